pub mod queue;
pub mod screenshot_worker;

pub use queue::{create_work_queue, WorkItem};
pub use screenshot_worker::{run_worker, WorkOutcome};
