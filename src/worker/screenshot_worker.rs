//! Worker loop that turns queued screenshots into recorded sessions.
//!
//! Blocks until the queue closes, so it is meant for a dedicated thread.

use std::sync::mpsc::{Receiver, Sender};
use tracing::{info, warn};

use super::queue::WorkItem;
use crate::ocr::{ParsedStatistics, ScreenshotError, ScreenshotProcessor, TextRecognizer};
use crate::store::{SessionRecord, StatisticsStore};

/// What happened to one queued screenshot.
#[derive(Debug)]
pub enum WorkOutcome {
    Recorded {
        user_id: i64,
        stats: ParsedStatistics,
    },
    Rejected {
        user_id: i64,
        error: ScreenshotError,
    },
    StoreFailed {
        user_id: i64,
        error: anyhow::Error,
    },
}

fn process_item<R: TextRecognizer, S: StatisticsStore>(
    item: &WorkItem,
    processor: &ScreenshotProcessor<R>,
    store: &S,
) -> WorkOutcome {
    let user_id = item.user_id;

    let stats = match processor.process_file(&item.screenshot_path) {
        Ok(stats) => stats,
        Err(error) => {
            warn!(user_id, path = %item.screenshot_path.display(), %error, "screenshot rejected");
            return WorkOutcome::Rejected { user_id, error };
        }
    };

    let source = item
        .screenshot_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let record = SessionRecord {
        user_id,
        recorded_at: item.received_at,
        stats,
        source,
    };

    match store.append(&record) {
        Ok(()) => WorkOutcome::Recorded { user_id, stats },
        Err(error) => {
            warn!(user_id, %error, "failed to store statistics");
            WorkOutcome::StoreFailed { user_id, error }
        }
    }
}

/// Processes items in arrival order until every sender is dropped.
///
/// Accepted results are appended to `store`. One outcome per item is sent to
/// `outcomes` when given. With `delete_screenshots` the screenshot file is
/// removed after processing whatever the result.
pub fn run_worker<R: TextRecognizer, S: StatisticsStore>(
    receiver: Receiver<WorkItem>,
    processor: &ScreenshotProcessor<R>,
    store: &S,
    outcomes: Option<&Sender<WorkOutcome>>,
    delete_screenshots: bool,
) {
    info!("screenshot worker started");

    for item in receiver {
        info!(
            user_id = item.user_id,
            path = %item.screenshot_path.display(),
            "processing queued screenshot"
        );

        let outcome = process_item(&item, processor, store);

        if delete_screenshots {
            if let Err(e) = std::fs::remove_file(&item.screenshot_path) {
                warn!(
                    path = %item.screenshot_path.display(),
                    error = %e,
                    "failed to delete screenshot"
                );
            }
        }

        if let Some(outcomes) = outcomes {
            // Nobody listening any more is not an error for the worker.
            let _ = outcomes.send(outcome);
        }
    }

    info!("screenshot worker finished");
}
