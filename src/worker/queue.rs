//! Work queue between whoever receives screenshots and the OCR worker thread.
//!
//! Uses std::sync::mpsc, so any number of producers can feed one worker.

use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};

/// A screenshot waiting to be processed.
#[derive(Debug, Clone)]
pub struct WorkItem {
    /// Who sent the screenshot
    pub user_id: i64,
    /// Path to the screenshot file
    pub screenshot_path: PathBuf,
    /// When the screenshot was received
    pub received_at: DateTime<Local>,
}

impl WorkItem {
    pub fn new(user_id: i64, screenshot_path: PathBuf) -> Self {
        Self {
            user_id,
            screenshot_path,
            received_at: Local::now(),
        }
    }
}

/// Creates a new work queue.
///
/// The channel is unbounded; items queue up while OCR is busy.
pub fn create_work_queue() -> (Sender<WorkItem>, Receiver<WorkItem>) {
    channel()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_items_arrive_in_order() {
        let (sender, receiver) = create_work_queue();

        for i in 1..=5 {
            sender
                .send(WorkItem::new(i, PathBuf::from(format!("screenshot_{}.png", i))))
                .unwrap();
        }

        for i in 1..=5 {
            let received = receiver.recv().unwrap();
            assert_eq!(received.user_id, i);
            assert_eq!(
                received.screenshot_path,
                PathBuf::from(format!("screenshot_{}.png", i))
            );
        }
    }

    #[test]
    fn test_channel_closes_when_sender_dropped() {
        let (sender, receiver) = create_work_queue();

        sender.send(WorkItem::new(1, PathBuf::from("test.png"))).unwrap();
        drop(sender);

        assert!(receiver.recv().is_ok());
        assert!(receiver.recv().is_err());
    }
}
