//! Statistics extraction from TikTok Live post-stream screenshots.
//!
//! A screenshot goes through [`ocr::ScreenshotProcessor`]: image variants,
//! multi-pass OCR, duration and number heuristics, validation. Accepted
//! results are kept by a [`store::StatisticsStore`] and summarized by
//! [`report`].

pub mod config;
pub mod logging;
pub mod ocr;
pub mod paths;
pub mod report;
pub mod store;
pub mod worker;
