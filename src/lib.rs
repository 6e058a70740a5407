pub mod app;
pub mod config;
pub mod db;
pub mod detector;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod observer;
pub mod state;
pub mod tally;
pub mod threshold;

pub use config::Settings;
pub use detector::{
    DEFAULT_THRESHOLD, DETECTOR_ID, HEADER_NAME, HEADER_VALUE, NPlusOneDetector, NPlusOneLayer,
    QueryFailed,
};
pub use observer::QueryObserver;
pub use tally::{QueryTally, RepeatViolations};
pub use threshold::{
    AnnotateResponse, Decorated, NPlusOneThreshold, ThresholdAnnotator, ThresholdLayer,
    n_plus_one_threshold,
};
