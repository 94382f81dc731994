pub mod audio;
pub mod chapters;
pub mod config;
pub mod dialog;
pub mod error;
pub mod interactive;
pub mod pipeline;
pub mod subtitle;

pub use config::Config;
pub use dialog::{consolidate, plan_dialog, subtract, Interval, Timestamp};
pub use error::{DialogError, Result};
pub use pipeline::{
    extract_dialog, extract_dialog_with_cancel, print_summary, ExtractionJob, PipelineConfig,
    PipelineResult, PipelineStats,
};
