pub mod error;
pub mod model;

pub use error::AppError;
pub use model::{
    AttemptPlan, Browser, DownloadRequest, PostStep, ProgressEvent, Quality, RunOutcome,
    RunPhase, Severity,
};
