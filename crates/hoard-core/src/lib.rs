pub mod cancel;
pub mod classify;
pub mod config;
pub mod deletion;
pub mod error;
pub mod pipeline;
pub mod platform;
pub mod progress;
pub mod record;
pub mod results;
pub mod scanner;

pub use cancel::CancelToken;
pub use classify::{classify, Classification, Classifier, Tier};
pub use crate::config::{AppConfig, ExtensionFilter, PipelineSettings, ScanConfig};
pub use deletion::{
    ConfirmedPlan, DeletionCandidate, DeletionOutcome, DeletionPlan, DisposalMethod,
    SafeDeletionEngine,
};
pub use error::Error;
pub use pipeline::{PollReport, ScanPipeline, ScanState, ScanSummary};
pub use progress::{ProgressReporter, SilentReporter};
pub use record::FileRecord;
pub use results::{ResultRow, ResultSet, SortDirection, SortKey, TierFilter, ViewOptions};
pub use scanner::{PathMatcher, TreeWalker};
