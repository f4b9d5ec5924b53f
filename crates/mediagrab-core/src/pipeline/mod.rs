//! Download pipelines.
//!
//! - `bulk`: fetch many resources in order, bundle them into one ZIP, report
//!   two-phase progress, hand the archive to the persistence sink.
//! - `single`: save one resource directly, retry once with the other
//!   strategy if the sink reports a failure.
//!
//! Both run on the tokio runtime and move every blocking step (transfers,
//! compression, sink calls) onto `spawn_blocking`, one step at a time.

mod bulk;
mod single;

#[cfg(test)]
pub(crate) mod testing;

pub use bulk::{BulkError, BulkOptions, BulkPipeline, BulkRequest, BulkState, FetchFailure, JobResult};
pub use single::{RetryOutcome, RetryTask, SingleOutcome, SinglePipeline, SingleRequest, RETRY_DELAY};

use serde::{Deserialize, Serialize};

/// What a failed bulk item leaves behind in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderMode {
    /// Every failure writes `error_read_me.txt`; a later failure replaces an
    /// earlier one, so only the last failure's text is kept.
    #[default]
    Collapsed,
    /// Failed items are left out of the archive and only reported in
    /// [`JobResult::failures`].
    Disabled,
}
