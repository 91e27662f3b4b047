use crate::error::LoadError;
use tracing::warn;

/// Decides whether a stage survives a failure.
///
/// Returning `Ok(())` absorbs the failure: an unavailable dump ends input, a
/// malformed record is dropped. Returning `Err` aborts the stage before
/// anything is persisted.
pub trait FailurePolicy {
    fn on_unavailable(&self, err: LoadError) -> Result<(), LoadError>;

    fn on_malformed(&self, err: LoadError) -> Result<(), LoadError>;
}

/// Any failure aborts the stage. Used for authors.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailFast;

impl FailurePolicy for FailFast {
    fn on_unavailable(&self, err: LoadError) -> Result<(), LoadError> {
        Err(err)
    }

    fn on_malformed(&self, err: LoadError) -> Result<(), LoadError> {
        Err(err)
    }
}

/// Failures are logged and absorbed; whatever parsed is kept. Used for works.
#[derive(Debug, Default, Clone, Copy)]
pub struct BestEffort;

impl FailurePolicy for BestEffort {
    fn on_unavailable(&self, err: LoadError) -> Result<(), LoadError> {
        warn!(error = %err, "Dump unreadable, treating as end of input");
        Ok(())
    }

    fn on_malformed(&self, err: LoadError) -> Result<(), LoadError> {
        match &err {
            LoadError::MalformedRecord { line, source } => {
                warn!(line, error = %source, "Skipping malformed record");
            }
            other => warn!(error = %other, "Skipping malformed record"),
        }
        Ok(())
    }
}
