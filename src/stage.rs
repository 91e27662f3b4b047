use crate::config::PROGRESS_INTERVAL;
use crate::error::{LoadError, RecordError};
use crate::parser::{parse_payload, DumpReader};
use crate::policy::FailurePolicy;
use async_trait::async_trait;
use indicatif::ProgressBar;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

/// Turns one parsed payload into a record.
#[async_trait]
pub trait RecordMapper: Send + Sync {
    type Record: Send;

    async fn map(&self, payload: &Value) -> Result<Self::Record, RecordError>;
}

/// Records accumulated by one pass over a dump, owned by the caller.
#[derive(Debug)]
pub struct StageOutput<T> {
    pub records: Vec<T>,
    pub lines_read: u64,
}

impl<T> Default for StageOutput<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            lines_read: 0,
        }
    }
}

/// Reads `path` line by line, mapping each payload and letting `policy`
/// decide what a failure means for the rest of the pass.
pub async fn collect_records<M, P>(
    path: &Path,
    mapper: &M,
    policy: &P,
    limit: Option<u64>,
) -> Result<StageOutput<M::Record>, LoadError>
where
    M: RecordMapper,
    P: FailurePolicy,
{
    let mut output = StageOutput::default();

    let reader = match DumpReader::open(path) {
        Ok(reader) => reader,
        Err(e) => {
            policy.on_unavailable(e)?;
            return Ok(output);
        }
    };

    info!("Reading dump: {}", reader.path().display());
    let pb = ProgressBar::new_spinner();

    for line in reader {
        if limit.is_some_and(|max| output.lines_read >= max) {
            debug!(limit = ?limit, "Line limit reached");
            break;
        }

        let line = match line {
            Ok(line) => line,
            Err(e) => {
                policy.on_unavailable(e)?;
                break;
            }
        };
        output.lines_read += 1;

        let mapped = match parse_payload(&line.text) {
            Ok(payload) => mapper.map(&payload).await,
            Err(e) => Err(e),
        };

        match mapped {
            Ok(record) => output.records.push(record),
            Err(source) => policy.on_malformed(LoadError::MalformedRecord {
                line: line.number,
                source,
            })?,
        }

        if output.lines_read % PROGRESS_INTERVAL == 0 {
            pb.tick();
        }
    }

    pb.finish_and_clear();

    info!(
        lines = output.lines_read,
        records = output.records.len(),
        "Dump read"
    );

    Ok(output)
}
