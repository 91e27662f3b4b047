use std::path::PathBuf;

/// Prefix stripped from author `key` fields to form the natural key
pub const AUTHOR_KEY_PREFIX: &str = "/authors/";

/// Prefix stripped from work `key` fields to form the natural key
pub const WORK_KEY_PREFIX: &str = "/works/";

/// Name recorded for an author reference that has no matching author
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// Layout of `created.value` on work records (`yyyy-MM-dd'T'HH:mm:ss.SSSSSS`)
pub const CREATED_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Progress update interval (tick every N lines)
pub const PROGRESS_INTERVAL: u64 = 1000;

/// Records written per Neo4j transaction during a bulk save
pub const SAVE_BATCH_SIZE: usize = 1000;

pub const DEFAULT_BOLT_URI: &str = "bolt://localhost:7687";

pub const CONNECT_MAX_RETRIES: u32 = 10;

pub const CONNECT_RETRY_DELAY_SECS: u64 = 3;

/// Settings shared by both loader stages.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub author_dump: PathBuf,
    pub works_dump: PathBuf,
    /// Stop each stage after this many lines
    pub limit: Option<u64>,
    /// Skip work lines without a `created` object instead of leaving the date unset
    pub require_created: bool,
}

impl LoaderConfig {
    pub fn new(author_dump: impl Into<PathBuf>, works_dump: impl Into<PathBuf>) -> Self {
        Self {
            author_dump: author_dump.into(),
            works_dump: works_dump.into(),
            limit: None,
            require_created: true,
        }
    }
}
