//! Error taxonomy for the loader stages

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Why a single dump line could not be turned into a record
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("no JSON object found in line")]
    NoPayload,

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("missing required field '{path}'")]
    MissingField { path: String },

    #[error("field '{path}' is not {expected}")]
    WrongType { path: String, expected: &'static str },

    #[error("invalid date '{value}': {source}")]
    InvalidDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("author lookup for '{id}' failed: {message}")]
    Lookup { id: String, message: String },
}

/// Stage-level failure
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Unable to read file '{}'", .path.display())]
    FileUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed record on line {line}: {source}")]
    MalformedRecord {
        line: u64,
        #[source]
        source: RecordError,
    },
}
