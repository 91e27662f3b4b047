use crate::error::{LoadError, RecordError};
use bzip2::read::MultiBzDecoder;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

/// One line of a dump file, numbered from 1.
#[derive(Debug, Clone)]
pub struct DumpLine {
    pub number: u64,
    pub text: String,
}

/// Line iterator over a dump file. Paths ending in `.bz2` are decompressed on the fly.
///
/// The file handle is owned by the reader and released when it is dropped,
/// whether or not iteration ran to the end.
pub struct DumpReader {
    path: PathBuf,
    lines: Lines<Box<dyn BufRead + Send>>,
    line_no: u64,
}

impl DumpReader {
    pub fn open(path: &Path) -> Result<Self, LoadError> {
        let file = File::open(path).map_err(|source| LoadError::FileUnavailable {
            path: path.to_path_buf(),
            source,
        })?;

        let reader: Box<dyn BufRead + Send> = if is_bz2(path) {
            Box::new(BufReader::with_capacity(
                128 * 1024,
                MultiBzDecoder::new(file),
            ))
        } else {
            Box::new(BufReader::with_capacity(128 * 1024, file))
        };

        Ok(Self {
            path: path.to_path_buf(),
            lines: reader.lines(),
            line_no: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Iterator for DumpReader {
    type Item = Result<DumpLine, LoadError>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = self.lines.next()?;
        self.line_no += 1;
        Some(
            line.map(|text| DumpLine {
                number: self.line_no,
                text,
            })
            .map_err(|source| LoadError::FileUnavailable {
                path: self.path.clone(),
                source,
            }),
        )
    }
}

fn is_bz2(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("bz2"))
}

/// Parses the JSON object embedded in a dump line.
///
/// Dump lines carry tab-separated record metadata (type, key, revision,
/// timestamp) before the JSON; everything before the first `{` is dropped.
pub fn parse_payload(line: &str) -> Result<Value, RecordError> {
    let start = memchr::memchr(b'{', line.as_bytes()).ok_or(RecordError::NoPayload)?;
    let value: Value = serde_json::from_str(&line[start..])?;
    if !value.is_object() {
        return Err(RecordError::NotAnObject);
    }
    Ok(value)
}
