use crate::config::{LoaderConfig, AUTHOR_KEY_PREFIX};
use crate::error::RecordError;
use crate::fields::{strip_key_prefix, Fields};
use crate::models::Author;
use crate::policy::FailFast;
use crate::stage::{collect_records, RecordMapper};
use crate::store::EntityStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

/// Builds an author from a dump payload. Every field is optional and
/// defaults to the empty string, so a payload without `key` yields an
/// author with an empty id.
pub fn parse_author(payload: &Value) -> Result<Author, RecordError> {
    let fields = Fields::root(payload)?;
    let key = fields.text_or_default("key");

    Ok(Author {
        id: strip_key_prefix(&key, AUTHOR_KEY_PREFIX).to_string(),
        name: fields.text_or_default("name"),
        personal_name: fields.text_or_default("personal_name"),
    })
}

pub struct AuthorMapper;

#[async_trait]
impl RecordMapper for AuthorMapper {
    type Record = Author;

    async fn map(&self, payload: &Value) -> Result<Author, RecordError> {
        parse_author(payload)
    }
}

/// Loads the author dump into `store`.
///
/// A single unreadable dump or malformed line aborts the stage before
/// `save_all` is called, so a failed run persists no authors at all.
pub async fn load_authors<S>(config: &LoaderConfig, store: &S) -> Result<usize>
where
    S: EntityStore<Author>,
{
    let path = &config.author_dump;
    let output = collect_records(path, &AuthorMapper, &FailFast, config.limit)
        .await
        .with_context(|| format!("Author load aborted for {}", path.display()))?;

    let count = output.records.len();
    store
        .save_all(output.records)
        .await
        .context("Failed to persist authors")?;

    info!(authors = count, "complete");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_full_author() {
        let author = parse_author(&json!({
            "key": "/authors/OL1A",
            "name": "Jane Doe",
            "personal_name": "Jane Q. Doe"
        }))
        .unwrap();
        assert_eq!(
            author,
            Author {
                id: "OL1A".to_string(),
                name: "Jane Doe".to_string(),
                personal_name: "Jane Q. Doe".to_string(),
            }
        );
    }

    #[test]
    fn parse_author_defaults_to_empty_strings() {
        let author = parse_author(&json!({"key": "/authors/OL2A"})).unwrap();
        assert_eq!(author.id, "OL2A");
        assert_eq!(author.name, "");
        assert_eq!(author.personal_name, "");
    }

    #[test]
    fn parse_author_without_key_has_empty_id() {
        let author = parse_author(&json!({"name": "Anonymous"})).unwrap();
        assert_eq!(author.id, "");
        assert_eq!(author.name, "Anonymous");
    }

    #[test]
    fn parse_author_key_without_prefix_is_kept() {
        let author = parse_author(&json!({"key": "OL3A"})).unwrap();
        assert_eq!(author.id, "OL3A");
    }

    #[test]
    fn parse_author_rejects_non_object() {
        assert!(matches!(
            parse_author(&json!("Jane Doe")),
            Err(RecordError::NotAnObject)
        ));
    }
}
