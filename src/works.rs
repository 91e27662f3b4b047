use crate::config::{
    LoaderConfig, AUTHOR_KEY_PREFIX, CREATED_TIMESTAMP_FORMAT, UNKNOWN_AUTHOR, WORK_KEY_PREFIX,
};
use crate::error::RecordError;
use crate::fields::{strip_key_prefix, Fields};
use crate::models::{Author, Book};
use crate::policy::BestEffort;
use crate::stage::{collect_records, RecordMapper};
use crate::store::EntityStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::{debug, info};

/// Builds a book from a work payload, leaving `author_names` unset.
///
/// Optional: `description`, `covers`, `authors`. Required when present:
/// `authors[i].author.key`, and `created.value` in the timestamp layout.
/// The `created` object itself is required unless `require_created` is off.
pub fn parse_work(payload: &Value, require_created: bool) -> Result<Book, RecordError> {
    let fields = Fields::root(payload)?;
    let key = fields.text_or_default("key");

    let description = match fields.object("description") {
        Some(desc) => Some(desc.text_or_default("value")),
        None => fields
            .value("description")
            .and_then(Value::as_str)
            .map(str::to_string),
    };

    let published_date = if require_created || fields.value("created").is_some() {
        let created = fields.require_object("created")?;
        Some(parse_created(created.require_str("value")?)?)
    } else {
        None
    };

    let cover_ids = match fields.array("covers") {
        Some((items, path)) => Some(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| cover_id(item, &path, i))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        None => None,
    };

    let author_ids = match fields.array("authors") {
        Some((items, path)) => Some(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let entry = Fields::element(item, format!("{path}[{i}]"))?;
                    let key = entry.require_object("author")?.require_str("key")?;
                    Ok(strip_key_prefix(key, AUTHOR_KEY_PREFIX).to_string())
                })
                .collect::<Result<Vec<_>, RecordError>>()?,
        ),
        None => None,
    };

    Ok(Book {
        id: strip_key_prefix(&key, WORK_KEY_PREFIX).to_string(),
        name: fields.text_or_default("title"),
        description,
        published_date,
        cover_ids,
        author_ids,
        author_names: None,
    })
}

pub fn parse_created(value: &str) -> Result<NaiveDate, RecordError> {
    NaiveDateTime::parse_from_str(value, CREATED_TIMESTAMP_FORMAT)
        .map(|ts| ts.date())
        .map_err(|source| RecordError::InvalidDate {
            value: value.to_string(),
            source,
        })
}

fn cover_id(item: &Value, path: &str, index: usize) -> Result<String, RecordError> {
    match item {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(RecordError::WrongType {
            path: format!("{path}[{index}]"),
            expected: "a string",
        }),
    }
}

/// Looks up each id in order; ids with no stored author get [`UNKNOWN_AUTHOR`].
pub async fn resolve_author_names<S>(
    ids: &[String],
    authors: &S,
) -> Result<Vec<String>, RecordError>
where
    S: EntityStore<Author>,
{
    let mut names = Vec::with_capacity(ids.len());
    for id in ids {
        let found = authors
            .find_by_id(id)
            .await
            .map_err(|e| RecordError::Lookup {
                id: id.clone(),
                message: format!("{e:#}"),
            })?;
        match found {
            Some(author) => names.push(author.name),
            None => {
                debug!(author_id = %id, "Unresolved author reference");
                names.push(UNKNOWN_AUTHOR.to_string());
            }
        }
    }
    Ok(names)
}

pub struct BookMapper<'a, S> {
    authors: &'a S,
    require_created: bool,
}

impl<'a, S> BookMapper<'a, S> {
    pub fn new(authors: &'a S, require_created: bool) -> Self {
        Self {
            authors,
            require_created,
        }
    }
}

#[async_trait]
impl<'a, S> RecordMapper for BookMapper<'a, S>
where
    S: EntityStore<Author>,
{
    type Record = Book;

    async fn map(&self, payload: &Value) -> Result<Book, RecordError> {
        let mut book = parse_work(payload, self.require_created)?;
        if let Some(ids) = &book.author_ids {
            book.author_names = Some(resolve_author_names(ids, self.authors).await?);
        }
        Ok(book)
    }
}

/// Loads the works dump into `books`, resolving author names through `authors`.
///
/// Unreadable dumps and malformed lines are logged and skipped; whatever
/// parsed is saved in one bulk call.
pub async fn load_works<A, B>(config: &LoaderConfig, authors: &A, books: &B) -> Result<usize>
where
    A: EntityStore<Author>,
    B: EntityStore<Book>,
{
    let mapper = BookMapper::new(authors, config.require_created);
    let output = collect_records(&config.works_dump, &mapper, &BestEffort, config.limit)
        .await
        .with_context(|| format!("Work load aborted for {}", config.works_dump.display()))?;

    let count = output.records.len();
    books
        .save_all(output.records)
        .await
        .context("Failed to persist books")?;

    info!(books = count, lines = output.lines_read, "Works loaded");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn sample_work() -> Value {
        json!({
            "key": "/works/OL5W",
            "title": "The Long Walk",
            "description": {"type": "/type/text", "value": "A walk."},
            "created": {"type": "/type/datetime", "value": "2009-10-15T11:34:21.437031"},
            "covers": ["123", 456],
            "authors": [
                {"type": {"key": "/type/author_role"}, "author": {"key": "/authors/OL1A"}},
                {"author": {"key": "/authors/OL9Z"}}
            ]
        })
    }

    async fn author_store() -> MemoryStore<Author> {
        let store = MemoryStore::new();
        store
            .save_all(vec![Author {
                id: "OL1A".to_string(),
                name: "Jane Doe".to_string(),
                personal_name: String::new(),
            }])
            .await
            .unwrap();
        store
    }

    #[test]
    fn parse_full_work() {
        let book = parse_work(&sample_work(), true).unwrap();
        assert_eq!(book.id, "OL5W");
        assert_eq!(book.name, "The Long Walk");
        assert_eq!(book.description.as_deref(), Some("A walk."));
        assert_eq!(book.published_date, NaiveDate::from_ymd_opt(2009, 10, 15));
        assert_eq!(
            book.cover_ids,
            Some(vec!["123".to_string(), "456".to_string()])
        );
        assert_eq!(
            book.author_ids,
            Some(vec!["OL1A".to_string(), "OL9Z".to_string()])
        );
        assert_eq!(book.author_names, None);
    }

    #[test]
    fn missing_description_is_unset() {
        let mut work = sample_work();
        work.as_object_mut().unwrap().remove("description");
        let book = parse_work(&work, true).unwrap();
        assert_eq!(book.description, None);
    }

    #[test]
    fn description_without_value_is_empty() {
        let mut work = sample_work();
        work["description"] = json!({"type": "/type/text"});
        let book = parse_work(&work, true).unwrap();
        assert_eq!(book.description.as_deref(), Some(""));
    }

    #[test]
    fn plain_string_description_is_used() {
        let mut work = sample_work();
        work["description"] = json!("Plain text.");
        let book = parse_work(&work, true).unwrap();
        assert_eq!(book.description.as_deref(), Some("Plain text."));
    }

    #[test]
    fn missing_covers_and_authors_are_unset() {
        let mut work = sample_work();
        let obj = work.as_object_mut().unwrap();
        obj.remove("covers");
        obj.remove("authors");
        let book = parse_work(&work, true).unwrap();
        assert_eq!(book.cover_ids, None);
        assert_eq!(book.author_ids, None);
    }

    #[test]
    fn empty_covers_stay_empty() {
        let mut work = sample_work();
        work["covers"] = json!([]);
        let book = parse_work(&work, true).unwrap();
        assert_eq!(book.cover_ids, Some(vec![]));
    }

    #[test]
    fn cover_of_wrong_type_is_malformed() {
        let mut work = sample_work();
        work["covers"] = json!([{"id": 1}]);
        match parse_work(&work, true) {
            Err(RecordError::WrongType { path, .. }) => assert_eq!(path, "covers[0]"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn bad_created_date_is_malformed() {
        let mut work = sample_work();
        work["created"] = json!({"value": "15/10/2009"});
        assert!(matches!(
            parse_work(&work, true),
            Err(RecordError::InvalidDate { .. })
        ));
        assert!(matches!(
            parse_work(&work, false),
            Err(RecordError::InvalidDate { .. })
        ));
    }

    #[test]
    fn missing_created_depends_on_policy() {
        let mut work = sample_work();
        work.as_object_mut().unwrap().remove("created");
        match parse_work(&work, true) {
            Err(RecordError::MissingField { path }) => assert_eq!(path, "created"),
            other => panic!("unexpected: {other:?}"),
        }
        let book = parse_work(&work, false).unwrap();
        assert_eq!(book.published_date, None);
    }

    #[test]
    fn created_without_value_is_malformed() {
        let mut work = sample_work();
        work["created"] = json!({"type": "/type/datetime"});
        match parse_work(&work, false) {
            Err(RecordError::MissingField { path }) => assert_eq!(path, "created.value"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn author_entry_without_key_is_malformed() {
        let mut work = sample_work();
        work["authors"] = json!([{"author": {"key": "/authors/OL1A"}}, {"author": {}}]);
        match parse_work(&work, true) {
            Err(RecordError::MissingField { path }) => assert_eq!(path, "authors[1].author.key"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parse_created_layout() {
        assert_eq!(
            parse_created("2008-04-01T03:28:50.625462").unwrap(),
            NaiveDate::from_ymd_opt(2008, 4, 1).unwrap()
        );
        assert!(parse_created("2008-04-01").is_err());
        assert!(parse_created("").is_err());
    }

    #[tokio::test]
    async fn names_follow_ids_with_unknown_sentinel() {
        let store = author_store().await;
        let ids = vec!["OL1A".to_string(), "OL9Z".to_string()];
        let names = resolve_author_names(&ids, &store).await.unwrap();
        assert_eq!(names, vec!["Jane Doe", "Unknown Author"]);
    }

    #[tokio::test]
    async fn mapper_fills_author_names() {
        let store = author_store().await;
        let mapper = BookMapper::new(&store, true);
        let book = mapper.map(&sample_work()).await.unwrap();
        let ids = book.author_ids.unwrap();
        let names = book.author_names.unwrap();
        assert_eq!(ids.len(), names.len());
        assert_eq!(names, vec!["Jane Doe", "Unknown Author"]);
    }

    #[tokio::test]
    async fn mapper_without_authors_leaves_names_unset() {
        let store = author_store().await;
        let mapper = BookMapper::new(&store, true);
        let mut work = sample_work();
        work.as_object_mut().unwrap().remove("authors");
        let book = mapper.map(&work).await.unwrap();
        assert_eq!(book.author_names, None);
    }

    #[tokio::test]
    async fn empty_authors_array_gives_empty_names() {
        let store = author_store().await;
        let mapper = BookMapper::new(&store, true);
        let mut work = sample_work();
        work["authors"] = json!([]);
        let book = mapper.map(&work).await.unwrap();
        assert_eq!(book.author_ids, Some(vec![]));
        assert_eq!(book.author_names, Some(vec![]));
    }
}
