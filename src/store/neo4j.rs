use super::EntityStore;
use crate::config::{
    CONNECT_MAX_RETRIES, CONNECT_RETRY_DELAY_SECS, DEFAULT_BOLT_URI, SAVE_BATCH_SIZE,
};
use crate::models::{Author, Book, Entity};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use neo4rs::{query, Graph, Query, Row};
use tracing::{debug, info};

/// Absent optionals are written as null so an upsert clears stale properties.
const CYPHER_MERGE_AUTHOR: &str = r#"MERGE (a:Author {id: $id})
SET a.name = $name,
    a.personal_name = $personal_name"#;

const CYPHER_MERGE_BOOK: &str = r#"MERGE (b:Book {id: $id})
SET b.name = $name,
    b.description = CASE WHEN $has_description THEN $description ELSE null END,
    b.published_date = CASE WHEN $published_date = '' THEN null ELSE date($published_date) END,
    b.cover_ids = CASE WHEN $has_covers THEN $cover_ids ELSE null END,
    b.author_ids = CASE WHEN $has_authors THEN $author_ids ELSE null END,
    b.author_names = CASE WHEN $has_authors THEN $author_names ELSE null END"#;

const CYPHER_FIND_AUTHOR: &str = r#"MATCH (a:Author {id: $id})
RETURN a.id AS id,
       coalesce(a.name, '') AS name,
       coalesce(a.personal_name, '') AS personal_name
LIMIT 1"#;

const CYPHER_FIND_BOOK: &str = r#"MATCH (b:Book {id: $id})
RETURN b.id AS id,
       coalesce(b.name, '') AS name,
       b.description IS NOT NULL AS has_description,
       coalesce(b.description, '') AS description,
       coalesce(toString(b.published_date), '') AS published_date,
       b.cover_ids IS NOT NULL AS has_covers,
       coalesce(b.cover_ids, []) AS cover_ids,
       b.author_ids IS NOT NULL AS has_authors,
       coalesce(b.author_ids, []) AS author_ids,
       coalesce(b.author_names, []) AS author_names
LIMIT 1"#;

const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE CONSTRAINT author_id_unique IF NOT EXISTS FOR (a:Author) REQUIRE a.id IS UNIQUE;",
    "CREATE CONSTRAINT book_id_unique IF NOT EXISTS FOR (b:Book) REQUIRE b.id IS UNIQUE;",
];

#[derive(Debug, Clone)]
pub struct Neo4jConfig {
    pub bolt_uri: String,
    pub user: String,
    pub password: String,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            bolt_uri: DEFAULT_BOLT_URI.to_string(),
            user: String::new(),
            password: String::new(),
        }
    }
}

/// Stores authors and books as `:Author` / `:Book` nodes keyed by `id`.
pub struct Neo4jStore {
    graph: Graph,
}

impl Neo4jStore {
    /// Connects (retrying while the server comes up) and ensures the id constraints exist.
    pub async fn connect(config: &Neo4jConfig) -> Result<Self> {
        info!(uri = %config.bolt_uri, "Connecting to Neo4j");
        let graph = connect_with_retry(config).await?;
        for statement in SCHEMA_STATEMENTS {
            run_cypher(&graph, statement).await?;
        }
        info!("Neo4j schema ready");
        Ok(Self { graph })
    }

    async fn save_queries<T: Entity>(&self, queries: Vec<Query>) -> Result<()> {
        if queries.is_empty() {
            info!(label = T::LABEL, "Nothing to save");
            return Ok(());
        }

        let total = queries.len();
        let pb = make_progress_bar(total as u64, T::LABEL);
        let mut queries = queries.into_iter().peekable();

        while queries.peek().is_some() {
            let batch: Vec<Query> = queries.by_ref().take(SAVE_BATCH_SIZE).collect();
            let size = batch.len();
            let mut txn = self
                .graph
                .start_txn()
                .await
                .context("Failed to start transaction")?;
            txn.run_queries(batch)
                .await
                .with_context(|| format!("Failed to write {} batch", T::LABEL))?;
            txn.commit()
                .await
                .with_context(|| format!("Failed to commit {} batch", T::LABEL))?;
            pb.inc(size as u64);
        }

        pb.finish_with_message(format!("{}: {total} saved", T::LABEL));
        info!(label = T::LABEL, count = total, "Bulk save complete");
        Ok(())
    }

    async fn find_row(&self, cypher: &str, id: &str) -> Result<Option<Row>> {
        let mut result = self
            .graph
            .execute(query(cypher).param("id", id))
            .await
            .with_context(|| format!("Failed to execute lookup for id '{id}'"))?;
        Ok(result.next().await?)
    }
}

#[async_trait]
impl EntityStore<Author> for Neo4jStore {
    async fn save_all(&self, records: Vec<Author>) -> Result<()> {
        let queries = records.iter().map(author_query).collect();
        self.save_queries::<Author>(queries).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Author>> {
        let Some(row) = self.find_row(CYPHER_FIND_AUTHOR, id).await? else {
            return Ok(None);
        };
        Ok(Some(Author {
            id: row.get("id").context("Missing 'id' field in result")?,
            name: row.get("name").context("Missing 'name' field in result")?,
            personal_name: row
                .get("personal_name")
                .context("Missing 'personal_name' field in result")?,
        }))
    }
}

#[async_trait]
impl EntityStore<Book> for Neo4jStore {
    async fn save_all(&self, records: Vec<Book>) -> Result<()> {
        let queries = records.iter().map(book_query).collect();
        self.save_queries::<Book>(queries).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Book>> {
        let Some(row) = self.find_row(CYPHER_FIND_BOOK, id).await? else {
            return Ok(None);
        };
        book_from_row(&row).map(Some)
    }
}

fn author_query(author: &Author) -> Query {
    query(CYPHER_MERGE_AUTHOR)
        .param("id", author.id.as_str())
        .param("name", author.name.as_str())
        .param("personal_name", author.personal_name.as_str())
}

fn book_query(book: &Book) -> Query {
    let published_date = book
        .published_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();

    query(CYPHER_MERGE_BOOK)
        .param("id", book.id.as_str())
        .param("name", book.name.as_str())
        .param("has_description", book.description.is_some())
        .param("description", book.description.clone().unwrap_or_default())
        .param("published_date", published_date)
        .param("has_covers", book.cover_ids.is_some())
        .param("cover_ids", book.cover_ids.clone().unwrap_or_default())
        .param("has_authors", book.author_ids.is_some())
        .param("author_ids", book.author_ids.clone().unwrap_or_default())
        .param("author_names", book.author_names.clone().unwrap_or_default())
}

fn book_from_row(row: &Row) -> Result<Book> {
    let has_description: bool = row.get("has_description").context("Missing 'has_description'")?;
    let has_covers: bool = row.get("has_covers").context("Missing 'has_covers'")?;
    let has_authors: bool = row.get("has_authors").context("Missing 'has_authors'")?;
    let published_date: String = row.get("published_date").context("Missing 'published_date'")?;

    let published_date = if published_date.is_empty() {
        None
    } else {
        Some(
            NaiveDate::parse_from_str(&published_date, "%Y-%m-%d")
                .with_context(|| format!("Stored date is not ISO-8601: {published_date}"))?,
        )
    };

    Ok(Book {
        id: row.get("id").context("Missing 'id'")?,
        name: row.get("name").context("Missing 'name'")?,
        description: if has_description {
            Some(row.get("description").context("Missing 'description'")?)
        } else {
            None
        },
        published_date,
        cover_ids: if has_covers {
            Some(row.get("cover_ids").context("Missing 'cover_ids'")?)
        } else {
            None
        },
        author_ids: if has_authors {
            Some(row.get("author_ids").context("Missing 'author_ids'")?)
        } else {
            None
        },
        author_names: if has_authors {
            Some(row.get("author_names").context("Missing 'author_names'")?)
        } else {
            None
        },
    })
}

async fn connect_with_retry(config: &Neo4jConfig) -> Result<Graph> {
    let max_retries = CONNECT_MAX_RETRIES;
    let delay = tokio::time::Duration::from_secs(CONNECT_RETRY_DELAY_SECS);

    for attempt in 1..=max_retries {
        match Graph::new(&config.bolt_uri, &config.user, &config.password) {
            Ok(graph) => match graph.run(query("RETURN 1;")).await {
                Ok(_) => return Ok(graph),
                Err(e) if attempt < max_retries => {
                    info!(attempt, "Connection test failed, retrying: {e}");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return Err(e).context(format!(
                        "Cannot connect to Neo4j at {} after {max_retries} attempts",
                        config.bolt_uri
                    ));
                }
            },
            Err(e) if attempt < max_retries => {
                info!(
                    attempt,
                    "Cannot connect to Neo4j at {}, retrying: {e}", config.bolt_uri
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                return Err(e).context(format!(
                    "Cannot connect to Neo4j at {} after {max_retries} attempts",
                    config.bolt_uri
                ));
            }
        }
    }

    bail!(
        "Cannot connect to Neo4j at {} after {max_retries} attempts",
        config.bolt_uri
    );
}

async fn run_cypher(graph: &Graph, cypher: &str) -> Result<()> {
    debug!(cypher, "Running schema statement");
    graph
        .run(query(cypher))
        .await
        .with_context(|| format!("Failed to execute: {cypher}"))?;
    Ok(())
}

fn make_progress_bar(total: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar().template(&format!(
        "    {{spinner:.cyan}} {label:<8} [{{bar:30.cyan/blue}}] {{pos}}/{{len}} records"
    )) {
        pb.set_style(style.progress_chars("=> "));
    }
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn author_merge_is_keyed_on_id() {
        assert!(CYPHER_MERGE_AUTHOR.contains("MERGE (a:Author {id: $id})"));
        assert!(CYPHER_MERGE_AUTHOR.contains("a.personal_name = $personal_name"));
    }

    #[test]
    fn book_merge_nulls_absent_optionals() {
        assert!(CYPHER_MERGE_BOOK.contains("MERGE (b:Book {id: $id})"));
        for flag in ["$has_description", "$has_covers", "$has_authors"] {
            assert!(CYPHER_MERGE_BOOK.contains(flag), "missing {flag}");
        }
        assert!(CYPHER_MERGE_BOOK.contains("date($published_date)"));
    }

    #[test]
    fn lookups_return_single_row() {
        for cypher in [CYPHER_FIND_AUTHOR, CYPHER_FIND_BOOK] {
            assert!(cypher.contains("{id: $id}"));
            assert!(cypher.trim_end().ends_with("LIMIT 1"));
        }
    }

    #[test]
    fn book_lookup_returns_every_merged_property() {
        for column in [
            "AS name",
            "AS description",
            "AS published_date",
            "AS cover_ids",
            "AS author_ids",
            "AS author_names",
        ] {
            assert!(CYPHER_FIND_BOOK.contains(column), "missing {column}");
        }
    }

    #[test]
    fn schema_constrains_both_labels() {
        assert!(SCHEMA_STATEMENTS.iter().any(|s| s.contains("(a:Author)")));
        assert!(SCHEMA_STATEMENTS.iter().any(|s| s.contains("(b:Book)")));
        assert!(SCHEMA_STATEMENTS.iter().all(|s| s.contains("IF NOT EXISTS")));
    }

    #[test]
    fn default_config_targets_local_bolt() {
        let config = Neo4jConfig::default();
        assert_eq!(config.bolt_uri, "bolt://localhost:7687");
        assert!(config.user.is_empty());
    }
}
