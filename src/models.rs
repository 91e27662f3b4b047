use chrono::NaiveDate;

/// A record persisted under a natural key.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Node label / table name used in storage and logs
    const LABEL: &'static str;

    fn id(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Author {
    pub id: String,
    pub name: String,
    pub personal_name: String,
}

/// A work with author names copied in at ingest time.
///
/// When `author_ids` is present, `author_names` is present too and has the
/// same length, with `author_names[i]` belonging to `author_ids[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Book {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub published_date: Option<NaiveDate>,
    pub cover_ids: Option<Vec<String>>,
    pub author_ids: Option<Vec<String>>,
    pub author_names: Option<Vec<String>>,
}

impl Entity for Author {
    const LABEL: &'static str = "Author";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Book {
    const LABEL: &'static str = "Book";

    fn id(&self) -> &str {
        &self.id
    }
}
