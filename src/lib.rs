//! Shelfload: Open Library dump loader
//!
//! This crate ingests the newline-delimited author and work dumps published by
//! Open Library and persists them as denormalized records:
//!
//! 1. **Author Stage** -- Parse every author line and save the whole set in one
//!    bulk call. Any unreadable dump or malformed line aborts the stage before
//!    anything is saved.
//! 2. **Work Stage** -- Parse every work line, resolve each referenced author id
//!    against the author store to copy its name onto the book, and save the
//!    books in one bulk call. Unreadable dumps and malformed lines are logged and
//!    skipped.
//!
//! The work stage depends on the author stage having completed, since author
//! names are looked up in the store it populated.
//!
//! # Dump Format
//!
//! Each line carries tab-separated record metadata followed by a JSON object:
//!
//! ```text
//! /type/author	/authors/OL1A	3	2010-04-08T00:00:00.000000	{"key": "/authors/OL1A", "name": "Jane Doe"}
//! ```
//!
//! Everything before the first `{` is ignored. Dumps ending in `.bz2` are
//! decompressed while reading.
//!
//! # Key Modules
//!
//! - [`parser`] -- Dump line iterator and payload extraction
//! - [`fields`] -- Required/optional JSON field accessors
//! - [`authors`] -- Author mapping and the fail-fast author stage
//! - [`works`] -- Book mapping, author name resolution, and the best-effort work stage
//! - [`policy`] -- Failure policies selected per stage
//! - [`stage`] -- Line loop shared by both stages
//! - [`store`] -- Storage capability with in-memory and Neo4j backends
//! - [`models`] -- `Author` and `Book` records
//! - [`config`] -- Constants and loader settings
//!
//! # Example Usage
//!
//! ```bash
//! shelfload -v load --author-dump ol_dump_authors.txt --works-dump ol_dump_works.txt.bz2
//! ```

pub mod authors;
pub mod config;
pub mod error;
pub mod fields;
pub mod models;
pub mod parser;
pub mod policy;
pub mod stage;
pub mod store;
pub mod works;

use anyhow::Result;
use config::LoaderConfig;
use models::{Author, Book};
use store::EntityStore;
use tracing::info;

/// Record counts persisted by a full run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub authors: usize,
    pub books: usize,
}

/// Runs the author stage to completion, then the work stage.
pub async fn run<A, B>(
    config: &LoaderConfig,
    author_store: &A,
    book_store: &B,
) -> Result<LoadSummary>
where
    A: EntityStore<Author>,
    B: EntityStore<Book>,
{
    info!("Starting author stage");
    let author_count = authors::load_authors(config, author_store).await?;

    info!("Starting work stage");
    let book_count = works::load_works(config, author_store, book_store).await?;

    Ok(LoadSummary {
        authors: author_count,
        books: book_count,
    })
}
