use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::metrics::{REQUEST_LATENCY, REQUEST_TOTAL};
use crate::models::{AuthorWithBooks, Book};
use crate::state::AppState;

pub const AUTHORS: &str = "SELECT id, name FROM authors ORDER BY id";
pub const BOOKS_BY_AUTHOR: &str = "SELECT id, title FROM books WHERE author_id = ?1 ORDER BY id";
pub const AUTHORS_WITH_BOOKS: &str = "SELECT a.id, a.name, b.id, b.title FROM authors a \
     LEFT JOIN books b ON b.author_id = a.id ORDER BY a.id, b.id";

// Lists authors with one books query per author (N+1 on purpose)
pub async fn list_authors(State(state): State<Arc<AppState>>) -> Result<Response> {
    REQUEST_TOTAL.inc();
    let start_time = Instant::now();

    let authors = load_one_by_one(&state.db)?;

    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());
    Ok(Json(authors).into_response())
}

// Same payload from a single join
pub async fn list_authors_batched(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AuthorWithBooks>>> {
    REQUEST_TOTAL.inc();
    let start_time = Instant::now();

    let authors = load_batched(&state.db)?;

    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());
    Ok(Json(authors))
}

fn load_one_by_one(db: &Database) -> Result<Vec<AuthorWithBooks>> {
    let authors = db.query(AUTHORS, [], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;

    authors
        .into_iter()
        .map(|(id, name)| {
            let books = db.query(BOOKS_BY_AUTHOR, [id], |row| {
                Ok(Book {
                    id: row.get(0)?,
                    title: row.get(1)?,
                })
            })?;
            Ok::<_, Error>(AuthorWithBooks { id, name, books })
        })
        .collect()
}

fn load_batched(db: &Database) -> Result<Vec<AuthorWithBooks>> {
    let rows = db.query(AUTHORS_WITH_BOOKS, [], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<i64>>(2)?,
            row.get::<_, Option<String>>(3)?,
        ))
    })?;

    let mut authors: Vec<AuthorWithBooks> = Vec::new();
    for (author_id, name, book_id, title) in rows {
        // rows arrive grouped by author
        if authors.last().is_none_or(|a| a.id != author_id) {
            authors.push(AuthorWithBooks {
                id: author_id,
                name,
                books: Vec::new(),
            });
        }
        if let (Some(id), Some(title), Some(author)) = (book_id, title, authors.last_mut()) {
            author.books.push(Book { id, title });
        }
    }
    Ok(authors)
}
