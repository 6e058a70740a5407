use axum::{Json, extract::State};
use std::sync::Arc;
use std::time::Instant;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::metrics::{REQUEST_LATENCY, REQUEST_TOTAL};
use crate::models::BookWithAuthor;
use crate::observer;
use crate::state::AppState;

pub const BOOKS: &str = "SELECT id, author_id, title FROM books ORDER BY id";
pub const AUTHOR_NAME: &str = "SELECT name FROM authors WHERE id = ?1";

// Lists books, resolving each author separately on the blocking pool
pub async fn list_books(State(state): State<Arc<AppState>>) -> Result<Json<Vec<BookWithAuthor>>> {
    REQUEST_TOTAL.inc();
    let start_time = Instant::now();

    // task-locals don't cross into spawn_blocking, carry the observer over
    let query_observer = observer::current();
    let books = tokio::task::spawn_blocking(move || {
        let _guard = query_observer.map(observer::enter);
        load_books(&state.db)
    })
    .await??;

    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());
    Ok(Json(books))
}

fn load_books(db: &Database) -> Result<Vec<BookWithAuthor>> {
    let books = db.query(BOOKS, [], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    books
        .into_iter()
        .map(|(id, author_id, title)| {
            let author = db
                .query(AUTHOR_NAME, [author_id], |row| row.get::<_, String>(0))?
                .into_iter()
                .next()
                .unwrap_or_default();
            Ok::<_, Error>(BookWithAuthor { id, title, author })
        })
        .collect()
}
