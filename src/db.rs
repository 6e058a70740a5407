use rusqlite::{Connection, Params, Row};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::info;

use crate::observer;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database connection lock poisoned")]
    Poisoned,
}

// every statement goes through observer::intercept; bound parameters stay
// out of the text, so lookups differing only by value count as one query
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &str) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    pub fn query<T, P, F>(&self, sql: &str, params: P, map: F) -> Result<Vec<T>, DbError>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        observer::intercept(sql, |sql| {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt
                .query_map(params, map)?
                .collect::<Result<Vec<T>, _>>()?;
            Ok(rows)
        })
    }

    pub fn execute<P: Params>(&self, sql: &str, params: P) -> Result<usize, DbError> {
        observer::intercept(sql, |sql| Ok(self.lock()?.execute(sql, params)?))
    }

    pub fn execute_batch(&self, sql: &str) -> Result<(), DbError> {
        observer::intercept(sql, |sql| Ok(self.lock()?.execute_batch(sql)?))
    }

    // authors/books schema plus sample rows
    pub fn seed(&self) -> Result<(), DbError> {
        self.execute_batch(SCHEMA)?;

        for (author_id, (name, titles)) in (1_i64..).zip(SEED) {
            self.execute(
                "INSERT INTO authors (id, name) VALUES (?1, ?2)",
                (author_id, name),
            )?;
            for title in titles {
                self.execute(
                    "INSERT INTO books (author_id, title) VALUES (?1, ?2)",
                    (author_id, title),
                )?;
            }
        }

        info!(authors = SEED.len(), "seeded demo database");
        Ok(())
    }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS authors (
    id   INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS books (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    author_id INTEGER NOT NULL REFERENCES authors(id),
    title     TEXT NOT NULL
);
DELETE FROM books;
DELETE FROM authors;
";

const SEED: [(&str, [&str; 2]); 3] = [
    ("Ursula K. Le Guin", ["A Wizard of Earthsea", "The Dispossessed"]),
    ("Iain M. Banks", ["Consider Phlebas", "The Player of Games"]),
    ("Octavia E. Butler", ["Kindred", "Parable of the Sower"]),
];
