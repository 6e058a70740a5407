use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: i64,
    pub title: String,
}

// Author with all of their books
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct AuthorWithBooks {
    pub id: i64,
    pub name: String,
    pub books: Vec<Book>,
}

// Book listing row, author name resolved
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct BookWithAuthor {
    pub id: i64,
    pub title: String,
    pub author: String,
}
