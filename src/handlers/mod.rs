mod authors;
mod books;
mod health;
mod metrics;

pub use authors::{list_authors, list_authors_batched};
pub use books::list_books;
pub use health::health_handler;
pub use metrics::metrics_handler;
