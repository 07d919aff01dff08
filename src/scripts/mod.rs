pub mod index_books;

pub use index_books::{ingest_books, run_ingestion, IngestReport};
