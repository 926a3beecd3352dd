//! SQLite store files: schema, bulk writer and read-only fetcher.

pub mod reader;
pub mod schema;
pub mod writer;

pub use reader::MatrixStore;
pub use writer::StoreWriter;
