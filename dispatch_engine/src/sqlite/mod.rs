//! SQLite storage backend for the dispatch engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
