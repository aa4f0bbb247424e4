//! SQLite backend for the Pesa engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
