//! SQLite backend for the settlement core.

mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
