//! SQLite storage for the named store
//!
//! A small document collection store: each row is one JSON document in a
//! named collection, read back in insertion order.

pub mod repository;
pub mod schema;

pub use repository::NameStore;
