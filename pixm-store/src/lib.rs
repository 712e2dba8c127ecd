//! SQLite-backed catalog of authors, items and the local sequence.

pub mod db;
pub mod error;
pub mod models;
pub mod store;

pub use db::{create_pool, create_test_pool};
pub use error::{Result, StoreError};
pub use models::{AnimationAssetRow, AuthorRow, ItemRow};
pub use store::{Store, UnitOfWork};
