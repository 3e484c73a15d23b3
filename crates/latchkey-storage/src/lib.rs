//! Storage layer for the Latchkey door controller.
//!
//! The controller only reads from the key database: a tag may open the door
//! when its identifier is stored as a key linked to a member. Managing
//! members and keys is left to whatever owns the database.
//!
//! ```no_run
//! use latchkey_core::AccessAuthorizer;
//! use latchkey_storage::{Database, DatabaseConfig, SqliteKeyStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(DatabaseConfig::new("latchkey.db")).await?;
//! let store = SqliteKeyStore::from_database(&db);
//!
//! if store.is_access_allowed("35c17053").await? {
//!     println!("welcome");
//! }
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod key_store;

pub use connection::{Database, DatabaseConfig};
pub use error::{StorageError, StorageResult};
pub use key_store::SqliteKeyStore;
