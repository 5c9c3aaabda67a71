//! Implementations of [`AddressSource`](crate::AddressSource).

pub mod memory;
pub mod schema;
pub mod sqlite;

pub use memory::MemoryDirectory;
pub use sqlite::SqliteDirectory;
