//! Key-value store backends.

mod memory;
mod postgres;

pub use memory::MemoryKvStore;
pub use postgres::PgKvStore;
