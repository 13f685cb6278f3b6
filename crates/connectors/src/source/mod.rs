pub mod fixture;
pub mod memory;
pub mod postgres;

pub use fixture::FixtureSource;
pub use memory::{BookGenre, MemorySource, SourceTables};
pub use postgres::PgSource;
