pub mod env;
pub mod error;
pub mod validated;
pub mod validator;

pub use validated::{MigrationSettings, SettingsBuilder};
pub use validator::SettingsValidator;

pub const DEFAULT_JOB_NAME: &str = "migrationJob";
pub const DEFAULT_CHUNK_SIZE: usize = 10;
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Above this chunk size a warning is logged; the chunk buffer is held in memory.
pub const LARGE_CHUNK_SIZE: usize = 100_000;
