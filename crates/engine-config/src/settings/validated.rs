use crate::settings::{DEFAULT_CHUNK_SIZE, DEFAULT_HISTORY_LIMIT, DEFAULT_JOB_NAME};
use engine_core::connectors::destination::WriteMode;
use serde::Serialize;

/// Immutable, validated configuration used throughout a migration run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationSettings {
    /// Name the job is recorded under in the execution history
    pub job_name: String,
    /// Rows per chunk; the only memory-bounding knob of a step
    pub chunk_size: usize,
    /// How the target treats documents whose id already exists
    pub write_mode: WriteMode,
    /// Number of executions `status` shows by default
    pub history_limit: usize,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            job_name: DEFAULT_JOB_NAME.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            write_mode: WriteMode::Insert,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl MigrationSettings {
    pub fn from_builder(builder: SettingsBuilder) -> Self {
        Self {
            job_name: builder
                .job_name
                .unwrap_or_else(|| DEFAULT_JOB_NAME.to_string()),
            chunk_size: builder.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE),
            write_mode: builder.write_mode.unwrap_or_default(),
            history_limit: builder.history_limit.unwrap_or(DEFAULT_HISTORY_LIMIT),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }
}

/// Partially specified settings. Layers are merged with [`Self::overlay`],
/// later layers winning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsBuilder {
    pub job_name: Option<String>,
    pub chunk_size: Option<usize>,
    pub write_mode: Option<WriteMode>,
    pub history_limit: Option<usize>,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_name(mut self, name: impl Into<String>) -> Self {
        self.job_name = Some(name.into());
        self
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size);
        self
    }

    pub fn write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = Some(mode);
        self
    }

    pub fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    /// Values set in `upper` replace the ones in `self`.
    pub fn overlay(self, upper: SettingsBuilder) -> Self {
        Self {
            job_name: upper.job_name.or(self.job_name),
            chunk_size: upper.chunk_size.or(self.chunk_size),
            write_mode: upper.write_mode.or(self.write_mode),
            history_limit: upper.history_limit.or(self.history_limit),
        }
    }

    pub fn build(self) -> MigrationSettings {
        MigrationSettings::from_builder(self)
    }
}
