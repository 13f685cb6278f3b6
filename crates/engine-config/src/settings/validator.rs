use crate::settings::{
    LARGE_CHUNK_SIZE,
    error::SettingsError,
    validated::{MigrationSettings, SettingsBuilder},
};
use tracing::{info, warn};

/// Validates migration settings before a run is launched.
pub struct SettingsValidator;

impl SettingsValidator {
    pub fn validate(builder: SettingsBuilder) -> Result<MigrationSettings, SettingsError> {
        let mut errors: Vec<String> = Vec::new();

        Self::validate_chunk_size(&builder, &mut errors);
        Self::validate_job_name(&builder, &mut errors);
        Self::validate_history_limit(&builder, &mut errors);

        if !errors.is_empty() {
            return Err(SettingsError::ValidationFailed(errors));
        }

        let validated = builder.build();
        info!(
            job = %validated.job_name,
            chunk_size = validated.chunk_size,
            write_mode = %validated.write_mode,
            "Settings validated"
        );
        Ok(validated)
    }

    fn validate_chunk_size(builder: &SettingsBuilder, errors: &mut Vec<String>) {
        match builder.chunk_size {
            Some(0) => errors.push("chunk_size must be at least 1".to_string()),
            Some(size) if size > LARGE_CHUNK_SIZE => {
                warn!("Chunk size {size} is very large, may cause memory issues");
            }
            _ => {}
        }
    }

    fn validate_job_name(builder: &SettingsBuilder, errors: &mut Vec<String>) {
        if let Some(name) = &builder.job_name {
            if name.trim().is_empty() {
                errors.push("job_name must not be empty".to_string());
            } else if name.contains(':') {
                errors.push("job_name must not contain ':'".to_string());
            }
        }
    }

    fn validate_history_limit(builder: &SettingsBuilder, errors: &mut Vec<String>) {
        if builder.history_limit == Some(0) {
            errors.push("history_limit must be at least 1".to_string());
        }
    }
}
