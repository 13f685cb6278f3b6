use crate::settings::{error::SettingsError, validated::SettingsBuilder};
use engine_core::connectors::destination::WriteMode;
use std::{collections::HashMap, str::FromStr};

pub const ENV_JOB_NAME: &str = "SHELFMOVER_JOB_NAME";
pub const ENV_CHUNK_SIZE: &str = "SHELFMOVER_CHUNK_SIZE";
pub const ENV_WRITE_MODE: &str = "SHELFMOVER_WRITE_MODE";
pub const ENV_HISTORY_LIMIT: &str = "SHELFMOVER_HISTORY_LIMIT";

/// Builds a settings layer from environment variables.
pub fn from_vars(vars: &HashMap<String, String>) -> Result<SettingsBuilder, SettingsError> {
    let mut builder = SettingsBuilder::new();

    if let Some(name) = vars.get(ENV_JOB_NAME) {
        builder.job_name = Some(name.clone());
    }
    if let Some(raw) = vars.get(ENV_CHUNK_SIZE) {
        builder.chunk_size = Some(parse(ENV_CHUNK_SIZE, raw)?);
    }
    if let Some(raw) = vars.get(ENV_WRITE_MODE) {
        builder.write_mode = Some(parse::<WriteMode>(ENV_WRITE_MODE, raw)?);
    }
    if let Some(raw) = vars.get(ENV_HISTORY_LIMIT) {
        builder.history_limit = Some(parse(ENV_HISTORY_LIMIT, raw)?);
    }

    Ok(builder)
}

fn parse<T>(key: &str, raw: &str) -> Result<T, SettingsError>
where
    T: FromStr,
    T::Err: ToString,
{
    raw.trim().parse::<T>().map_err(|e| SettingsError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
