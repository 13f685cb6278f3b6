use crate::error::CliError;
use async_trait::async_trait;
use connectors::source::{PgSource, postgres::redact};
use std::time::Instant;
use tracing::{error, info};

/// Checks that a source can be reached before a migration is started.
#[async_trait]
pub trait ConnectionPinger {
    async fn ping(&self) -> Result<(), CliError>;
}

pub struct PostgresConnectionPinger {
    pub conn_str: String,
}

#[async_trait]
impl ConnectionPinger for PostgresConnectionPinger {
    async fn ping(&self) -> Result<(), CliError> {
        let url = redact(&self.conn_str);
        let started = Instant::now();

        let source = PgSource::connect(&self.conn_str, 1).await.inspect_err(|err| {
            error!(%url, %err, "PostgreSQL source unreachable");
        })?;
        source.ping().await?;

        info!(
            %url,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "PostgreSQL source is reachable"
        );
        Ok(())
    }
}
