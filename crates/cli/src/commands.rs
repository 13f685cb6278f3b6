use clap::{Args, Subcommand};
use engine_core::connectors::destination::WriteMode;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full migration from the source into the document store
    Migrate {
        #[command(flatten)]
        config: ConfigArgs,

        #[command(flatten)]
        run: RunArgs,
    },
    /// Show the most recent executions of the job
    Status {
        #[command(flatten)]
        config: ConfigArgs,

        #[arg(long, help = "Number of executions to show")]
        limit: Option<usize>,

        #[arg(long, help = "Print executions as JSON instead of a table")]
        json: bool,
    },
    /// Resume the most recent execution if it failed
    Restart {
        #[command(flatten)]
        config: ConfigArgs,

        #[command(flatten)]
        run: RunArgs,
    },
    /// Check that the PostgreSQL source is reachable
    TestConn {
        /// PostgreSQL connection URL
        #[arg(long)]
        pg_url: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(long, help = "Job state directory (default: ~/.shelfmover/state)")]
    pub state_dir: Option<PathBuf>,

    #[arg(long, help = "Job name executions are recorded under")]
    pub job_name: Option<String>,

    #[arg(long, help = "Load SHELFMOVER_* settings from this .env file")]
    pub env_file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[arg(long, help = "Directory of the target document store")]
    pub target_dir: PathBuf,

    #[arg(
        long,
        conflicts_with = "pg_url",
        required_unless_present = "pg_url",
        help = "JSON file with the source tables"
    )]
    pub fixture: Option<PathBuf>,

    #[arg(long, help = "PostgreSQL source connection URL")]
    pub pg_url: Option<String>,

    #[arg(long, help = "Rows per chunk")]
    pub chunk_size: Option<usize>,

    #[arg(long, help = "insert (fail on existing ids) or upsert")]
    pub write_mode: Option<WriteMode>,
}
