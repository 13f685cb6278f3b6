pub mod factory;
pub mod tracker;

pub use factory::MigrationSteps;
pub use tracker::JobExecutionTracker;
