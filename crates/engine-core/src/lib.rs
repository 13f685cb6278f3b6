pub mod cache;
pub mod connectors;
pub mod error;
pub mod listener;
pub mod metrics;
pub mod processor;
pub mod state;
