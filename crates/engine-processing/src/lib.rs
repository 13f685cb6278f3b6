pub mod error;
pub mod state_manager;
pub mod step;
pub mod transform;
