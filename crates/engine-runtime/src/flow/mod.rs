pub mod controller;
pub mod resume;

pub use controller::{FlowController, JobResult, StepProvider};
pub use resume::ResumePlan;
