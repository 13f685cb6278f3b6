pub mod execution;
pub mod records;
