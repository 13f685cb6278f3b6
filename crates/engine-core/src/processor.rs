use crate::error::TransformError;

/// Pure per-row transformation from a source row to a target document.
///
/// Implementations may read (or, for the producing step, populate) the
/// reference cache, but never drop a row silently: a missing reference is a
/// [`TransformError::MissingKey`].
pub trait Processor<S, T>: Send + Sync {
    fn process(&self, row: S) -> Result<T, TransformError>;
}

