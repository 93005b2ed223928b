use std::{future::Future, pin::Pin};

use crate::error::Error;

/// Boxed future returned by the backend traits, borrowing the backend for `'a`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, Error>> + 'a>>;

/// Returns the last `/`-separated segment of a Google resource name.
pub fn last_segment(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}
