//! # Write-once result slot.
//!
//! A [`ResultSlot`] captures the successful result of a bound
//! [`EventStream`](crate::EventStream). It can be written exactly once:
//! a second write is a state error, never a silent overwrite.
//!
//! Clones share the same slot.
//!
//! ```rust
//! use tasknest::ResultSlot;
//!
//! let slot = ResultSlot::new();
//! assert!(slot.fill(7).is_ok());
//! assert!(slot.fill(8).is_err());
//! assert_eq!(slot.get(), Some(7));
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::error::TaskError;

/// Shared write-once location for a task result.
pub struct ResultSlot<T> {
    cell: Arc<OnceLock<T>>,
}

impl<T> ResultSlot<T> {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self {
            cell: Arc::new(OnceLock::new()),
        }
    }

    /// Stores `value`; fails if the slot was already filled.
    pub fn fill(&self, value: T) -> Result<(), TaskError> {
        self.cell
            .set(value)
            .map_err(|_| TaskError::state("result slot is already filled"))
    }

    pub fn is_filled(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Borrowing accessor for callers that cannot clone `T`.
    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.cell.get())
    }
}

impl<T: Clone> ResultSlot<T> {
    /// Copy of the stored value, if any.
    pub fn get(&self) -> Option<T> {
        self.cell.get().cloned()
    }
}

impl<T> Default for ResultSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for ResultSlot<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ResultSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResultSlot").field(&self.cell.get()).finish()
    }
}
