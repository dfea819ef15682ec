//! Optimistic "expected vs. actual" guard for field updates.
//!
//! An update command asserts the value it believes is current. The handler
//! compares that assertion with the value reconstructed from the stream and
//! only emits the update when both are structurally equal. On mismatch the
//! caller gets all three values back: the `actual` value is what a client
//! needs to resubmit a corrected command.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three values involved in a failed compare-and-swap style update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueMismatch<T> {
    /// The previous value asserted by the command.
    pub expected: T,
    /// The value actually held by the entity.
    pub actual: T,
    /// The new value the command asked for.
    pub requested: T,
}

impl<T: fmt::Debug> fmt::Display for ValueMismatch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "expected {:?}, actual {:?}, requested {:?}",
            self.expected, self.actual, self.requested
        )
    }
}

/// Compare an asserted previous value against the actual current one.
///
/// Equality is structural (`PartialEq`). On mismatch the three values are
/// returned verbatim.
pub fn check<T>(expected_previous: &T, actual_current: &T, requested_new: &T) -> Result<(), ValueMismatch<T>>
where
    T: PartialEq + Clone,
{
    if expected_previous == actual_current {
        Ok(())
    } else {
        Err(ValueMismatch {
            expected: expected_previous.clone(),
            actual: actual_current.clone(),
            requested: requested_new.clone(),
        })
    }
}
