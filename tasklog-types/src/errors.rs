use crate::store::{EventStoreError, StreamIdError};
use thiserror::Error;

/// Error type for command execution failures.
///
/// Represents all possible failure modes during command execution. The
/// executor uses the classification to decide retry behavior: only version
/// conflicts are retried, everything else is returned to the caller as-is.
///
/// `R` is the command's typed rejection.
#[derive(Error, Debug)]
pub enum CommandError<R> {
    /// The command was rejected by a business rule.
    ///
    /// A rejection is an expected domain outcome carrying enough context for
    /// the caller to correct the input and resubmit. It never indicates a bug
    /// and will not succeed on retry with the same input.
    #[error("command rejected: {0}")]
    Rejected(R),

    /// Version conflict persisted after all retry attempts.
    ///
    /// Another writer kept advancing the stream between this command's read
    /// and write phases until the retry budget was exhausted.
    #[error("concurrency conflict after {0} retry attempts")]
    ConcurrencyError(u32),

    /// Storage backend failure during event store operations.
    #[error("event store error: {0}")]
    EventStoreError(EventStoreError),

    /// The command's target could not be turned into a stream identifier.
    #[error("invalid stream id: {0}")]
    InvalidStreamId(StreamIdError),
}

impl<R> CommandError<R> {
    /// Returns the rejection if this error is a domain rejection.
    pub const fn rejection(&self) -> Option<&R> {
        match self {
            Self::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }

    /// Returns true if the error is a domain rejection.
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// Convert the rejection type, leaving infrastructure variants untouched.
    pub fn map_rejection<T, F>(self, f: F) -> CommandError<T>
    where
        F: FnOnce(R) -> T,
    {
        match self {
            Self::Rejected(rejection) => CommandError::Rejected(f(rejection)),
            Self::ConcurrencyError(attempts) => CommandError::ConcurrencyError(attempts),
            Self::EventStoreError(error) => CommandError::EventStoreError(error),
            Self::InvalidStreamId(error) => CommandError::InvalidStreamId(error),
        }
    }
}

impl<R> From<EventStoreError> for CommandError<R> {
    fn from(error: EventStoreError) -> Self {
        Self::EventStoreError(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error, PartialEq)]
    #[error("not enough widgets: {0}")]
    struct NotEnough(u8);

    #[test]
    fn rejected_display_includes_rejection_message() {
        let error: CommandError<NotEnough> = CommandError::Rejected(NotEnough(2));

        assert_eq!(error.to_string(), "command rejected: not enough widgets: 2");
    }

    #[test]
    fn map_rejection_converts_rejections() {
        let error: CommandError<NotEnough> = CommandError::Rejected(NotEnough(2));

        let mapped = error.map_rejection(|NotEnough(n)| u32::from(n) * 10);

        assert_eq!(mapped.rejection(), Some(&20));
    }

    #[test]
    fn map_rejection_preserves_infrastructure_variants() {
        let error: CommandError<NotEnough> = CommandError::ConcurrencyError(3);

        let mapped = error.map_rejection(|NotEnough(n)| n);

        assert!(matches!(mapped, CommandError::ConcurrencyError(3)));
        assert!(!mapped.is_rejection());
    }
}
