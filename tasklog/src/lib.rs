//! `tasklog` - single-entity command/event engine
//!
//! Every entity owns exactly one event stream. A command is decided against
//! the state folded from that stream and either emits new events or is
//! rejected with a typed, domain-level reason. Appends are guarded by the
//! stream version observed at read time, so two commands racing on the same
//! entity can never both commit against the same state.
//!
//! # Example
//!
//! ```rust,ignore
//! use tasklog::{InMemoryEventStore, RetryPolicy, execute};
//!
//! let store = InMemoryEventStore::new();
//! let events = execute(&store, command, RetryPolicy::new()).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod executor;
pub mod mismatch;
mod retry;

pub use executor::{execute, load_state};
pub use mismatch::ValueMismatch;
pub use retry::{MetricsHook, RetryContext, RetryPolicy};
pub use tasklog_memory::InMemoryEventStore;
pub use tasklog_types::{
    Aggregate, CommandError, CommandLogic, Event, EventStore, EventStoreError, EventStreamReader,
    EventStreamSlice, NewEvents, Operation, StreamId, StreamIdError, StreamVersion,
    StreamWriteEntry, StreamWrites, reduce,
};
