use crate::command::Event;
use crate::validation::no_glob_metacharacters;
use nutype::nutype;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::future::Future;

/// A batch of events headed for the store, plus the version each target
/// stream must still be at for the batch to be accepted.
///
/// Every stream has to be registered with its expected version before events
/// can be queued for it. Events are kept both as the native value (boxed as
/// `dyn Any`, so one batch can mix event types) and as JSON, for stores that
/// persist outside the process.
#[derive(Debug, Default)]
pub struct StreamWrites {
    entries: Vec<StreamWriteEntry>,
    expected_versions: HashMap<StreamId, StreamVersion>,
}

/// One queued event.
#[derive(Debug)]
pub struct StreamWriteEntry {
    /// Target stream.
    pub stream_id: StreamId,
    /// The event itself, type-erased.
    pub event: Box<dyn Any + Send>,
    /// [`Event::event_type_name`] of the event.
    pub event_type_name: &'static str,
    /// JSON encoding of the event.
    pub event_data: Value,
}

impl StreamWrites {
    /// An empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare that the batch writes to `stream_id`, which must be at
    /// `expected_version` when the batch is appended.
    ///
    /// Declaring a stream again is harmless as long as the version agrees.
    pub fn register_stream(
        mut self,
        stream_id: StreamId,
        expected_version: StreamVersion,
    ) -> Result<Self, EventStoreError> {
        match self.expected_versions.entry(stream_id) {
            Entry::Vacant(slot) => {
                let _ = slot.insert(expected_version);
            }
            Entry::Occupied(slot) if *slot.get() == expected_version => {}
            Entry::Occupied(slot) => {
                return Err(EventStoreError::ConflictingExpectedVersions {
                    first_version: *slot.get(),
                    stream_id: slot.key().clone(),
                    second_version: expected_version,
                });
            }
        }
        Ok(self)
    }

    /// Queue `event` for a stream declared with [`StreamWrites::register_stream`].
    pub fn append<E: Event>(mut self, stream_id: &StreamId, event: E) -> Result<Self, EventStoreError> {
        if !self.expected_versions.contains_key(stream_id) {
            return Err(EventStoreError::UndeclaredStream {
                stream_id: stream_id.clone(),
            });
        }

        let event_data = serde_json::to_value(&event).map_err(|error| {
            EventStoreError::SerializationFailed {
                stream_id: stream_id.clone(),
                detail: error.to_string(),
            }
        })?;

        self.entries.push(StreamWriteEntry {
            stream_id: stream_id.clone(),
            event_type_name: event.event_type_name(),
            event: Box::new(event),
            event_data,
        });
        Ok(self)
    }

    /// The version each declared stream is expected to be at.
    pub const fn expected_versions(&self) -> &HashMap<StreamId, StreamVersion> {
        &self.expected_versions
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no event is queued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The queued events, in the order they were appended to the batch.
    pub fn into_entries(self) -> Vec<StreamWriteEntry> {
        self.entries
    }
}

/// Persistence seam of the engine.
///
/// An implementation owns the streams. It must hand events back in the order
/// they were appended, and it must apply a batch either completely or not at
/// all, refusing it with [`EventStoreError::VersionConflict`] when any
/// declared stream has moved past its expected version. How that is enforced
/// (a lock, a transaction, a single writer per key) is up to the backend.
pub trait EventStore {
    /// Every event of `stream_id`, oldest first. A stream that was never
    /// written reads as empty.
    fn read_stream<E: Event>(
        &self,
        stream_id: StreamId,
    ) -> impl Future<Output = Result<EventStreamReader<E>, EventStoreError>> + Send;

    /// Append a batch under the optimistic version check described above.
    fn append_events(
        &self,
        writes: StreamWrites,
    ) -> impl Future<Output = Result<EventStreamSlice, EventStoreError>> + Send;
}

/// Name of an event stream, e.g. `task-0192...`.
///
/// Trimmed, never blank, at most 255 characters, and free of the glob
/// characters `* ? [ ]`.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255, predicate = no_glob_metacharacters),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct StreamId(String);

impl StreamId {
    /// `<category>-<id>`, the stream of a single entity.
    pub fn for_entity(category: &str, id: impl fmt::Display) -> Result<Self, StreamIdError> {
        Self::try_new(format!("{category}-{id}"))
    }
}

/// Number of events in a stream. An unwritten stream is at version 0.
#[nutype(derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Display))]
pub struct StreamVersion(usize);

/// Store operation named in [`EventStoreError::StoreFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// [`EventStore::read_stream`].
    ReadStream,
    /// [`EventStore::append_events`].
    AppendEvents,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ReadStream => "read_stream",
            Self::AppendEvents => "append_events",
        })
    }
}

/// Failures reported by an [`EventStore`] or while building a [`StreamWrites`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EventStoreError {
    /// The same stream was declared twice in one batch with different versions.
    #[error(
        "stream {stream_id} declared at version {first_version} and again at {second_version}"
    )]
    ConflictingExpectedVersions {
        /// The twice-declared stream.
        stream_id: StreamId,
        /// Version given first.
        first_version: StreamVersion,
        /// Version given second.
        second_version: StreamVersion,
    },

    /// An event was queued for a stream the batch never declared.
    #[error("stream {stream_id} was not declared in this batch")]
    UndeclaredStream {
        /// The undeclared stream.
        stream_id: StreamId,
    },

    /// An event could not be encoded as JSON.
    #[error("cannot encode event for {stream_id}: {detail}")]
    SerializationFailed {
        /// Target stream.
        stream_id: StreamId,
        /// Encoder message.
        detail: String,
    },

    /// A stored event does not decode into the type the reader asked for.
    ///
    /// Event sets are closed enums, so this means reader and writer disagree
    /// about a stream's event type. Retrying cannot help.
    #[error("cannot decode event from {stream_id}: {detail}")]
    DeserializationFailed {
        /// Stream being read.
        stream_id: StreamId,
        /// Decoder message.
        detail: String,
    },

    /// The backend itself failed.
    #[error("event store failed during {operation}")]
    StoreFailure {
        /// What was being attempted.
        operation: Operation,
    },

    /// A declared stream moved past its expected version before the append.
    ///
    /// Another writer got there first. The caller should re-read, re-decide
    /// and try again rather than drop its events.
    #[error("stream advanced since it was read")]
    VersionConflict,
}

/// Events of one stream, oldest first, as returned by
/// [`EventStore::read_stream`].
pub struct EventStreamReader<E: Event> {
    events: Vec<E>,
}

impl<E: Event> EventStreamReader<E> {
    /// Wrap events that are already in stream order.
    pub const fn new(events: Vec<E>) -> Self {
        Self { events }
    }

    /// Number of events read.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True for a stream with no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The stream version this read observed; pass it back as the expected
    /// version of the next append.
    pub fn version(&self) -> StreamVersion {
        StreamVersion::new(self.events.len())
    }

    /// The oldest event, if any.
    pub fn first(&self) -> Option<&E> {
        self.events.first()
    }

    /// Borrow the events in stream order.
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.events.iter()
    }
}

impl<E: Event> IntoIterator for EventStreamReader<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

/// Outcome of a successful append: where each written stream now stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventStreamSlice {
    versions: HashMap<StreamId, StreamVersion>,
}

impl EventStreamSlice {
    /// Record the post-append version of each written stream.
    pub const fn new(versions: HashMap<StreamId, StreamVersion>) -> Self {
        Self { versions }
    }

    /// Version of `stream_id` after the append, `None` if the batch did not
    /// write to it.
    pub fn version_of(&self, stream_id: &StreamId) -> Option<StreamVersion> {
        self.versions.get(stream_id).copied()
    }
}

/// Lets the executor take a store by value or by reference.
impl<T: EventStore + Sync> EventStore for &T {
    async fn read_stream<E: Event>(
        &self,
        stream_id: StreamId,
    ) -> Result<EventStreamReader<E>, EventStoreError> {
        T::read_stream(self, stream_id).await
    }

    async fn append_events(
        &self,
        writes: StreamWrites,
    ) -> Result<EventStreamSlice, EventStoreError> {
        T::append_events(self, writes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct Noted {
        note: String,
    }

    impl Event for Noted {
        fn event_type_name(&self) -> &'static str {
            "Noted"
        }
    }

    fn noted(note: &str) -> Noted {
        Noted {
            note: note.to_string(),
        }
    }

    fn stream(name: &str) -> StreamId {
        StreamId::try_new(name).expect("valid stream id")
    }

    #[test]
    fn redeclaring_a_stream_at_the_same_version_is_accepted() {
        let task = stream("task-1");

        let writes = StreamWrites::new()
            .register_stream(task.clone(), StreamVersion::new(3))
            .and_then(|writes| writes.append(&task, noted("a")))
            .and_then(|writes| writes.register_stream(task.clone(), StreamVersion::new(3)))
            .and_then(|writes| writes.append(&task, noted("b")));

        assert_eq!(writes.map(|writes| writes.len()), Ok(2));
    }

    #[test]
    fn redeclaring_a_stream_at_another_version_is_refused() {
        let task = stream("task-1");

        let error = StreamWrites::new()
            .register_stream(task.clone(), StreamVersion::new(3))
            .and_then(|writes| writes.register_stream(task.clone(), StreamVersion::new(4)))
            .expect_err("versions disagree");

        assert_eq!(
            error,
            EventStoreError::ConflictingExpectedVersions {
                stream_id: task,
                first_version: StreamVersion::new(3),
                second_version: StreamVersion::new(4),
            }
        );
        assert_eq!(
            error.to_string(),
            "stream task-1 declared at version 3 and again at 4"
        );
    }

    #[test]
    fn events_for_undeclared_streams_are_refused() {
        let declared = stream("task-1");
        let undeclared = stream("task-2");

        let error = StreamWrites::new()
            .register_stream(declared, StreamVersion::new(0))
            .and_then(|writes| writes.append(&undeclared, noted("lost")))
            .expect_err("task-2 was never declared");

        assert_eq!(
            error,
            EventStoreError::UndeclaredStream {
                stream_id: undeclared
            }
        );
    }

    #[test]
    fn entries_keep_batch_order_name_and_json() {
        let task = stream("task-1");
        let label = stream("label-1");

        let entries = StreamWrites::new()
            .register_stream(task.clone(), StreamVersion::new(0))
            .and_then(|writes| writes.register_stream(label.clone(), StreamVersion::new(2)))
            .and_then(|writes| writes.append(&label, noted("first")))
            .and_then(|writes| writes.append(&task, noted("second")))
            .expect("both streams declared")
            .into_entries();

        let summary: Vec<(StreamId, &str, Value)> = entries
            .iter()
            .map(|entry| {
                (
                    entry.stream_id.clone(),
                    entry.event_type_name,
                    entry.event_data.clone(),
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                (label, "Noted", serde_json::json!({ "note": "first" })),
                (task, "Noted", serde_json::json!({ "note": "second" })),
            ]
        );
        assert_eq!(
            entries[0].event.downcast_ref::<Noted>(),
            Some(&noted("first"))
        );
    }

    #[test]
    fn stream_ids_are_trimmed_and_validated() {
        assert_eq!(stream("  task-1 ").to_string(), "task-1");
        assert!(StreamId::try_new("").is_err());
        assert!(StreamId::try_new(" \t ").is_err());
        assert!(StreamId::try_new("x".repeat(256)).is_err());
        assert!(StreamId::try_new("task-*").is_err());
    }

    #[test]
    fn for_entity_joins_category_and_id() {
        let stream_id = StreamId::for_entity("label", 7).expect("valid stream id");

        assert_eq!(stream_id.to_string(), "label-7");
        assert!(StreamId::for_entity("label", "[7]").is_err());
    }

    #[test]
    fn reader_version_counts_events() {
        let empty: EventStreamReader<Noted> = EventStreamReader::new(Vec::new());
        let full = EventStreamReader::new(vec![noted("a"), noted("b"), noted("c")]);

        assert_eq!((empty.version(), empty.first()), (StreamVersion::new(0), None));
        assert_eq!(full.version(), StreamVersion::new(3));
        assert_eq!(full.first(), Some(&noted("a")));
    }

    #[test]
    fn reader_yields_events_oldest_first() {
        let reader = EventStreamReader::new(vec![noted("a"), noted("b")]);

        let notes: Vec<String> = reader.into_iter().map(|event| event.note).collect();

        assert_eq!(notes, ["a", "b"]);
    }

    #[test]
    fn slice_only_knows_written_streams() {
        let written = stream("task-1");
        let slice = EventStreamSlice::new(HashMap::from([(written.clone(), StreamVersion::new(3))]));

        assert_eq!(slice.version_of(&written), Some(StreamVersion::new(3)));
        assert_eq!(slice.version_of(&stream("task-2")), None);
    }
}
