#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! In-memory event store for the tasklog command/event engine.
//!
//! `InMemoryEventStore` keeps every stream in a process-local map guarded by a
//! mutex. Appends check each registered stream's expected version under that
//! lock, which gives the read → decide → append cycle the single-writer
//! guarantee the engine relies on: of two commands that read the same stream
//! version, only the first append wins.

use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Mutex;
use tasklog_types::{
    Event, EventStore, EventStoreError, EventStreamReader, EventStreamSlice, Operation, StreamId,
    StreamVersion, StreamWriteEntry, StreamWrites,
};
use tracing::{debug, trace};

struct PersistedEvent {
    event: Box<dyn Any + Send>,
    event_type_name: &'static str,
    event_data: Value,
}

#[derive(Default)]
struct StreamData {
    events: Vec<PersistedEvent>,
}

impl StreamData {
    fn version(&self) -> StreamVersion {
        StreamVersion::new(self.events.len())
    }
}

/// In-memory event store implementation.
///
/// # Intended Use
///
/// - **Testing**: Unit and integration tests with deterministic behavior
/// - **Embedding**: Hosts that keep entity streams in process memory
///
/// All events are held in memory; nothing survives a restart. Streams are
/// guarded by a single `std::sync::Mutex`, so appends to different streams are
/// serialized as well, which is correct but limits throughput under heavy
/// concurrency.
pub struct InMemoryEventStore {
    streams: Mutex<HashMap<StreamId, StreamData>>,
}

impl InMemoryEventStore {
    /// Create a new in-memory event store.
    ///
    /// All streams start at version 0 (no events).
    pub fn new() -> Self {
        Self {
            streams: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

fn decode<E: Event>(stream_id: &StreamId, persisted: &PersistedEvent) -> Result<E, EventStoreError> {
    if let Some(event) = persisted.event.downcast_ref::<E>() {
        return Ok(event.clone());
    }

    serde_json::from_value(persisted.event_data.clone()).map_err(|error| {
        EventStoreError::DeserializationFailed {
            stream_id: stream_id.clone(),
            detail: format!("{} ({})", error, persisted.event_type_name),
        }
    })
}

impl EventStore for InMemoryEventStore {
    async fn read_stream<E: Event>(
        &self,
        stream_id: StreamId,
    ) -> Result<EventStreamReader<E>, EventStoreError> {
        let events = self
            .streams
            .lock()
            .map_err(|_| EventStoreError::StoreFailure {
                operation: Operation::ReadStream,
            })?
            .get(&stream_id)
            .map_or_else(
                || Ok(Vec::new()),
                |data| {
                    data.events
                        .iter()
                        .map(|persisted| decode::<E>(&stream_id, persisted))
                        .collect::<Result<Vec<E>, EventStoreError>>()
                },
            )?;

        trace!(stream_id = %stream_id, count = events.len(), "read stream");

        Ok(EventStreamReader::new(events))
    }

    async fn append_events(
        &self,
        writes: StreamWrites,
    ) -> Result<EventStreamSlice, EventStoreError> {
        let mut streams = self.streams.lock().map_err(|_| EventStoreError::StoreFailure {
            operation: Operation::AppendEvents,
        })?;
        let expected_versions = writes.expected_versions().clone();

        // Check all version constraints before writing any events
        for (stream_id, expected_version) in &expected_versions {
            let current_version = streams
                .get(stream_id)
                .map_or_else(|| StreamVersion::new(0), StreamData::version);

            if current_version != *expected_version {
                debug!(
                    stream_id = %stream_id,
                    expected = %expected_version,
                    current = %current_version,
                    "version conflict"
                );
                return Err(EventStoreError::VersionConflict);
            }
        }

        let mut versions: HashMap<StreamId, StreamVersion> = HashMap::new();

        for entry in writes.into_entries() {
            let StreamWriteEntry {
                stream_id,
                event,
                event_type_name,
                event_data,
            } = entry;

            let data = streams.entry(stream_id.clone()).or_default();
            data.events.push(PersistedEvent {
                event,
                event_type_name,
                event_data,
            });
            let _ = versions.insert(stream_id, data.version());
        }
        drop(streams);

        debug!(streams = versions.len(), "appended events");

        Ok(EventStreamSlice::new(versions))
    }
}
