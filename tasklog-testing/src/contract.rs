//! Scenarios every [`EventStore`] implementation must pass.
//!
//! Each `test_*` function builds a fresh store from the factory it is given
//! and reports the first violated expectation as a [`ContractTestFailure`].

use serde::{Deserialize, Serialize};
use std::fmt;
use tasklog_types::{
    Event, EventStore, EventStoreError, EventStreamReader, EventStreamSlice, StreamId,
    StreamVersion, StreamWrites,
};
use uuid::Uuid;

/// A contract scenario that did not hold for the store under test.
#[derive(Debug)]
pub struct ContractTestFailure {
    scenario: &'static str,
    detail: String,
}

impl fmt::Display for ContractTestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.scenario, self.detail)
    }
}

impl std::error::Error for ContractTestFailure {}

/// Outcome of a single contract scenario.
pub type ContractTestResult = Result<(), ContractTestFailure>;

/// Event written by the contract scenarios.
///
/// Remembers its stream so that cross-stream leaks are detectable on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractTestEvent {
    stream_id: StreamId,
    sequence: u32,
}

impl ContractTestEvent {
    /// Stream the event was written to.
    pub const fn stream_id(&self) -> &StreamId {
        &self.stream_id
    }

    /// Position assigned by the writer.
    pub const fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl Event for ContractTestEvent {
    fn event_type_name(&self) -> &'static str {
        "ContractTestEvent"
    }
}

/// One scenario run: a fresh store plus failure reporting tagged with the
/// scenario name.
struct Scenario<S> {
    name: &'static str,
    store: S,
}

impl<S: EventStore> Scenario<S> {
    fn start<F: Fn() -> S>(name: &'static str, make_store: &F) -> Self {
        Self {
            name,
            store: make_store(),
        }
    }

    fn fail(&self, detail: impl Into<String>) -> ContractTestFailure {
        ContractTestFailure {
            scenario: self.name,
            detail: detail.into(),
        }
    }

    fn unexpected(&self, operation: &str, error: &EventStoreError) -> ContractTestFailure {
        self.fail(format!("{operation} returned unexpected error: {error}"))
    }

    /// A stream name no other scenario run can produce.
    fn stream(&self, role: &str) -> Result<StreamId, ContractTestFailure> {
        let raw = format!("contract-{}-{role}-{}", self.name, Uuid::now_v7());
        StreamId::try_new(raw.clone())
            .map_err(|error| self.fail(format!("invalid stream id `{raw}`: {error}")))
    }

    /// Build a batch writing `sequences` to each listed stream, every stream
    /// expected at `expected`.
    fn batch(
        &self,
        expected: StreamVersion,
        targets: &[(&StreamId, &[u32])],
    ) -> Result<StreamWrites, ContractTestFailure> {
        let build = || -> Result<StreamWrites, EventStoreError> {
            let mut writes = StreamWrites::new();
            for (stream_id, _) in targets {
                writes = writes.register_stream((*stream_id).clone(), expected)?;
            }
            for (stream_id, sequences) in targets {
                for &sequence in *sequences {
                    let event = ContractTestEvent {
                        stream_id: (*stream_id).clone(),
                        sequence,
                    };
                    writes = writes.append(stream_id, event)?;
                }
            }
            Ok(writes)
        };

        build().map_err(|error| self.fail(format!("could not build write batch: {error}")))
    }

    async fn append(&self, writes: StreamWrites) -> Result<EventStreamSlice, ContractTestFailure> {
        self.store
            .append_events(writes)
            .await
            .map_err(|error| self.unexpected("append_events", &error))
    }

    /// Append a batch that must be refused with a version conflict.
    async fn append_expecting_conflict(&self, writes: StreamWrites) -> ContractTestResult {
        match self.store.append_events(writes).await {
            Err(EventStoreError::VersionConflict) => Ok(()),
            Err(error) => Err(self.unexpected("append_events", &error)),
            Ok(_) => Err(self.fail("stale expected version was accepted")),
        }
    }

    async fn read(
        &self,
        stream_id: &StreamId,
    ) -> Result<EventStreamReader<ContractTestEvent>, ContractTestFailure> {
        self.store
            .read_stream::<ContractTestEvent>(stream_id.clone())
            .await
            .map_err(|error| self.unexpected("read_stream", &error))
    }

    async fn sequences(&self, stream_id: &StreamId) -> Result<Vec<u32>, ContractTestFailure> {
        Ok(self
            .read(stream_id)
            .await?
            .iter()
            .map(ContractTestEvent::sequence)
            .collect())
    }
}

/// Appended events can be read back, in append order, and the append reports
/// the new stream version.
pub async fn test_basic_read_write<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: EventStore + Send + Sync + 'static,
{
    let scenario = Scenario::start("basic_read_write", &make_store);
    let stream_id = scenario.stream("single")?;

    let slice = scenario
        .append(scenario.batch(StreamVersion::new(0), &[(&stream_id, &[1, 2])])?)
        .await?;
    if slice.version_of(&stream_id) != Some(StreamVersion::new(2)) {
        return Err(scenario.fail(format!(
            "append should report version 2, reported {:?}",
            slice.version_of(&stream_id)
        )));
    }

    let sequences = scenario.sequences(&stream_id).await?;
    if sequences != [1, 2] {
        return Err(scenario.fail(format!("read {sequences:?}, wrote [1, 2]")));
    }

    Ok(())
}

/// Appending with a stale expected version fails with `VersionConflict`.
pub async fn test_concurrent_version_conflicts<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: EventStore + Send + Sync + 'static,
{
    let scenario = Scenario::start("concurrent_version_conflicts", &make_store);
    let stream_id = scenario.stream("shared")?;

    let _ = scenario
        .append(scenario.batch(StreamVersion::new(0), &[(&stream_id, &[1])])?)
        .await?;

    scenario
        .append_expecting_conflict(scenario.batch(StreamVersion::new(0), &[(&stream_id, &[2])])?)
        .await
}

/// Two racing appends at the same expected version: exactly one wins.
pub async fn test_racing_appends_single_winner<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: EventStore + Send + Sync + 'static,
{
    let scenario = Scenario::start("racing_appends_single_winner", &make_store);
    let stream_id = scenario.stream("race")?;
    let left = scenario.batch(StreamVersion::new(0), &[(&stream_id, &[1])])?;
    let right = scenario.batch(StreamVersion::new(0), &[(&stream_id, &[2])])?;

    let outcomes: [_; 2] = tokio::join!(
        scenario.store.append_events(left),
        scenario.store.append_events(right)
    )
    .into();

    let winners = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    let conflicts = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, Err(EventStoreError::VersionConflict)))
        .count();
    if (winners, conflicts) != (1, 1) {
        return Err(scenario.fail(format!(
            "{winners} appends won and {conflicts} conflicted; expected one of each"
        )));
    }

    let persisted = scenario.sequences(&stream_id).await?;
    if persisted.len() != 1 {
        return Err(scenario.fail(format!("racing appends persisted {persisted:?}")));
    }

    Ok(())
}

/// Events written to one stream never show up in another.
pub async fn test_stream_isolation<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: EventStore + Send + Sync + 'static,
{
    let scenario = Scenario::start("stream_isolation", &make_store);
    let left = scenario.stream("left")?;
    let right = scenario.stream("right")?;

    let _ = scenario
        .append(scenario.batch(StreamVersion::new(0), &[(&left, &[1]), (&right, &[1, 2])])?)
        .await?;

    for (stream_id, expected_len) in [(&left, 1), (&right, 2)] {
        let reader = scenario.read(stream_id).await?;
        if reader.len() != expected_len {
            return Err(scenario.fail(format!(
                "{stream_id} holds {} events, wrote {expected_len}",
                reader.len()
            )));
        }
        if let Some(stray) = reader.iter().find(|event| event.stream_id() != stream_id) {
            return Err(scenario.fail(format!(
                "{stream_id} returned an event written to {}",
                stray.stream_id()
            )));
        }
    }

    Ok(())
}

/// Reading a stream that was never written yields an empty reader at version 0.
pub async fn test_missing_stream_reads<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: EventStore + Send + Sync + 'static,
{
    let scenario = Scenario::start("missing_stream_reads", &make_store);
    let stream_id = scenario.stream("ghost")?;

    let reader = scenario.read(&stream_id).await?;
    if !reader.is_empty() || reader.version() != StreamVersion::new(0) {
        return Err(scenario.fail(format!(
            "unwritten stream read {} events at version {}",
            reader.len(),
            reader.version()
        )));
    }

    Ok(())
}

/// A batch that conflicts on any stream writes nothing at all.
pub async fn test_conflict_preserves_atomicity<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: EventStore + Send + Sync + 'static,
{
    let scenario = Scenario::start("conflict_preserves_atomicity", &make_store);
    let fresh = scenario.stream("fresh")?;
    let advanced = scenario.stream("advanced")?;

    let _ = scenario
        .append(scenario.batch(StreamVersion::new(0), &[(&advanced, &[1])])?)
        .await?;

    // `fresh` is really at version 0, `advanced` is not.
    scenario
        .append_expecting_conflict(
            scenario.batch(StreamVersion::new(0), &[(&fresh, &[1]), (&advanced, &[2])])?,
        )
        .await?;

    let fresh_events = scenario.sequences(&fresh).await?;
    let advanced_events = scenario.sequences(&advanced).await?;
    if !fresh_events.is_empty() || advanced_events != [1] {
        return Err(scenario.fail(format!(
            "refused batch leaked events: fresh={fresh_events:?}, advanced={advanced_events:?}"
        )));
    }

    Ok(())
}

/// Versions handed back by reads are accepted by the next append.
pub async fn test_read_version_guards_next_append<F, S>(make_store: F) -> ContractTestResult
where
    F: Fn() -> S + Send + Sync + Clone + 'static,
    S: EventStore + Send + Sync + 'static,
{
    let scenario = Scenario::start("read_version_guards_next_append", &make_store);
    let stream_id = scenario.stream("cycle")?;

    for sequence in 1..=3 {
        let observed = scenario.read(&stream_id).await?.version();
        let _ = scenario
            .append(scenario.batch(observed, &[(&stream_id, &[sequence])])?)
            .await?;
    }

    let sequences = scenario.sequences(&stream_id).await?;
    if sequences != [1, 2, 3] {
        return Err(scenario.fail(format!("read-then-append cycles stored {sequences:?}")));
    }

    Ok(())
}

/// Generate a module running every contract scenario against a store factory.
#[macro_export]
macro_rules! event_store_contract_tests {
    (suite = $suite:ident, make_store = $make_store:expr $(,)?) => {
        mod $suite {
            use $crate::contract::{
                test_basic_read_write, test_concurrent_version_conflicts,
                test_conflict_preserves_atomicity, test_missing_stream_reads,
                test_racing_appends_single_winner, test_read_version_guards_next_append,
                test_stream_isolation,
            };

            #[tokio::test(flavor = "multi_thread")]
            async fn basic_read_write_contract() {
                test_basic_read_write($make_store)
                    .await
                    .expect("event store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn concurrent_version_conflicts_contract() {
                test_concurrent_version_conflicts($make_store)
                    .await
                    .expect("event store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn racing_appends_single_winner_contract() {
                test_racing_appends_single_winner($make_store)
                    .await
                    .expect("event store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn stream_isolation_contract() {
                test_stream_isolation($make_store)
                    .await
                    .expect("event store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn missing_stream_reads_contract() {
                test_missing_stream_reads($make_store)
                    .await
                    .expect("event store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn conflict_preserves_atomicity_contract() {
                test_conflict_preserves_atomicity($make_store)
                    .await
                    .expect("event store contract failed");
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn read_version_guards_next_append_contract() {
                test_read_version_guards_next_append($make_store)
                    .await
                    .expect("event store contract failed");
            }
        }
    };
}

pub use event_store_contract_tests;
