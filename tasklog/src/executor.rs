use crate::retry::{RetryContext, RetryPolicy, duration_to_millis};
use tasklog_types::{
    Aggregate, CommandError, CommandLogic, Event, EventStore, EventStoreError, StreamId, StreamVersion,
    StreamWrites, reduce,
};
use tracing::{Span, debug, field, info, instrument, warn};

/// Execute a command against the event store.
///
/// Runs the read → reduce → handle → append cycle for the command's stream:
///
/// 1. read every event of the target stream and note its version
/// 2. fold the events into `C::State`
/// 3. let the command decide, producing events or a typed rejection
/// 4. append the events, expecting the version observed in step 1
///
/// If another writer advanced the stream in between, the store reports a
/// version conflict and the whole cycle is repeated against fresh state, up
/// to the policy's retry limit. A command that was valid against stale state
/// may therefore come back as a rejection on retry.
///
/// Returns the appended events in emission order.
///
/// # Errors
///
/// - [`CommandError::Rejected`] when the command's business rules refuse it
/// - [`CommandError::ConcurrencyError`] when conflicts outlast the retry budget
/// - [`CommandError::EventStoreError`] for any other store failure
/// - [`CommandError::InvalidStreamId`] when the target cannot name a stream
#[instrument(
    name = "execute",
    skip_all,
    fields(command = std::any::type_name::<C>(), stream_id = field::Empty)
)]
pub async fn execute<C, S>(
    store: S,
    command: C,
    policy: RetryPolicy,
) -> Result<Vec<C::Event>, CommandError<C::Rejection>>
where
    C: CommandLogic,
    S: EventStore + Send + Sync,
{
    let stream_id = command.stream_id().map_err(CommandError::InvalidStreamId)?;
    let _ = Span::current().record("stream_id", field::display(&stream_id));

    let mut attempt: u32 = 0;

    loop {
        let (state, expected_version) = load_state::<C::State, _>(&store, &stream_id).await?;

        let events: Vec<C::Event> = match command.handle(state) {
            Ok(new_events) => new_events.into_iter().collect(),
            Err(rejection) => {
                debug!(%rejection, "command rejected");
                return Err(CommandError::Rejected(rejection));
            }
        };

        let writes = prepare_writes(&stream_id, expected_version, &events)?;

        match store.append_events(writes).await {
            Ok(_) => {
                info!(events = events.len(), retries = attempt, "command executed");
                return Ok(events);
            }
            Err(EventStoreError::VersionConflict) if attempt < policy.retry_limit() => {
                attempt += 1;
                let delay = policy.backoff_delay(attempt);
                let delay_ms = duration_to_millis(delay);

                policy.notify_retry(&RetryContext {
                    attempt,
                    delay_ms,
                    streams: vec![stream_id.clone()],
                });
                warn!(attempt, delay_ms, "version conflict, retrying");

                tokio::time::sleep(delay).await;
            }
            Err(EventStoreError::VersionConflict) => {
                warn!(retries = attempt, "version conflict, retries exhausted");
                return Err(CommandError::ConcurrencyError(attempt));
            }
            Err(error) => return Err(CommandError::EventStoreError(error)),
        }
    }
}

fn prepare_writes<E: Event>(
    stream_id: &StreamId,
    expected_version: StreamVersion,
    events: &[E],
) -> Result<StreamWrites, EventStoreError> {
    events.iter().cloned().try_fold(
        StreamWrites::new().register_stream(stream_id.clone(), expected_version)?,
        |writes, event| writes.append(stream_id, event),
    )
}

/// Reconstruct an entity's current state from its stream.
///
/// Returns the state together with the stream version it reflects.
pub async fn load_state<A, S>(
    store: &S,
    stream_id: &StreamId,
) -> Result<(A, StreamVersion), EventStoreError>
where
    A: Aggregate,
    S: EventStore + Sync,
{
    let reader = store.read_stream::<A::Event>(stream_id.clone()).await?;
    let version = reader.version();

    Ok((reduce(A::default(), reader.iter()), version))
}
