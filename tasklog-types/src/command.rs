use crate::store::{StreamId, StreamIdError};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Trait implemented by every domain event payload.
///
/// Events are immutable facts. They must be cloneable so the executor can
/// both persist them and hand them back to the caller, and serializable so
/// stores that do not keep native values can round-trip them.
pub trait Event: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Stable name of the event variant, used by stores for diagnostics.
    fn event_type_name(&self) -> &'static str;
}

/// State reconstructed by folding an entity's events.
///
/// `apply` must be pure and deterministic: it consumes the previous state and
/// returns the next one, overwriting only the fields the event affects.
pub trait Aggregate: Default + Send {
    /// The closed set of events this state understands.
    type Event: Event;

    /// Apply a single event, producing the next state.
    fn apply(self, event: &Self::Event) -> Self;
}

/// Fold an ordered sequence of events into state, starting from `initial`.
///
/// Because each step is pure, replaying the same sequence always yields the
/// same state, and replay may be split at any point:
/// `reduce(reduce(s, a), b) == reduce(s, a ++ b)`.
pub fn reduce<'a, A, I>(initial: A, events: I) -> A
where
    A: Aggregate,
    I: IntoIterator<Item = &'a A::Event>,
{
    events
        .into_iter()
        .fold(initial, A::apply)
}

/// Trait defining the behavior of a command.
///
/// A command targets exactly one entity stream. The executor reads that
/// stream, reduces it into `State`, and passes the state to `handle()`, which
/// either produces new events or rejects the command with a typed
/// `Rejection`. Rejections are domain decisions, never infrastructure failures.
pub trait CommandLogic: Send + Sync {
    /// State reconstructed from the target stream.
    type State: Aggregate<Event = Self::Event>;

    /// Events this command emits.
    type Event: Event;

    /// Typed rejection returned when a business rule forbids the command.
    type Rejection: std::error::Error + Send + Sync + 'static;

    /// The stream holding the target entity's events.
    fn stream_id(&self) -> Result<StreamId, StreamIdError>;

    /// Decide the outcome of the command against the current state.
    fn handle(&self, state: Self::State) -> Result<NewEvents<Self::Event>, Self::Rejection>;
}

/// Events produced by a successful `handle()`.
///
/// A sequence rather than a single value so that an outcome can grow into
/// several facts without changing the handler signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvents<E> {
    events: Vec<E>,
}

impl<E> NewEvents<E> {
    /// Wrap a single event.
    #[must_use]
    pub fn single(event: E) -> Self {
        Self {
            events: vec![event],
        }
    }

    /// Number of events produced.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if the command produced no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterate over the produced events in emission order.
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.events.iter()
    }
}

impl<E> From<Vec<E>> for NewEvents<E> {
    fn from(events: Vec<E>) -> Self {
        Self { events }
    }
}

impl<E> IntoIterator for NewEvents<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}
