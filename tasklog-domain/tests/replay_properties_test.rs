use chrono::{DateTime, Utc};
use proptest::prelude::*;
use tasklog::reduce;
use tasklog_domain::{
    LabelColor, LabelDetails, LabelDetailsChange, LabelEvent, LabelId, LabelState, LabelTitle,
    TaskDescription, TaskEvent, TaskId, TaskPriority, TaskState,
};
use uuid::Uuid;

fn task_id() -> impl Strategy<Value = TaskId> {
    any::<u128>().prop_map(|bits| TaskId::new(Uuid::from_u128(bits)))
}

fn description() -> impl Strategy<Value = TaskDescription> {
    "[a-z ]{0,12}".prop_map(TaskDescription::new)
}

fn priority() -> impl Strategy<Value = TaskPriority> {
    prop_oneof![
        Just(TaskPriority::Low),
        Just(TaskPriority::Normal),
        Just(TaskPriority::High),
    ]
}

fn timestamp() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..4_000_000_000).prop_map(|seconds| {
        DateTime::<Utc>::from_timestamp(seconds, 0).expect("in range for chrono")
    })
}

fn task_event() -> impl Strategy<Value = TaskEvent> {
    prop_oneof![
        (task_id(), description())
            .prop_map(|(task_id, description)| TaskEvent::TaskCreated { task_id, description }),
        (task_id(), timestamp())
            .prop_map(|(task_id, created_at)| TaskEvent::TaskDraftCreated { task_id, created_at }),
        (task_id(), proptest::option::of(description()), description()).prop_map(
            |(task_id, previous, new)| TaskEvent::TaskDescriptionUpdated {
                task_id,
                previous,
                new
            }
        ),
        (task_id(), priority(), priority()).prop_map(|(task_id, previous, new)| {
            TaskEvent::TaskPriorityUpdated {
                task_id,
                previous,
                new,
            }
        }),
        task_id().prop_map(|task_id| TaskEvent::TaskDraftFinalized { task_id }),
        task_id().prop_map(|task_id| TaskEvent::TaskCompleted { task_id }),
        task_id().prop_map(|task_id| TaskEvent::TaskDeleted { task_id }),
    ]
}

fn label_details() -> impl Strategy<Value = LabelDetails> {
    let color = prop_oneof![
        Just(LabelColor::Gray),
        Just(LabelColor::Red),
        Just(LabelColor::Green),
        Just(LabelColor::Blue),
    ];
    ("[A-Za-z]{1,8}", color)
        .prop_map(|(title, color)| LabelDetails::new(LabelTitle::new(title), color))
}

fn label_event() -> impl Strategy<Value = LabelEvent> {
    let label_id = any::<u128>().prop_map(|bits| LabelId::new(Uuid::from_u128(bits)));
    prop_oneof![
        (label_id.clone(), "[A-Za-z]{1,8}").prop_map(|(label_id, title)| {
            LabelEvent::LabelCreated {
                label_id,
                title: LabelTitle::new(title),
            }
        }),
        (label_id, label_details(), label_details()).prop_map(|(label_id, previous, new)| {
            LabelEvent::LabelDetailsUpdated {
                label_id,
                change: LabelDetailsChange { previous, new },
            }
        }),
    ]
}

proptest! {
    #[test]
    fn task_replay_is_deterministic(events in prop::collection::vec(task_event(), 0..24)) {
        prop_assert_eq!(
            reduce(TaskState::default(), &events),
            reduce(TaskState::default(), &events)
        );
    }

    #[test]
    fn task_replay_can_resume_at_any_split(
        events in prop::collection::vec(task_event(), 0..24),
        split in any::<prop::sample::Index>(),
    ) {
        let k = split.index(events.len() + 1);
        let resumed = reduce(reduce(TaskState::default(), &events[..k]), &events[k..]);

        prop_assert_eq!(resumed, reduce(TaskState::default(), &events));
    }

    #[test]
    fn label_replay_can_resume_at_any_split(
        events in prop::collection::vec(label_event(), 0..24),
        split in any::<prop::sample::Index>(),
    ) {
        let k = split.index(events.len() + 1);
        let resumed = reduce(reduce(LabelState::default(), &events[..k]), &events[k..]);

        prop_assert_eq!(resumed, reduce(LabelState::default(), &events));
    }

    #[test]
    fn last_details_update_wins(
        title in "[A-Za-z]{1,8}",
        updates in prop::collection::vec((label_details(), label_details()), 1..8),
    ) {
        let label_id = LabelId::generate();
        let mut events = vec![LabelEvent::LabelCreated { label_id, title: LabelTitle::new(title) }];
        events.extend(updates.iter().cloned().map(|(previous, new)| {
            LabelEvent::LabelDetailsUpdated { label_id, change: LabelDetailsChange { previous, new } }
        }));

        let state = reduce(LabelState::default(), &events);

        prop_assert_eq!(state.details(), updates.last().map(|(_, new)| new));
    }
}
