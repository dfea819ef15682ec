use tasklog::{CommandError, EventStore, InMemoryEventStore};
use tasklog_domain::{
    DispatchError, Dispatcher, DomainEvent, Rejection, TaskCommand, TaskDescription, TaskEvent,
    TaskId, TaskPriority, TaskRejection, TaskStatus, ValueMismatch,
};

fn description(text: &str) -> TaskDescription {
    TaskDescription::new(text.to_string())
}

fn task_rejection(result: Result<Vec<DomainEvent>, DispatchError>) -> TaskRejection {
    match result {
        Err(CommandError::Rejected(Rejection::Task(rejection))) => rejection,
        other => panic!("expected a task rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn first_draft_succeeds_and_second_is_rejected() {
    // Given: a task with no history
    let dispatcher = Dispatcher::new(InMemoryEventStore::new());
    let task_id = TaskId::generate();

    // When: a draft is created
    let events = dispatcher
        .dispatch(TaskCommand::CreateDraft { task_id })
        .await
        .expect("draft on a fresh task");

    // Then: one draft event was recorded and the task is a draft
    assert!(matches!(
        events.as_slice(),
        [DomainEvent::Task(TaskEvent::TaskDraftCreated { task_id: recorded, .. })] if *recorded == task_id
    ));
    let state = dispatcher.load_task(task_id).await.expect("load task");
    assert_eq!(state.status(), TaskStatus::Draft);
    assert!(state.draft_created_at().is_some());

    // When: a second draft is requested for the same task
    let second = dispatcher.dispatch(TaskCommand::CreateDraft { task_id }).await;

    // Then: it is rejected and nothing more is recorded
    assert_eq!(
        task_rejection(second),
        TaskRejection::CannotCreateDraft { task_id }
    );
    let stream = dispatcher
        .store()
        .read_stream::<TaskEvent>(task_id.stream_id().expect("valid stream id"))
        .await
        .expect("read task stream");
    assert_eq!(stream.len(), 1);
}

#[tokio::test]
async fn two_character_description_is_rejected() {
    let dispatcher = Dispatcher::new(InMemoryEventStore::new());
    let task_id = TaskId::generate();

    let result = dispatcher
        .dispatch(TaskCommand::CreateBasicTask {
            task_id,
            description: description("ab"),
        })
        .await;

    assert_eq!(
        task_rejection(result),
        TaskRejection::CannotCreateTaskWithInappropriateDescription { task_id }
    );
    let state = dispatcher.load_task(task_id).await.expect("load task");
    assert_eq!(state.status(), TaskStatus::Undefined);
}

#[tokio::test]
async fn three_character_description_is_accepted_and_stored() {
    let dispatcher = Dispatcher::new(InMemoryEventStore::new());
    let task_id = TaskId::generate();

    let _ = dispatcher
        .dispatch(TaskCommand::CreateBasicTask {
            task_id,
            description: description("abc"),
        })
        .await
        .expect("three characters is long enough");

    let state = dispatcher.load_task(task_id).await.expect("load task");
    assert_eq!(state.status(), TaskStatus::Finalized);
    assert_eq!(state.description(), Some(&description("abc")));
}

#[tokio::test]
async fn draft_is_described_finalized_prioritized_and_completed() {
    let dispatcher = Dispatcher::new(InMemoryEventStore::new());
    let task_id = TaskId::generate();

    for command in [
        TaskCommand::CreateDraft { task_id },
        TaskCommand::UpdateTaskDescription {
            task_id,
            previous: None,
            new: description("renew passport"),
        },
        TaskCommand::FinalizeDraft { task_id },
        TaskCommand::UpdateTaskPriority {
            task_id,
            previous: TaskPriority::Normal,
            new: TaskPriority::High,
        },
        TaskCommand::CompleteTask { task_id },
    ] {
        let _ = dispatcher
            .dispatch(command.clone())
            .await
            .unwrap_or_else(|error| panic!("{command:?} failed: {error}"));
    }

    let state = dispatcher.load_task(task_id).await.expect("load task");
    assert_eq!(state.status(), TaskStatus::Completed);
    assert_eq!(state.description(), Some(&description("renew passport")));
    assert_eq!(state.priority(), TaskPriority::High);
}

#[tokio::test]
async fn stale_description_assertion_returns_the_current_value() {
    let dispatcher = Dispatcher::new(InMemoryEventStore::new());
    let task_id = TaskId::generate();
    let _ = dispatcher
        .dispatch(TaskCommand::CreateBasicTask {
            task_id,
            description: description("call mom"),
        })
        .await
        .expect("create task");
    let _ = dispatcher
        .dispatch(TaskCommand::UpdateTaskDescription {
            task_id,
            previous: Some(description("call mom")),
            new: description("call mom tonight"),
        })
        .await
        .expect("first update matches");

    // A client still holding the original description retries its own edit.
    let result = dispatcher
        .dispatch(TaskCommand::UpdateTaskDescription {
            task_id,
            previous: Some(description("call mom")),
            new: description("call dad"),
        })
        .await;

    assert_eq!(
        task_rejection(result),
        TaskRejection::CannotUpdateTaskDescription {
            task_id,
            mismatch: ValueMismatch {
                expected: Some(description("call mom")),
                actual: Some(description("call mom tonight")),
                requested: Some(description("call dad")),
            },
        }
    );
}

#[tokio::test]
async fn deleted_task_accepts_no_further_commands() {
    let dispatcher = Dispatcher::new(InMemoryEventStore::new());
    let task_id = TaskId::generate();
    let _ = dispatcher
        .dispatch(TaskCommand::CreateBasicTask {
            task_id,
            description: description("file taxes"),
        })
        .await
        .expect("create task");
    let _ = dispatcher
        .dispatch(TaskCommand::DeleteTask { task_id })
        .await
        .expect("delete task");

    let complete = dispatcher.dispatch(TaskCommand::CompleteTask { task_id }).await;
    let delete_again = dispatcher.dispatch(TaskCommand::DeleteTask { task_id }).await;

    assert_eq!(
        task_rejection(complete),
        TaskRejection::CannotCompleteTask {
            task_id,
            status: TaskStatus::Deleted,
        }
    );
    assert_eq!(
        task_rejection(delete_again),
        TaskRejection::CannotDeleteTask {
            task_id,
            status: TaskStatus::Deleted,
        }
    );
}

#[tokio::test]
async fn tasks_do_not_share_state() {
    let dispatcher = Dispatcher::new(InMemoryEventStore::new());
    let drafted = TaskId::generate();
    let untouched = TaskId::generate();

    let _ = dispatcher
        .dispatch(TaskCommand::CreateDraft { task_id: drafted })
        .await
        .expect("draft");

    let state = dispatcher.load_task(untouched).await.expect("load task");
    assert_eq!(state.status(), TaskStatus::Undefined);
}
