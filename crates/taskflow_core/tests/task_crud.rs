use rusqlite::Connection;
use taskflow_core::model::task::TaskValidationError;
use taskflow_core::{
    open_db_in_memory, NewTask, SqliteTaskRepository, TaskListQuery, TaskPriority, TaskService,
    TaskServiceError, TaskStatus,
};
use uuid::Uuid;

const NOW: i64 = 1_700_000_000_000;

fn fixed_now() -> i64 {
    NOW
}

fn service(conn: &Connection) -> TaskService<SqliteTaskRepository<'_>> {
    TaskService::with_clock(SqliteTaskRepository::try_new(conn).unwrap(), fixed_now)
}

#[test]
fn create_and_get_round_trips_owned_rows() {
    let conn = open_db_in_memory().unwrap();
    let tasks = service(&conn);

    let created = tasks
        .create_task(NewTask {
            title: "  Write report  ".to_string(),
            description: Some("   ".to_string()),
            priority: TaskPriority::High,
            due_at: Some(NOW + 3_600_000),
            tags: vec!["#Work".to_string(), "work".to_string(), "q3".to_string()],
            subtasks: vec!["outline".to_string(), "draft".to_string()],
            estimated_minutes: Some(90),
            ..NewTask::default()
        })
        .unwrap();

    assert_eq!(created.title, "Write report");
    assert_eq!(created.description, None);
    assert_eq!(created.status, TaskStatus::Pending);
    assert_eq!(created.created_at, NOW);

    let loaded = tasks.get_task(created.id).unwrap().unwrap();
    assert_eq!(loaded, created);
    assert_eq!(loaded.tags, vec!["q3".to_string(), "work".to_string()]);
    assert_eq!(loaded.subtasks.len(), 2);
    assert_eq!(loaded.subtasks[0].title, "outline");
    assert_eq!(loaded.subtasks[1].position, 1);
}

#[test]
fn blank_title_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let tasks = service(&conn);

    let err = tasks.create_task(NewTask::titled("   ")).unwrap_err();
    assert!(matches!(
        err,
        TaskServiceError::InvalidTask(TaskValidationError::BlankTitle)
    ));
    assert!(tasks.list_tasks(&TaskListQuery::default()).unwrap().is_empty());
}

#[test]
fn create_with_unknown_prerequisite_fails() {
    let conn = open_db_in_memory().unwrap();
    let tasks = service(&conn);
    let missing = Uuid::new_v4();

    let err = tasks
        .create_task(NewTask {
            dependencies: vec![missing],
            ..NewTask::titled("blocked")
        })
        .unwrap_err();
    assert!(matches!(err, TaskServiceError::PrerequisiteNotFound(id) if id == missing));
}

#[test]
fn update_keeps_status_and_dependencies() {
    let conn = open_db_in_memory().unwrap();
    let tasks = service(&conn);
    let prerequisite = tasks.create_task(NewTask::titled("first")).unwrap();
    let task = tasks
        .create_task(NewTask {
            dependencies: vec![prerequisite.id],
            ..NewTask::titled("second")
        })
        .unwrap();

    let mut edited = task.clone();
    edited.title = "second, renamed".to_string();
    edited.status = TaskStatus::Cancelled;
    edited.dependencies.clear();
    edited.priority = TaskPriority::Urgent;
    let updated = tasks.update_task(edited).unwrap();

    assert_eq!(updated.title, "second, renamed");
    assert_eq!(updated.priority, TaskPriority::Urgent);
    assert_eq!(updated.status, TaskStatus::Pending);
    assert_eq!(updated.dependencies, vec![prerequisite.id]);
    assert_eq!(tasks.get_task(task.id).unwrap().unwrap(), updated);
}

#[test]
fn update_missing_task_reports_not_found() {
    let conn = open_db_in_memory().unwrap();
    let tasks = service(&conn);
    let mut ghost = taskflow_core::Task::new("ghost", NOW);
    ghost.id = Uuid::new_v4();

    let err = tasks.update_task(ghost.clone()).unwrap_err();
    assert!(matches!(err, TaskServiceError::TaskNotFound(id) if id == ghost.id));
}

#[test]
fn delete_cascades_owned_rows_and_edges() {
    let conn = open_db_in_memory().unwrap();
    let tasks = service(&conn);
    let prerequisite = tasks.create_task(NewTask::titled("first")).unwrap();
    let task = tasks
        .create_task(NewTask {
            dependencies: vec![prerequisite.id],
            subtasks: vec!["step".to_string()],
            ..NewTask::titled("second")
        })
        .unwrap();

    tasks.delete_task(prerequisite.id).unwrap();

    assert!(tasks.get_task(prerequisite.id).unwrap().is_none());
    let remaining = tasks.get_task(task.id).unwrap().unwrap();
    assert!(remaining.dependencies.is_empty());

    tasks.delete_task(task.id).unwrap();
    let subtasks: i64 = conn
        .query_row("SELECT COUNT(*) FROM subtasks;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(subtasks, 0);

    let err = tasks.delete_task(task.id).unwrap_err();
    assert!(matches!(err, TaskServiceError::TaskNotFound(_)));
}

#[test]
fn list_filters_by_status_tag_and_due_window() {
    let conn = open_db_in_memory().unwrap();
    let tasks = service(&conn);
    let early = tasks
        .create_task(NewTask {
            due_at: Some(NOW),
            tags: vec!["home".to_string()],
            ..NewTask::titled("early")
        })
        .unwrap();
    let late = tasks
        .create_task(NewTask {
            due_at: Some(NOW + 10_000),
            ..NewTask::titled("late")
        })
        .unwrap();
    tasks.set_status(late.id, TaskStatus::InProgress).unwrap();

    let by_tag = tasks
        .list_tasks(&TaskListQuery {
            tag: Some("HOME".to_string()),
            ..TaskListQuery::default()
        })
        .unwrap();
    assert_eq!(by_tag.len(), 1);
    assert_eq!(by_tag[0].id, early.id);

    let in_progress = tasks
        .list_tasks(&TaskListQuery {
            statuses: vec![TaskStatus::InProgress],
            ..TaskListQuery::default()
        })
        .unwrap();
    assert_eq!(in_progress.len(), 1);
    assert_eq!(in_progress[0].id, late.id);

    let window = tasks
        .list_tasks(&TaskListQuery {
            due_from: Some(NOW + 1),
            due_to: Some(NOW + 10_001),
            ..TaskListQuery::default()
        })
        .unwrap();
    assert_eq!(window.len(), 1);
    assert_eq!(window[0].id, late.id);
}

#[test]
fn lifecycle_rejects_illegal_transitions() {
    let conn = open_db_in_memory().unwrap();
    let tasks = service(&conn);
    let task = tasks.create_task(NewTask::titled("cancel me")).unwrap();

    let cancelled = tasks.set_status(task.id, TaskStatus::Cancelled).unwrap();
    assert_eq!(cancelled.task.status, TaskStatus::Cancelled);
    assert_eq!(cancelled.task.completed_at, None);

    let err = tasks.set_status(task.id, TaskStatus::InProgress).unwrap_err();
    assert!(matches!(
        err,
        TaskServiceError::InvalidTransition {
            from: TaskStatus::Cancelled,
            to: TaskStatus::InProgress
        }
    ));
    let err = tasks.complete_task(task.id).unwrap_err();
    assert!(matches!(err, TaskServiceError::InvalidTransition { .. }));

    let reopened = tasks.set_status(task.id, TaskStatus::Pending).unwrap();
    assert_eq!(reopened.task.status, TaskStatus::Pending);
}

#[test]
fn toggle_completion_round_trip_clears_completed_at() {
    let conn = open_db_in_memory().unwrap();
    let tasks = service(&conn);
    let task = tasks.create_task(NewTask::titled("flip")).unwrap();

    let done = tasks.toggle_completion(task.id).unwrap();
    assert_eq!(done.task.status, TaskStatus::Completed);
    assert_eq!(done.task.completed_at, Some(NOW));
    assert!(done.successor.is_none());

    let open = tasks.toggle_completion(task.id).unwrap();
    assert_eq!(open.task.status, TaskStatus::Pending);
    assert_eq!(open.task.completed_at, None);
}

#[test]
fn toggle_subtask_and_set_tags() {
    let conn = open_db_in_memory().unwrap();
    let tasks = service(&conn);
    let task = tasks
        .create_task(NewTask {
            subtasks: vec!["a".to_string(), "b".to_string()],
            ..NewTask::titled("checklist")
        })
        .unwrap();

    let toggled = tasks.toggle_subtask(task.id, task.subtasks[1].id).unwrap();
    assert_eq!(toggled.subtask_progress(), (1, 2));
    assert!(tasks.get_task(task.id).unwrap().unwrap().subtasks[1].is_completed);

    let err = tasks.toggle_subtask(task.id, Uuid::new_v4()).unwrap_err();
    assert!(matches!(err, TaskServiceError::SubtaskNotFound(_)));

    let tagged = tasks
        .set_tags(task.id, &["Errands".to_string(), "#errands".to_string()])
        .unwrap();
    assert_eq!(tagged.tags, vec!["errands".to_string()]);
}

#[test]
fn corrupted_recurrence_json_surfaces_as_repo_error() {
    let conn = open_db_in_memory().unwrap();
    let tasks = service(&conn);
    let task = tasks.create_task(NewTask::titled("broken")).unwrap();
    conn.execute(
        "UPDATE tasks SET recurrence_json = 'not json' WHERE uuid = ?1;",
        [task.id.to_string()],
    )
    .unwrap();

    assert!(tasks.get_task(task.id).is_err());
}
