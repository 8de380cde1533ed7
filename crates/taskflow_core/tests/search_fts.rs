use rusqlite::Connection;
use taskflow_core::repo::project_repo::SqliteProjectRepository;
use taskflow_core::service::project_service::ProjectService;
use taskflow_core::{
    open_db_in_memory, search_tasks, NewTask, SearchError, SearchQuery, SqliteTaskRepository,
    TaskService, TaskStatus,
};

fn fixed_now() -> i64 {
    1_700_000_000_000
}

fn task_service(conn: &Connection) -> TaskService<SqliteTaskRepository<'_>> {
    TaskService::with_clock(SqliteTaskRepository::try_new(conn).unwrap(), fixed_now)
}

#[test]
fn search_matches_title_and_description() {
    let conn = open_db_in_memory().unwrap();
    let tasks = task_service(&conn);
    let invoice = tasks
        .create_task(NewTask {
            description: Some("send the quarterly invoice to Acme".to_string()),
            ..NewTask::titled("Billing")
        })
        .unwrap();
    let title_hit = tasks.create_task(NewTask::titled("Invoice archive")).unwrap();
    tasks.create_task(NewTask::titled("Buy milk")).unwrap();

    let hits = search_tasks(&conn, &SearchQuery::new("invoice")).unwrap();
    let ids: Vec<_> = hits.iter().map(|hit| hit.task_id).collect();
    assert_eq!(hits.len(), 2);
    assert!(ids.contains(&invoice.id));
    assert!(ids.contains(&title_hit.id));
    assert!(hits.iter().all(|hit| hit.snippet.contains('[')));
}

#[test]
fn search_follows_updates_and_deletes() {
    let conn = open_db_in_memory().unwrap();
    let tasks = task_service(&conn);
    let task = tasks.create_task(NewTask::titled("Draft blog post")).unwrap();

    let mut edited = task.clone();
    edited.title = "Draft newsletter".to_string();
    tasks.update_task(edited).unwrap();

    assert!(search_tasks(&conn, &SearchQuery::new("blog"))
        .unwrap()
        .is_empty());
    assert_eq!(
        search_tasks(&conn, &SearchQuery::new("newsletter"))
            .unwrap()
            .len(),
        1
    );

    tasks.delete_task(task.id).unwrap();
    assert!(search_tasks(&conn, &SearchQuery::new("newsletter"))
        .unwrap()
        .is_empty());
}

#[test]
fn all_terms_must_match_and_status_filter_applies() {
    let conn = open_db_in_memory().unwrap();
    let tasks = task_service(&conn);
    let done = tasks.create_task(NewTask::titled("Renew passport")).unwrap();
    tasks.create_task(NewTask::titled("Renew library card")).unwrap();
    tasks.complete_task(done.id).unwrap();

    let both = search_tasks(&conn, &SearchQuery::new("renew passport")).unwrap();
    assert_eq!(both.len(), 1);
    assert_eq!(both[0].task_id, done.id);
    assert_eq!(both[0].status, TaskStatus::Completed);

    let mut open_only = SearchQuery::new("renew");
    open_only.statuses = vec![TaskStatus::Pending, TaskStatus::InProgress];
    let hits = search_tasks(&conn, &open_only).unwrap();
    assert_eq!(hits.len(), 1);
    assert_ne!(hits[0].task_id, done.id);
}

#[test]
fn quoting_neutralizes_fts_operators() {
    let conn = open_db_in_memory().unwrap();
    let tasks = task_service(&conn);
    tasks
        .create_task(NewTask::titled("Compare \"NEAR\" OR options"))
        .unwrap();

    let hits = search_tasks(&conn, &SearchQuery::new("\"near OR")).unwrap();
    assert_eq!(hits.len(), 1);
}

#[test]
fn raw_syntax_errors_are_reported() {
    let conn = open_db_in_memory().unwrap();
    let mut query = SearchQuery::new("\"unterminated");
    query.raw_fts_syntax = true;

    assert!(matches!(
        search_tasks(&conn, &query),
        Err(SearchError::InvalidQuery { .. })
    ));
}

#[test]
fn blank_query_and_zero_limit_return_nothing() {
    let conn = open_db_in_memory().unwrap();
    task_service(&conn)
        .create_task(NewTask::titled("anything"))
        .unwrap();

    assert!(search_tasks(&conn, &SearchQuery::new("   "))
        .unwrap()
        .is_empty());
    let mut query = SearchQuery::new("anything");
    query.limit = 0;
    assert!(search_tasks(&conn, &query).unwrap().is_empty());
}

#[test]
fn limit_caps_result_count() {
    let conn = open_db_in_memory().unwrap();
    let tasks = task_service(&conn);
    for index in 0..5 {
        tasks
            .create_task(NewTask::titled(format!("report {index}")))
            .unwrap();
    }

    let mut query = SearchQuery::new("report");
    query.limit = 3;
    assert_eq!(search_tasks(&conn, &query).unwrap().len(), 3);
}

#[test]
fn project_filter_narrows_hits() {
    let conn = open_db_in_memory().unwrap();
    let project = ProjectService::new(SqliteProjectRepository::try_new(&conn).unwrap())
        .create_project("Taxes", None, None)
        .unwrap();
    let tasks = task_service(&conn);
    let filed = tasks
        .create_task(NewTask {
            project_id: Some(project.id),
            ..NewTask::titled("Collect receipts")
        })
        .unwrap();
    tasks.create_task(NewTask::titled("Collect parcel")).unwrap();

    let mut query = SearchQuery::new("collect");
    query.project_id = Some(project.id);
    let hits = search_tasks(&conn, &query).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].task_id, filed.id);
    assert_eq!(hits[0].title, "Collect receipts");
}
