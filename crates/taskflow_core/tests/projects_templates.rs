use rusqlite::Connection;
use taskflow_core::model::template::TaskTemplate;
use taskflow_core::repo::category_repo::SqliteCategoryRepository;
use taskflow_core::repo::project_repo::SqliteProjectRepository;
use taskflow_core::repo::tag_repo::SqliteTagRepository;
use taskflow_core::repo::template_repo::SqliteTemplateRepository;
use taskflow_core::service::project_service::{
    CategoryService, ProjectService, ProjectServiceError,
};
use taskflow_core::service::tag_service::TagService;
use taskflow_core::service::template_service::{TemplateService, TemplateServiceError};
use taskflow_core::{
    open_db_in_memory, NewTask, RecurrencePattern, SqliteTaskRepository, TaskListQuery,
    TaskPriority, TaskService, TaskStatus,
};
use uuid::Uuid;

const NOW: i64 = 1_700_000_000_000;

fn fixed_now() -> i64 {
    NOW
}

fn task_service(conn: &Connection) -> TaskService<SqliteTaskRepository<'_>> {
    TaskService::with_clock(SqliteTaskRepository::try_new(conn).unwrap(), fixed_now)
}

fn project_service(conn: &Connection) -> ProjectService<SqliteProjectRepository<'_>> {
    ProjectService::with_clock(SqliteProjectRepository::try_new(conn).unwrap(), fixed_now)
}

fn template_service(conn: &Connection) -> TemplateService<SqliteTemplateRepository<'_>> {
    TemplateService::with_clock(SqliteTemplateRepository::try_new(conn).unwrap(), fixed_now)
}

#[test]
fn project_crud_normalizes_input() {
    let conn = open_db_in_memory().unwrap();
    let projects = project_service(&conn);

    let created = projects
        .create_project("  Launch  ", Some(" ".to_string()), Some("#FFAA00".to_string()))
        .unwrap();
    assert_eq!(created.name, "Launch");
    assert_eq!(created.description, None);
    assert_eq!(created.color.as_deref(), Some("#ffaa00"));
    assert_eq!(projects.get_project(created.id).unwrap().unwrap(), created);

    assert!(matches!(
        projects.create_project("   ", None, None),
        Err(ProjectServiceError::BlankName)
    ));
    assert!(matches!(
        projects.create_project("Bad", None, Some("orange".to_string())),
        Err(ProjectServiceError::InvalidColor(_))
    ));

    let mut renamed = created.clone();
    renamed.name = "Launch v2".to_string();
    let updated = projects.update_project(renamed).unwrap();
    assert_eq!(updated.name, "Launch v2");
    assert_eq!(updated.created_at, created.created_at);
}

#[test]
fn archived_projects_are_hidden_by_default() {
    let conn = open_db_in_memory().unwrap();
    let projects = project_service(&conn);
    let active = projects.create_project("Active", None, None).unwrap();
    let old = projects.create_project("Old", None, None).unwrap();

    projects.set_archived(old.id, true).unwrap();

    let visible = projects.list_projects(false).unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, active.id);
    assert_eq!(projects.list_projects(true).unwrap().len(), 2);
}

#[test]
fn summary_counts_tasks_and_delete_detaches_them() {
    let conn = open_db_in_memory().unwrap();
    let projects = project_service(&conn);
    let tasks = task_service(&conn);
    let project = projects.create_project("Home", None, None).unwrap();

    let mut ids = Vec::new();
    for title in ["paint", "clean", "fix sink", "buy plants"] {
        let task = tasks
            .create_task(NewTask {
                project_id: Some(project.id),
                ..NewTask::titled(title)
            })
            .unwrap();
        ids.push(task.id);
    }
    tasks.complete_task(ids[0]).unwrap();
    tasks.set_status(ids[1], TaskStatus::Cancelled).unwrap();

    let summary = projects.summary(project.id).unwrap();
    assert_eq!(summary.counts.total, 4);
    assert_eq!(summary.counts.open, 2);
    assert_eq!(summary.counts.completed, 1);
    assert!((summary.progress - 0.25).abs() < f64::EPSILON);

    projects.delete_project(project.id).unwrap();
    assert!(matches!(
        projects.summary(project.id),
        Err(ProjectServiceError::NotFound(id)) if id == project.id
    ));
    let orphans = tasks.list_tasks(&TaskListQuery::default()).unwrap();
    assert_eq!(orphans.len(), 4);
    assert!(orphans.iter().all(|task| task.project_id.is_none()));
}

#[test]
fn categories_are_unique_by_name_and_detach_on_delete() {
    let conn = open_db_in_memory().unwrap();
    let categories = CategoryService::new(SqliteCategoryRepository::try_new(&conn).unwrap());
    let tasks = task_service(&conn);

    let health = categories
        .create_category("Health", Some("#00FF00".to_string()), Some("heart".to_string()))
        .unwrap();
    assert_eq!(health.color.as_deref(), Some("#00ff00"));
    assert!(matches!(
        categories.create_category("health", None, None),
        Err(ProjectServiceError::Repo(_))
    ));

    let task = tasks
        .create_task(NewTask {
            category_id: Some(health.id),
            ..NewTask::titled("run")
        })
        .unwrap();
    categories.delete_category(health.id).unwrap();

    assert!(categories.list_categories().unwrap().is_empty());
    assert_eq!(tasks.get_task(task.id).unwrap().unwrap().category_id, None);
    assert!(matches!(
        categories.delete_category(health.id),
        Err(ProjectServiceError::NotFound(_))
    ));
}

#[test]
fn template_stamps_tasks_and_counts_usage() {
    let conn = open_db_in_memory().unwrap();
    let templates = template_service(&conn);
    let tasks = task_service(&conn);

    let mut draft = TaskTemplate::new(" Weekly review ", " Review the week ", 0);
    draft.priority = TaskPriority::High;
    draft.tags = vec!["#Planning".to_string()];
    draft.subtasks = vec!["inbox zero".to_string(), "  ".to_string(), "plan".to_string()];
    draft.recurrence = Some(RecurrencePattern::weekly());
    let template = templates.create_template(draft).unwrap();

    assert_eq!(template.name, "Weekly review");
    assert_eq!(template.tags, vec!["planning".to_string()]);
    assert_eq!(template.subtasks.len(), 2);
    assert_eq!(template.created_at, NOW);

    let task = templates
        .create_task_from_template(template.id, Some(NOW + 1_000))
        .unwrap();
    assert_eq!(task.title, "Review the week");
    assert_eq!(task.priority, TaskPriority::High);
    assert_eq!(task.due_at, Some(NOW + 1_000));
    assert_eq!(task.subtasks[1].title, "plan");
    assert!(task.is_recurring());
    assert_eq!(tasks.get_task(task.id).unwrap().unwrap(), task);

    templates.create_task_from_template(template.id, None).unwrap();
    let stored = templates.get_template(template.id).unwrap().unwrap();
    assert_eq!(stored.usage_count, 2);
}

#[test]
fn template_validation_and_missing_template() {
    let conn = open_db_in_memory().unwrap();
    let templates = template_service(&conn);

    assert!(matches!(
        templates.create_template(TaskTemplate::new(" ", "title", 0)),
        Err(TemplateServiceError::BlankName)
    ));
    assert!(matches!(
        templates.create_template(TaskTemplate::new("name", " ", 0)),
        Err(TemplateServiceError::BlankTitle)
    ));
    let mut bad = TaskTemplate::new("name", "title", 0);
    bad.recurrence = Some(RecurrencePattern::daily().every(0));
    assert!(matches!(
        templates.create_template(bad),
        Err(TemplateServiceError::InvalidRecurrence(_))
    ));

    let missing = Uuid::new_v4();
    assert!(matches!(
        templates.create_task_from_template(missing, None),
        Err(TemplateServiceError::TemplateNotFound(id)) if id == missing
    ));
}

#[test]
fn failed_usage_bump_discards_the_stamped_task() {
    let conn = open_db_in_memory().unwrap();
    let templates = template_service(&conn);
    let template = templates
        .create_template(TaskTemplate::new("Standup", "Post standup notes", 0))
        .unwrap();
    conn.execute_batch(
        "CREATE TEMP TRIGGER freeze_template_usage
         BEFORE UPDATE OF usage_count ON task_templates
         BEGIN
             SELECT RAISE(ABORT, 'usage frozen');
         END;",
    )
    .unwrap();

    assert!(matches!(
        templates.create_task_from_template(template.id, None),
        Err(TemplateServiceError::Repo(_))
    ));
    assert!(task_service(&conn)
        .list_tasks(&TaskListQuery::default())
        .unwrap()
        .is_empty());
    assert_eq!(
        templates.get_template(template.id).unwrap().unwrap().usage_count,
        0
    );
}

#[test]
fn tags_can_be_renamed_merged_and_deleted() {
    let conn = open_db_in_memory().unwrap();
    let tasks = task_service(&conn);
    let tags = TagService::new(SqliteTagRepository::try_new(&conn).unwrap());

    let first = tasks
        .create_task(NewTask {
            tags: vec!["wrk".to_string()],
            ..NewTask::titled("a")
        })
        .unwrap();
    let second = tasks
        .create_task(NewTask {
            tags: vec!["work".to_string(), "wrk".to_string()],
            ..NewTask::titled("b")
        })
        .unwrap();

    let target = tags.rename_tag("#WRK", "Work").unwrap();
    assert_eq!(target, "work");

    let usage = tags.list_tags().unwrap();
    assert_eq!(usage.len(), 1);
    assert_eq!(usage[0].name, "work");
    assert_eq!(usage[0].task_count, 2);
    assert_eq!(
        tasks.get_task(second.id).unwrap().unwrap().tags,
        vec!["work".to_string()]
    );

    tags.delete_tag("work").unwrap();
    assert!(tags.list_tags().unwrap().is_empty());
    assert!(tasks.get_task(first.id).unwrap().unwrap().tags.is_empty());
    assert!(tags.delete_tag("work").is_err());
}
