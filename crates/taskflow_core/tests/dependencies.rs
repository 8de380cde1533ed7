use rusqlite::Connection;
use taskflow_core::{
    open_db_in_memory, DependencyError, DependencyService, NewTask, SqliteTaskRepository, Task,
    TaskListQuery, TaskService, TaskStatus,
};
use uuid::Uuid;

fn fixed_now() -> i64 {
    1_700_000_000_000
}

struct Fixture<'conn> {
    tasks: TaskService<SqliteTaskRepository<'conn>>,
    deps: DependencyService<SqliteTaskRepository<'conn>>,
}

fn fixture(conn: &Connection) -> Fixture<'_> {
    Fixture {
        tasks: TaskService::with_clock(SqliteTaskRepository::try_new(conn).unwrap(), fixed_now),
        deps: DependencyService::new(SqliteTaskRepository::try_new(conn).unwrap()),
    }
}

fn create(fx: &Fixture<'_>, title: &str) -> Task {
    fx.tasks.create_task(NewTask::titled(title)).unwrap()
}

#[test]
fn add_dependency_persists_edge_and_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let fx = fixture(&conn);
    let design = create(&fx, "design");
    let build = create(&fx, "build");

    fx.deps.add_dependency(build.id, design.id).unwrap();
    fx.deps.add_dependency(build.id, design.id).unwrap();

    let stored = fx.tasks.get_task(build.id).unwrap().unwrap();
    assert_eq!(stored.dependencies, vec![design.id]);
    assert_eq!(fx.deps.graph().unwrap().edge_count(), 1);
}

#[test]
fn self_and_unknown_dependencies_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let fx = fixture(&conn);
    let task = create(&fx, "solo");
    let ghost = Uuid::new_v4();

    assert!(matches!(
        fx.deps.add_dependency(task.id, task.id),
        Err(DependencyError::SelfDependency(id)) if id == task.id
    ));
    assert!(matches!(
        fx.deps.add_dependency(task.id, ghost),
        Err(DependencyError::PrerequisiteNotFound(id)) if id == ghost
    ));
    assert!(matches!(
        fx.deps.add_dependency(ghost, task.id),
        Err(DependencyError::TaskNotFound(id)) if id == ghost
    ));
}

#[test]
fn closing_a_cycle_is_rejected_with_its_path() {
    let conn = open_db_in_memory().unwrap();
    let fx = fixture(&conn);
    let a = create(&fx, "a");
    let b = create(&fx, "b");
    let c = create(&fx, "c");
    fx.deps.add_dependency(a.id, b.id).unwrap();
    fx.deps.add_dependency(b.id, c.id).unwrap();

    match fx.deps.add_dependency(c.id, a.id).unwrap_err() {
        DependencyError::CycleDetected { path } => {
            assert_eq!(path, vec![c.id, a.id, b.id, c.id]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(fx
        .tasks
        .get_task(c.id)
        .unwrap()
        .unwrap()
        .dependencies
        .is_empty());
    assert!(fx.deps.graph().unwrap().find_cycle().is_none());
}

#[test]
fn set_dependencies_replaces_edges_as_a_unit() {
    let conn = open_db_in_memory().unwrap();
    let fx = fixture(&conn);
    let a = create(&fx, "a");
    let b = create(&fx, "b");
    let c = create(&fx, "c");
    fx.deps.add_dependency(a.id, b.id).unwrap();

    let stored = fx.deps.set_dependencies(a.id, vec![c.id, c.id]).unwrap();
    assert_eq!(stored, vec![c.id]);
    assert_eq!(
        fx.tasks.get_task(a.id).unwrap().unwrap().dependencies,
        vec![c.id]
    );

    // b no longer waits on anything, so b -> a is legal; then c -> b closes a loop.
    fx.deps.set_dependencies(b.id, vec![a.id]).unwrap();
    assert!(matches!(
        fx.deps.set_dependencies(c.id, vec![b.id]),
        Err(DependencyError::CycleDetected { .. })
    ));
    assert!(fx
        .tasks
        .get_task(c.id)
        .unwrap()
        .unwrap()
        .dependencies
        .is_empty());
}

#[test]
fn remove_dependency_unblocks_and_ignores_missing_edge() {
    let conn = open_db_in_memory().unwrap();
    let fx = fixture(&conn);
    let a = create(&fx, "a");
    let b = create(&fx, "b");
    fx.deps.add_dependency(a.id, b.id).unwrap();
    assert_eq!(fx.deps.blocking_prerequisites(a.id).unwrap(), vec![b.id]);

    fx.deps.remove_dependency(a.id, b.id).unwrap();
    fx.deps.remove_dependency(a.id, b.id).unwrap();
    assert!(fx.deps.blocking_prerequisites(a.id).unwrap().is_empty());
}

#[test]
fn readiness_splits_open_tasks() {
    let conn = open_db_in_memory().unwrap();
    let fx = fixture(&conn);
    let shop = create(&fx, "shop");
    let cook = create(&fx, "cook");
    let eat = create(&fx, "eat");
    let wash = create(&fx, "wash");
    fx.deps.add_dependency(cook.id, shop.id).unwrap();
    fx.deps.add_dependency(eat.id, cook.id).unwrap();
    fx.tasks.set_status(wash.id, TaskStatus::Cancelled).unwrap();

    let all = fx.tasks.list_tasks(&TaskListQuery::default()).unwrap();
    let readiness = fx.deps.readiness(&all).unwrap();
    assert_eq!(readiness.ready, vec![shop.id]);
    assert!(readiness.is_blocked(cook.id));
    assert!(readiness.is_blocked(eat.id));
    assert!(!readiness.is_blocked(wash.id));

    fx.tasks.complete_task(shop.id).unwrap();
    let all = fx.tasks.list_tasks(&TaskListQuery::default()).unwrap();
    let readiness = fx.deps.readiness(&all).unwrap();
    assert_eq!(readiness.ready, vec![cook.id]);
    assert_eq!(readiness.blocked.len(), 1);
    assert_eq!(readiness.blocked[0].task_id, eat.id);
    assert_eq!(readiness.blocked[0].waiting_on, vec![cook.id]);
}

#[test]
fn topological_order_puts_prerequisites_first() {
    let conn = open_db_in_memory().unwrap();
    let fx = fixture(&conn);
    let a = create(&fx, "a");
    let b = create(&fx, "b");
    let c = create(&fx, "c");
    fx.deps.add_dependency(a.id, b.id).unwrap();
    fx.deps.add_dependency(b.id, c.id).unwrap();

    let order = fx.deps.graph().unwrap().topological_order().unwrap();
    let position = |id: Uuid| order.iter().position(|entry| *entry == id).unwrap();
    assert!(position(c.id) < position(b.id));
    assert!(position(b.id) < position(a.id));
}
