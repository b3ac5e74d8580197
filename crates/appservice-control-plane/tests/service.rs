mod common;

use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use appservice_control_plane::ServiceError;
use appservice_core::{
    AppId, CallerContext, ExecutionStatus, StartParams, TaskId, TaskParams, TaskState,
};

use common::{service, BROKEN_APP, GATED_APP};

fn params(value: serde_json::Value) -> TaskParams {
    value.as_object().cloned().unwrap()
}

fn alice() -> CallerContext {
    CallerContext::user("alice").with_token("secret")
}

#[tokio::test]
async fn start_app_returns_running_task() {
    let (service, executor) = service();

    let task = service
        .start_app(&alice(), &AppId::from("app1"), TaskParams::new(), "ws1")
        .await
        .unwrap();

    assert!(!task.id.as_str().is_empty());
    assert_eq!(task.state, TaskState::Running);
    assert_eq!(task.owner.as_deref(), Some("alice"));
    assert_eq!(task.start_params.workspace.as_deref(), Some("ws1"));
    assert!(task.handle.is_some());

    let details = service.query_task_details(&alice(), &task.id).await.unwrap();
    assert_eq!(details.task.state, TaskState::Running);
    assert_eq!(details.progress, Some(ExecutionStatus::Running));

    // The caller context reaches the executor untouched.
    let launches = executor.launches();
    assert_eq!(launches.len(), 1);
    assert_eq!(launches[0].caller.token.as_deref(), Some("secret"));
}

#[tokio::test]
async fn start_missing_app_creates_no_task() {
    let (service, executor) = service();

    let err = service
        .start_app(&alice(), &AppId::from("missing_app"), TaskParams::new(), "ws1")
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::AppNotFound(id) if id.as_str() == "missing_app"));
    assert!(service.enumerate_tasks(&alice(), 0, 10).await.is_empty());
    assert_eq!(service.query_task_summary(&alice()).await.total(), 0);
    assert!(executor.launches().is_empty());
}

#[tokio::test]
async fn invalid_params_are_rejected_before_task_creation() {
    let (service, _) = service();

    let err = service
        .start_app(
            &alice(),
            &AppId::from("Assembly"),
            params(json!({ "recipe": "fast" })),
            "ws1",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidParams(_)));
    assert!(service.enumerate_tasks(&alice(), 0, 10).await.is_empty());

    let task = service
        .start_app(
            &alice(),
            &AppId::from("Assembly"),
            params(json!({ "reads": "r1.fq" })),
            "ws1",
        )
        .await
        .unwrap();
    assert_eq!(task.parameters.get("recipe"), Some(&json!("auto")));
}

#[tokio::test]
async fn launch_failure_is_recorded_on_the_task() {
    let (service, _) = service();

    let task = service
        .start_app(&alice(), &AppId::from(BROKEN_APP), TaskParams::new(), "ws1")
        .await
        .unwrap();
    assert_eq!(task.state, TaskState::Failed);
    assert!(task.error.as_deref().unwrap().contains("no capacity"));
    assert!(task.handle.is_none());

    let details = service.query_task_details(&alice(), &task.id).await.unwrap();
    assert_eq!(details.task.state, TaskState::Failed);
    assert!(details.progress.is_none());
}

#[tokio::test]
async fn start_app2_keeps_start_params() {
    let (service, _) = service();

    let start_params = StartParams {
        workspace: Some("/alice/home".to_string()),
        parent_id: Some("parent-1".to_string()),
        container_id: Some("img-42".to_string()),
        disable_preflight: true,
        ..StartParams::default()
    };
    let task = service
        .start_app2(
            &alice(),
            &AppId::from("app1"),
            TaskParams::new(),
            start_params.clone(),
        )
        .await
        .unwrap();

    assert_eq!(task.state, TaskState::Running);
    assert_eq!(task.start_params, start_params);
}

#[tokio::test]
async fn queries_refresh_finished_tasks() {
    let (service, executor) = service();
    let caller = alice();

    let task = service
        .start_app(&caller, &AppId::from("app1"), TaskParams::new(), "ws1")
        .await
        .unwrap();
    executor.finish(task.handle.as_ref().unwrap(), 0);

    let tasks = service.query_tasks(&caller, &[task.id.clone()]).await;
    let refreshed = &tasks[&task.id];
    assert_eq!(refreshed.state, TaskState::Completed);
    assert_eq!(refreshed.result.as_ref().unwrap().exit_code, Some(0));
    assert!(refreshed.completed_at.is_some());

    let details = service.query_task_details(&caller, &task.id).await.unwrap();
    assert!(details.stdout_path.unwrap().ends_with("stdout.txt"));
}

#[tokio::test]
async fn query_tasks_omits_unknown_ids() {
    let (service, _) = service();
    let caller = alice();

    let task = service
        .start_app(&caller, &AppId::from("app1"), TaskParams::new(), "ws1")
        .await
        .unwrap();

    let found = service
        .query_tasks(&caller, &[task.id.clone(), TaskId::new("nope")])
        .await;
    assert_eq!(found.len(), 1);
    assert!(found.contains_key(&task.id));

    assert!(service.query_tasks(&caller, &[]).await.is_empty());
}

#[tokio::test]
async fn poll_failure_keeps_last_known_state() {
    let (service, executor) = service();
    let caller = alice();

    let task = service
        .start_app(&caller, &AppId::from("app1"), TaskParams::new(), "ws1")
        .await
        .unwrap();
    executor.finish(task.handle.as_ref().unwrap(), 1);
    executor.poll_unavailable.store(true, Ordering::SeqCst);

    let details = service.query_task_details(&caller, &task.id).await.unwrap();
    assert_eq!(details.task.state, TaskState::Running);
    assert!(details.progress.is_none());

    executor.poll_unavailable.store(false, Ordering::SeqCst);
    let details = service.query_task_details(&caller, &task.id).await.unwrap();
    assert_eq!(details.task.state, TaskState::Failed);
}

#[tokio::test]
async fn query_task_details_unknown_task() {
    let (service, _) = service();
    let err = service
        .query_task_details(&alice(), &TaskId::new("nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::TaskNotFound(_)));
}

#[tokio::test]
async fn kill_running_task() {
    let (service, executor) = service();
    let caller = alice();

    let task = service
        .start_app(&caller, &AppId::from("app1"), TaskParams::new(), "ws1")
        .await
        .unwrap();

    let outcome = service.kill_task(&caller, &task.id).await.unwrap();
    assert_eq!(outcome.killed, 1);
    assert_eq!(executor.killed(), vec![task.handle.unwrap().id]);

    let details = service.query_task_details(&caller, &task.id).await.unwrap();
    assert_eq!(details.task.state, TaskState::Killed);

    let again = service.kill_task(&caller, &task.id).await.unwrap();
    assert_eq!(again.killed, 0);
    assert_eq!(again.message, "task already killed");
}

#[tokio::test]
async fn kill_completed_task_is_idempotent() {
    let (service, executor) = service();
    let caller = alice();

    let task = service
        .start_app(&caller, &AppId::from("app1"), TaskParams::new(), "ws1")
        .await
        .unwrap();
    executor.finish(task.handle.as_ref().unwrap(), 0);
    let completed = service.query_task_details(&caller, &task.id).await.unwrap().task;
    assert_eq!(completed.state, TaskState::Completed);

    for _ in 0..3 {
        let outcome = service.kill_task(&caller, &task.id).await.unwrap();
        assert_eq!(outcome.killed, 0);
        assert_eq!(outcome.message, "task already finished");
    }

    let after = service.query_tasks(&caller, &[task.id.clone()]).await;
    assert_eq!(after[&task.id], completed);
    assert!(executor.killed().is_empty());
}

#[tokio::test]
async fn kill_notices_task_that_finished_unobserved() {
    let (service, executor) = service();
    let caller = alice();

    let task = service
        .start_app(&caller, &AppId::from("app1"), TaskParams::new(), "ws1")
        .await
        .unwrap();
    // Finished at the executor, but no query has observed it yet.
    executor.finish(task.handle.as_ref().unwrap(), 0);

    let outcome = service.kill_task(&caller, &task.id).await.unwrap();
    assert_eq!(outcome.killed, 0);
    assert_eq!(outcome.message, "task already finished");
}

#[tokio::test]
async fn kill_error_leaves_state_unchanged() {
    let (service, executor) = service();
    let caller = alice();

    let task = service
        .start_app(&caller, &AppId::from("app1"), TaskParams::new(), "ws1")
        .await
        .unwrap();
    executor.fail_kill.store(true, Ordering::SeqCst);

    let outcome = service.kill_task(&caller, &task.id).await.unwrap();
    assert_eq!(outcome.killed, 0);
    assert!(outcome.message.contains("executor refused"));

    let details = service.query_task_details(&caller, &task.id).await.unwrap();
    assert_eq!(details.task.state, TaskState::Running);
    assert!(!details.task.kill_requested);
}

#[tokio::test]
async fn refresh_during_kill_does_not_preempt_it() {
    let (service, executor) = service();
    let caller = alice();

    let task = service
        .start_app(&caller, &AppId::from("app1"), TaskParams::new(), "ws1")
        .await
        .unwrap();
    executor.hold_kill.store(true, Ordering::SeqCst);

    let killer = {
        let service = service.clone();
        let caller = caller.clone();
        let id = task.id.clone();
        tokio::spawn(async move { service.kill_task(&caller, &id).await })
    };
    executor.kill_parked().await;

    // The executor already reports the execution as failed.
    let summary = service.query_task_summary(&caller).await;
    assert_eq!(summary.count(TaskState::Failed), 0);
    assert_eq!(summary.count(TaskState::Running), 1);

    let details = service.query_task_details(&caller, &task.id).await.unwrap();
    assert_eq!(details.task.state, TaskState::Running);
    assert!(matches!(details.progress, Some(ExecutionStatus::Failed { .. })));

    executor.release_kill();
    let outcome = killer.await.unwrap().unwrap();
    assert_eq!(outcome.killed, 1);
    assert_eq!(outcome.message, "task killed");

    let after = service.query_task_details(&caller, &task.id).await.unwrap();
    assert_eq!(after.task.state, TaskState::Killed);
    assert!(!after.task.kill_requested);
    assert!(after.task.error.is_none());
}

#[tokio::test]
async fn kill_unknown_task() {
    let (service, _) = service();
    let err = service
        .kill_task(&alice(), &TaskId::new("nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::TaskNotFound(_)));
}

#[tokio::test]
async fn kill_during_launch_stops_the_execution() {
    let (service, executor) = service();
    let caller = alice();

    let starter = {
        let service = service.clone();
        let caller = caller.clone();
        tokio::spawn(async move {
            service
                .start_app(&caller, &AppId::from(GATED_APP), TaskParams::new(), "ws1")
                .await
        })
    };

    // Wait for the queued record to appear.
    let queued = loop {
        if let Some(task) = service.enumerate_tasks(&caller, 0, 1).await.pop() {
            break task;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    };
    assert_eq!(queued.state, TaskState::Queued);

    let outcome = service.kill_task(&caller, &queued.id).await.unwrap();
    assert_eq!(outcome.killed, 1);

    executor.release_launch();
    let task = starter.await.unwrap().unwrap();
    assert_eq!(task.state, TaskState::Killed);
    assert_eq!(executor.killed(), vec![task.handle.unwrap().id]);
}

#[tokio::test]
async fn rerun_creates_new_task_and_leaves_original() {
    let (service, executor) = service();
    let caller = alice();

    let original = service
        .start_app(
            &caller,
            &AppId::from("Assembly"),
            params(json!({ "reads": "r1.fq", "recipe": "fast" })),
            "ws1",
        )
        .await
        .unwrap();
    executor.finish(original.handle.as_ref().unwrap(), 1);
    let before = service
        .query_task_details(&caller, &original.id)
        .await
        .unwrap()
        .task;
    assert_eq!(before.state, TaskState::Failed);

    let new_id = service.rerun_task(&caller, &original.id).await.unwrap();
    assert_ne!(new_id, original.id);

    let tasks = service
        .query_tasks(&caller, &[original.id.clone(), new_id.clone()])
        .await;
    assert_eq!(tasks[&original.id], before);

    let rerun = &tasks[&new_id];
    assert_eq!(rerun.state, TaskState::Running);
    assert_eq!(rerun.app, original.app);
    assert_eq!(rerun.parameters, original.parameters);
    assert_eq!(rerun.start_params, original.start_params);
    assert_eq!(rerun.rerun_of.as_ref(), Some(&original.id));
}

#[tokio::test]
async fn rerun_unknown_task() {
    let (service, _) = service();
    let err = service
        .rerun_task(&alice(), &TaskId::new("nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::TaskNotFound(_)));
}

#[tokio::test]
async fn pages_reconstruct_creation_order() {
    let (service, _) = service();
    let caller = alice();

    let mut created = Vec::new();
    for i in 0..25 {
        let task = service
            .start_app(&caller, &AppId::from("app1"), TaskParams::new(), format!("ws{i}"))
            .await
            .unwrap();
        created.push(task.id);
    }

    let mut listed = Vec::new();
    let mut offset = 0;
    loop {
        let page = service.enumerate_tasks(&caller, offset, 7).await;
        if page.is_empty() {
            break;
        }
        offset += page.len();
        listed.extend(page.into_iter().map(|t| t.id));
    }
    assert_eq!(listed, created);
    assert!(service.enumerate_tasks(&caller, 1000, 7).await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_starts_get_distinct_ids() {
    let (service, _) = service();

    let mut handles = Vec::new();
    for _ in 0..50 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .start_app(&alice(), &AppId::from("app1"), TaskParams::new(), "ws")
                .await
                .unwrap()
                .id
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap());
    }
    assert_eq!(ids.len(), 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn summary_matches_created_tasks_under_concurrency() {
    let (service, _) = service();
    let service = Arc::new(service);

    let mut workers = Vec::new();
    for i in 0..40 {
        let service = service.clone();
        workers.push(tokio::spawn(async move {
            let caller = alice();
            let app = if i % 5 == 0 { BROKEN_APP } else { "app1" };
            let task = service
                .start_app(&caller, &AppId::from(app), TaskParams::new(), "ws")
                .await
                .unwrap();
            if i % 2 == 0 {
                service.kill_task(&caller, &task.id).await.unwrap();
            }
        }));
    }

    let observer = {
        let service = service.clone();
        tokio::spawn(async move {
            let store = &service.state().store;
            for _ in 0..20 {
                let created_before = store.len().await as u64;
                let summary = service.query_task_summary(&alice()).await;
                let created_after = store.len().await as u64;
                assert!(
                    created_before <= summary.total() && summary.total() <= created_after,
                    "summary total {} outside [{created_before}, {created_after}]",
                    summary.total()
                );
                tokio::task::yield_now().await;
            }
        })
    };

    for worker in workers {
        worker.await.unwrap();
    }
    observer.await.unwrap();

    // 8 broken launches; the 16 other even-numbered tasks were killed.
    let summary = service.query_task_summary(&alice()).await;
    assert_eq!(summary.total(), 40);
    assert_eq!(summary.count(TaskState::Failed), 8);
    assert_eq!(summary.count(TaskState::Killed), 16);
    assert_eq!(summary.count(TaskState::Running), 16);
    assert_eq!(summary.count(TaskState::Queued), 0);
    assert_eq!(
        summary.total(),
        service.enumerate_tasks(&alice(), 0, 1000).await.len() as u64
    );
}

#[tokio::test]
async fn service_status_reports_service_and_executor() {
    let (service, _) = service();

    let status = service.service_status(&alice()).await;
    assert_eq!(status.len(), 2);
    assert_eq!(status[0].service, "AppService");
    assert!(status.iter().all(|s| s.up));
    assert!(status[0].message.contains("4 apps"));

    let apps = service.enumerate_apps(&alice()).await;
    assert_eq!(apps.len(), 4);
}
