//! End-to-end walk of a task from assignment through a rejected and then
//! accepted acceptance run, with a git worktree prepared along the way.
//! Exercises `actl-routing`, `actl-tasks`, `actl-workspace`, and
//! `actl-acceptance` together the way a real review cycle would.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use actl_core::{CapabilityRecord, TaskStatus, WorkspaceContext, WorkspaceStatus};
use actl_events::EventBus;
use actl_routing::{rank_accounts, Candidate, RankOptions, ScoringInput};
use actl_store::{CapabilityStore, WorkspaceStore};
use actl_tasks::{add_task, submit_for_review, AddTaskOptions};
use actl_workspace::{GitExecutor, PrepareWorktreeRequest, WorkspaceManager};

struct FakeGit;

impl GitExecutor for FakeGit {
    fn worktree_add(&self, _repo_path: &str, _worktree_path: &str, _branch: &str) -> Result<String, String> {
        Ok("done".to_string())
    }
    fn worktree_remove(&self, _repo_path: &str, _worktree_path: &str) -> Result<String, String> {
        Ok(String::new())
    }
}

fn candidate(account: &str, skills: &[&str], total: u32, accepted: u32) -> Candidate {
    let mut record = CapabilityRecord::new(account);
    record.skills = skills.iter().map(|s| s.to_string()).collect();
    record.total = total;
    record.accepted = accepted;
    Candidate {
        account: account.to_string(),
        input: ScoringInput {
            skills: record.skills,
            provider_type: record.provider_type,
            total: record.total,
            accepted: record.accepted,
            avg_delivery_ms: record.avg_delivery_ms,
            trust_score: None,
            minutes_since_active: Some(1.0),
            wip: 0,
            open: 0,
            recent_throughput: 0,
        },
    }
}

#[tokio::test]
async fn task_lifecycle_with_workspace() {
    let capabilities = CapabilityStore::open(":memory:").unwrap();
    let alice = candidate("alice", &["typescript", "testing"], 10, 1);
    let bob = candidate("bob", &["typescript", "devops"], 3, 2);
    capabilities
        .upsert(&CapabilityRecord {
            account: "alice".to_string(),
            skills: alice.input.skills.clone(),
            total: alice.input.total,
            accepted: alice.input.accepted,
            avg_delivery_ms: 0.0,
            last_active_at: chrono::Utc::now().to_rfc3339(),
            provider_type: None,
            trust_score: None,
        })
        .unwrap();
    capabilities
        .upsert(&CapabilityRecord {
            account: "bob".to_string(),
            skills: bob.input.skills.clone(),
            total: bob.input.total,
            accepted: bob.input.accepted,
            avg_delivery_ms: 0.0,
            last_active_at: chrono::Utc::now().to_rfc3339(),
            provider_type: None,
            trust_score: None,
        })
        .unwrap();

    let required_skills: Vec<String> = vec!["typescript".to_string(), "testing".to_string()];
    let ranked = rank_accounts(&[alice, bob], &required_skills, &RankOptions::default());
    assert_eq!(ranked[0].account, "alice");

    let mut tags = BTreeSet::new();
    tags.insert("backend".to_string());
    let board = add_task(
        &actl_tasks::TaskBoard::new(),
        "ship the widget",
        Some("bob".to_string()),
        AddTaskOptions {
            tags,
            ..Default::default()
        },
    );
    let task_id = board.tasks()[0].id.clone();
    let board = actl_tasks::update_task_status(&board, &task_id, TaskStatus::InProgress).unwrap();

    let workspace_store = WorkspaceStore::open(":memory:").unwrap();
    let bus = Arc::new(EventBus::new());
    let manager = WorkspaceManager::new(workspace_store, Arc::clone(&bus), Box::new(FakeGit));

    let req = PrepareWorktreeRequest {
        owner: "bob".to_string(),
        repo_path: "/tmp/r".to_string(),
        branch: "feature/x".to_string(),
        handoff_id: None,
    };
    let ws = manager.prepare_worktree(req.clone()).unwrap();
    assert_eq!(ws.status, WorkspaceStatus::Ready);
    assert_eq!(ws.worktree_path, "/tmp/r/.worktrees/feature-x");

    let ws_again = manager.prepare_worktree(req).unwrap();
    assert_eq!(ws_again.id, ws.id);

    let ctx = WorkspaceContext {
        workspace_id: ws.id.clone(),
        repo_path: ws.repo_path.clone(),
        branch: ws.branch.clone(),
    };
    let board = submit_for_review(&board, &task_id, Some(ctx.clone())).unwrap();

    // FakeGit never actually creates the worktree directory, so acceptance
    // commands run in a real scratch directory rather than `ws.repo_path`.
    let scratch = tempfile::tempdir().unwrap();
    let scratch_dir = scratch.path().to_str().unwrap();

    let failing = actl_acceptance::run_suite(
        &["echo ok".to_string(), "exit 1".to_string()],
        scratch_dir,
        Duration::from_secs(5),
    )
    .await
    .unwrap();
    assert!(!failing.passed);
    let board = actl_tasks::reject_task(&board, &task_id, "exit 1 failed").unwrap();
    assert_eq!(board.find(&task_id).unwrap().status, TaskStatus::InProgress);

    let board = submit_for_review(&board, &task_id, Some(ctx)).unwrap();
    let passing = actl_acceptance::run_suite(
        &["echo ok".to_string(), "echo done".to_string()],
        scratch_dir,
        Duration::from_secs(5),
    )
    .await
    .unwrap();
    assert!(passing.passed);
    let board = actl_tasks::accept_task(&board, &task_id, None).unwrap();
    let task = board.find(&task_id).unwrap();
    assert_eq!(task.status, TaskStatus::Accepted);
    assert!(matches!(
        task.events.last().unwrap(),
        actl_core::TaskEvent::CleanupQueued { .. }
    ));

    manager.cleanup_workspace(&ws.id).unwrap();
    assert!(manager.get_workspace(&ws.id).unwrap().is_none());
}
