// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

use super::*;
use lx_core::test_support::dag_with_steps;
use lx_core::Step;
use lx_sock::SocketClient;
use tempfile::TempDir;

fn test_context(state: &TempDir) -> Context {
    let config = crate::config::Config {
        config_path: None,
        state_dir: state.path().to_path_buf(),
        dags_dir: state.path().join("dags"),
        default_shell: "sh".to_string(),
        retention_days: 30,
        coordinator: Default::default(),
        worker: Default::default(),
        scheduler: Default::default(),
        tls: Default::default(),
    };
    Context {
        config,
        quiet: true,
        run_store: Arc::new(lx_store::FileRunStore::new(state.path())),
        queue_store: Arc::new(lx_store::FileQueueStore::new(state.path())),
    }
}

fn agent_params(dag: Dag, run_id: &str) -> AgentParams {
    AgentParams {
        dag,
        run_id: DagRunId::from_string(run_id),
        params: String::new(),
        root: None,
        parent: None,
        step_filter: None,
        retry: false,
    }
}

#[tokio::test]
async fn successful_run_persists_succeeded_status() {
    let state = TempDir::new().unwrap();
    let ctx = test_context(&state);
    let mut dag = dag_with_steps("w1", &["a", "b"]);
    dag.steps[0].command = "echo one".to_string();
    dag.steps[1].command = "echo two".to_string();

    let status = run_dag(&ctx, agent_params(dag, "r1")).await.unwrap();
    assert_eq!(status, RunStatus::Succeeded);

    let attempt =
        ctx.run_store.find_attempt(&DagRunRef::new("w1", "r1")).await.unwrap();
    let saved = attempt.read_status().await.unwrap();
    assert_eq!(saved.status, RunStatus::Succeeded);
    assert!(saved.nodes.iter().all(|n| n.state == NodeState::Succeeded));
    assert!(saved.nodes.iter().all(|n| n.exit_code == Some(0)));
    assert!(saved.finished_at.is_some());

    // Socket file removed on clean shutdown.
    assert!(!socket_path(state.path(), "w1", "r1").exists());
}

#[tokio::test]
async fn failing_step_skips_downstream_and_fails_run() {
    let state = TempDir::new().unwrap();
    let ctx = test_context(&state);
    let mut dag = dag_with_steps("w1", &["a", "b", "c"]);
    dag.steps[1].command = "exit 7".to_string();

    let status = run_dag(&ctx, agent_params(dag, "r1")).await.unwrap();
    assert_eq!(status, RunStatus::Failed);

    let saved = ctx
        .run_store
        .find_attempt(&DagRunRef::new("w1", "r1"))
        .await
        .unwrap()
        .read_status()
        .await
        .unwrap();
    assert_eq!(saved.nodes[0].state, NodeState::Succeeded);
    assert_eq!(saved.nodes[1].state, NodeState::Failed);
    assert_eq!(saved.nodes[1].exit_code, Some(7));
    assert_eq!(saved.nodes[2].state, NodeState::Skipped);
}

#[tokio::test]
async fn step_output_lands_in_log_files() {
    let state = TempDir::new().unwrap();
    let ctx = test_context(&state);
    let mut dag = dag_with_steps("w1", &["say"]);
    dag.steps[0].command = "echo hello-stdout; echo hello-stderr >&2".to_string();

    run_dag(&ctx, agent_params(dag, "r1")).await.unwrap();

    let saved = ctx
        .run_store
        .find_attempt(&DagRunRef::new("w1", "r1"))
        .await
        .unwrap()
        .read_status()
        .await
        .unwrap();
    let stdout = saved.nodes[0].stdout.clone().unwrap();
    let stderr = saved.nodes[0].stderr.clone().unwrap();
    assert!(std::fs::read_to_string(stdout).unwrap().contains("hello-stdout"));
    assert!(std::fs::read_to_string(stderr).unwrap().contains("hello-stderr"));
}

#[tokio::test]
async fn stop_over_the_socket_cancels_the_run() {
    let state = TempDir::new().unwrap();
    let ctx = test_context(&state);
    let mut dag = dag_with_steps("w1", &["slow"]);
    dag.steps[0].command = "sleep 30".to_string();

    let socket = SocketClient::new(socket_path(state.path(), "w1", "r1"));
    let stopper = tokio::spawn(async move {
        // Wait for the run to claim its socket, then stop it.
        for _ in 0..200 {
            if socket.is_running().await {
                socket.stop().await.unwrap();
                return true;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        false
    });

    let started = std::time::Instant::now();
    let status = run_dag(&ctx, agent_params(dag, "r1")).await.unwrap();
    assert_eq!(status, RunStatus::Cancelled);
    assert!(started.elapsed() < std::time::Duration::from_secs(10));
    assert!(stopper.await.unwrap(), "stop was never delivered");

    let saved = ctx
        .run_store
        .find_attempt(&DagRunRef::new("w1", "r1"))
        .await
        .unwrap()
        .read_status()
        .await
        .unwrap();
    assert_eq!(saved.status, RunStatus::Cancelled);
    assert_eq!(saved.nodes[0].state, NodeState::Cancelled);
}

#[tokio::test]
async fn live_status_visible_through_socket_while_running() {
    let state = TempDir::new().unwrap();
    let ctx = test_context(&state);
    let mut dag = dag_with_steps("w1", &["slow"]);
    dag.steps[0].command = "sleep 2".to_string();

    let probe_path = socket_path(state.path(), "w1", "r1");
    let probe = tokio::spawn(async move {
        let client = SocketClient::new(probe_path);
        for _ in 0..200 {
            if let Ok(live) = client.status().await {
                return Some(live);
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        None
    });

    let run = run_dag(&ctx, agent_params(dag, "r1"));
    let (final_status, probed) = tokio::join!(run, probe);
    assert_eq!(final_status.unwrap(), RunStatus::Succeeded);

    let live = probed.unwrap().expect("socket never answered");
    assert_eq!(live.status, RunStatus::Running);
    assert_eq!(live.pid, Some(std::process::id() as i32));
}

#[tokio::test]
async fn step_filter_runs_single_node() {
    let state = TempDir::new().unwrap();
    let ctx = test_context(&state);
    let mut dag = dag_with_steps("w1", &["a", "b"]);
    dag.steps.push(Step {
        name: "only".to_string(),
        command: "echo only".to_string(),
        depends: vec![],
    });

    let mut params = agent_params(dag, "r1");
    params.step_filter = Some("only".to_string());
    run_dag(&ctx, params).await.unwrap();

    let saved = ctx
        .run_store
        .find_attempt(&DagRunRef::new("w1", "r1"))
        .await
        .unwrap()
        .read_status()
        .await
        .unwrap();
    let only = saved.nodes.iter().find(|n| n.name == "only").unwrap();
    assert_eq!(only.state, NodeState::Succeeded);
    assert!(saved
        .nodes
        .iter()
        .filter(|n| n.name != "only")
        .all(|n| n.state == NodeState::Pending));
}

#[tokio::test]
async fn child_run_records_lineage() {
    let state = TempDir::new().unwrap();
    let ctx = test_context(&state);
    let root = DagRunRef::new("parent", "p1");

    let mut dag = dag_with_steps("child", &["a"]);
    dag.steps[0].command = "true".to_string();
    let mut params = agent_params(dag, "c1");
    params.root = Some(root.clone());
    params.parent = Some(root.clone());
    run_dag(&ctx, params).await.unwrap();

    let attempt = ctx
        .run_store
        .find_child_attempt(&root, &DagRunId::from_string("c1"))
        .await
        .unwrap();
    let saved = attempt.read_status().await.unwrap();
    assert_eq!(saved.root, Some(root.clone()));
    assert_eq!(saved.parent, Some(root));
    assert_eq!(saved.status, RunStatus::Succeeded);
}
