//! Integration tests for flow scoping
//!
//! Tests flow isolation, per-flow ordering, concurrency, and retention.

use std::sync::Arc;

use concord::engine::{FlowContext, Shape, SyncDescription, Vars, actions, shape};
use concord::foundation::{ActionRef, Record, Value, record};

use crate::support::{Recorder, click, counter_app, quiet_config, quiet_engine};

fn audit_on_login_and_view(vars: &mut Vars) -> SyncDescription {
    let user = vars.var("user");
    SyncDescription::new()
        .when(actions([
            (
                ActionRef::new("Session", "login"),
                shape! { "user" => user },
                Shape::new(),
            ),
            (
                ActionRef::new("Page", "view"),
                shape! { "user" => user },
                Shape::new(),
            ),
        ]))
        .then([(ActionRef::new("Audit", "record"), shape! { "user" => user })])
}

struct AuditApp {
    engine: concord::engine::SyncEngine,
    audit: Arc<Recorder>,
}

fn audit_app() -> AuditApp {
    let engine = quiet_engine();
    let audit = Recorder::new(&["record"]);
    engine
        .instrument_concept("Session", Recorder::new(&["login"]))
        .unwrap();
    engine
        .instrument_concept("Page", Recorder::new(&["view"]))
        .unwrap();
    engine.instrument_concept("Audit", audit.clone()).unwrap();
    engine
        .register_sync("AuditLoginThenView", audit_on_login_and_view)
        .unwrap();
    AuditApp { engine, audit }
}

// =============================================================================
// Isolation
// =============================================================================

#[tokio::test]
async fn records_of_one_flow_never_match_another() {
    let app = audit_app();
    let login = ActionRef::new("Session", "login");
    let view = ActionRef::new("Page", "view");

    let (a, b) = tokio::join!(
        app.engine.invoke(&login, record! { "user" => "ann" }),
        app.engine.invoke(&view, record! { "user" => "ann" }),
    );
    a.unwrap();
    b.unwrap();
    assert_eq!(app.audit.count("record"), 0);
}

#[tokio::test]
async fn same_flow_joins_across_calls() {
    let app = audit_app();
    let cx = app.engine.begin_flow();
    app.engine
        .invoke_in(&cx, &ActionRef::new("Session", "login"), record! { "user" => "ann" })
        .await
        .unwrap();
    app.engine
        .invoke_in(&cx, &ActionRef::new("Page", "view"), record! { "user" => "ann" })
        .await
        .unwrap();

    let calls = app.audit.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, record! { "user" => "ann" });
    assert_eq!(cx.len().await, 3);
}

#[tokio::test]
async fn shared_variable_mismatch_does_not_fire() {
    let app = audit_app();
    let cx = FlowContext::new();
    app.engine
        .invoke_in(&cx, &ActionRef::new("Session", "login"), record! { "user" => "ann" })
        .await
        .unwrap();
    app.engine
        .invoke_in(&cx, &ActionRef::new("Page", "view"), record! { "user" => "bob" })
        .await
        .unwrap();
    assert_eq!(app.audit.count("record"), 0);
}

// =============================================================================
// Ordering
// =============================================================================

#[tokio::test]
async fn log_is_append_ordered_with_root_first() {
    let app = counter_app(quiet_config());
    let cx = app.engine.begin_flow();
    app.button.call_in(&cx, "clicked", click()).await.unwrap();

    let log = cx.log().await;
    assert_eq!(log.id, cx.id());
    let actions: Vec<String> = log.records.iter().map(|r| r.action.to_string()).collect();
    assert_eq!(actions, vec!["Button.clicked", "Counter.increment"]);
    for (i, record) in log.records.iter().enumerate() {
        assert_eq!(record.seq, i as u64);
        assert_eq!(record.flow, cx.id());
    }
}

#[tokio::test]
async fn cascade_settles_before_call_returns() {
    let app = counter_app(quiet_config());
    let cx = app.engine.begin_flow();
    for _ in 0..11 {
        app.button.call_in(&cx, "clicked", click()).await.unwrap();
    }
    // No waiting: the notification is already there
    assert_eq!(app.notification.messages(), vec!["Reached 10".to_string()]);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_flows_each_settle_independently() {
    let app = counter_app(quiet_config().with_retained_flows(64));
    let mut handles = Vec::new();
    for _ in 0..32 {
        let button = app.button.clone();
        handles.push(tokio::spawn(async move { button.call("clicked", click()).await }));
    }
    for handle in futures::future::join_all(handles).await {
        handle.unwrap().unwrap();
    }

    let flows = app.engine.settled_flows();
    assert_eq!(flows.len(), 32);
    for flow in &flows {
        assert_eq!(flow.len(), 2);
        assert!(flow.records.iter().all(|r| r.flow == flow.id));
    }
    let rows = app.counter.query("_getCount", Record::new()).await.unwrap();
    assert_eq!(rows[0].get("count"), Some(&Value::Int(32)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_calls_in_one_flow_are_serialized() {
    let app = counter_app(quiet_config());
    let cx = app.engine.begin_flow();
    let calls: Vec<_> = (0..11)
        .map(|_| {
            let button = app.button.clone();
            let cx = cx.clone();
            tokio::spawn(async move { button.call_in(&cx, "clicked", click()).await })
        })
        .collect();
    for result in futures::future::join_all(calls).await {
        result.unwrap().unwrap();
    }

    let log = cx.log().await;
    assert_eq!(log.len(), 23);
    assert_eq!(app.notification.messages().len(), 1);
}

// =============================================================================
// Retention
// =============================================================================

#[tokio::test]
async fn minted_flows_are_not_retained_by_default() {
    let app = counter_app(quiet_config());
    app.button.call("clicked", click()).await.unwrap();
    assert!(app.engine.settled_flows().is_empty());
}

#[tokio::test]
async fn retention_keeps_most_recent_flows() {
    let app = counter_app(quiet_config().with_retained_flows(2));
    let mut ids = Vec::new();
    for _ in 0..5 {
        app.button.call("clicked", click()).await.unwrap();
        ids.push(app.engine.settled_flows().last().unwrap().id);
    }
    let kept: Vec<_> = app.engine.settled_flows().iter().map(|f| f.id).collect();
    assert_eq!(kept, ids[3..].to_vec());
}

#[tokio::test]
async fn each_invoke_mints_a_new_flow() {
    let app = counter_app(quiet_config().with_retained_flows(10));
    for _ in 0..11 {
        app.button.call("clicked", click()).await.unwrap();
    }
    // The count passes ten, but every flow holds a single increment
    assert_eq!(app.notification.messages().len(), 1);
    let flows = app.engine.settled_flows();
    assert_eq!(flows.len(), 10);
    assert!(flows.iter().all(|f| f.len() == 2 || f.len() == 3));
}
