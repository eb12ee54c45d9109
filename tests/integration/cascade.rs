//! Integration tests for cascading evaluation
//!
//! Tests termination, the firing kill switch, and the re-firing policy.

use std::sync::Arc;

use concord::engine::{Shape, SyncDescription, SyncEngine, Vars, Where, actions, shape};
use concord::foundation::{ActionRef, ErrorKind, Record, SemanticLimit, Value, record};

use crate::support::{Counter, Recorder, click, counter_app, quiet_config, quiet_engine};

fn increment() -> ActionRef {
    ActionRef::new("Counter", "increment")
}

// =============================================================================
// Termination
// =============================================================================

#[tokio::test]
async fn self_retriggering_cascade_halts() {
    let engine = quiet_engine();
    let counter = engine
        .instrument_concept("Counter", Arc::new(Counter::default()))
        .unwrap();
    engine
        .register_sync("CountToFive", |vars: &mut Vars| {
            let count = vars.var("count");
            SyncDescription::new()
                .when(actions([(increment(), Shape::new(), shape! { "count" => count })]))
                .refine(Where::new().filter(move |f| {
                    f.get(count).and_then(Value::as_int).is_some_and(|n| n < 5)
                }))
                .then([(increment(), Shape::new())])
        })
        .unwrap();

    let cx = engine.begin_flow();
    let output = counter.call_in(&cx, "increment", Record::new()).await.unwrap();

    // The caller sees its own action's output, not the cascade's
    assert_eq!(output, record! { "count" => 1 });
    let log = cx.log().await;
    assert_eq!(log.len(), 5);
    assert_eq!(log.records[4].output, record! { "count" => 5 });
}

#[tokio::test]
async fn unbounded_cascade_hits_kill_switch() {
    let engine = SyncEngine::new(quiet_config().with_max_firings(50));
    let counter = engine
        .instrument_concept("Counter", Arc::new(Counter::default()))
        .unwrap();
    engine
        .register_sync("Forever", |_: &mut Vars| {
            SyncDescription::new()
                .when(actions([(increment(), Shape::new(), Shape::new())]))
                .then([(increment(), Shape::new())])
        })
        .unwrap();

    let cx = engine.begin_flow();
    let err = counter
        .call_in(&cx, "increment", Record::new())
        .await
        .unwrap_err();

    match &err.kind {
        ErrorKind::LimitExceeded(SemanticLimit::MaxFirings { limit, sync }) => {
            assert_eq!(*limit, 50);
            assert_eq!(sync.as_deref(), Some("Forever"));
        }
        other => panic!("expected LimitExceeded, got {other:?}"),
    }
    assert_eq!(err.context.as_ref().and_then(|c| c.sync.as_deref()), Some("Forever"));
    // Root plus fifty dispatches
    assert_eq!(cx.len().await, 51);
}

#[tokio::test]
async fn kill_switch_is_per_flow() {
    let engine = SyncEngine::new(quiet_config().with_max_firings(3));
    let counter = engine
        .instrument_concept("Counter", Arc::new(Counter::default()))
        .unwrap();
    let audit = Recorder::new(&["record"]);
    engine.instrument_concept("Audit", audit.clone()).unwrap();
    engine
        .register_sync("AuditIncrement", |_: &mut Vars| {
            SyncDescription::new()
                .when(actions([(increment(), Shape::new(), Shape::new())]))
                .then([(ActionRef::new("Audit", "record"), Shape::new())])
        })
        .unwrap();

    // One firing per flow, many flows: never near the limit
    for _ in 0..10 {
        counter.call("increment", Record::new()).await.unwrap();
    }
    assert_eq!(audit.count("record"), 10);
}

#[tokio::test]
async fn kill_switch_resets_for_each_call_on_shared_flow() {
    let app = counter_app(quiet_config().with_max_firings(3));
    let cx = app.engine.begin_flow();

    // Each click dispatches one increment: five calls, five firings in total
    for _ in 0..5 {
        app.button.call_in(&cx, "clicked", click()).await.unwrap();
    }

    let log = cx.log().await;
    assert_eq!(log.len(), 10);
    assert_eq!(log.of(&increment()).count(), 5);
}

// =============================================================================
// Re-firing
// =============================================================================

fn pair_sync(_: &mut Vars) -> SyncDescription {
    SyncDescription::new()
        .when(actions([
            (ActionRef::new("A", "x"), Shape::new(), Shape::new()),
            (ActionRef::new("B", "y"), Shape::new(), Shape::new()),
        ]))
        .then([(ActionRef::new("C", "z"), Shape::new())])
}

#[tokio::test]
async fn each_combination_fires_once() {
    let engine = quiet_engine();
    let a = engine.instrument_concept("A", Recorder::new(&["x"])).unwrap();
    let b = engine.instrument_concept("B", Recorder::new(&["y"])).unwrap();
    let c = Recorder::new(&["z"]);
    engine.instrument_concept("C", c.clone()).unwrap();
    engine
        .instrument_concept("D", Recorder::new(&["w"]))
        .unwrap();
    engine.register_sync("Pair", pair_sync).unwrap();

    let cx = engine.begin_flow();
    a.call_in(&cx, "x", Record::new()).await.unwrap();
    assert_eq!(c.count("z"), 0);

    b.call_in(&cx, "y", Record::new()).await.unwrap();
    assert_eq!(c.count("z"), 1);

    // Unrelated records never rediscover (x1, y1)
    engine
        .invoke_in(&cx, &ActionRef::new("D", "w"), Record::new())
        .await
        .unwrap();
    assert_eq!(c.count("z"), 1);

    // (x1, y2)
    b.call_in(&cx, "y", Record::new()).await.unwrap();
    assert_eq!(c.count("z"), 2);

    // (x2, y1) and (x2, y2)
    a.call_in(&cx, "x", Record::new()).await.unwrap();
    assert_eq!(c.count("z"), 4);
}

#[tokio::test]
async fn then_entries_dispatch_in_order_per_frame() {
    let engine = quiet_engine();
    let source = engine
        .instrument_concept("Source", Recorder::new(&["emit"]))
        .unwrap();
    let sink = Recorder::new(&["first", "second"]);
    engine.instrument_concept("Sink", sink.clone()).unwrap();
    engine
        .register_sync("Fan", |vars: &mut Vars| {
            let n = vars.var("n");
            SyncDescription::new()
                .when(actions([(
                    ActionRef::new("Source", "emit"),
                    Shape::new(),
                    Shape::new(),
                )]))
                .refine(Where::new().apply(move |frames| {
                    Ok(frames
                        .into_iter()
                        .flat_map(|frame| {
                            (1..=2).filter_map(move |i| frame.clone().with(n, Value::Int(i)))
                        })
                        .collect())
                }))
                .then([
                    (ActionRef::new("Sink", "first"), shape! { "n" => n }),
                    (ActionRef::new("Sink", "second"), shape! { "n" => n }),
                ])
        })
        .unwrap();

    source.call("emit", Record::new()).await.unwrap();

    let calls: Vec<(String, i64)> = sink
        .calls()
        .into_iter()
        .map(|(action, input)| (action, input.get("n").and_then(Value::as_int).unwrap()))
        .collect();
    assert_eq!(
        calls,
        vec![
            ("first".to_string(), 1),
            ("second".to_string(), 1),
            ("first".to_string(), 2),
            ("second".to_string(), 2),
        ]
    );
}

#[tokio::test]
async fn dispatched_records_trigger_further_syncs() {
    let engine = quiet_engine();
    let a = engine.instrument_concept("A", Recorder::new(&["x"])).unwrap();
    engine.instrument_concept("B", Recorder::new(&["y"])).unwrap();
    let c = Recorder::new(&["z"]);
    engine.instrument_concept("C", c.clone()).unwrap();
    engine
        .register_sync("XtoY", |vars: &mut Vars| {
            let v = vars.var("v");
            SyncDescription::new()
                .when(actions([(ActionRef::new("A", "x"), shape! { "v" => v }, Shape::new())]))
                .then([(ActionRef::new("B", "y"), shape! { "v" => v })])
        })
        .unwrap();
    engine
        .register_sync("YtoZ", |vars: &mut Vars| {
            let v = vars.var("v");
            SyncDescription::new()
                .when(actions([(ActionRef::new("B", "y"), Shape::new(), shape! { "v" => v })]))
                .then([(ActionRef::new("C", "z"), shape! { "v" => v, "via" => "y" })])
        })
        .unwrap();

    a.call("x", record! { "v" => 7 }).await.unwrap();
    assert_eq!(c.calls(), vec![("z".to_string(), record! { "v" => 7, "via" => "y" })]);
}
