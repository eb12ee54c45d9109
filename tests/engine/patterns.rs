//! Integration tests for variables, shapes, and patterns

use concord_engine::{Frame, Pattern, Shape, Term, Vars, actions, shape};
use concord_foundation::{ActionRef, FlowId, Record, Value, record};

use concord_engine::InvocationRecord;

fn invocation(action: &str, input: Record, output: Record) -> InvocationRecord {
    InvocationRecord {
        flow: FlowId::new(),
        seq: 0,
        action: ActionRef::parse(action).unwrap(),
        input,
        output,
    }
}

// =============================================================================
// Vars
// =============================================================================

#[test]
fn vars_are_scoped_per_arena() {
    let mut a = Vars::new();
    let mut b = Vars::new();
    let x_a = a.var("x");
    let y_a = a.var("y");
    let x_b = b.var("x");
    // Each arena names its own variables
    assert_eq!(a.lookup("x"), Some(x_a));
    assert_ne!(x_a, y_a);
    assert_eq!(b.name(x_b), "x");
    assert_eq!(a.len(), 2);
    assert_eq!(b.len(), 1);
}

#[test]
fn take_destructures() {
    let mut vars = Vars::new();
    let [user, role, count] = vars.take(["user", "role", "count"]);
    assert_eq!(vars.name(user), "user");
    assert_eq!(vars.name(role), "role");
    assert_eq!(vars.name(count), "count");
}

// =============================================================================
// Shapes
// =============================================================================

#[test]
fn shape_macro_mixes_literals_and_vars() {
    let mut vars = Vars::new();
    let count = vars.var("count");
    let s = shape! { "kind" => "increment_counter", "count" => count, "limit" => 10 };
    assert_eq!(s.fields().len(), 3);
    assert_eq!(s.fields()[0].1, Term::Literal(Value::from("increment_counter")));
    assert_eq!(s.fields()[1].1, Term::Var(count));
    assert_eq!(s.vars().collect::<Vec<_>>(), vec![count]);
}

#[test]
fn empty_shape_matches_anything() {
    let shape = shape! {};
    assert!(shape.is_empty());
    assert!(shape.unify(&record! { "a" => 1 }, &Frame::new()).is_some());
    assert!(shape.unify(&Record::new(), &Frame::new()).is_some());
}

#[test]
fn shape_checks_existing_binding() {
    let mut vars = Vars::new();
    let user = vars.var("user");
    let shape = shape! { "user" => user };
    let frame = Frame::new().with(user, Value::from("ann")).unwrap();

    assert!(shape.unify(&record! { "user" => "ann" }, &frame).is_some());
    assert!(shape.unify(&record! { "user" => "bob" }, &frame).is_none());
}

#[test]
fn literal_types_must_match() {
    let shape = shape! { "count" => 1 };
    assert!(shape.unify(&record! { "count" => 1 }, &Frame::new()).is_some());
    assert!(shape.unify(&record! { "count" => 1.0 }, &Frame::new()).is_none());
    assert!(shape.unify(&record! { "count" => "1" }, &Frame::new()).is_none());
}

// =============================================================================
// Patterns
// =============================================================================

#[test]
fn pattern_binds_input_and_output() {
    let mut vars = Vars::new();
    let [user, count] = vars.take(["user", "count"]);
    let pattern = Pattern::new(
        ActionRef::new("Counter", "increment"),
        shape! { "user" => user },
        shape! { "count" => count },
    );
    let record = invocation(
        "Counter.increment",
        record! { "user" => "ann" },
        record! { "count" => 3 },
    );
    let frame = pattern.unify(&record, &Frame::new()).unwrap();
    assert_eq!(frame.get(user), Some(&Value::from("ann")));
    assert_eq!(frame.get(count), Some(&Value::Int(3)));
    assert_eq!(frame.len(), 2);
}

#[test]
fn same_var_in_input_and_output_must_agree() {
    let mut vars = Vars::new();
    let x = vars.var("x");
    let pattern = Pattern::new(
        ActionRef::new("Echo", "echo"),
        shape! { "v" => x },
        shape! { "v" => x },
    );
    let same = invocation("Echo.echo", record! { "v" => 1 }, record! { "v" => 1 });
    let different = invocation("Echo.echo", record! { "v" => 1 }, record! { "v" => 2 });
    assert!(pattern.unify(&same, &Frame::new()).is_some());
    assert!(pattern.unify(&different, &Frame::new()).is_none());
}

#[test]
fn error_outputs_are_matchable() {
    let mut vars = Vars::new();
    let message = vars.var("message");
    let pattern = Pattern::new(
        ActionRef::new("User", "register"),
        Shape::new(),
        shape! { "error" => message },
    );
    let failed = invocation("User.register", Record::new(), Record::error("name taken"));
    let ok = invocation("User.register", Record::new(), record! { "user" => "u1" });
    let frame = pattern.unify(&failed, &Frame::new()).unwrap();
    assert_eq!(frame.get(message), Some(&Value::from("name taken")));
    assert!(pattern.unify(&ok, &Frame::new()).is_none());
}

#[test]
fn actions_normalizes_tuples() {
    let mut vars = Vars::new();
    let kind = vars.var("kind");
    let patterns = actions([
        (
            ActionRef::new("Button", "clicked"),
            shape! { "kind" => kind },
            Shape::new(),
        ),
        (ActionRef::new("Counter", "increment"), Shape::new(), Shape::new()),
    ]);
    assert_eq!(patterns.len(), 2);
    assert_eq!(patterns[0].vars().collect::<Vec<_>>(), vec![kind]);
    assert_eq!(patterns[1].action, ActionRef::new("Counter", "increment"));
}
