//! End-to-end runs of compiled expression trees.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use pretty_assertions::assert_eq;
use tess_eval::{BinaryOp, Binding, EvalErrorKind, Expr, Machine, Name, Value};

fn num(n: f64) -> Expr {
    Expr::Number(n)
}

fn var(name: &str) -> Expr {
    Expr::var(name)
}

fn bin(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::binary(op, lhs, rhs)
}

fn call(callee: &str, args: Vec<Expr>) -> Expr {
    Expr::call(var(callee), args)
}

fn run(machine: &mut Machine, expr: &Expr) -> Value {
    machine.run(&expr.to_program()).unwrap()
}

fn show(machine: &Machine, value: &Value) -> String {
    value.display(machine.heap())
}

fn fib() -> Expr {
    Expr::lambda(
        "fib",
        &["n"],
        Expr::if_else(
            bin(BinaryOp::Lt, var("n"), num(2.0)),
            var("n"),
            bin(
                BinaryOp::Add,
                call("fib", vec![bin(BinaryOp::Sub, var("n"), num(1.0))]),
                call("fib", vec![bin(BinaryOp::Sub, var("n"), num(2.0))]),
            ),
        ),
    )
}

// Closures and recursion

#[test]
fn self_recursion_with_memoization() {
    let mut machine = Machine::new();
    let expr = Expr::let_in(
        vec![Binding::bind("fib", fib())],
        call("fib", vec![num(20.0)]),
    );
    assert_eq!(run(&mut machine, &expr), Value::from(6765.0));
    assert_eq!(machine.contexts().memo().misses(), 21);
    assert_eq!(machine.contexts().memo().hits(), 18);
}

#[test]
fn memoization_does_not_change_results() {
    let expr = Expr::let_in(
        vec![Binding::bind("fib", fib())],
        call("fib", vec![num(12.0)]),
    );
    let mut memoized = Machine::new();
    let mut plain = Machine::builder().memoize(false).build();
    assert_eq!(run(&mut memoized, &expr), run(&mut plain, &expr));
    assert!(plain.steps() > memoized.steps());
}

fn point(x: f64, y: f64) -> Expr {
    Expr::Cluster(vec![num(x), num(y)])
}

/// Calls on vertices and tiles that agree in position but differ in what
/// their fields report.
fn calls_on_lookalike_objects() -> Expr {
    let square = Expr::primitive("regular", vec![num(4.0)]);
    // Vertex 0 sits where the square's vertex 2 does.
    let triangle = Expr::primitive(
        "polygon",
        vec![Expr::Cluster(vec![
            point(1.0, 1.0),
            point(2.0, 1.0),
            point(1.0, 2.0),
        ])],
    );
    let vertex = |tile: &str, i: &str| Expr::field(Expr::field(var(tile), "vertices"), i);
    Expr::let_in(
        vec![
            Binding::bind("a", square),
            Binding::bind("b", triangle),
            Binding::bind(
                "p",
                Expr::primitive("patch", vec![Expr::Cluster(vec![var("b")])]),
            ),
            Binding::bind(
                "index_of",
                Expr::lambda("index_of", &["v"], Expr::field(var("v"), "index")),
            ),
            Binding::bind(
                "unplaced",
                Expr::lambda(
                    "unplaced",
                    &["t"],
                    bin(BinaryOp::Eq, Expr::field(var("t"), "patch"), Expr::Nil),
                ),
            ),
        ],
        Expr::Cluster(vec![
            call("index_of", vec![vertex("a", "2")]),
            call("index_of", vec![vertex("b", "0")]),
            call("unplaced", vec![var("b")]),
            call("unplaced", vec![Expr::field(Expr::field(var("p"), "tiles"), "0")]),
        ]),
    )
}

#[test]
fn memo_distinguishes_objects_with_equal_geometry() {
    let expr = calls_on_lookalike_objects();
    let mut memoized = Machine::new();
    let mut plain = Machine::builder().memoize(false).build();

    let expected = "[2, 0, true, false]";
    let result = run(&mut plain, &expr);
    assert_eq!(show(&plain, &result), expected);
    let result = run(&mut memoized, &expr);
    assert_eq!(show(&memoized, &result), expected);
    assert_eq!(memoized.contexts().memo().hits(), 0);
}

#[test]
fn mutual_recursion() {
    let is_zero = |n: &str| bin(BinaryOp::Eq, var(n), num(0.0));
    let pred = |n: &str| bin(BinaryOp::Sub, var(n), num(1.0));
    let expr = Expr::let_in(
        vec![
            Binding::bind(
                "even",
                Expr::lambda(
                    "even",
                    &["n"],
                    Expr::if_else(is_zero("n"), true.into(), call("odd", vec![pred("n")])),
                ),
            ),
            Binding::bind(
                "odd",
                Expr::lambda(
                    "odd",
                    &["n"],
                    Expr::if_else(is_zero("n"), false.into(), call("even", vec![pred("n")])),
                ),
            ),
        ],
        Expr::Cluster(vec![
            call("even", vec![num(10.0)]),
            call("odd", vec![num(7.0)]),
            call("even", vec![num(3.0)]),
        ]),
    );
    let mut machine = Machine::new();
    let result = run(&mut machine, &expr);
    assert_eq!(show(&machine, &result), "[true, true, false]");
}

#[test]
fn zero_parameter_lambdas_evaluate_on_reference() {
    let expr = Expr::let_in(
        vec![
            Binding::bind("k", num(5.0)),
            Binding::bind(
                "double_k",
                Expr::lambda("double_k", &[], bin(BinaryOp::Mul, var("k"), num(2.0))),
            ),
        ],
        bin(BinaryOp::Add, var("double_k"), call("double_k", Vec::new())),
    );
    let mut machine = Machine::new();
    assert_eq!(run(&mut machine, &expr), Value::from(20.0));
}

#[test]
fn closures_capture_at_creation() {
    let expr = Expr::let_in(
        vec![
            Binding::bind("x", num(1.0)),
            Binding::bind("f", Expr::lambda("f", &[], var("x"))),
            Binding::bind("x", num(2.0)),
        ],
        Expr::Cluster(vec![var("f"), var("x")]),
    );
    let mut machine = Machine::new();
    let result = run(&mut machine, &expr);
    assert_eq!(show(&machine, &result), "[1, 2]");
}

#[test]
fn higher_order_calls() {
    let expr = Expr::let_in(
        vec![
            Binding::bind(
                "twice",
                Expr::lambda(
                    "twice",
                    &["g", "v"],
                    Expr::call(var("g"), vec![Expr::call(var("g"), vec![var("v")])]),
                ),
            ),
            Binding::bind(
                "inc",
                Expr::lambda("inc", &["n"], bin(BinaryOp::Add, var("n"), num(1.0))),
            ),
        ],
        call("twice", vec![var("inc"), num(5.0)]),
    );
    let mut machine = Machine::new();
    assert_eq!(run(&mut machine, &expr), Value::from(7.0));
}

#[test]
fn positional_parameters() {
    let expr = Expr::let_in(
        vec![Binding::bind(
            "diff",
            Expr::lambda("diff", &["a", "b"], bin(BinaryOp::Sub, var("$1"), var("$2"))),
        )],
        call("diff", vec![num(9.0), num(4.0)]),
    );
    let mut machine = Machine::new();
    assert_eq!(run(&mut machine, &expr), Value::from(5.0));
}

// Objects

#[test]
fn field_writes_rebind_a_copy() {
    let bindings = || {
        vec![
            Binding::bind("t", Expr::primitive("regular", vec![num(4.0)])),
            Binding::bind("u", var("t")),
            Binding::set_field("t", "color", Expr::string("red")),
        ]
    };
    let mut machine = Machine::new();

    let written = Expr::let_in(
        bindings(),
        Expr::Cluster(vec![
            Expr::field(var("t"), "color"),
            Expr::field(var("t"), "sides"),
        ]),
    );
    let result = run(&mut machine, &written);
    assert_eq!(show(&machine, &result), "[red, 4]");

    let alias = Expr::let_in(bindings(), Expr::field(var("u"), "color"));
    let err = machine.run(&alias.to_program()).unwrap_err();
    assert_eq!(
        err.kind,
        EvalErrorKind::UndefinedField {
            field: Name::new("color"),
            type_name: "tile"
        }
    );
}

#[test]
fn destructuring_field_writes() {
    let expr = Expr::let_in(
        vec![
            Binding::bind("t", Expr::primitive("regular", vec![num(3.0)])),
            Binding::SetField {
                targets: vec![
                    (Name::new("t"), Name::new("w")),
                    (Name::new("t"), Name::new("h")),
                ],
                value: Expr::Cluster(vec![num(2.0), num(3.0)]),
            },
        ],
        bin(
            BinaryOp::Mul,
            Expr::field(var("t"), "w"),
            Expr::field(var("t"), "h"),
        ),
    );
    let mut machine = Machine::new();
    assert_eq!(run(&mut machine, &expr), Value::from(6.0));
}

#[test]
fn patches_share_vertex_locations() {
    let expr = Expr::let_in(
        vec![Binding::bind(
            "p",
            Expr::primitive(
                "patch",
                vec![Expr::Cluster(vec![
                    Expr::primitive("regular", vec![num(4.0)]),
                    Expr::primitive("regular", vec![num(3.0)]),
                ])],
            ),
        )],
        Expr::Cluster(vec![
            Expr::field(Expr::field(var("p"), "tiles"), "size"),
            Expr::field(Expr::field(var("p"), "locations"), "size"),
        ]),
    );
    let mut machine = Machine::new();
    let result = run(&mut machine, &expr);
    assert_eq!(show(&machine, &result), "[2, 5]");
}

#[test]
fn comprehension_over_tile_vertices() {
    let expr = Expr::let_in(
        vec![Binding::bind("t", Expr::primitive("regular", vec![num(4.0)]))],
        Expr::comprehension(
            "v",
            Expr::field(var("t"), "vertices"),
            Expr::field(var("v"), "index"),
        ),
    );
    let mut machine = Machine::new();
    let result = run(&mut machine, &expr);
    assert_eq!(show(&machine, &result), "[0, 1, 2, 3]");
}

// Errors

#[test]
fn errors_report_line_and_backtrace() {
    let expr = Expr::let_in(
        vec![Binding::bind(
            "f",
            Expr::lambda(
                "f",
                &["n"],
                bin(BinaryOp::Div, var("n"), num(0.0)).at_line(12),
            ),
        )],
        call("f", vec![num(1.0)]),
    );
    let mut machine = Machine::new();
    let err = machine.run(&expr.to_program()).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::DivisionByZero);
    assert_eq!(err.to_string(), "line 12: division by zero (in f)");
}

#[test]
fn unreached_compile_errors_are_harmless() {
    let expr = Expr::if_else(
        true.into(),
        num(1.0),
        Expr::primitive("no_such_primitive", Vec::new()),
    );
    let mut machine = Machine::new();
    assert_eq!(run(&mut machine, &expr), Value::from(1.0));

    let reached = Expr::if_else(
        false.into(),
        num(1.0),
        Expr::primitive("no_such_primitive", Vec::new()),
    );
    let err = machine.run(&reached.to_program()).unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::UnknownPrimitive { .. }));
}

#[test]
fn machine_recovers_after_a_failed_run() {
    let mut machine = Machine::new();
    let failing = Expr::let_in(
        vec![Binding::bind("x", num(1.0))],
        Expr::field(var("x"), "nope"),
    );
    assert!(machine.run(&failing.to_program()).is_err());
    assert_eq!(machine.contexts().depth(), 1);

    let fine = bin(BinaryOp::Pow, num(2.0), num(3.0));
    assert_eq!(run(&mut machine, &fine), Value::from(8.0));
}
