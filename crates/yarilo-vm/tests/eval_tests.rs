//! Integration tests for evaluation: binding, cursor sequencing, infix
//! folding, stack-frame procedures and error reporting.

use yarilo_lexer::Lexer;
use yarilo_parser::Parser;
use yarilo_types::SourceFile;
use yarilo_vm::config::DEFAULT_MAX_CALL_DEPTH;
use yarilo_vm::{Code, Cursor, ErrorKind, EvalError, Value, Vm, VmConfig};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn booted() -> Vm {
    let vm = Vm::new();
    vm.boot().expect("boot script failed");
    vm
}

fn eval(source: &str) -> Value {
    booted()
        .eval(source)
        .unwrap_or_else(|e| panic!("eval of {source:?} failed: {e}"))
}

fn eval_err(source: &str) -> EvalError {
    match booted().eval(source) {
        Ok(v) => panic!("expected {source:?} to fail, got {v:?}"),
        Err(e) => e,
    }
}

fn num(n: f64) -> Value {
    Value::Number(n)
}

/// Lex, parse, lower and bind `source` against `vm` without running it.
fn bound_code(vm: &Vm, source: &str) -> Code {
    let sf = SourceFile::new("test.y", source);
    let lex = Lexer::new(&sf).lex();
    assert!(!lex.errors.has_errors(), "lex errors in {source:?}");
    let parsed = Parser::new(lex.tokens, &sf).parse();
    assert!(!parsed.errors.has_errors(), "parse errors in {source:?}");
    let code = Code::from_nodes(&parsed.nodes);
    vm.bind(&code);
    code
}

// ══════════════════════════════════════════════════════════════════════════════
// Arithmetic and sequencing
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_add_and_sub_constants() {
    for (a, b) in [(1.0, 2.0), (0.0, 0.0), (-4.5, 10.0), (1e6, 3.25)] {
        let vm = booted();
        assert_eq!(vm.eval(&format!("add {a} {b}")).unwrap(), num(a + b));
        assert_eq!(vm.eval(&format!("sub {a} {b}")).unwrap(), num(a - b));
    }
}

#[test]
fn test_sub_goes_negative() {
    assert_eq!(eval("sub 1 20"), num(-19.0));
}

#[test]
fn test_nested_prefix_calls() {
    assert_eq!(eval("add add 1 2 3"), num(6.0));
}

#[test]
fn test_set_words_then_use() {
    assert_eq!(eval("x: 7 y: 8 add x y"), num(15.0));
}

#[test]
fn test_either_picks_branch() {
    assert_eq!(eval("either gt 2 1 [5] [6]"), num(5.0));
    assert_eq!(eval("either gt 1 2 [5] [6]"), num(6.0));
}

#[test]
fn test_successive_next_calls() {
    let vm = booted();
    let code = bound_code(&vm, "gt 7 8 gt 8 7 eq 7 7 eq 7 8");
    let mut cursor = Cursor::new(vm, code);
    let results: Vec<Value> = (0..4).map(|_| cursor.next().unwrap()).collect();
    assert_eq!(
        results,
        vec![
            Value::Bool(false),
            Value::Bool(true),
            Value::Bool(true),
            Value::Bool(false)
        ]
    );
    assert!(cursor.at_end());
}

#[test]
fn test_const_is_idempotent() {
    let vm = booted();
    let code = bound_code(&vm, "42");
    let keys = vm.dictionary().keys();
    for _ in 0..3 {
        assert_eq!(vm.execute(&code).unwrap(), num(42.0));
    }
    assert_eq!(vm.dictionary().keys(), keys);
    assert_eq!(vm.stack_len(), 0);
}

#[test]
fn test_quote_word_is_its_symbol() {
    assert_eq!(eval("'fib"), Value::from("fib"));
}

#[test]
fn test_string_concatenation() {
    assert_eq!(eval(r#"add "fib=" 55"#), Value::from("fib=55"));
}

// ══════════════════════════════════════════════════════════════════════════════
// Infix
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_infix_has_no_precedence() {
    assert_eq!(eval("1 + 2 * 3"), num(9.0));
}

#[test]
fn test_parens_override_order() {
    assert_eq!(eval("1 + (2 * 3)"), num(7.0));
}

#[test]
fn test_infix_chains_left_to_right() {
    assert_eq!(eval("1 + 2 + 3"), num(6.0));
    assert_eq!(eval("10 - 2 - 3"), num(5.0));
}

#[test]
fn test_infix_inside_argument() {
    assert_eq!(eval("add 1 + 2 3"), num(6.0));
}

#[test]
fn test_infix_comparisons() {
    assert_eq!(eval("3 > 2"), Value::Bool(true));
    assert_eq!(eval("2 = 2"), Value::Bool(true));
    assert_eq!(eval(r#""a" = "b""#), Value::Bool(false));
}

// ══════════════════════════════════════════════════════════════════════════════
// Procedures
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_proc_with_parameter() {
    assert_eq!(eval("x: proc [n] [add n 10] x 5"), num(15.0));
}

#[test]
fn test_recursive_fib_prefix() {
    let vm = booted();
    let fib = vm
        .eval("fib: proc [n] [either gt n 1 [add fib sub n 1 fib sub n 2] [n]] fib 20")
        .unwrap();
    assert_eq!(fib, num(6765.0));
    assert_eq!(vm.stack_len(), 0);
}

#[test]
fn test_recursive_fib_infix() {
    assert_eq!(
        eval("fib: proc [n] [either n > 1 [(fib n - 1) + (fib n - 2)] [n]] fib 20"),
        num(6765.0)
    );
}

#[test]
fn test_local_shadows_outer() {
    let vm = booted();
    let result = vm.eval("x: 10 f: proc [/local x] [x: 5 x] f").unwrap();
    assert_eq!(result, num(5.0));
    assert_eq!(vm.get("x"), Some(num(10.0)));
}

#[test]
fn test_locals_start_empty() {
    assert_eq!(eval("f: proc [/local t] [t] f"), Value::None);
}

#[test]
fn test_parameter_assignment_stays_in_frame() {
    let vm = booted();
    assert_eq!(vm.eval("n: 1 f: proc [n] [n: add n 1 n] f 4").unwrap(), num(5.0));
    assert_eq!(vm.get("n"), Some(num(1.0)));
}

#[test]
fn test_same_parameter_name_in_two_procs() {
    assert_eq!(
        eval("f: proc [x] [add x 1] g: proc [x] [f add x x] g 3"),
        num(7.0)
    );
}

#[test]
fn test_same_proc_expression_twice() {
    assert_eq!(
        eval("mk: proc [] [proc [b] [b]] f1: mk f2: mk g: proc [x] [f1 add x 1] g 5"),
        num(6.0)
    );
    assert_eq!(
        eval("mk: proc [] [proc [b] [mul b 2]] f1: mk f2: mk add f1 3 f2 4"),
        num(14.0)
    );
}

#[test]
fn test_fn_is_non_streaming() {
    assert_eq!(eval("sq: fn [x] [mul x x] sq 9"), num(81.0));
    assert_eq!(
        eval_err("fn [/in] [1]"),
        EvalError::UnsupportedParameterKind("in".into())
    );
}

#[test]
fn test_unknown_refinement() {
    assert_eq!(
        eval_err("proc [a /static b] [a]"),
        EvalError::UnsupportedParameterKind("static".into())
    );
}

#[test]
fn test_throw_inside_proc_cleans_stack() {
    let vm = booted();
    let err = vm
        .eval(r#"f: proc [a b /local c] [throw "inner"] add 1 f 2 3"#)
        .unwrap_err();
    assert_eq!(err, EvalError::Thrown("inner".into()));
    assert_eq!(vm.stack_len(), 0);
    // The VM is still usable afterwards.
    assert_eq!(vm.eval("add 2 2").unwrap(), num(4.0));
}

#[test]
fn test_call_depth_limit() {
    let vm = Vm::with_config(VmConfig::default().with_max_call_depth(16));
    vm.boot().unwrap();
    let err = vm.eval("down: proc [n] [down add n 1] down 0").unwrap_err();
    assert_eq!(err, EvalError::CallDepthExceeded(16));
    assert_eq!(vm.stack_len(), 0);
}

#[test]
fn test_default_depth_limit_fits_small_stack() {
    const COUNT: &str = "count: proc [n] [either gt n 0 [add 1 count sub n 1] [0]]";
    let worker = std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(|| {
            let vm = booted();
            vm.eval(COUNT).unwrap();
            let depth = DEFAULT_MAX_CALL_DEPTH as f64;
            assert_eq!(
                vm.eval(&format!("count {}", depth - 2.0)).unwrap(),
                num(depth - 2.0)
            );
            assert_eq!(
                vm.eval("count 1000").unwrap_err(),
                EvalError::CallDepthExceeded(DEFAULT_MAX_CALL_DEPTH)
            );
            assert_eq!(vm.stack_len(), 0);
        })
        .unwrap();
    worker.join().expect("recursion worker panicked");
}

#[test]
fn test_tracing_does_not_change_results() {
    let vm = Vm::with_config(VmConfig::default().with_trace(true));
    vm.boot().unwrap();
    assert_eq!(vm.eval("1 + 2").unwrap(), num(3.0));
}

#[test]
fn test_print_records_output() {
    let vm = booted();
    assert_eq!(vm.eval("print add 1 2 print \"done\"").unwrap(), Value::from("done"));
    assert_eq!(vm.output(), vec!["3", "done"]);
}

// ══════════════════════════════════════════════════════════════════════════════
// Errors
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_throw_stops_evaluation() {
    let vm = booted();
    let err = vm.eval(r#"add 5 5 throw "message" x: 1"#).unwrap_err();
    assert_eq!(err, EvalError::Thrown("message".into()));
    assert_eq!(err.kind(), ErrorKind::UserThrown);
    assert_eq!(vm.get("x"), None);
}

#[test]
fn test_unbound_word() {
    assert_eq!(
        eval_err("add 1 missing"),
        EvalError::UnboundReference("missing".into())
    );
}

#[test]
fn test_exhausted_code() {
    assert_eq!(eval_err("add 1"), EvalError::ExhaustedCode);
}

#[test]
fn test_syntax_error_is_distinct() {
    let err = eval_err("add 1 [2");
    assert_eq!(err.kind(), ErrorKind::Syntax);
    let report = err.report();
    assert!(report.diagnostics.is_some());
}

#[test]
fn test_error_report_json() {
    let json = eval_err("nope").report().to_json().unwrap();
    assert!(json.contains("\"kind\":\"unbound-reference\""), "{json}");
    assert!(json.contains("nope"), "{json}");
}

#[test]
fn test_type_mismatch_in_core() {
    assert_eq!(eval_err("mul \"a\" 2").kind(), ErrorKind::TypeMismatch);
}
