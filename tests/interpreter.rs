use loxcore::{InterpretResult, Vm};
use pretty_assertions::assert_eq;

fn run(source: &str) -> (InterpretResult, String) {
  let mut buf = Vec::new();
  let mut vm = Vm::new(&mut buf);
  let result = vm.interpret(source);
  (result, String::from_utf8(buf).expect("program output is always valid UTF-8"))
}

#[test]
fn arithmetic_precedence() {
  let (result, output) = run("print 1 + 2 * 3 - 4 / 2;");
  assert!(matches!(result, InterpretResult::Ok));
  assert_eq!(output, "5\n");
}

#[test]
fn string_concatenation() {
  let (_, output) = run(r#"print "hello, " + "world";"#);
  assert_eq!(output, "hello, world\n");
}

#[test]
fn string_times_number_repeats() {
  let (_, output) = run(r#"print "ab" * 3;"#);
  assert_eq!(output, "ababab\n");
}

#[test]
fn while_loop_accumulates_a_sum() {
  let (_, output) = run(
    r#"
    var i = 0;
    var total = 0;
    while (i < 10) {
      total = total + i;
      i = i + 1;
    }
    print total;
    "#,
  );
  assert_eq!(output, "45\n");
}

#[test]
fn nested_scopes_shadow_outer_locals() {
  let (_, output) = run(
    r#"
    var x = "outer";
    {
      var x = "inner";
      print x;
    }
    print x;
    "#,
  );
  assert_eq!(output, "inner\nouter\n");
}

#[test]
fn reading_an_undefined_global_is_a_runtime_error() {
  let (result, _) = run("print nope;");
  assert_eq!(result.exit_code(), 70);
  assert!(result.runtime_error().unwrap().message.contains("Undefined variable"));
}

#[test]
fn self_referential_local_initializer_is_a_compile_error() {
  let (result, _) = run("{ var a = a; }");
  assert_eq!(result.exit_code(), 65);
  assert_eq!(result.compile_errors().len(), 1);
}

#[test]
fn equality_compares_across_types_without_erroring() {
  let (result, output) = run(r#"print nil == false; print 0 == "0";"#);
  assert!(matches!(result, InterpretResult::Ok));
  assert_eq!(output, "false\nfalse\n");
}

#[test]
fn break_escapes_a_while_loop() {
  let (_, output) = run(
    r#"
    var i = 0;
    while (i < 100) {
      if (i == 5) break;
      i = i + 1;
    }
    print i;
    "#,
  );
  assert_eq!(output, "5\n");
}

#[test]
fn break_escapes_a_for_loop() {
  let (_, output) = run(
    r#"
    var last = -1;
    for (var i = 0; i < 20; i = i + 1) {
      if (i == 7) break;
      last = i;
    }
    print last;
    "#,
  );
  assert_eq!(output, "6\n");
}

#[test]
fn more_than_256_globals_compile_and_run() {
  let mut source = String::new();
  for i in 0..300 {
    source.push_str(&format!("var g{} = {};\n", i, i));
  }
  source.push_str("print g299;\n");

  let (result, output) = run(&source);
  assert!(matches!(result, InterpretResult::Ok));
  assert_eq!(output, "299\n");
}

#[test]
fn numeric_zero_is_falsey() {
  let (_, output) = run(r#"if (0) { print "yes"; } else { print "no"; }"#);
  assert_eq!(output, "no\n");
}
