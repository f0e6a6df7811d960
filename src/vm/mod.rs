//! The stack-based virtual machine that executes a compiled `Chunk`.

mod arithmetic;
mod run;

use crate::chunk::Chunk;
use crate::compiler::Compiler;
use crate::errors::{InterpretResult, RuntimeError};
use crate::intern::Interner;
use crate::table::Table;
use crate::value::Value;
use std::io::Write;

const STACK_MAX: usize = 256;

/// What the dispatch loop's instruction handlers report back to `run`: keep
/// going, or stop with the interpreter's final outcome.
pub(crate) enum Step {
  Continue,
  Done(InterpretResult),
}

/// Owns everything a running program needs: its value stack, the global
/// namespace, and the shared string intern pool. `output` is where `print`
/// writes, a generic sink rather than a hardcoded `println!` so tests can
/// capture it.
pub struct Vm<W: Write> {
  chunk: Chunk,
  ip: usize,
  stack: Vec<Value>,
  globals: Table<Value>,
  interner: Interner,
  output: W,
  /// Runtime opt-in over the `debug-print-code` feature: the feature makes
  /// the dump available in this build, this flag decides whether a given
  /// `interpret` call actually fires it.
  print_code: bool,
  /// Same idea for `debug-trace-execution`.
  trace_execution: bool,
}

impl<W: Write> Vm<W> {
  pub fn new(output: W) -> Vm<W> {
    Vm {
      chunk: Chunk::new(),
      ip: 0,
      stack: Vec::with_capacity(STACK_MAX),
      globals: Table::new(),
      interner: Interner::new(),
      output,
      print_code: false,
      trace_execution: false,
    }
  }

  /// Opts this VM into the debug dumps compiled in via `debug-print-code`/
  /// `debug-trace-execution`. A flag set here is a no-op in a build that
  /// didn't compile in the matching feature.
  pub fn set_debug_flags(&mut self, print_code: bool, trace_execution: bool) {
    self.print_code = print_code;
    self.trace_execution = trace_execution;
  }

  /// Compiles `source` and, if that succeeds, runs it to completion.
  pub fn interpret(&mut self, source: &str) -> InterpretResult {
    let chunk = match Compiler::compile(source, &mut self.interner) {
      Ok(chunk) => chunk,
      Err(errors) => return InterpretResult::CompileError(errors),
    };

    self.chunk = chunk;
    self.ip = 0;
    self.stack.clear();

    #[cfg(feature = "debug-print-code")]
    if self.print_code {
      crate::debug::disassemble_chunk(&self.chunk, "<script>");
    }

    self.run()
  }

  fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
    if self.stack.len() >= STACK_MAX {
      return Err(self.runtime_error("Stack overflow."));
    }
    self.stack.push(value);
    Ok(())
  }

  fn pop(&mut self) -> Value {
    self.stack.pop().expect("compiler never emits a pop past what it pushed")
  }

  fn peek(&self, distance: usize) -> &Value {
    let len = self.stack.len();
    &self.stack[len - 1 - distance]
  }

  fn current_line(&self) -> usize {
    self.chunk.get_line(self.ip.saturating_sub(1))
  }

  fn runtime_error(&self, message: impl Into<String>) -> RuntimeError {
    RuntimeError::new(self.current_line(), message)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn run(source: &str) -> (InterpretResult, String) {
    let mut buf = Vec::new();
    let mut vm = Vm::new(&mut buf);
    let result = vm.interpret(source);
    (result, String::from_utf8(buf).unwrap())
  }

  #[test]
  fn prints_arithmetic_result() {
    let (result, output) = run("print 1 + 2 * 3;");
    assert!(matches!(result, InterpretResult::Ok));
    assert_eq!(output, "7\n");
  }

  #[test]
  fn concatenates_strings() {
    let (_, output) = run(r#"print "foo" + "bar";"#);
    assert_eq!(output, "foobar\n");
  }

  #[test]
  fn repeats_string_by_number() {
    let (_, output) = run(r#"print "ab" * 3;"#);
    assert_eq!(output, "ababab\n");
  }

  #[test]
  fn string_repeat_truncates_and_floors_at_zero() {
    let (_, output) = run(r#"print "ab" * 2.9;"#);
    assert_eq!(output, "abab\n");

    let (_, output) = run(r#"print "ab" * -5;"#);
    assert_eq!(output, "\n");
  }

  #[test]
  fn while_loop_accumulates() {
    let (_, output) = run("var i = 0; var sum = 0; while (i < 5) { sum = sum + i; i = i + 1; } print sum;");
    assert_eq!(output, "10\n");
  }

  #[test]
  fn nested_scopes_shadow_without_leaking() {
    let (_, output) = run("var a = 1; { var a = 2; print a; } print a;");
    assert_eq!(output, "2\n1\n");
  }

  #[test]
  fn undefined_global_is_a_runtime_error() {
    let (result, _) = run("print undefined_name;");
    assert!(matches!(result, InterpretResult::RuntimeError(_)));
    assert_eq!(result.exit_code(), 70);
  }

  #[test]
  fn setting_undefined_global_rolls_back() {
    let (result, _) = run("undefined_name = 1;");
    assert!(matches!(result, InterpretResult::RuntimeError(_)));
  }

  #[test]
  fn equality_never_type_errors() {
    let (result, output) = run(r#"print 1 == "1";"#);
    assert!(matches!(result, InterpretResult::Ok));
    assert_eq!(output, "false\n");
  }

  #[test]
  fn break_exits_while_loop_early() {
    let (_, output) = run("var i = 0; while (true) { if (i == 3) break; i = i + 1; } print i;");
    assert_eq!(output, "3\n");
  }

  #[test]
  fn break_exits_for_loop_early() {
    let (_, output) = run("var last = 0; for (var i = 0; i < 10; i = i + 1) { if (i == 4) break; last = i; } print last;");
    assert_eq!(output, "3\n");
  }

  #[test]
  fn zero_is_falsey_in_condition() {
    let (_, output) = run("if (0) { print \"truthy\"; } else { print \"falsey\"; }");
    assert_eq!(output, "falsey\n");
  }
}
