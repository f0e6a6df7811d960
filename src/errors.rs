//! Error types shared by the compiler and the VM, plus the three-way
//! interpretation outcome the driver matches on.

use thiserror::Error;

/// A compile-time (lexical or syntactic) error. The compiler collects and
/// reports every one of these it can find in a single pass; `interpret`
/// only needs the fact that at least one occurred.
#[derive(Debug, Error, Clone)]
#[error("[line {line}] Error{}: {message}", at.as_ref().map(|a| format!(" at '{}'", a)).unwrap_or_default())]
pub struct CompileError {
  pub line: usize,
  pub at: Option<String>,
  pub message: String,
}

/// A runtime error: type mismatch, undefined global, stack overflow.
#[derive(Debug, Error, Clone)]
#[error("{message}\n[line {line}] in script")]
pub struct RuntimeError {
  pub line: usize,
  pub message: String,
}

impl RuntimeError {
  pub fn new(line: usize, message: impl Into<String>) -> RuntimeError {
    RuntimeError { line, message: message.into() }
  }
}

/// The outcome of interpreting one program, returned by `Vm::interpret`.
#[derive(Debug)]
pub enum InterpretResult {
  Ok,
  CompileError(Vec<CompileError>),
  RuntimeError(RuntimeError),
}

impl InterpretResult {
  /// The conventional `sysexits.h`-flavored process exit code clox uses:
  /// `0` on success, `65` for a compile-time (data) error, `70` for a
  /// runtime error.
  pub fn exit_code(&self) -> i32 {
    match self {
      InterpretResult::Ok => 0,
      InterpretResult::CompileError(_) => 65,
      InterpretResult::RuntimeError(_) => 70,
    }
  }

  pub fn compile_errors(&self) -> &[CompileError] {
    match self {
      InterpretResult::CompileError(errors) => errors,
      _ => &[],
    }
  }

  pub fn runtime_error(&self) -> Option<&RuntimeError> {
    match self {
      InterpretResult::RuntimeError(error) => Some(error),
      _ => None,
    }
  }
}
