//! Binary and unary operator semantics. Split out from `run` the same way
//! the teacher splits its dispatch loop from its arithmetic helpers.

use super::Vm;
use crate::errors::RuntimeError;
use crate::value::Value;
use std::io::Write;

impl<W: Write> Vm<W> {
  pub(super) fn op_add(&mut self) -> Result<(), RuntimeError> {
    let b = self.pop();
    let a = self.pop();

    let result = match (&a, &b) {
      (Value::Number(x), Value::Number(y)) => Value::Number(x + y),
      (Value::Obj(_), Value::Obj(_)) => {
        let lhs = a.as_string().expect("matched Obj above").chars.clone();
        let rhs = b.as_string().expect("matched Obj above").chars.clone();
        Value::Obj(self.interner.intern(&(lhs + &rhs)))
      }
      _ => return Err(self.runtime_error("Operands must be two numbers or two strings.")),
    };

    self.push(result)
  }

  /// `MULTIPLY` is overloaded for string-repeat: `string * number` (or
  /// `number * string`) repeats the string `floor(n)` times, clamped to
  /// zero for negative counts — there is no sensible "negative copies".
  pub(super) fn op_multiply(&mut self) -> Result<(), RuntimeError> {
    let b = self.pop();
    let a = self.pop();

    let result = match (&a, &b) {
      (Value::Number(x), Value::Number(y)) => Value::Number(x * y),
      (Value::Obj(s), Value::Number(n)) | (Value::Number(n), Value::Obj(s)) => {
        let count = n.trunc().max(0.0) as usize;
        Value::Obj(self.interner.intern(&s.chars.repeat(count)))
      }
      _ => return Err(self.runtime_error("Operands must be two numbers, or a string and a number.")),
    };

    self.push(result)
  }

  pub(super) fn op_subtract(&mut self) -> Result<(), RuntimeError> {
    self.numeric_binary_op("Operands must be numbers.", |a, b| Value::Number(a - b))
  }

  pub(super) fn op_divide(&mut self) -> Result<(), RuntimeError> {
    self.numeric_binary_op("Operands must be numbers.", |a, b| Value::Number(a / b))
  }

  pub(super) fn op_greater(&mut self) -> Result<(), RuntimeError> {
    self.numeric_binary_op("Operands must be numbers.", |a, b| Value::Bool(a > b))
  }

  pub(super) fn op_less(&mut self) -> Result<(), RuntimeError> {
    self.numeric_binary_op("Operands must be numbers.", |a, b| Value::Bool(a < b))
  }

  /// `EQUAL` is the one binary operator with no type requirement at
  /// all — `Value`'s `PartialEq` already returns `false` across mismatched
  /// tags, which is exactly the semantics we want here.
  pub(super) fn op_equal(&mut self) -> Result<(), RuntimeError> {
    let b = self.pop();
    let a = self.pop();
    self.push(Value::Bool(a == b))
  }

  fn numeric_binary_op(&mut self, message: &str, op: impl Fn(f64, f64) -> Value) -> Result<(), RuntimeError> {
    let b = self.pop();
    let a = self.pop();

    match (a.as_number(), b.as_number()) {
      (Some(x), Some(y)) => self.push(op(x, y)),
      _ => Err(self.runtime_error(message)),
    }
  }

  pub(super) fn op_not(&mut self) -> Result<(), RuntimeError> {
    let value = self.pop();
    self.push(Value::Bool(value.is_falsey()))
  }

  pub(super) fn op_negate(&mut self) -> Result<(), RuntimeError> {
    match self.peek(0).as_number() {
      Some(n) => {
        self.pop();
        self.push(Value::Number(-n))
      }
      None => Err(self.runtime_error("Operand must be a number.")),
    }
  }
}
