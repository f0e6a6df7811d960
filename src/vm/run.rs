//! The dispatch loop: decodes one instruction at a time out of the current
//! chunk and executes it.

use super::Vm;
use crate::chunk::OpCode;
use crate::errors::{InterpretResult, RuntimeError};
use crate::value::Value;
use std::io::Write;

impl<W: Write> Vm<W> {
  pub(super) fn run(&mut self) -> InterpretResult {
    loop {
      #[cfg(feature = "debug-trace-execution")]
      if self.trace_execution {
        crate::debug::trace_stack(&self.stack);
        crate::debug::disassemble_instruction(&self.chunk, self.ip);
      }

      let op = match self.chunk.get_op(self.ip) {
        Some(op) => op,
        None => unreachable!("ip past the end of a well-formed chunk"),
      };
      self.ip += 1;

      let outcome = match op {
        OpCode::Constant => {
          let index = self.read_byte() as usize;
          self.push(self.chunk.get_constant(index).clone())
        }
        OpCode::ConstantLong => {
          let index = self.read_short() as usize;
          self.push(self.chunk.get_constant(index).clone())
        }
        OpCode::Nil => self.push(Value::Nil),
        OpCode::True => self.push(Value::Bool(true)),
        OpCode::False => self.push(Value::Bool(false)),
        OpCode::Pop => {
          self.pop();
          Ok(())
        }

        OpCode::GetLocal => {
          let slot = self.read_byte() as usize;
          self.push(self.stack[slot].clone())
        }
        OpCode::SetLocal => {
          let slot = self.read_byte() as usize;
          self.stack[slot] = self.peek(0).clone();
          Ok(())
        }

        OpCode::GetGlobal => self.op_get_global(false),
        OpCode::GetGlobalLong => self.op_get_global(true),
        OpCode::DefineGlobal => self.op_define_global(false),
        OpCode::DefineGlobalLong => self.op_define_global(true),
        OpCode::SetGlobal => self.op_set_global(false),
        OpCode::SetGlobalLong => self.op_set_global(true),

        OpCode::Equal => self.op_equal(),
        OpCode::Greater => self.op_greater(),
        OpCode::Less => self.op_less(),
        OpCode::Add => self.op_add(),
        OpCode::Subtract => self.op_subtract(),
        OpCode::Multiply => self.op_multiply(),
        OpCode::Divide => self.op_divide(),
        OpCode::Not => self.op_not(),
        OpCode::Negate => self.op_negate(),

        OpCode::Print => {
          let value = self.pop();
          writeln!(self.output, "{}", value).expect("writing to the print sink should not fail");
          Ok(())
        }

        OpCode::Jump => {
          let offset = self.read_short();
          self.ip += offset as usize;
          Ok(())
        }
        OpCode::JumpIfFalse => {
          let offset = self.read_short();
          if self.peek(0).is_falsey() {
            self.ip += offset as usize;
          }
          Ok(())
        }
        OpCode::Loop => {
          let offset = self.read_short();
          self.ip -= offset as usize;
          Ok(())
        }

        OpCode::Return => return InterpretResult::Ok,
      };

      if let Err(err) = outcome {
        return InterpretResult::RuntimeError(err);
      }
    }
  }

  fn read_byte(&mut self) -> u8 {
    let byte = self.chunk.get_byte(self.ip);
    self.ip += 1;
    byte
  }

  fn read_short(&mut self) -> u16 {
    let short = self.chunk.get_short(self.ip);
    self.ip += 2;
    short
  }

  fn read_name(&mut self, long: bool) -> crate::value::ObjRef {
    let index = if long { self.read_short() as usize } else { self.read_byte() as usize };
    self
      .chunk
      .get_constant(index)
      .as_string()
      .expect("compiler only ever emits a string constant as a global's name operand")
      .clone()
  }

  fn op_get_global(&mut self, long: bool) -> Result<(), RuntimeError> {
    let name = self.read_name(long);
    match self.globals.get(&name) {
      Some(value) => {
        let value = value.clone();
        self.push(value)
      }
      None => Err(self.runtime_error(format!("Undefined variable '{}'.", name.chars))),
    }
  }

  fn op_define_global(&mut self, long: bool) -> Result<(), RuntimeError> {
    let name = self.read_name(long);
    let value = self.pop();
    self.globals.set(name, value);
    Ok(())
  }

  /// `SET_GLOBAL` on a name that was never declared is a runtime error —
  /// and since `Table::set` always writes the slot regardless, the bogus
  /// entry it just created has to be deleted again rather than left
  /// behind as a global that silently sprang into existence.
  fn op_set_global(&mut self, long: bool) -> Result<(), RuntimeError> {
    let name = self.read_name(long);
    let value = self.peek(0).clone();

    if self.globals.set(name.clone(), value) {
      self.globals.delete(&name);
      return Err(self.runtime_error(format!("Undefined variable '{}'.", name.chars)));
    }
    Ok(())
  }
}
