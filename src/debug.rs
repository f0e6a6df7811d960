//! Human-readable disassembly of a compiled `Chunk`, compiled in only when
//! one of the `debug-print-code`/`debug-trace-execution` features is
//! enabled so release builds pay nothing for it.

#![cfg(any(feature = "debug-print-code", feature = "debug-trace-execution"))]

use crate::chunk::{Chunk, OpCode};
use crate::value::Value;

/// Prints every instruction in `chunk`, labeled with `name`.
pub fn disassemble_chunk(chunk: &Chunk, name: &str) {
  println!("== {} ==", name);

  let mut offset = 0;
  while offset < chunk.len() {
    offset = disassemble_instruction(chunk, offset);
  }
}

/// Prints one instruction at `offset` and returns the offset of the next
/// one, accounting for however many operand bytes this instruction has.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize) -> usize {
  print!("{:04} ", offset);

  if offset > 0 && chunk.get_line(offset) == chunk.get_line(offset - 1) {
    print!("   | ");
  } else {
    print!("{:4} ", chunk.get_line(offset));
  }

  let op = match chunk.get_op(offset) {
    Some(op) => op,
    None => {
      println!("Unknown opcode {}", chunk.get_byte(offset));
      return offset + 1;
    }
  };

  match op {
    OpCode::Constant => constant_instruction("OP_CONSTANT", chunk, offset),
    OpCode::ConstantLong => constant_long_instruction("OP_CONSTANT_LONG", chunk, offset),
    OpCode::Nil => simple_instruction("OP_NIL", offset),
    OpCode::True => simple_instruction("OP_TRUE", offset),
    OpCode::False => simple_instruction("OP_FALSE", offset),
    OpCode::Pop => simple_instruction("OP_POP", offset),
    OpCode::GetLocal => byte_instruction("OP_GET_LOCAL", chunk, offset),
    OpCode::SetLocal => byte_instruction("OP_SET_LOCAL", chunk, offset),
    OpCode::GetGlobal => constant_instruction("OP_GET_GLOBAL", chunk, offset),
    OpCode::GetGlobalLong => constant_long_instruction("OP_GET_GLOBAL_LONG", chunk, offset),
    OpCode::DefineGlobal => constant_instruction("OP_DEFINE_GLOBAL", chunk, offset),
    OpCode::DefineGlobalLong => constant_long_instruction("OP_DEFINE_GLOBAL_LONG", chunk, offset),
    OpCode::SetGlobal => constant_instruction("OP_SET_GLOBAL", chunk, offset),
    OpCode::SetGlobalLong => constant_long_instruction("OP_SET_GLOBAL_LONG", chunk, offset),
    OpCode::Equal => simple_instruction("OP_EQUAL", offset),
    OpCode::Greater => simple_instruction("OP_GREATER", offset),
    OpCode::Less => simple_instruction("OP_LESS", offset),
    OpCode::Add => simple_instruction("OP_ADD", offset),
    OpCode::Subtract => simple_instruction("OP_SUBTRACT", offset),
    OpCode::Multiply => simple_instruction("OP_MULTIPLY", offset),
    OpCode::Divide => simple_instruction("OP_DIVIDE", offset),
    OpCode::Not => simple_instruction("OP_NOT", offset),
    OpCode::Negate => simple_instruction("OP_NEGATE", offset),
    OpCode::Print => simple_instruction("OP_PRINT", offset),
    OpCode::Jump => jump_instruction("OP_JUMP", 1, chunk, offset),
    OpCode::JumpIfFalse => jump_instruction("OP_JUMP_IF_FALSE", 1, chunk, offset),
    OpCode::Loop => jump_instruction("OP_LOOP", -1, chunk, offset),
    OpCode::Return => simple_instruction("OP_RETURN", offset),
  }
}

fn simple_instruction(name: &str, offset: usize) -> usize {
  println!("{}", name);
  offset + 1
}

fn byte_instruction(name: &str, chunk: &Chunk, offset: usize) -> usize {
  let slot = chunk.get_byte(offset + 1);
  println!("{:<20} {:4}", name, slot);
  offset + 2
}

fn constant_instruction(name: &str, chunk: &Chunk, offset: usize) -> usize {
  let index = chunk.get_byte(offset + 1) as usize;
  print_constant(name, index, chunk);
  offset + 2
}

fn constant_long_instruction(name: &str, chunk: &Chunk, offset: usize) -> usize {
  let index = chunk.get_short(offset + 1) as usize;
  print_constant(name, index, chunk);
  offset + 3
}

fn print_constant(name: &str, index: usize, chunk: &Chunk) {
  println!("{:<20} {:4} '{}'", name, index, chunk.get_constant(index));
}

fn jump_instruction(name: &str, sign: i32, chunk: &Chunk, offset: usize) -> usize {
  let jump = chunk.get_short(offset + 1) as i32;
  let target = offset as i32 + 3 + sign * jump;
  println!("{:<20} {:4} -> {}", name, offset, target);
  offset + 3
}

/// Prints the current contents of the value stack, bottom to top — used by
/// `debug-trace-execution` right before each instruction dispatches.
pub fn trace_stack(stack: &[Value]) {
  print!("          ");
  for value in stack {
    print!("[ {} ]", value);
  }
  println!();
}
