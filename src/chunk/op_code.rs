use num_derive::FromPrimitive;

/// The set of instructions supported by the virtual machine.
///
/// **NOTE:** Changing the order in which members are declared creates
/// incompatibilities between different versions of the interpreter, since
/// instructions are encoded as their `u8` discriminant in the chunk's code
/// stream.
#[derive(Debug, Clone, Copy, PartialEq, FromPrimitive)]
#[repr(u8)]
pub enum OpCode {
  // Constants and literals.
  Constant,
  ConstantLong,
  Nil,
  True,
  False,

  // Stack housekeeping.
  Pop,

  // Locals and globals.
  GetLocal,
  SetLocal,
  GetGlobal,
  GetGlobalLong,
  DefineGlobal,
  DefineGlobalLong,
  SetGlobal,
  SetGlobalLong,

  // Comparisons.
  Equal,
  Greater,
  Less,

  // Arithmetic.
  Add,
  Subtract,
  Multiply,
  Divide,

  // Unary.
  Not,
  Negate,

  // I/O.
  Print,

  // Control flow.
  Jump,
  JumpIfFalse,
  Loop,

  Return,
}

impl OpCode {
  /// Decodes a raw byte from a chunk's code stream back into an `OpCode`.
  /// Any byte the compiler emitted came from `as u8` on this very enum, so
  /// a `None` here means the chunk is corrupt — a bug in the compiler, not
  /// a condition the VM should try to recover from.
  pub fn from_byte(byte: u8) -> Option<OpCode> {
    num_traits::FromPrimitive::from_u8(byte)
  }
}
