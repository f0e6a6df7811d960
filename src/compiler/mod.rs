//! The single-pass compiler: a Pratt parser that emits bytecode directly as
//! it recognizes each expression and statement, with no intermediate syntax
//! tree. Grounded in the scanner/chunk contract the rest of this crate
//! already defines — this module is what drives both.

mod rules;

pub use rules::ParseRule;

use crate::chunk::{Chunk, OpCode};
use crate::errors::CompileError;
use crate::intern::Interner;
use crate::scanner::{Scanner, Token, TokenKind};
use crate::value::Value;

pub use self::precedence::Precedence;

mod precedence;

/// A signature shared by every prefix/infix parse function. `can_assign`
/// tells a variable reference whether `=` may legally follow it here (it
/// mustn't inside e.g. `a + b = c`). Carries the same `'src`/`'intern`
/// lifetimes as the `Compiler` it operates on — eliding them here would
/// otherwise require Rust to infer two independent higher-ranked lifetimes
/// for a single fn-pointer reference, which it can't.
type ParseFn<'src, 'intern> = fn(&mut Compiler<'src, 'intern>, bool);

/// One resolved local variable slot. `depth == -1` marks a local that has
/// been declared but whose initializer hasn't finished compiling yet — the
/// sentinel that makes `var a = a;` a compile error instead of reading
/// uninitialized stack slack.
struct Local<'src> {
  name: &'src str,
  depth: i32,
}

const UNINITIALIZED: i32 = -1;
const MAX_LOCALS: usize = 256;

/// Tracks the bytecode offsets a `break` inside the loop currently being
/// compiled needs patched once the loop's end is known, plus enough state
/// to compile nested loops correctly.
struct LoopContext {
  loop_start: usize,
  scope_depth: i32,
  break_jumps: Vec<usize>,
}

/// Compiles one source string into one `Chunk`. Borrows an `Interner` for
/// the lifetime of the compile so that every string literal and identifier
/// name it sees shares the same intern pool the VM reads from at runtime.
pub struct Compiler<'src, 'intern> {
  scanner: Scanner<'src>,
  previous: Token<'src>,
  current: Token<'src>,

  chunk: Chunk,
  interner: &'intern mut Interner,

  errors: Vec<CompileError>,
  panic_mode: bool,

  locals: Vec<Local<'src>>,
  scope_depth: i32,

  loops: Vec<LoopContext>,
}

impl<'src, 'intern> Compiler<'src, 'intern> {
  fn new(source: &'src str, interner: &'intern mut Interner) -> Self {
    Compiler {
      scanner: Scanner::new(source),
      previous: Token::sentinel(),
      current: Token::sentinel(),
      chunk: Chunk::new(),
      interner,
      errors: Vec::new(),
      panic_mode: false,
      locals: Vec::with_capacity(MAX_LOCALS),
      scope_depth: 0,
      loops: Vec::new(),
    }
  }

  /// Compiles `source` to completion. On success returns the finished
  /// `Chunk`; on failure returns every `CompileError` collected along the
  /// way (panic-mode recovery means one syntax slip rarely stops at just
  /// one reported error, but it also rarely cascades into hundreds).
  pub fn compile(source: &str, interner: &mut Interner) -> Result<Chunk, Vec<CompileError>> {
    let mut compiler = Compiler::new(source, interner);
    compiler.advance();

    while !compiler.check(TokenKind::Eof) {
      compiler.declaration();
    }

    compiler.consume(TokenKind::Eof, "Expect end of expression.");
    compiler.emit_return();

    if compiler.errors.is_empty() {
      Ok(compiler.chunk)
    } else {
      Err(compiler.errors)
    }
  }

  // ---- token stream -----------------------------------------------------

  fn advance(&mut self) {
    self.previous = self.current;

    loop {
      self.current = self.scanner.scan_token();
      if self.current.kind != TokenKind::Error {
        break;
      }
      self.error_at_current(self.current.lexeme);
    }
  }

  fn consume(&mut self, kind: TokenKind, message: &str) {
    if self.current.kind == kind {
      self.advance();
    } else {
      self.error_at_current(message);
    }
  }

  fn check(&self, kind: TokenKind) -> bool {
    self.current.kind == kind
  }

  fn matches(&mut self, kind: TokenKind) -> bool {
    if !self.check(kind) {
      return false;
    }
    self.advance();
    true
  }

  // ---- error reporting ---------------------------------------------------

  fn error_at_current(&mut self, message: &str) {
    let token = self.current;
    self.error_at(token, message);
  }

  fn error(&mut self, message: &str) {
    let token = self.previous;
    self.error_at(token, message);
  }

  /// Records a `CompileError` unless we're already unwinding from one —
  /// once `panic_mode` is set, every subsequent error at the same syntax
  /// failure is almost certainly noise cascading from the first, so it's
  /// swallowed until `synchronize` clears the flag at a statement boundary.
  fn error_at(&mut self, token: Token<'src>, message: &str) {
    if self.panic_mode {
      return;
    }
    self.panic_mode = true;

    let at = match token.kind {
      TokenKind::Eof => Some("end".to_string()),
      TokenKind::Error => None,
      _ => Some(token.lexeme.to_string()),
    };

    self.errors.push(CompileError { line: token.line, at, message: message.to_string() });
  }

  /// Discards tokens until we're at something that plausibly begins a new
  /// statement, so one syntax error doesn't stop the whole pass from
  /// reporting the others.
  fn synchronize(&mut self) {
    self.panic_mode = false;

    while self.current.kind != TokenKind::Eof {
      if self.previous.kind == TokenKind::Semicolon {
        return;
      }

      match self.current.kind {
        TokenKind::Class
        | TokenKind::Fun
        | TokenKind::Var
        | TokenKind::For
        | TokenKind::If
        | TokenKind::While
        | TokenKind::Print
        | TokenKind::Return
        | TokenKind::Break => return,
        _ => self.advance(),
      }
    }
  }

  // ---- bytecode emission -------------------------------------------------

  fn emit_byte(&mut self, byte: u8) {
    let line = self.previous.line;
    self.chunk.write(byte, line);
  }

  fn emit_op(&mut self, op: OpCode) {
    let line = self.previous.line;
    self.chunk.write_op(op, line);
  }

  fn emit_bytes(&mut self, op: OpCode, byte: u8) {
    self.emit_op(op);
    self.emit_byte(byte);
  }

  fn emit_return(&mut self) {
    self.emit_op(OpCode::Return);
  }

  /// Emits a constant, picking the short or long form the same way
  /// `Chunk::write_constant` does, and reports a compile error instead of
  /// silently truncating if the pool is somehow already full.
  fn emit_constant(&mut self, value: Value) {
    let line = self.previous.line;
    if !self.chunk.write_constant(value, line) {
      self.error("Too many constants in one chunk.");
    }
  }

  /// Emits a two-byte placeholder jump operand and returns the offset of
  /// its first byte, to be patched later by `patch_jump`.
  fn emit_jump(&mut self, op: OpCode) -> usize {
    self.emit_op(op);
    self.emit_byte(0xff);
    self.emit_byte(0xff);
    self.chunk.len() - 2
  }

  /// Backpatches the jump at `offset` to land on the instruction about to
  /// be emitted next.
  fn patch_jump(&mut self, offset: usize) {
    let jump = self.chunk.len() - offset - 2;
    if jump > u16::MAX as usize {
      self.error("Too much code to jump over.");
      return;
    }
    self.chunk.patch_short(offset, jump as u16);
  }

  /// Emits a backward jump to `loop_start`, used to close the body of
  /// `while`/`for`.
  fn emit_loop(&mut self, loop_start: usize) {
    self.emit_op(OpCode::Loop);

    let offset = self.chunk.len() - loop_start + 2;
    if offset > u16::MAX as usize {
      self.error("Loop body too large.");
      return;
    }
    let bytes = (offset as u16).to_be_bytes();
    self.emit_byte(bytes[0]);
    self.emit_byte(bytes[1]);
  }

  // ---- scopes -------------------------------------------------------------

  fn begin_scope(&mut self) {
    self.scope_depth += 1;
  }

  /// Pops every local that belonged to the scope just ended. Each pop is
  /// its own `OpCode::Pop` rather than a single "pop N" instruction,
  /// matching the rest of the opcode set's one-value-at-a-time stack
  /// discipline.
  fn end_scope(&mut self) {
    self.scope_depth -= 1;

    while let Some(local) = self.locals.last() {
      if local.depth > self.scope_depth {
        self.emit_op(OpCode::Pop);
        self.locals.pop();
      } else {
        break;
      }
    }
  }

  // ---- declarations and statements ----------------------------------------

  fn declaration(&mut self) {
    if self.matches(TokenKind::Var) {
      self.var_declaration();
    } else {
      self.statement();
    }

    if self.panic_mode {
      self.synchronize();
    }
  }

  fn var_declaration(&mut self) {
    let global = self.parse_variable("Expect variable name.");

    if self.matches(TokenKind::Equal) {
      self.expression();
    } else {
      self.emit_op(OpCode::Nil);
    }
    self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.");

    self.define_variable(global);
  }

  fn statement(&mut self) {
    if self.matches(TokenKind::Print) {
      self.print_statement();
    } else if self.matches(TokenKind::If) {
      self.if_statement();
    } else if self.matches(TokenKind::While) {
      self.while_statement();
    } else if self.matches(TokenKind::For) {
      self.for_statement();
    } else if self.matches(TokenKind::Break) {
      self.break_statement();
    } else if self.matches(TokenKind::LeftBrace) {
      self.begin_scope();
      self.block();
      self.end_scope();
    } else {
      self.expression_statement();
    }
  }

  fn print_statement(&mut self) {
    self.expression();
    self.consume(TokenKind::Semicolon, "Expect ';' after value.");
    self.emit_op(OpCode::Print);
  }

  fn expression_statement(&mut self) {
    self.expression();
    self.consume(TokenKind::Semicolon, "Expect ';' after expression.");
    self.emit_op(OpCode::Pop);
  }

  fn block(&mut self) {
    while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
      self.declaration();
    }
    self.consume(TokenKind::RightBrace, "Expect '}' after block.");
  }

  fn if_statement(&mut self) {
    self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.");
    self.expression();
    self.consume(TokenKind::RightParen, "Expect ')' after condition.");

    // JUMP_IF_FALSE deliberately does not pop: both branches below start
    // with an explicit POP for the condition value, so the stack stays
    // balanced on either path.
    let then_jump = self.emit_jump(OpCode::JumpIfFalse);
    self.emit_op(OpCode::Pop);
    self.statement();

    let else_jump = self.emit_jump(OpCode::Jump);
    self.patch_jump(then_jump);
    self.emit_op(OpCode::Pop);

    if self.matches(TokenKind::Else) {
      self.statement();
    }
    self.patch_jump(else_jump);
  }

  fn while_statement(&mut self) {
    let loop_start = self.chunk.len();
    self.loops.push(LoopContext { loop_start, scope_depth: self.scope_depth, break_jumps: Vec::new() });

    self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.");
    self.expression();
    self.consume(TokenKind::RightParen, "Expect ')' after condition.");

    let exit_jump = self.emit_jump(OpCode::JumpIfFalse);
    self.emit_op(OpCode::Pop);
    self.statement();
    self.emit_loop(loop_start);

    self.patch_jump(exit_jump);
    self.emit_op(OpCode::Pop);

    self.end_loop();
  }

  fn for_statement(&mut self) {
    self.begin_scope();
    self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.");

    if self.matches(TokenKind::Semicolon) {
      // No initializer.
    } else if self.matches(TokenKind::Var) {
      self.var_declaration();
    } else {
      self.expression_statement();
    }

    let mut loop_start = self.chunk.len();
    self.loops.push(LoopContext { loop_start, scope_depth: self.scope_depth, break_jumps: Vec::new() });

    let mut exit_jump: Option<usize> = None;
    if !self.matches(TokenKind::Semicolon) {
      self.expression();
      self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.");

      exit_jump = Some(self.emit_jump(OpCode::JumpIfFalse));
      self.emit_op(OpCode::Pop);
    }

    if !self.matches(TokenKind::RightParen) {
      let body_jump = self.emit_jump(OpCode::Jump);

      let increment_start = self.chunk.len();
      self.expression();
      self.emit_op(OpCode::Pop);
      self.consume(TokenKind::RightParen, "Expect ')' after for clauses.");

      self.emit_loop(loop_start);
      loop_start = increment_start;
      self.loops.last_mut().expect("for loop context pushed above").loop_start = loop_start;
      self.patch_jump(body_jump);
    }

    self.statement();
    self.emit_loop(loop_start);

    if let Some(exit_jump) = exit_jump {
      self.patch_jump(exit_jump);
      self.emit_op(OpCode::Pop);
    }

    self.end_loop();
    self.end_scope();
  }

  /// Patches every `break` recorded against the loop context that's
  /// finishing, to land just past the loop's final instruction.
  fn end_loop(&mut self) {
    let ctx = self.loops.pop().expect("end_loop called without a matching loop context");
    for offset in ctx.break_jumps {
      self.patch_jump(offset);
    }
  }

  fn break_statement(&mut self) {
    if self.loops.is_empty() {
      self.error("Cannot use 'break' outside of a loop.");
      self.consume(TokenKind::Semicolon, "Expect ';' after 'break'.");
      return;
    }

    // Pop every local that belongs to a scope nested inside the loop,
    // since control is about to jump clean past them.
    let loop_scope_depth = self.loops.last().expect("checked non-empty above").scope_depth;
    let pop_count = self.locals.iter().rev().take_while(|l| l.depth > loop_scope_depth).count();
    for _ in 0..pop_count {
      self.emit_op(OpCode::Pop);
    }

    let jump = self.emit_jump(OpCode::Jump);
    self.loops.last_mut().expect("checked non-empty above").break_jumps.push(jump);

    self.consume(TokenKind::Semicolon, "Expect ';' after 'break'.");
  }

  // ---- expressions ---------------------------------------------------------

  fn expression(&mut self) {
    self.parse_precedence(Precedence::Assignment);
  }

  /// The heart of the Pratt parser: consumes one prefix expression, then
  /// keeps consuming infix operators whose precedence is at least
  /// `precedence`, left-associating along the way.
  fn parse_precedence(&mut self, precedence: Precedence) {
    self.advance();

    let prefix_rule = rules::get_rule(self.previous.kind).prefix;
    let prefix_rule = match prefix_rule {
      Some(rule) => rule,
      None => {
        self.error("Expect expression.");
        return;
      }
    };

    let can_assign = precedence <= Precedence::Assignment;
    prefix_rule(self, can_assign);

    while precedence <= rules::get_rule(self.current.kind).precedence {
      self.advance();
      let infix_rule = rules::get_rule(self.previous.kind)
        .infix
        .expect("get_rule only reports a precedence above None when an infix fn is present");
      infix_rule(self, can_assign);
    }

    if can_assign && self.matches(TokenKind::Equal) {
      self.error("Invalid assignment target.");
    }
  }

  fn grouping(&mut self, _can_assign: bool) {
    self.expression();
    self.consume(TokenKind::RightParen, "Expect ')' after expression.");
  }

  fn unary(&mut self, _can_assign: bool) {
    let operator = self.previous.kind;
    self.parse_precedence(Precedence::Unary);

    match operator {
      TokenKind::Minus => self.emit_op(OpCode::Negate),
      TokenKind::Bang => self.emit_op(OpCode::Not),
      _ => unreachable!("unary() only ever registered for Minus and Bang"),
    }
  }

  fn binary(&mut self, _can_assign: bool) {
    let operator = self.previous.kind;
    let rule = rules::get_rule(operator);
    self.parse_precedence(rule.precedence.next());

    match operator {
      TokenKind::Plus => self.emit_op(OpCode::Add),
      TokenKind::Minus => self.emit_op(OpCode::Subtract),
      TokenKind::Star => self.emit_op(OpCode::Multiply),
      TokenKind::Slash => self.emit_op(OpCode::Divide),
      TokenKind::BangEqual => {
        self.emit_op(OpCode::Equal);
        self.emit_op(OpCode::Not);
      }
      TokenKind::EqualEqual => self.emit_op(OpCode::Equal),
      TokenKind::Greater => self.emit_op(OpCode::Greater),
      TokenKind::GreaterEqual => {
        self.emit_op(OpCode::Less);
        self.emit_op(OpCode::Not);
      }
      TokenKind::Less => self.emit_op(OpCode::Less),
      TokenKind::LessEqual => {
        self.emit_op(OpCode::Greater);
        self.emit_op(OpCode::Not);
      }
      _ => unreachable!("binary() only ever registered for the operators above"),
    }
  }

  fn literal(&mut self, _can_assign: bool) {
    match self.previous.kind {
      TokenKind::False => self.emit_op(OpCode::False),
      TokenKind::Nil => self.emit_op(OpCode::Nil),
      TokenKind::True => self.emit_op(OpCode::True),
      _ => unreachable!("literal() only ever registered for False, Nil, and True"),
    }
  }

  fn number(&mut self, _can_assign: bool) {
    let value: f64 = self.previous.lexeme.parse().expect("scanner only emits well-formed number lexemes");
    self.emit_constant(Value::Number(value));
  }

  fn string(&mut self, _can_assign: bool) {
    // Strip the surrounding quotes the scanner included in the lexeme.
    let raw = self.previous.lexeme;
    let chars = &raw[1..raw.len() - 1];
    let interned = self.interner.intern(chars);
    self.emit_constant(Value::Obj(interned));
  }

  fn and_(&mut self, _can_assign: bool) {
    let end_jump = self.emit_jump(OpCode::JumpIfFalse);
    self.emit_op(OpCode::Pop);
    self.parse_precedence(Precedence::And);
    self.patch_jump(end_jump);
  }

  fn or_(&mut self, _can_assign: bool) {
    let else_jump = self.emit_jump(OpCode::JumpIfFalse);
    let end_jump = self.emit_jump(OpCode::Jump);

    self.patch_jump(else_jump);
    self.emit_op(OpCode::Pop);

    self.parse_precedence(Precedence::Or);
    self.patch_jump(end_jump);
  }

  fn variable(&mut self, can_assign: bool) {
    let name = self.previous;
    self.named_variable(name, can_assign);
  }

  fn named_variable(&mut self, name: Token<'src>, can_assign: bool) {
    if let Some(slot) = self.resolve_local(name.lexeme) {
      if can_assign && self.matches(TokenKind::Equal) {
        self.expression();
        self.emit_bytes(OpCode::SetLocal, slot as u8);
      } else {
        self.emit_bytes(OpCode::GetLocal, slot as u8);
      }
      return;
    }

    let index = self.identifier_constant(name.lexeme);
    if can_assign && self.matches(TokenKind::Equal) {
      self.expression();
      self.emit_global_op(OpCode::SetGlobal, OpCode::SetGlobalLong, index);
    } else {
      self.emit_global_op(OpCode::GetGlobal, OpCode::GetGlobalLong, index);
    }
  }

  // ---- variable resolution ---------------------------------------------------

  /// Interns `name` as a string constant and returns its constant-pool
  /// index, for use as a global variable's name operand.
  fn identifier_constant(&mut self, name: &str) -> u16 {
    let interned = self.interner.intern(name);
    match self.chunk.add_constant(Value::Obj(interned)) {
      crate::chunk::ConstantSlot::Index(index) => index,
      crate::chunk::ConstantSlot::PoolFull => {
        self.error("Too many constants in one chunk.");
        0
      }
    }
  }

  /// Emits the short-form opcode with a `u8` operand when `index` fits, or
  /// the `_LONG` variant with a big-endian `u16` operand otherwise — the
  /// 16-bit index space lets a program define more than 256 distinct
  /// globals, unlike the 8-bit locals array.
  fn emit_global_op(&mut self, short: OpCode, long: OpCode, index: u16) {
    if index <= u8::MAX as u16 {
      self.emit_bytes(short, index as u8);
    } else {
      self.emit_op(long);
      let bytes = index.to_be_bytes();
      self.emit_byte(bytes[0]);
      self.emit_byte(bytes[1]);
    }
  }

  fn parse_variable(&mut self, message: &str) -> u16 {
    self.consume(TokenKind::Identifier, message);

    self.declare_variable();
    if self.scope_depth > 0 {
      // Locals aren't looked up by name at runtime, so no constant is needed.
      return 0;
    }

    self.identifier_constant(self.previous.lexeme)
  }

  fn declare_variable(&mut self) {
    if self.scope_depth == 0 {
      return;
    }

    let name = self.previous.lexeme;
    for local in self.locals.iter().rev() {
      if local.depth != UNINITIALIZED && local.depth < self.scope_depth {
        break;
      }
      if local.name == name {
        self.error("Already a variable with this name in this scope.");
        return;
      }
    }

    self.add_local(name);
  }

  fn add_local(&mut self, name: &'src str) {
    if self.locals.len() >= MAX_LOCALS {
      self.error("Too many local variables in function.");
      return;
    }
    self.locals.push(Local { name, depth: UNINITIALIZED });
  }

  fn mark_initialized(&mut self) {
    if self.scope_depth == 0 {
      return;
    }
    if let Some(local) = self.locals.last_mut() {
      local.depth = self.scope_depth;
    }
  }

  fn define_variable(&mut self, global: u16) {
    if self.scope_depth > 0 {
      self.mark_initialized();
      return;
    }

    self.emit_global_op(OpCode::DefineGlobal, OpCode::DefineGlobalLong, global);
  }

  /// Resolves `name` against the locals currently in scope, innermost
  /// first. A local whose `depth` is still `UNINITIALIZED` is in the middle
  /// of evaluating its own initializer, so referencing it by name here is
  /// the `var a = a;` self-reference the compiler must reject.
  fn resolve_local(&mut self, name: &str) -> Option<usize> {
    for (i, local) in self.locals.iter().enumerate().rev() {
      if local.name == name {
        if local.depth == UNINITIALIZED {
          self.error("Can't read local variable in its own initializer.");
        }
        return Some(i);
      }
    }
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn compile_ok(source: &str) -> Chunk {
    let mut interner = Interner::new();
    Compiler::compile(source, &mut interner).expect("expected source to compile")
  }

  fn compile_err(source: &str) -> Vec<CompileError> {
    let mut interner = Interner::new();
    Compiler::compile(source, &mut interner).expect_err("expected source to fail to compile")
  }

  #[test]
  fn compiles_arithmetic_precedence() {
    let chunk = compile_ok("1 + 2 * 3;");
    assert_eq!(chunk.get_op(0), Some(OpCode::Constant));
    assert_eq!(chunk.get_op(chunk.len() - 2), Some(OpCode::Pop));
    assert_eq!(chunk.get_op(chunk.len() - 1), Some(OpCode::Return));
  }

  #[test]
  fn rejects_self_referential_initializer() {
    let errors = compile_err("{ var a = a; }");
    assert!(errors.iter().any(|e| e.message.contains("own initializer")));
  }

  #[test]
  fn rejects_break_outside_loop() {
    let errors = compile_err("break;");
    assert!(errors.iter().any(|e| e.message.contains("outside of a loop")));
  }

  #[test]
  fn compiles_break_inside_while() {
    let chunk = compile_ok("while (true) { break; }");
    assert!(!chunk.is_empty());
  }

  #[test]
  fn lifts_globals_past_256_to_long_form() {
    let mut source = String::new();
    for i in 0..300 {
      source.push_str(&format!("var g{} = {};\n", i, i));
    }
    let chunk = compile_ok(&source);
    let has_long_define = (0..chunk.len()).any(|offset| chunk.get_op(offset) == Some(OpCode::DefineGlobalLong));
    assert!(has_long_define);
  }
}
