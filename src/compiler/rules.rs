//! The Pratt parser's rule table: for every token kind, which function (if
//! any) parses it in prefix position, which parses it in infix position,
//! and at what precedence the infix form binds.

use super::Precedence;
use super::{Compiler, ParseFn};
use crate::scanner::TokenKind;

pub struct ParseRule<'src, 'intern> {
  pub prefix: Option<ParseFn<'src, 'intern>>,
  pub infix: Option<ParseFn<'src, 'intern>>,
  pub precedence: Precedence,
}

const fn rule<'src, 'intern>(
  prefix: Option<ParseFn<'src, 'intern>>,
  infix: Option<ParseFn<'src, 'intern>>,
  precedence: Precedence,
) -> ParseRule<'src, 'intern> {
  ParseRule { prefix, infix, precedence }
}

/// Looks up the parse rule for `kind`. Every `TokenKind` has an entry;
/// tokens with no meaning in expression position get `Precedence::None` and
/// no prefix/infix handler, which is exactly what stops `parse_precedence`
/// from trying to parse them as the start (or continuation) of an expression.
pub fn get_rule<'src, 'intern>(kind: TokenKind) -> ParseRule<'src, 'intern> {
  use TokenKind::*;

  match kind {
    LeftParen => rule(Some(Compiler::grouping), None, Precedence::None),
    RightParen => rule(None, None, Precedence::None),
    LeftBrace => rule(None, None, Precedence::None),
    RightBrace => rule(None, None, Precedence::None),
    Comma => rule(None, None, Precedence::None),
    Dot => rule(None, None, Precedence::None),
    Minus => rule(Some(Compiler::unary), Some(Compiler::binary), Precedence::Term),
    Plus => rule(None, Some(Compiler::binary), Precedence::Term),
    Semicolon => rule(None, None, Precedence::None),
    Slash => rule(None, Some(Compiler::binary), Precedence::Factor),
    Star => rule(None, Some(Compiler::binary), Precedence::Factor),

    Bang => rule(Some(Compiler::unary), None, Precedence::None),
    BangEqual => rule(None, Some(Compiler::binary), Precedence::Equality),
    Equal => rule(None, None, Precedence::None),
    EqualEqual => rule(None, Some(Compiler::binary), Precedence::Equality),
    Greater => rule(None, Some(Compiler::binary), Precedence::Comparison),
    GreaterEqual => rule(None, Some(Compiler::binary), Precedence::Comparison),
    Less => rule(None, Some(Compiler::binary), Precedence::Comparison),
    LessEqual => rule(None, Some(Compiler::binary), Precedence::Comparison),

    Identifier => rule(Some(Compiler::variable), None, Precedence::None),
    StringLit => rule(Some(Compiler::string), None, Precedence::None),
    Number => rule(Some(Compiler::number), None, Precedence::None),

    And => rule(None, Some(Compiler::and_), Precedence::And),
    Break => rule(None, None, Precedence::None),
    Class => rule(None, None, Precedence::None),
    Else => rule(None, None, Precedence::None),
    False => rule(Some(Compiler::literal), None, Precedence::None),
    For => rule(None, None, Precedence::None),
    Fun => rule(None, None, Precedence::None),
    If => rule(None, None, Precedence::None),
    Nil => rule(Some(Compiler::literal), None, Precedence::None),
    Or => rule(None, Some(Compiler::or_), Precedence::Or),
    Print => rule(None, None, Precedence::None),
    Return => rule(None, None, Precedence::None),
    Super => rule(None, None, Precedence::None),
    This => rule(None, None, Precedence::None),
    True => rule(Some(Compiler::literal), None, Precedence::None),
    Var => rule(None, None, Precedence::None),
    While => rule(None, None, Precedence::None),

    Error => rule(None, None, Precedence::None),
    Eof => rule(None, None, Precedence::None),
  }
}
