//! A pull-based scanner: each call to [`Scanner::scan_token`] produces the
//! next token on demand, borrowing its lexeme straight out of the source
//! string. This is the interface the compiler consumes; nothing upstream
//! of the compiler depends on the scanner having run ahead of time.

pub mod token;

pub use token::{Token, TokenKind};

/// Converts source text into a stream of [`Token`]s.
pub struct Scanner<'src> {
  source: &'src str,
  /// Byte offset of the first character of the token currently being scanned.
  start: usize,
  /// Byte offset of the next unconsumed character.
  current: usize,
  line: usize,
}

impl<'src> Scanner<'src> {
  pub fn new(source: &'src str) -> Scanner<'src> {
    Scanner {
      source,
      start: 0,
      current: 0,
      line: 1,
    }
  }

  /// Scans and returns the next token in the source. Returns an `Eof` token
  /// forever once the source is exhausted.
  pub fn scan_token(&mut self) -> Token<'src> {
    self.skip_whitespace();
    self.start = self.current;

    if self.is_at_end() {
      return self.make_token(TokenKind::Eof);
    }

    let c = self.advance();

    if is_alpha(c) {
      return self.identifier();
    }
    if c.is_ascii_digit() {
      return self.number();
    }

    match c {
      '(' => self.make_token(TokenKind::LeftParen),
      ')' => self.make_token(TokenKind::RightParen),
      '{' => self.make_token(TokenKind::LeftBrace),
      '}' => self.make_token(TokenKind::RightBrace),
      ';' => self.make_token(TokenKind::Semicolon),
      ',' => self.make_token(TokenKind::Comma),
      '.' => self.make_token(TokenKind::Dot),
      '-' => self.make_token(TokenKind::Minus),
      '+' => self.make_token(TokenKind::Plus),
      '/' => self.make_token(TokenKind::Slash),
      '*' => self.make_token(TokenKind::Star),
      '!' => {
        let kind = if self.matches('=') { TokenKind::BangEqual } else { TokenKind::Bang };
        self.make_token(kind)
      }
      '=' => {
        let kind = if self.matches('=') { TokenKind::EqualEqual } else { TokenKind::Equal };
        self.make_token(kind)
      }
      '<' => {
        let kind = if self.matches('=') { TokenKind::LessEqual } else { TokenKind::Less };
        self.make_token(kind)
      }
      '>' => {
        let kind = if self.matches('=') { TokenKind::GreaterEqual } else { TokenKind::Greater };
        self.make_token(kind)
      }
      '"' => self.string(),
      _ => self.error_token("Unexpected character."),
    }
  }

  fn is_at_end(&self) -> bool {
    self.current >= self.source.len()
  }

  /// Gets the current byte without consuming it.
  fn peek(&self) -> char {
    self.source[self.current..].chars().next().unwrap_or('\0')
  }

  /// Gets the byte after the current one without consuming anything.
  fn peek_next(&self) -> char {
    let mut chars = self.source[self.current..].chars();
    chars.next();
    chars.next().unwrap_or('\0')
  }

  /// Consumes and returns the current character.
  fn advance(&mut self) -> char {
    let c = self.peek();
    self.current += c.len_utf8();
    c
  }

  /// Consumes the current character only if it matches `expected`.
  fn matches(&mut self, expected: char) -> bool {
    if self.is_at_end() || self.peek() != expected {
      return false;
    }
    self.current += expected.len_utf8();
    true
  }

  fn skip_whitespace(&mut self) {
    loop {
      match self.peek() {
        ' ' | '\r' | '\t' => {
          self.advance();
        }
        '\n' => {
          self.line += 1;
          self.advance();
        }
        '/' if self.peek_next() == '/' => {
          while self.peek() != '\n' && !self.is_at_end() {
            self.advance();
          }
        }
        _ => break,
      }
    }
  }

  fn string(&mut self) -> Token<'src> {
    while self.peek() != '"' && !self.is_at_end() {
      if self.peek() == '\n' {
        self.line += 1;
      }
      self.advance();
    }

    if self.is_at_end() {
      return self.error_token("Unterminated string.");
    }

    // Consume the closing quote.
    self.advance();
    self.make_token(TokenKind::StringLit)
  }

  fn number(&mut self) -> Token<'src> {
    while self.peek().is_ascii_digit() {
      self.advance();
    }

    if self.peek() == '.' && self.peek_next().is_ascii_digit() {
      // Consume the '.'.
      self.advance();

      while self.peek().is_ascii_digit() {
        self.advance();
      }
    }

    self.make_token(TokenKind::Number)
  }

  fn identifier(&mut self) -> Token<'src> {
    while is_alpha(self.peek()) || self.peek().is_ascii_digit() {
      self.advance();
    }

    let lexeme = &self.source[self.start..self.current];
    self.make_token(token::keyword_or_identifier(lexeme))
  }

  fn make_token(&self, kind: TokenKind) -> Token<'src> {
    Token {
      kind,
      lexeme: &self.source[self.start..self.current],
      line: self.line,
    }
  }

  fn error_token(&self, message: &'static str) -> Token<'src> {
    Token {
      kind: TokenKind::Error,
      lexeme: message,
      line: self.line,
    }
  }
}

fn is_alpha(c: char) -> bool {
  c.is_alphabetic() || c == '_'
}

#[cfg(test)]
mod tests {
  use super::*;

  fn kinds(src: &str) -> Vec<TokenKind> {
    let mut scanner = Scanner::new(src);
    let mut out = Vec::new();
    loop {
      let tok = scanner.scan_token();
      let done = tok.kind == TokenKind::Eof;
      out.push(tok.kind);
      if done {
        break;
      }
    }
    out
  }

  #[test]
  fn scans_arithmetic_expression() {
    use TokenKind::*;
    assert_eq!(kinds("1 + 2 * 3;"), vec![Number, Plus, Number, Star, Number, Semicolon, Eof]);
  }

  #[test]
  fn scans_keywords_and_identifiers() {
    use TokenKind::*;
    assert_eq!(kinds("var x while breakfast"), vec![Var, Identifier, While, Identifier, Eof]);
  }

  #[test]
  fn scans_break_keyword() {
    assert_eq!(kinds("break;")[0], TokenKind::Break);
  }

  #[test]
  fn tracks_line_numbers_across_newlines() {
    let mut scanner = Scanner::new("1\n2\n3");
    assert_eq!(scanner.scan_token().line, 1);
    assert_eq!(scanner.scan_token().line, 2);
    assert_eq!(scanner.scan_token().line, 3);
  }

  #[test]
  fn reports_unterminated_string() {
    let mut scanner = Scanner::new("\"abc");
    let tok = scanner.scan_token();
    assert_eq!(tok.kind, TokenKind::Error);
    assert_eq!(tok.lexeme, "Unterminated string.");
  }

  #[test]
  fn skips_line_comments() {
    use TokenKind::*;
    assert_eq!(kinds("1 // a comment\n2"), vec![Number, Number, Eof]);
  }
}
