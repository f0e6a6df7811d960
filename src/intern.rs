//! The string intern pool. Every string the system produces — literal,
//! concatenation result, repeated-string, identifier — passes through
//! `Interner::intern`, so two values with equal bytes always end up
//! sharing one `Rc<ObjString>`. Both the compiler (for literals and
//! identifiers) and the VM (for `ADD`/`MULTIPLY` results) hold a `&mut
//! Interner` into the same pool for the duration of one `interpret` call.

use crate::table::Table;
use crate::value::{ObjRef, ObjString};
use std::rc::Rc;

#[derive(Default)]
pub struct Interner {
  strings: Table<()>,
}

impl Interner {
  pub fn new() -> Interner {
    Interner::default()
  }

  /// Returns the interned `ObjRef` for `chars`, creating and registering a
  /// new `ObjString` the first time this content is seen.
  pub fn intern(&mut self, chars: &str) -> ObjRef {
    let hash = ObjString::hash_bytes(chars.as_bytes());
    if let Some(existing) = self.strings.find_string(chars, hash) {
      return existing;
    }

    let obj = Rc::new(ObjString::new(chars.to_string()));
    self.strings.set(obj.clone(), ());
    obj
  }

  pub fn len(&self) -> usize {
    self.strings.len()
  }

  pub fn is_empty(&self) -> bool {
    self.strings.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn equal_content_shares_identity() {
    let mut interner = Interner::new();
    let a = interner.intern("hello");
    let b = interner.intern("hello");
    assert!(Rc::ptr_eq(&a, &b));
    assert_eq!(interner.len(), 1);
  }

  #[test]
  fn distinct_content_gets_distinct_identity() {
    let mut interner = Interner::new();
    let a = interner.intern("hello");
    let b = interner.intern("goodbye");
    assert!(!Rc::ptr_eq(&a, &b));
    assert_eq!(interner.len(), 2);
  }
}
