//! An open-addressed, linear-probing, tombstone-aware hash table keyed by
//! interned strings. Used both as the VM's globals namespace
//! (`Table<Value>`) and, as a string set (`Table<()>`), for the intern pool
//! itself.

use crate::value::ObjRef;

const INITIAL_CAPACITY: usize = 8;
const MAX_LOAD: f64 = 0.75;

#[derive(Clone)]
enum Slot<V> {
  Empty,
  Tombstone,
  Occupied(ObjRef, V),
}

/// A hash table from interned string to `V`.
pub struct Table<V> {
  entries: Vec<Slot<V>>,
  count: usize,
}

impl<V: Clone> Default for Table<V> {
  fn default() -> Self {
    Table { entries: Vec::new(), count: 0 }
  }
}

impl<V: Clone> Table<V> {
  pub fn new() -> Table<V> {
    Table::default()
  }

  pub fn len(&self) -> usize {
    self.count
  }

  pub fn is_empty(&self) -> bool {
    self.count == 0
  }

  /// Walks the probe sequence for `key` starting at `key.hash mod
  /// capacity`. Returns the index of either a matching occupied slot, or
  /// the slot a new entry for `key` should be written to (the first
  /// tombstone seen, or else the first truly empty slot).
  fn find_entry(entries: &[Slot<V>], capacity: usize, key: &ObjRef) -> usize {
    let mut index = (key.hash as usize) % capacity;
    let mut tombstone: Option<usize> = None;

    loop {
      match &entries[index] {
        Slot::Empty => return tombstone.unwrap_or(index),
        Slot::Tombstone => {
          if tombstone.is_none() {
            tombstone = Some(index);
          }
        }
        Slot::Occupied(k, _) => {
          if same_key(k, key) {
            return index;
          }
        }
      }
      index = (index + 1) % capacity;
    }
  }

  fn adjust_capacity(&mut self, capacity: usize) {
    let mut new_entries: Vec<Slot<V>> = (0..capacity).map(|_| Slot::Empty).collect();

    let mut new_count = 0;
    for slot in self.entries.drain(..) {
      if let Slot::Occupied(key, value) = slot {
        let dest = Self::find_entry(&new_entries, capacity, &key);
        new_entries[dest] = Slot::Occupied(key, value);
        new_count += 1;
      }
    }

    self.entries = new_entries;
    self.count = new_count;
  }

  /// Inserts or overwrites `key -> value`. Returns `true` if `key` was not
  /// already present (a brand-new key, as opposed to an overwrite or a
  /// tombstone reuse).
  pub fn set(&mut self, key: ObjRef, value: V) -> bool {
    if self.entries.is_empty() {
      self.adjust_capacity(INITIAL_CAPACITY);
    } else if (self.count + 1) as f64 > self.entries.len() as f64 * MAX_LOAD {
      self.adjust_capacity(self.entries.len() * 2);
    }

    let capacity = self.entries.len();
    let index = Self::find_entry(&self.entries, capacity, &key);
    let is_new_key = matches!(self.entries[index], Slot::Empty);

    if is_new_key {
      self.count += 1;
    }
    self.entries[index] = Slot::Occupied(key, value);
    is_new_key
  }

  pub fn get(&self, key: &ObjRef) -> Option<&V> {
    if self.entries.is_empty() {
      return None;
    }

    let index = Self::find_entry(&self.entries, self.entries.len(), key);
    match &self.entries[index] {
      Slot::Occupied(_, value) => Some(value),
      _ => None,
    }
  }

  /// Deletes `key`, leaving a tombstone behind so later probes don't stop
  /// short. Returns whether the key was present.
  pub fn delete(&mut self, key: &ObjRef) -> bool {
    if self.entries.is_empty() {
      return false;
    }

    let capacity = self.entries.len();
    let index = Self::find_entry(&self.entries, capacity, key);
    if matches!(self.entries[index], Slot::Occupied(..)) {
      self.entries[index] = Slot::Tombstone;
      true
    } else {
      false
    }
  }

  pub fn add_all(&mut self, from: &Table<V>) {
    for slot in &from.entries {
      if let Slot::Occupied(key, value) = slot {
        self.set(key.clone(), value.clone());
      }
    }
  }

  /// Looks up an interned string by its *content* (length, hash, bytes)
  /// rather than by key identity. This is the one operation the intern
  /// pool needs that the globals table never does: when compiling a string
  /// literal we don't yet have an `Rc` to compare pointers against, only
  /// raw characters.
  pub fn find_string(&self, chars: &str, hash: u32) -> Option<ObjRef> {
    if self.entries.is_empty() {
      return None;
    }

    let capacity = self.entries.len();
    let mut index = (hash as usize) % capacity;

    loop {
      match &self.entries[index] {
        Slot::Empty => return None,
        Slot::Occupied(key, _) => {
          if key.hash == hash && key.chars == chars {
            return Some(key.clone());
          }
        }
        Slot::Tombstone => {}
      }
      index = (index + 1) % capacity;
    }
  }
}

/// Key comparison for `find_entry`: two interned strings are the same key
/// either when they're literally the same allocation, or — during a single
/// probe before interning has deduplicated them — when their bytes match.
/// In steady state (everything interned) this reduces to pointer equality.
fn same_key(a: &ObjRef, b: &ObjRef) -> bool {
  std::rc::Rc::ptr_eq(a, b) || a.chars == b.chars
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::value::{ObjString, Value};
  use std::rc::Rc;

  fn key(s: &str) -> ObjRef {
    Rc::new(ObjString::new(s.to_string()))
  }

  #[test]
  fn set_then_get_round_trips() {
    let mut t: Table<Value> = Table::new();
    let k = key("x");
    assert!(t.set(k.clone(), Value::Number(42.0)));
    assert_eq!(t.get(&k), Some(&Value::Number(42.0)));
  }

  #[test]
  fn overwrite_is_not_a_new_key() {
    let mut t: Table<Value> = Table::new();
    let k = key("x");
    assert!(t.set(k.clone(), Value::Number(1.0)));
    assert!(!t.set(k.clone(), Value::Number(2.0)));
    assert_eq!(t.get(&k), Some(&Value::Number(2.0)));
    assert_eq!(t.len(), 1);
  }

  #[test]
  fn delete_then_get_returns_none() {
    let mut t: Table<Value> = Table::new();
    let k = key("x");
    t.set(k.clone(), Value::Bool(true));
    assert!(t.delete(&k));
    assert_eq!(t.get(&k), None);
  }

  #[test]
  fn delete_of_missing_key_rolls_back_cleanly() {
    let mut t: Table<Value> = Table::new();
    let k = key("missing");
    assert!(!t.delete(&k));
  }

  #[test]
  fn grows_past_load_factor() {
    let mut t: Table<Value> = Table::new();
    for i in 0..100 {
      t.set(key(&format!("k{}", i)), Value::Number(i as f64));
    }
    assert_eq!(t.len(), 100);
    for i in 0..100 {
      assert_eq!(t.get(&key(&format!("k{}", i))), Some(&Value::Number(i as f64)));
    }
  }

  #[test]
  fn find_string_locates_by_content() {
    let mut t: Table<()> = Table::new();
    let k = key("hello");
    t.set(k.clone(), ());
    let found = t.find_string("hello", ObjString::hash_bytes(b"hello")).unwrap();
    assert!(Rc::ptr_eq(&found, &k));
  }

  #[test]
  fn find_string_misses_on_different_content() {
    let mut t: Table<()> = Table::new();
    t.set(key("hello"), ());
    assert!(t.find_string("goodbye", ObjString::hash_bytes(b"goodbye")).is_none());
  }
}
