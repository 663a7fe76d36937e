//! CAS lock table with an expiry deadline index
//!
//! At most one lock exists per key. A lock is identified by the [`CasToken`]
//! handed out when it was taken; mutations on a locked key must present that
//! token.
//!
//! Locks taken with a TTL are also recorded in an [`ExpiryIndex`] that maps
//! deadline → `(key, token)` pairs in a `BTreeMap`, so the expiry thread
//! finds due locks with a range scan instead of walking every lock.

use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use viewstore_core::{CasToken, Error, Result};

/// Deadline → locks due at that instant
#[derive(Debug, Default)]
pub struct ExpiryIndex {
    index: BTreeMap<Instant, Vec<(String, CasToken)>>,
}

impl ExpiryIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `(key, cas)` for expiry at `deadline`
    pub fn insert(&mut self, deadline: Instant, key: String, cas: CasToken) {
        self.index.entry(deadline).or_default().push((key, cas));
    }

    /// Forget a scheduled expiry
    ///
    /// If the deadline has no entries left, it is removed entirely.
    pub fn remove(&mut self, deadline: Instant, key: &str, cas: CasToken) {
        if let Some(entries) = self.index.get_mut(&deadline) {
            entries.retain(|(k, c)| !(k == key && *c == cas));
            if entries.is_empty() {
                self.index.remove(&deadline);
            }
        }
    }

    /// Earliest scheduled deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.index.keys().next().copied()
    }

    /// Remove and return every entry due at or before `now`
    pub fn take_expired(&mut self, now: Instant) -> Vec<(String, CasToken)> {
        let due: Vec<Instant> = self.index.range(..=now).map(|(at, _)| *at).collect();

        let mut expired = Vec::new();
        for at in due {
            if let Some(entries) = self.index.remove(&at) {
                expired.extend(entries);
            }
        }
        expired
    }

    /// Number of scheduled expiries
    pub fn len(&self) -> usize {
        self.index.values().map(Vec::len).sum()
    }

    /// True if nothing is scheduled
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct LockEntry {
    cas: CasToken,
    deadline: Option<Instant>,
}

/// Active locks and the token counter
#[derive(Debug)]
pub struct LockTable {
    locks: FxHashMap<String, LockEntry>,
    expiry: ExpiryIndex,
    next_cas: u64,
}

impl LockTable {
    /// Table whose first token is `initial_cas`
    pub fn new(initial_cas: u64) -> Self {
        LockTable {
            locks: FxHashMap::default(),
            expiry: ExpiryIndex::new(),
            next_cas: initial_cas,
        }
    }

    /// Fail with `KeyExists` if `key` is locked under a different token
    pub fn check(&self, key: &str, cas: CasToken) -> Result<()> {
        match self.locks.get(key) {
            Some(entry) if entry.cas != cas => Err(Error::cas_mismatch(key)),
            _ => Ok(()),
        }
    }

    /// Take a fresh lock on `key`, replacing any existing one
    ///
    /// A zero `ttl`, or one too large to schedule, means the lock never
    /// expires on its own.
    pub fn lock(&mut self, key: &str, ttl: Duration, now: Instant) -> CasToken {
        let cas = CasToken::new(self.next_cas);
        self.next_cas += 1;

        if let Some(old) = self.locks.remove(key) {
            if let Some(deadline) = old.deadline {
                self.expiry.remove(deadline, key, old.cas);
            }
        }

        let deadline = if ttl.is_zero() {
            None
        } else {
            now.checked_add(ttl)
        };
        if let Some(deadline) = deadline {
            self.expiry.insert(deadline, key.to_string(), cas);
        }
        self.locks.insert(key.to_string(), LockEntry { cas, deadline });
        cas
    }

    /// Release the lock on `key`
    ///
    /// Unlocking a key that is not locked is a no-op.
    pub fn unlock(&mut self, key: &str, cas: CasToken) -> Result<()> {
        self.check(key, cas)?;
        if let Some(entry) = self.locks.remove(key) {
            if let Some(deadline) = entry.deadline {
                self.expiry.remove(deadline, key, entry.cas);
            }
        }
        Ok(())
    }

    /// True if `key` currently holds a lock
    pub fn is_locked(&self, key: &str) -> bool {
        self.locks.contains_key(key)
    }

    /// Earliest pending expiry
    pub fn next_deadline(&self) -> Option<Instant> {
        self.expiry.next_deadline()
    }

    /// Pop every `(key, token)` whose expiry is due
    ///
    /// The locks themselves are left in place; callers release them through
    /// [`LockTable::unlock`].
    pub fn take_expired(&mut self, now: Instant) -> Vec<(String, CasToken)> {
        self.expiry.take_expired(now)
    }

    /// Number of active locks
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// True if no key is locked
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
