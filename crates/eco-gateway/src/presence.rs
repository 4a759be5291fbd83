use std::collections::BTreeMap;
use std::time::Instant;

/// Map from user id to the connection handle most recently registered for it.
///
/// A second registration for the same user replaces the first; the older
/// connection stays open but can no longer be found. Removal compares the
/// stored handle so a late disconnect from a replaced connection cannot
/// evict its successor.
#[derive(Debug)]
pub struct PresenceRegistry<H> {
    entries: BTreeMap<String, Entry<H>>,
}

#[derive(Debug)]
struct Entry<H> {
    handle: H,
    last_seen: Instant,
}

impl<H> Default for PresenceRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> PresenceRegistry<H> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Store `handle` for `user_id`, replacing whatever was there.
    /// Returns the replaced handle.
    pub fn register(&mut self, user_id: impl Into<String>, handle: H) -> Option<H> {
        self.entries
            .insert(
                user_id.into(),
                Entry {
                    handle,
                    last_seen: Instant::now(),
                },
            )
            .map(|old| old.handle)
    }

    pub fn lookup(&self, user_id: &str) -> Option<&H> {
        self.entries.get(user_id).map(|e| &e.handle)
    }

    pub fn last_seen(&self, user_id: &str) -> Option<Instant> {
        self.entries.get(user_id).map(|e| e.last_seen)
    }

    /// All registered user ids, sorted.
    pub fn snapshot(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.entries.contains_key(user_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<H: PartialEq> PresenceRegistry<H> {
    /// Remove `user_id` only if it is still owned by `handle`.
    /// Returns true if the entry was removed.
    pub fn deregister(&mut self, user_id: &str, handle: &H) -> bool {
        match self.entries.get(user_id) {
            Some(entry) if entry.handle == *handle => {
                self.entries.remove(user_id);
                true
            }
            _ => false,
        }
    }

    /// Refresh `last_seen` if `handle` still owns the entry. Never creates one.
    pub fn touch(&mut self, user_id: &str, handle: &H) -> bool {
        match self.entries.get_mut(user_id) {
            Some(entry) if entry.handle == *handle => {
                entry.last_seen = Instant::now();
                true
            }
            _ => false,
        }
    }
}
