// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Subscription refcount registry.
//!
//! The uplink may subscribe to the same event name any number of times, but
//! the bus carries at most one registration per name per process. This
//! registry tracks the count and tells the adapter when the underlying bus
//! registration must actually be created or released.
//!
//! Invariant: the bus has an active registration for `e` iff
//! `refcount(e) >= 1`.

use std::collections::HashMap;

use parking_lot::Mutex;

// =============================================================================
// SubscriptionRegistry
// =============================================================================

struct Inner {
    counts: HashMap<String, u32>,
    /// Names in first-subscription order, for reverse-order shutdown drain.
    order: Vec<String>,
}

/// Name → refcount table guarding bus event registrations.
#[derive(Default)]
pub struct SubscriptionRegistry {
    inner: Mutex<Inner>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            counts: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the refcount for `name`.
    ///
    /// Returns the new count; `1` means the caller must register with the
    /// bus.
    pub fn acquire(&self, name: &str) -> u32 {
        let mut inner = self.inner.lock();
        let count = inner.counts.entry(name.to_string()).or_insert(0);
        *count += 1;
        let count = *count;
        if count == 1 {
            inner.order.push(name.to_string());
        }
        count
    }

    /// Decrements the refcount for `name`.
    ///
    /// Returns `Some(new_count)`; `Some(0)` means the caller must release
    /// the bus registration. Returns `None` when the name was never
    /// subscribed.
    pub fn release(&self, name: &str) -> Option<u32> {
        let mut inner = self.inner.lock();
        let count = inner.counts.get_mut(name)?;
        *count -= 1;
        if *count == 0 {
            inner.counts.remove(name);
            inner.order.retain(|n| n != name);
            Some(0)
        } else {
            Some(*count)
        }
    }

    /// Current refcount for `name` (zero when absent).
    pub fn refcount(&self, name: &str) -> u32 {
        self.inner.lock().counts.get(name).copied().unwrap_or(0)
    }

    /// Number of distinct subscribed names.
    pub fn len(&self) -> usize {
        self.inner.lock().counts.len()
    }

    /// Returns `true` when no subscriptions exist.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes everything, returning names in reverse subscription order.
    ///
    /// Used on shutdown: the bus registrations are released newest-first.
    pub fn drain_reversed(&self) -> Vec<String> {
        let mut inner = self.inner.lock();
        inner.counts.clear();
        let mut order = std::mem::take(&mut inner.order);
        order.reverse();
        order
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("SubscriptionRegistry")
            .field("names", &inner.counts.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_release_cycle() {
        let reg = SubscriptionRegistry::new();
        assert_eq!(reg.acquire("e1"), 1);
        assert_eq!(reg.acquire("e1"), 2);
        assert_eq!(reg.refcount("e1"), 2);

        assert_eq!(reg.release("e1"), Some(1));
        assert_eq!(reg.refcount("e1"), 1);
        assert_eq!(reg.release("e1"), Some(0));
        assert_eq!(reg.refcount("e1"), 0);
    }

    #[test]
    fn test_release_unknown_is_none() {
        let reg = SubscriptionRegistry::new();
        assert_eq!(reg.release("never"), None);
    }

    #[test]
    fn test_resubscribe_after_drop() {
        let reg = SubscriptionRegistry::new();
        reg.acquire("e1");
        reg.release("e1");
        // A fresh acquire must report 1 again so the bus re-registers.
        assert_eq!(reg.acquire("e1"), 1);
    }

    #[test]
    fn test_drain_reverses_subscription_order() {
        let reg = SubscriptionRegistry::new();
        reg.acquire("first");
        reg.acquire("second");
        reg.acquire("third");
        reg.acquire("second"); // refcount bump must not reorder

        assert_eq!(
            reg.drain_reversed(),
            vec!["third".to_string(), "second".to_string(), "first".to_string()]
        );
        assert!(reg.is_empty());
    }
}
