//! # Client Visibility Set
//!
//! Which clients currently have this entity on their side, and which of
//! them the latest range scan still found.
//!
//! ## Scan Protocol
//!
//! ```text
//! uncheck_all()                  every last_checked entry -> false
//! for c in scan:  subscribe(c)   (true = entered)
//!                 mark_checked(c)
//! for c in departed():           subscribed but still false
//!                 unsubscribe(c) (exited)
//! ```
//!
//! Nothing here bounds capacity: membership is bounded by the clients in
//! range. `unsubscribe` purges both maps and `uncheck_all` forgets marks
//! for clients that never subscribed, so churn does not accumulate.

use std::collections::{HashMap, HashSet};

use crate::client::ClientId;

/// Subscribed clients plus the result of the most recent range scan.
#[derive(Clone, Debug, Default)]
pub struct VisibilitySet {
    /// Clients for which the entity exists on the remote side.
    subscribed: HashSet<ClientId>,
    /// Clients seen by recent scans: true = in range, false = pending removal.
    last_checked: HashMap<ClientId, bool>,
}

impl VisibilitySet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `client`. Returns false if it was already subscribed.
    pub fn subscribe(&mut self, client: ClientId) -> bool {
        self.subscribed.insert(client)
    }

    /// Removes `client` from both maps. Returns false if it was not subscribed.
    pub fn unsubscribe(&mut self, client: ClientId) -> bool {
        self.last_checked.remove(&client);
        self.subscribed.remove(&client)
    }

    /// Records that the latest scan found `client` in range.
    pub fn mark_checked(&mut self, client: ClientId) {
        self.last_checked.insert(client, true);
    }

    /// Records that the latest scan did not find `client` in range.
    pub fn mark_unchecked(&mut self, client: ClientId) {
        self.last_checked.insert(client, false);
    }

    /// Marks every subscribed client as pending removal, ahead of a new scan.
    ///
    /// Marks left for clients that never subscribed are dropped here, so
    /// scan churn does not accumulate.
    pub fn uncheck_all(&mut self) {
        let subscribed = &self.subscribed;
        self.last_checked.retain(|client, in_range| {
            *in_range = false;
            subscribed.contains(client)
        });
    }

    /// Returns the scan results the driver diffs against.
    #[must_use]
    pub const fn checked_clients(&self) -> &HashMap<ClientId, bool> {
        &self.last_checked
    }

    /// Subscribed clients the latest scan did not confirm, in id order.
    #[must_use]
    pub fn departed(&self) -> Vec<ClientId> {
        let mut gone: Vec<ClientId> = self
            .subscribed
            .iter()
            .filter(|client| !self.last_checked.get(*client).copied().unwrap_or(false))
            .copied()
            .collect();
        gone.sort_unstable();
        gone
    }

    /// Returns true if `client` is subscribed.
    #[must_use]
    pub fn is_subscribed(&self, client: ClientId) -> bool {
        self.subscribed.contains(&client)
    }

    /// Subscribed clients in id order.
    #[must_use]
    pub fn subscribed(&self) -> Vec<ClientId> {
        let mut clients: Vec<ClientId> = self.subscribed.iter().copied().collect();
        clients.sort_unstable();
        clients
    }

    /// Returns the number of subscribed clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribed.len()
    }

    /// Returns true if no client is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ClientId = ClientId(1);
    const B: ClientId = ClientId(2);

    #[test]
    fn test_subscribe_is_idempotent() {
        let mut set = VisibilitySet::new();
        assert!(set.subscribe(A));
        assert!(!set.subscribe(A));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_unsubscribe_purges_both_maps() {
        let mut set = VisibilitySet::new();
        set.subscribe(A);
        set.mark_checked(A);

        assert!(set.unsubscribe(A));
        assert!(!set.is_subscribed(A));
        assert!(!set.checked_clients().contains_key(&A));
        assert!(set.is_empty());
    }

    #[test]
    fn test_unsubscribe_unknown_client() {
        let mut set = VisibilitySet::new();
        assert!(!set.unsubscribe(A));
    }

    #[test]
    fn test_mark_unchecked() {
        let mut set = VisibilitySet::new();
        set.mark_checked(A);
        set.mark_unchecked(A);
        assert_eq!(set.checked_clients().get(&A), Some(&false));
    }

    #[test]
    fn test_departed_after_scan() {
        let mut set = VisibilitySet::new();
        for client in [A, B] {
            set.subscribe(client);
            set.mark_checked(client);
        }

        // Next scan only finds A.
        set.uncheck_all();
        set.mark_checked(A);

        assert_eq!(set.departed(), vec![B]);
        set.unsubscribe(B);
        assert!(set.departed().is_empty());
        assert_eq!(set.subscribed(), vec![A]);
    }

    #[test]
    fn test_subscribed_without_check_counts_as_departed() {
        let mut set = VisibilitySet::new();
        set.subscribe(A);
        assert_eq!(set.departed(), vec![A]);
    }

    #[test]
    fn test_uncheck_all_forgets_non_subscribers() {
        let mut set = VisibilitySet::new();
        set.subscribe(A);
        set.mark_checked(A);
        set.mark_checked(B);
        set.mark_unchecked(ClientId(3));
        assert_eq!(set.checked_clients().len(), 3);

        set.uncheck_all();
        assert_eq!(set.checked_clients().len(), 1);
        assert_eq!(set.checked_clients().get(&A), Some(&false));
        assert!(set.departed().contains(&A));
    }
}
