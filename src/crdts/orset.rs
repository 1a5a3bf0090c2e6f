// SPDX-License-Identifier: MIT OR Apache-2.0
use crate::causal_context::ReplicaId;
use crate::kernel::{DotKernel, SharedContext};
use std::fmt;

/// An add-wins **Observed-Remove Set**.
///
/// Membership is carried by kernel entries: each addition stores the element
/// under a fresh dot, and an element is in the set while at least one of its
/// dots is live. A removal tombstones only the dots the remover has
/// *observed*, so an addition concurrent with a removal always survives the
/// merge — the remover cannot retract what it never saw.
///
/// ## Example
///
/// ```rust
/// # use dot_kernel::{OrSet, ReplicaId};
/// let mut s1 = OrSet::new(ReplicaId::new("n1").unwrap());
/// let mut s2 = OrSet::new(ReplicaId::new("n2").unwrap());
///
/// let d = s1.add("apple");
/// s2.join(&d);
/// assert!(s2.contains(&"apple"));
///
/// // s2 removes the apple while s1 concurrently re-adds it
/// let removal = s2.remove(&"apple");
/// let re_add = s1.add("apple");
/// s1.join(&removal);
/// s2.join(&re_add);
///
/// // the concurrent add wins on both sides
/// assert!(s1.contains(&"apple"));
/// assert!(s2.contains(&"apple"));
/// assert_eq!(s1.kernel(), s2.kernel());
/// ```
#[derive(Clone)]
pub struct OrSet<V> {
    kernel: DotKernel<V>,
    id: ReplicaId,
}

impl<V: fmt::Debug> fmt::Debug for OrSet<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrSet@{}({:?})", self.id, self.kernel)
    }
}

impl<V: Clone + PartialEq> OrSet<V> {
    /// Constructs an empty set for the given replica, owning its causal
    /// context.
    pub fn new(id: ReplicaId) -> Self {
        Self {
            kernel: DotKernel::new(),
            id,
        }
    }

    /// Constructs an empty set drawing dots from a shared causal frame.
    pub fn with_shared_context(id: ReplicaId, context: SharedContext) -> Self {
        Self {
            kernel: DotKernel::with_shared_context(context),
            id,
        }
    }

    /// Adds an element.
    ///
    /// Any copies of the element this replica has observed are superseded
    /// first, so the element ends up carried by exactly one local dot. This
    /// is what makes a re-add dominate every removal that could have
    /// observed the earlier copies.
    pub fn add(&mut self, value: V) -> DotKernel<V> {
        let mut delta = self.kernel.remove_value(&value);
        delta.join(&self.kernel.add(&self.id, value));
        delta
    }

    /// Removes an element.
    ///
    /// Only observed additions are affected; an addition this replica has
    /// not seen survives the exchange.
    pub fn remove(&mut self, value: &V) -> DotKernel<V> {
        self.kernel.remove_value(value)
    }

    /// Removes every element.
    pub fn reset(&mut self) -> DotKernel<V> {
        self.kernel.remove_all()
    }

    /// True if the set currently contains the given element.
    pub fn contains(&self, value: &V) -> bool {
        self.kernel.values().any(|v| v == value)
    }

    /// Iterator over the elements.
    ///
    /// An element added concurrently by several replicas is carried by
    /// several dots until re-added, and yields once per surviving dot.
    pub fn elements(&self) -> impl Iterator<Item = &V> {
        self.kernel.values()
    }

    /// Merges a delta (or a full remote kernel) into this set.
    pub fn join(&mut self, delta: &DotKernel<V>) {
        self.kernel.join(delta);
    }

    /// The underlying kernel; pass it to another replica's [`OrSet::join`]
    /// for a full-state merge.
    pub fn kernel(&self) -> &DotKernel<V> {
        &self.kernel
    }

    /// The id this set writes as.
    pub fn id(&self) -> &ReplicaId {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::rid;

    #[test]
    fn add_remove_locally() {
        let mut set = OrSet::new(rid("n1"));
        assert!(!set.contains(&4));
        set.add(4);
        assert!(set.contains(&4));
        assert!(!set.contains(&2));
        set.remove(&4);
        assert!(!set.contains(&4));
    }

    #[test]
    fn exchange_converges() {
        let mut a = OrSet::new(rid("n1"));
        let mut b = OrSet::new(rid("n2"));
        let da = a.add(4);
        let db = b.add(2);
        a.join(&db);
        b.join(&da);
        assert!(a.contains(&2) && a.contains(&4));
        assert!(b.contains(&2) && b.contains(&4));

        let removal = b.remove(&2);
        a.join(&removal);
        assert!(!a.contains(&2));
        assert!(a.contains(&4));
        assert_eq!(a.kernel(), b.kernel());
    }

    #[test]
    fn concurrent_add_wins_over_remove() {
        let mut a = OrSet::new(rid("n1"));
        let mut b = OrSet::new(rid("n2"));
        let da = a.add(1);
        b.join(&da);

        // b removes while a concurrently re-adds
        let removal = b.remove(&1);
        let re_add = a.add(1);
        assert!(!b.contains(&1));

        a.join(&removal);
        b.join(&re_add);
        assert!(a.contains(&1));
        assert!(b.contains(&1));
        assert_eq!(a.kernel(), b.kernel());
    }

    #[test]
    fn remove_retracts_every_observed_copy() {
        let mut a = OrSet::new(rid("n1"));
        let mut b = OrSet::new(rid("n2"));

        // both add the same element without having synced
        let da = a.add(7);
        let _db = b.add(7);

        // once b has seen a's copy too, its removal retracts both
        b.join(&da);
        let removal = b.remove(&7);
        a.join(&removal);
        assert!(!a.contains(&7));
        assert!(!b.contains(&7));
    }

    #[test]
    fn re_add_supersedes_old_dots() {
        let mut a = OrSet::new(rid("n1"));
        let mut b = OrSet::new(rid("n2"));

        // concurrent adds of the same element leave one copy per replica
        let da = a.add(9);
        let db = b.add(9);
        a.join(&db);
        b.join(&da);
        assert_eq!(a.elements().count(), 2);

        // a re-add collapses them back into a single dot
        let re_add = a.add(9);
        assert_eq!(a.elements().count(), 1);
        b.join(&re_add);
        assert_eq!(b.elements().count(), 1);
        assert_eq!(a.kernel(), b.kernel());
    }

    #[test]
    fn reset_empties_and_propagates() {
        let mut a = OrSet::new(rid("n1"));
        let mut b = OrSet::new(rid("n2"));
        let d1 = a.add(1);
        let d2 = a.add(2);
        b.join(&d1);
        b.join(&d2);

        let reset = a.reset();
        b.join(&reset);
        assert_eq!(a.elements().count(), 0);
        assert_eq!(b.elements().count(), 0);
        assert_eq!(a.kernel(), b.kernel());
    }
}
