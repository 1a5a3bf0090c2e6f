// SPDX-License-Identifier: MIT OR Apache-2.0
//! # Dot Kernel
//!
//! This module defines the causally-anchored dot→value store that underpins
//! every CRDT in this crate. The construction follows the "dot store" model
//! of the 2018 paper _Delta state replicated data types_ by Paulo Sérgio
//! Almeida, Ali Shoker, and Carlos Baquero.
//!
//! ## Overview
//!
//! A [`DotFun`] is a map from [`Dot`]s to opaque payload values, kept sorted
//! by dot. A [`DotKernel`] pairs a `DotFun` with a [`DotContext`] tracking
//! every dot the replica has observed. The pairing is what makes removals
//! work without tombstone records: a dot that is *present in the context* but
//! *absent from the store* has been observed and removed, and
//! [`DotKernel::join`] uses exactly this to decide, for each entry present on
//! only one side, whether it is new (keep it) or removed (drop it).
//!
//! Every mutation returns a **delta**: a fresh kernel containing only the
//! dots the mutation touched and the minimal context needed to explain them.
//! Deltas merge into any other kernel via `join`; merging a full kernel is
//! the degenerate case where the delta happens to carry the whole state.
//!
//! ## Shared causal frames
//!
//! A composite CRDT may give several kernels belonging to one replica the
//! *same* context so that all of their dots draw from a single causal frame
//! (see [`SharedContext`]). A kernel created with [`DotKernel::new`] owns a
//! private context instead. [`DotKernel::clone`] preserves whichever
//! arrangement the kernel was created with.
use crate::causal_context::{Dot, DotContext, ReplicaId};
use crate::lattice::Lattice;
use smallvec::SmallVec;
use std::{
    cell::{Ref, RefCell},
    cmp::Ordering,
    fmt, mem,
    ops::Deref,
    rc::Rc,
};

/// Handle to a [`DotContext`] shared by several kernels of one replica.
///
/// All kernels holding the same handle mint dots from one causal frame, so
/// each [`DotKernel::dot_add`] yields a dot unique across all of them.
pub type SharedContext = Rc<RefCell<DotContext>>;

impl DotContext {
    /// Wraps this context in a [`SharedContext`] handle so several kernels
    /// can draw dots from it.
    pub fn into_shared(self) -> SharedContext {
        Rc::new(RefCell::new(self))
    }
}

/// A map from [`Dot`] to `V` whose key set is the set of live writes.
///
/// The store is explicitly ordered by dot so that merges can walk two stores
/// in lockstep and so that iteration order (and thus the debug rendering) is
/// deterministic regardless of insertion order.
#[derive(Clone, PartialEq, Eq)]
pub struct DotFun<V> {
    state: SmallVec<[(Dot, V); 1]>,
}

impl<V: fmt::Debug> fmt::Debug for DotFun<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

// manual impl because an auto-derive'd `Default` would require `V: Default`.
impl<V> Default for DotFun<V> {
    fn default() -> Self {
        Self {
            state: Default::default(),
        }
    }
}

impl<V> DotFun<V> {
    /// Constructs a [`DotFun`] with the given initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: SmallVec::with_capacity(capacity),
        }
    }

    /// Produces an iterator over the map's keys and values, in dot order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&Dot, &V)> {
        self.state.iter().map(|(k, v)| (k, v))
    }

    /// Produces an iterator over the map's keys, in dot order.
    pub fn keys(&self) -> impl ExactSizeIterator<Item = &Dot> {
        self.state.iter().map(|(k, _)| k)
    }

    /// Produces an iterator over the map's values, in dot order.
    pub fn values(&self) -> impl ExactSizeIterator<Item = &V> {
        self.state.iter().map(|(_, v)| v)
    }

    /// Returns the number of keys in the map.
    pub fn len(&self) -> usize {
        self.state.len()
    }

    /// Returns true if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    fn get_index(&self, dot: &Dot) -> Option<usize> {
        self.state
            .as_slice()
            .binary_search_by(|(k, _)| k.cmp(dot))
            .ok()
    }

    /// Retrieves the associated value, if any, for the given [`Dot`].
    pub fn get(&self, dot: &Dot) -> Option<&V> {
        self.get_index(dot).map(|idx| &self.state[idx].1)
    }

    /// Returns `true` if the given [`Dot`] has a value in this map.
    pub fn has(&self, dot: &Dot) -> bool {
        self.get_index(dot).is_some()
    }

    /// Associates the value with the given [`Dot`].
    ///
    /// Returns the previous value if any.
    pub fn set(&mut self, dot: Dot, value: V) -> Option<V> {
        if let Some(idx) = self.get_index(&dot) {
            Some(mem::replace(&mut self.state[idx].1, value))
        } else {
            let idx = self.state.partition_point(|(d, _)| *d < dot);
            self.state.insert(idx, (dot, value));
            None
        }
    }

    /// Removes and returns the value associated with a [`Dot`], if any.
    pub fn remove(&mut self, dot: &Dot) -> Option<V> {
        // as tempting as it may be, we shouldn't use swap_remove here as we
        // want to keep the list sorted
        self.get_index(dot).map(|idx| self.state.remove(idx).1)
    }

    /// Retains only the values for which a predicate is true.
    pub fn retain(&mut self, mut f: impl FnMut(&Dot, &mut V) -> bool) {
        self.state.retain(|(k, v)| f(k, v))
    }

    /// Removes and yields all entries.
    pub fn drain(&mut self) -> impl Iterator<Item = (Dot, V)> + '_ {
        self.state.drain(..)
    }

    /// Appends an entry whose dot must sort after every existing key.
    pub(crate) fn push(&mut self, dot: Dot, value: V) {
        debug_assert!(
            self.state.last().is_none_or(|(last, _)| *last < dot),
            "push would break dot ordering"
        );
        self.state.push((dot, value));
    }
}

impl<V> IntoIterator for DotFun<V> {
    type Item = (Dot, V);
    type IntoIter = smallvec::IntoIter<[(Dot, V); 1]>;

    fn into_iter(self) -> Self::IntoIter {
        self.state.into_iter()
    }
}

/// Read access to a kernel's live [`DotContext`], owned or shared.
pub struct ContextRef<'k>(ContextRefRepr<'k>);

enum ContextRefRepr<'k> {
    Owned(&'k DotContext),
    Shared(Ref<'k, DotContext>),
}

impl Deref for ContextRef<'_> {
    type Target = DotContext;

    fn deref(&self) -> &DotContext {
        match &self.0 {
            ContextRefRepr::Owned(context) => context,
            ContextRefRepr::Shared(context) => context,
        }
    }
}

impl fmt::Debug for ContextRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

/// A causally-anchored dot→value store.
///
/// Every key in the store is a member of the kernel's context (the store is
/// *anchored*); a context member absent from the store is an implicit
/// observed-remove tombstone. [`DotKernel::join`] never resurrects a dot a
/// replica has removed.
///
/// # Cloning
///
/// `Clone` preserves the context-ownership mode: a kernel owning its context
/// clones into a fully independent kernel, while a kernel participating in a
/// shared causal frame clones into another participant of the *same* frame
/// (the handle is cloned by reference, the private base context by value).
/// The store itself is always deep-copied. Without this rule, cloning a
/// participant in a shared frame would silently detach it.
///
/// # Example
///
/// ```rust
/// # use dot_kernel::{DotKernel, ReplicaId};
/// let a = ReplicaId::new("a").unwrap();
/// let b = ReplicaId::new("b").unwrap();
///
/// let mut k1 = DotKernel::new();
/// let delta = k1.add(&a, "x");
///
/// // an empty replica catches up by merging the delta
/// let mut k2 = DotKernel::new();
/// k2.join(&delta);
/// assert_eq!(k1, k2);
///
/// // a removal observed on one side takes effect on the other
/// let removal = k2.remove_value(&"x");
/// k1.join(&removal);
/// assert!(k1.is_empty());
///
/// // ...but an unobserved write survives merging with the removal
/// let mut k3 = DotKernel::new();
/// let _ = k3.add(&b, "y");
/// k3.join(&removal);
/// assert_eq!(k3.values().collect::<Vec<_>>(), [&"y"]);
/// ```
#[derive(Clone)]
pub struct DotKernel<V> {
    entries: DotFun<V>,
    /// Context shared with sibling kernels, if this kernel participates in a
    /// shared causal frame.
    shared: Option<SharedContext>,
    /// Privately owned context; authoritative when `shared` is `None`, and
    /// kept only so that `Clone` has a separately-copyable context when the
    /// live one is externally owned.
    base: DotContext,
}

// manual impl because an auto-derive'd `Default` would require `V: Default`.
impl<V> Default for DotKernel<V> {
    fn default() -> Self {
        Self {
            entries: DotFun::default(),
            shared: None,
            base: DotContext::new(),
        }
    }
}

impl<V: PartialEq> PartialEq for DotKernel<V> {
    /// Kernels compare by store and live-context *contents*; whether the
    /// context is owned or shared is not part of the state.
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries && *self.context() == *other.context()
    }
}

impl<V: Eq> Eq for DotKernel<V> {}

impl<V: fmt::Debug> fmt::Display for DotKernel<V> {
    /// Renders the kernel as `Kernel: DS (a:1->"x") Context: CC (a:1) DC ()`.
    ///
    /// This format is meant for humans and is not a stable contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kernel: DS (")?;
        for (i, (dot, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{dot}->{value:?}")?;
        }
        write!(f, ") {}", &*self.context())
    }
}

impl<V: fmt::Debug> fmt::Debug for DotKernel<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<V> DotKernel<V> {
    /// Constructs an empty kernel owning a fresh, private context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructs an empty kernel drawing dots from the given shared causal
    /// frame.
    pub fn with_shared_context(context: SharedContext) -> Self {
        Self {
            entries: DotFun::default(),
            shared: Some(context),
            base: DotContext::new(),
        }
    }

    /// Read access to the kernel's live context.
    pub fn context(&self) -> ContextRef<'_> {
        match &self.shared {
            Some(handle) => ContextRef(ContextRefRepr::Shared(handle.borrow())),
            None => ContextRef(ContextRefRepr::Owned(&self.base)),
        }
    }

    fn with_context_mut<R>(&mut self, f: impl FnOnce(&mut DotContext) -> R) -> R {
        match &self.shared {
            Some(handle) => f(&mut handle.borrow_mut()),
            None => f(&mut self.base),
        }
    }

    /// Retrieves the value stored under the given [`Dot`], if any.
    pub fn get(&self, dot: &Dot) -> Option<&V> {
        self.entries.get(dot)
    }

    /// Iterator over the live entries, in dot order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&Dot, &V)> {
        self.entries.iter()
    }

    /// Iterator over the live dots, in dot order.
    pub fn dots(&self) -> impl ExactSizeIterator<Item = &Dot> {
        self.entries.keys()
    }

    /// Iterator over the live values, in dot order.
    pub fn values(&self) -> impl ExactSizeIterator<Item = &V> {
        self.entries.values()
    }

    /// The number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the kernel holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry.
    ///
    /// The removed dots stay in this kernel's context as implicit
    /// tombstones. The returned delta carries them in *its* context (and an
    /// empty store), so merging it elsewhere deletes the same dots.
    pub fn remove_all(&mut self) -> DotKernel<V> {
        let mut delta = DotKernel::new();
        delta.base.extend(self.entries.drain().map(|(dot, _)| dot));
        delta
    }

    /// Removes the entry stored under the given dot, if any.
    ///
    /// A dot with no entry yields an empty delta even if the dot exists in
    /// the context: its tombstone is already present and there is nothing
    /// left to say.
    pub fn remove_dot(&mut self, dot: &Dot) -> DotKernel<V> {
        let mut delta = DotKernel::new();
        if self.entries.remove(dot).is_some() {
            delta.base.insert_dot(dot.clone());
        }
        delta
    }
}

impl<V: PartialEq> DotKernel<V> {
    /// Removes every entry whose value equals `value`.
    ///
    /// Equality is `V: PartialEq`; hosts needing a coarser or canonical
    /// notion of equality should express it in `V`'s `PartialEq`.
    pub fn remove_value(&mut self, value: &V) -> DotKernel<V> {
        let mut removed = Vec::new();
        self.entries.retain(|dot, v| {
            if *v == *value {
                removed.push(dot.clone());
                false
            } else {
                true
            }
        });
        let mut delta = DotKernel::new();
        delta.base.extend(removed);
        delta
    }
}

impl<V: Clone> DotKernel<V> {
    /// Stores `value` under a freshly minted dot.
    ///
    /// Returns a delta kernel whose store holds exactly the new entry and
    /// whose context holds exactly the new dot.
    pub fn add(&mut self, id: &ReplicaId, value: V) -> DotKernel<V> {
        let dot = self.dot_add(id, value.clone());
        let mut delta = DotKernel::new();
        delta.base.insert_dot(dot.clone());
        delta.entries.set(dot, value);
        delta
    }

    /// Stores `value` under a freshly minted dot and returns the dot only.
    ///
    /// Use this instead of [`DotKernel::add`] when composing deltas at a
    /// higher level.
    pub fn dot_add(&mut self, id: &ReplicaId, value: V) -> Dot {
        let dot = self.with_context_mut(|cc| cc.make_dot(id));
        self.entries.set(dot.clone(), value);
        dot
    }

    /// The causal merge.
    ///
    /// Entries present on both sides are kept (the same dot always names the
    /// same write). An entry present on one side only is kept iff the other
    /// side has *not* observed its dot; if it has, the absence is a removal
    /// and the entry is dropped. Finally the contexts join. The operation is
    /// idempotent, commutative, and associative, so deltas may be delivered
    /// out of order, more than once, or bundled into full states.
    pub fn join(&mut self, other: &DotKernel<V>) {
        self.join_with(other, |_ours, _theirs| {
            // same dot implies same write; keep ours
        });
    }

    fn join_with(&mut self, other: &DotKernel<V>, mut merge_values: impl FnMut(&mut V, &V)) {
        // a self-join can't change anything, and interleaving iteration with
        // mutation of the same store must never happen
        if std::ptr::eq(self, other) {
            return;
        }
        let ours = mem::take(&mut self.entries);
        let merged = {
            let our_cc = self.context();
            let their_cc = other.context();
            Self::merge_entries(ours, &our_cc, &other.entries, &their_cc, &mut merge_values)
        };
        self.entries = merged;

        // kernels in the same causal frame already share one context; a join
        // of it with itself is a no-op (and would deadlock the RefCell)
        let same_frame = match (&self.shared, &other.shared) {
            (Some(ours), Some(theirs)) => Rc::ptr_eq(ours, theirs),
            _ => false,
        };
        if !same_frame {
            let their_cc = other.context();
            self.with_context_mut(|cc| cc.join(&their_cc));
        }
    }

    /// Walks both stores in dot order with a two-pointer merge, deciding
    /// each entry against the two *pre-join* contexts.
    fn merge_entries(
        ours: DotFun<V>,
        our_cc: &DotContext,
        theirs: &DotFun<V>,
        their_cc: &DotContext,
        merge_values: &mut impl FnMut(&mut V, &V),
    ) -> DotFun<V> {
        enum Next {
            Ours,
            Theirs,
            Both,
        }

        let mut merged = DotFun::with_capacity(ours.len().max(theirs.len()));
        let mut ours = ours.into_iter().peekable();
        let mut theirs = theirs.iter().peekable();
        loop {
            let next = match (ours.peek(), theirs.peek()) {
                (None, None) => break,
                (Some(_), None) => Next::Ours,
                (None, Some(_)) => Next::Theirs,
                (Some((our_dot, _)), Some(&(their_dot, _))) => match our_dot.cmp(their_dot) {
                    Ordering::Less => Next::Ours,
                    Ordering::Greater => Next::Theirs,
                    Ordering::Equal => Next::Both,
                },
            };
            match next {
                Next::Ours => {
                    let (dot, value) = ours.next().expect("peeked above");
                    // keep only if the other side never observed the dot;
                    // otherwise it observed and removed it
                    if !their_cc.dot_in(&dot) {
                        merged.push(dot, value);
                    }
                }
                Next::Theirs => {
                    let (dot, value) = theirs.next().expect("peeked above");
                    // copy only if we never observed the dot; otherwise we
                    // observed and removed it, and it must not resurrect
                    if !our_cc.dot_in(dot) {
                        merged.push(dot.clone(), value.clone());
                    }
                }
                Next::Both => {
                    let (dot, mut value) = ours.next().expect("peeked above");
                    let (_, their_value) = theirs.next().expect("peeked above");
                    merge_values(&mut value, their_value);
                    merged.push(dot, value);
                }
            }
        }
        merged
    }
}

impl<V: Clone + Lattice> DotKernel<V> {
    /// Like [`DotKernel::join`], but when a dot is present on both sides the
    /// payloads are merged via [`Lattice::join`] instead of assumed equal.
    ///
    /// This supports payloads that are themselves join-semilattice elements,
    /// such as counters holding numbers or embedded CRDTs.
    pub fn deep_join(&mut self, other: &DotKernel<V>) {
        self.join_with(other, |ours, theirs| ours.join(theirs));
    }
}
