// SPDX-License-Identifier: MIT OR Apache-2.0
use crate::causal_context::ReplicaId;
use crate::kernel::{DotKernel, SharedContext};
use std::fmt;

/// A **Multi-Value Register**, a CRDT for storing a single, atomic value.
///
/// ## Conflict handling
///
/// When two replicas concurrently write different values, the register holds
/// both values simultaneously. A read then returns all conflicting values,
/// and the application resolves them however makes sense for its use case. A
/// subsequent write overwrites all conflicting values, resolving the
/// conflict by establishing a new, single value.
///
/// If a value is concurrently cleared and overwritten, the written value
/// wins and the register contains it.
///
/// The register is always in one of three states: empty, single-valued, or
/// multi-valued. [`MvReg::write`] always leaves it single-valued locally;
/// [`MvReg::join`] can move it to multi-valued when the incoming side
/// carries concurrent writes.
///
/// ## Example
///
/// ```rust
/// # use dot_kernel::{MvReg, ReplicaId};
/// let mut r1 = MvReg::new(ReplicaId::new("n1").unwrap());
/// let mut r2 = MvReg::new(ReplicaId::new("n2").unwrap());
///
/// // concurrent writes on both replicas
/// let d1 = r1.write("A");
/// let d2 = r2.write("B");
///
/// // after exchanging deltas, both replicas hold both values
/// r1.join(&d2);
/// r2.join(&d1);
/// let mut seen: Vec<_> = r1.values().collect();
/// seen.sort();
/// assert_eq!(seen, [&"A", &"B"]);
/// assert!(r1.is_conflicted());
/// assert_eq!(r1.kernel(), r2.kernel());
///
/// // the next write collapses the conflict
/// let d3 = r1.write("C");
/// r2.join(&d3);
/// assert_eq!(r2.values().collect::<Vec<_>>(), [&"C"]);
/// ```
#[derive(Clone)]
pub struct MvReg<V> {
    kernel: DotKernel<V>,
    id: ReplicaId,
}

impl<V: fmt::Debug> fmt::Debug for MvReg<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MvReg@{}({:?})", self.id, self.kernel)
    }
}

impl<V: Clone> MvReg<V> {
    /// Constructs an empty register for the given replica, owning its causal
    /// context.
    pub fn new(id: ReplicaId) -> Self {
        Self {
            kernel: DotKernel::new(),
            id,
        }
    }

    /// Constructs an empty register drawing dots from a shared causal frame.
    pub fn with_shared_context(id: ReplicaId, context: SharedContext) -> Self {
        Self {
            kernel: DotKernel::with_shared_context(context),
            id,
        }
    }

    /// Writes a value, overwriting everything this replica has observed.
    ///
    /// The returned delta is the union of the removal and the new write: at
    /// a replica that has seen the same history it leaves only `value`, while
    /// a concurrent write elsewhere survives the exchange (neither side's
    /// context contains the other's fresh dot).
    pub fn write(&mut self, value: V) -> DotKernel<V> {
        let mut delta = self.kernel.remove_all();
        delta.join(&self.kernel.add(&self.id, value));
        delta
    }

    /// Clears the register.
    ///
    /// Unlike [`MvReg::write`], no new dot is minted; the delta carries the
    /// removals only.
    pub fn reset(&mut self) -> DotKernel<V> {
        self.kernel.remove_all()
    }

    /// The current value set: one value when the register is settled, or one
    /// per concurrent write while a conflict is unresolved.
    pub fn values(&self) -> impl ExactSizeIterator<Item = &V> {
        self.kernel.values()
    }

    /// The number of currently held values.
    pub fn len(&self) -> usize {
        self.kernel.len()
    }

    /// True if no value has been written, or the last writes were cleared.
    pub fn is_empty(&self) -> bool {
        self.kernel.is_empty()
    }

    /// True if the register currently holds more than one concurrent value.
    pub fn is_conflicted(&self) -> bool {
        self.kernel.len() > 1
    }

    /// Merges a delta (or a full remote kernel) into this register.
    pub fn join(&mut self, delta: &DotKernel<V>) {
        self.kernel.join(delta);
    }

    /// The underlying kernel; pass it to another replica's [`MvReg::join`]
    /// for a full-state merge.
    pub fn kernel(&self) -> &DotKernel<V> {
        &self.kernel
    }

    /// The id this register writes as.
    pub fn id(&self) -> &ReplicaId {
        &self.id
    }
}
