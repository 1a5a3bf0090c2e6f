// SPDX-License-Identifier: MIT OR Apache-2.0
//! # dot-kernel: delta-state CRDTs over a causal substrate
//!
//! This crate provides a small family of **delta-state Conflict-Free
//! Replicated Data Types (CRDTs)** built on a shared causality-tracking
//! substrate, following the model of the paper ["Delta State Replicated Data
//! Types"][paper] by Almeida, Shoker, and Baquero.
//!
//! Replicas accept local mutations, emit small **deltas** describing those
//! mutations, and merge deltas (or full states) received from other
//! replicas. Regardless of delivery order, duplication, or partitioning, all
//! replicas that have observed the same set of deltas converge to identical
//! state.
//!
//! [paper]: https://arxiv.org/abs/1603.01529
//!
//! ## Core concepts
//!
//! ### Dots
//!
//! A **dot** is a globally unique identifier for one operation: a
//! [`ReplicaId`] naming the actor plus a counter that increases by one for
//! each of that actor's operations. When a replica makes a change, it
//! generates a new dot, and the dot travels with the delta describing the
//! change.
//!
//! ### Causal context
//!
//! The collection of all dots a replica has observed forms its
//! [`DotContext`]. The context represents the replica's knowledge of the
//! system's history, and because each actor's counters are dense, it
//! compresses well: a per-replica watermark covers every contiguous prefix,
//! and only out-of-order dots are stored individually (see
//! [`DotContext::compact`]).
//!
//! ### The kernel, and removals without tombstone records
//!
//! A [`DotKernel`] maps live dots to payload values and is anchored in a
//! context: every stored dot is also in the context. A removal simply drops
//! the entry — the dot stays behind in the context. When two kernels
//! [`join`](DotKernel::join), an entry present on one side only is kept iff
//! the other side's context does *not* contain its dot; if it does, the
//! other side observed the write and removed it, and the entry is dropped.
//! This is **observed-remove** semantics: removals affect exactly the writes
//! the remover had seen, concurrent writes survive, and no per-removal
//! record accumulates.
//!
//! ## The CRDTs
//!
//! - [`MvReg`]: a **Multi-Value Register**. Concurrent writes are all
//!   preserved; the next write collapses them.
//! - [`OrSet`]: an add-wins **Observed-Remove Set**.
//!
//! Both are thin layers over the kernel, and are also the recipe for
//! building your own types on top of it.
//!
//! ## Getting started: a conflict, observed and resolved
//!
//! ```rust
//! use dot_kernel::{MvReg, ReplicaId};
//!
//! let mut alice = MvReg::new(ReplicaId::new("alice").unwrap());
//! let mut bob = MvReg::new(ReplicaId::new("bob").unwrap());
//!
//! // Alice writes, and Bob catches up.
//! let delta = alice.write("draft v1");
//! bob.join(&delta);
//! assert_eq!(alice.kernel(), bob.kernel());
//!
//! // Disconnected, both edit.
//! let from_alice = alice.write("alice's v2");
//! let from_bob = bob.write("bob's v2");
//!
//! // On reconnect they exchange deltas; both writes survive on both sides.
//! alice.join(&from_bob);
//! bob.join(&from_alice);
//! assert!(alice.is_conflicted());
//! assert_eq!(alice.kernel(), bob.kernel());
//!
//! // Whoever writes next resolves the conflict.
//! let resolution = alice.write("merged v3");
//! bob.join(&resolution);
//! assert_eq!(bob.values().collect::<Vec<_>>(), [&"merged v3"]);
//! ```
//!
//! ## Scope
//!
//! This crate is the data-structure layer only. **It does not include any
//! networking or serialization**: you are responsible for encoding deltas
//! and shipping them between replicas, and the lattice laws (join is
//! idempotent, commutative, associative) mean any at-least-once, any-order
//! channel is good enough for convergence. No thread-safety is provided
//! either — a replica's types are meant to live on one thread (or behind a
//! host-provided lock), and kernels sharing a causal frame (see
//! [`SharedContext`]) are reference-linked single-threaded structures by
//! design.
#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;

pub mod causal_context;
pub use causal_context::{Dot, DotContext, InvalidDot, InvalidDotFormat, ReplicaId};
mod kernel;
pub use kernel::{ContextRef, DotFun, DotKernel, SharedContext};
pub mod lattice;
pub use lattice::{Lattice, Max};
pub mod crdts;
pub use crdts::{mvreg::MvReg, orset::OrSet};

#[cfg(test)]
pub(crate) mod test_util;
