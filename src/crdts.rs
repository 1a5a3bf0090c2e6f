// SPDX-License-Identifier: MIT OR Apache-2.0
//! # Consumer CRDTs
//!
//! CRDTs built on the [`DotKernel`](crate::DotKernel). The kernel does the
//! causal bookkeeping; each type here only decides *which* dots a mutation
//! removes and adds, and composes the kernel's deltas into one delta per
//! operation.
//!
//! - **[`MvReg`](mvreg::MvReg)**: a **Multi-Value Register**. A write
//!   overwrites everything the writer has observed; concurrent writes are
//!   all preserved until a later write resolves them.
//!
//! - **[`OrSet`](orset::OrSet)**: an add-wins **Observed-Remove Set**. A
//!   removal only affects additions the remover has observed, so a
//!   concurrent add always survives.
//!
//! Both mutate locally and return a delta [`DotKernel`](crate::DotKernel)
//! for the host to ship to other replicas; applying a delta (or a full
//! remote kernel) goes through `join` on either type.

pub mod mvreg;
pub mod orset;
