// SPDX-License-Identifier: MIT OR Apache-2.0
//! # Causal Context
//!
//! This module provides the core data structures for tracking causality.
//! Causal consistency is maintained by tracking the history of operations
//! using `Dot`s, which are globally unique identifiers for each operation.
//! The set of all observed dots forms a `DotContext`.
//!
//! - **[`ReplicaId`]**: a unique identifier for an actor in the system. It is
//!   an opaque, non-empty string chosen by the host; the library never
//!   generates or interprets it beyond ordering and equality.
//!
//! - **[`Dot`]**: a globally unique identifier for a single operation (for
//!   example, a write into a register). It consists of a `ReplicaId` and a
//!   counter, which is monotonically increasing for that specific actor.
//!
//! - **[`DotContext`]**: the set of all `Dot`s that a replica has observed.
//!   It represents the replica's knowledge of the system's history. By
//!   comparing `DotContext`s, replicas can determine which operations are
//!   new, concurrent, or have already been seen, enabling correct merging of
//!   states.
//!
//! The `DotContext` is stored in two parts: a *compact causal context*
//! mapping each replica to the greatest counter `c` such that every dot
//! `(id, 1)..=(id, c)` has been observed, and a *dot cloud* of out-of-order
//! dots waiting for the gap below them to fill in. [`DotContext::compact`]
//! moves dots from the cloud into the compact form as soon as they become
//! contiguous, so the common case (in-order delivery) costs one map entry
//! per replica no matter how many operations it has performed.
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    num::NonZeroU64,
    str::FromStr,
};

/// The delimiter between the replica id and the counter in a dot's wire form.
const DOT_DELIMITER: char = ':';

/// Error returned when a value does not name a well-formed dot.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum InvalidDot {
    /// The replica id was empty.
    EmptyId,
    /// The replica id contained the `':'` wire delimiter.
    ReservedDelimiter,
    /// The counter was zero. Real dots start at counter 1; zero exists only
    /// as the implicit "nothing observed" watermark of a [`DotContext`].
    ZeroCounter,
}

impl fmt::Display for InvalidDot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidDot::EmptyId => write!(f, "replica id is empty"),
            InvalidDot::ReservedDelimiter => {
                write!(
                    f,
                    "replica id contains the reserved delimiter '{DOT_DELIMITER}'"
                )
            }
            InvalidDot::ZeroCounter => write!(f, "dot counter must be >= 1"),
        }
    }
}

impl std::error::Error for InvalidDot {}

/// Error returned when parsing a dot from its `"id:counter"` wire form fails.
#[derive(Debug, Eq, PartialEq, Clone)]
pub enum InvalidDotFormat {
    /// The string contained no `':'` delimiter.
    MissingDelimiter,
    /// The part after the delimiter was not a base-10 integer in range.
    Counter,
    /// The part before the delimiter was not a valid replica id, or the
    /// counter was zero.
    Id(InvalidDot),
}

impl fmt::Display for InvalidDotFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidDotFormat::MissingDelimiter => {
                write!(f, "expected \"id{DOT_DELIMITER}counter\"")
            }
            InvalidDotFormat::Counter => write!(f, "counter is not a valid integer"),
            InvalidDotFormat::Id(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for InvalidDotFormat {}

impl From<InvalidDot> for InvalidDotFormat {
    fn from(value: InvalidDot) -> Self {
        Self::Id(value)
    }
}

/// The identifier we use for actors in the system.
///
/// A `ReplicaId` is an opaque, non-empty string. The only constraint beyond
/// non-emptiness is that it may not contain `':'`, which is reserved as the
/// delimiter in a [`Dot`]'s wire form.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplicaId(Box<str>);

impl ReplicaId {
    /// Constructs a new `ReplicaId` from the given string.
    pub fn new(id: impl Into<String>) -> Result<Self, InvalidDot> {
        let id = id.into();
        if id.is_empty() {
            return Err(InvalidDot::EmptyId);
        }
        if id.contains(DOT_DELIMITER) {
            return Err(InvalidDot::ReservedDelimiter);
        }
        Ok(Self(id.into_boxed_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReplicaId {
    type Err = InvalidDot;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for ReplicaId {
    type Error = InvalidDot;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for ReplicaId {
    type Error = InvalidDot;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ReplicaId> for String {
    fn from(value: ReplicaId) -> Self {
        value.0.into_string()
    }
}

/// A unique identifier for an operation.
///
/// Every mutation is assigned a unique identity in the form of a `Dot`: a
/// combination of the mutating replica's id and an ever-increasing counter.
///
/// Dots are ordered by the replica id *first* and *then* the counter, and are
/// value types: equality is structural on `(id, counter)`.
///
/// The wire form of a dot is the exact string `"{id}:{counter}"`, which
/// [`fmt::Display`] produces and [`FromStr`] parses. The round-trip is exact.
///
/// ```rust
/// # use dot_kernel::Dot;
/// let dot = Dot::mint("a", 3);
/// assert_eq!(dot.to_string(), "a:3");
/// assert_eq!("a:3".parse::<Dot>().unwrap(), dot);
/// assert!("a".parse::<Dot>().is_err());
/// assert!("a:0".parse::<Dot>().is_err());
/// assert!("a:b:1".parse::<Dot>().is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Dot {
    id: ReplicaId,
    counter: NonZeroU64,
}

impl fmt::Debug for Dot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{DOT_DELIMITER}{}", self.id, self.counter)
    }
}

impl fmt::Display for Dot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{DOT_DELIMITER}{}", self.id, self.counter)
    }
}

impl Dot {
    /// Constructs a new `Dot` for the given replica and counter.
    pub fn new(id: ReplicaId, counter: NonZeroU64) -> Self {
        Self { id, counter }
    }

    /// Creates a new [`Dot`] out of thin air.
    ///
    /// All real dots should be made through a [`DotContext`]. This
    /// constructor is mainly useful for tests and documentation examples.
    ///
    /// # Panics
    ///
    /// If `id` is not a valid [`ReplicaId`] or `counter == 0`.
    pub fn mint(id: &str, counter: u64) -> Self {
        let id = ReplicaId::new(id).expect("invalid replica id");
        let counter = NonZeroU64::new(counter).expect("attempted to mint a dot with counter 0");
        Self { id, counter }
    }

    /// Returns the [`ReplicaId`] of the actor that produced this [`Dot`].
    pub fn actor(&self) -> &ReplicaId {
        &self.id
    }

    /// Returns the counter (ie, per-actor operation index) of this [`Dot`].
    pub fn counter(&self) -> NonZeroU64 {
        self.counter
    }
}

impl From<(ReplicaId, NonZeroU64)> for Dot {
    fn from((id, counter): (ReplicaId, NonZeroU64)) -> Self {
        Self { id, counter }
    }
}

impl TryFrom<(&str, u64)> for Dot {
    type Error = InvalidDot;

    fn try_from((id, counter): (&str, u64)) -> Result<Self, Self::Error> {
        let id = ReplicaId::new(id)?;
        let counter = NonZeroU64::new(counter).ok_or(InvalidDot::ZeroCounter)?;
        Ok(Self { id, counter })
    }
}

impl FromStr for Dot {
    type Err = InvalidDotFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, counter) = s
            .split_once(DOT_DELIMITER)
            .ok_or(InvalidDotFormat::MissingDelimiter)?;
        // NOTE: u64's FromStr also accepts a leading '+', which is not part
        // of the wire form.
        if counter.is_empty() || !counter.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidDotFormat::Counter);
        }
        let counter: u64 = counter.parse().map_err(|_| InvalidDotFormat::Counter)?;
        let counter = NonZeroU64::new(counter).ok_or(InvalidDot::ZeroCounter)?;
        Ok(Self {
            id: ReplicaId::new(id)?,
            counter,
        })
    }
}

impl TryFrom<&str> for Dot {
    type Error = InvalidDotFormat;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<String> for Dot {
    type Error = InvalidDotFormat;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Dot> for String {
    fn from(value: Dot) -> Self {
        value.to_string()
    }
}

/// Tracks the set of dots observed from each actor in the system.
///
/// This type can be used both to track observed causal history, and to
/// produce new `Dot`s via [`DotContext::make_dot`].
///
/// # Examples
///
/// ## Producing [`Dot`]s
///
/// ```rust
/// # use dot_kernel::{Dot, DotContext, ReplicaId};
/// let id = ReplicaId::new("a").unwrap();
/// let mut cause = DotContext::new();
///
/// // Counters start at 1 and grow contiguously:
/// let dot1 = cause.make_dot(&id);
/// let dot2 = cause.make_dot(&id);
/// assert_eq!(dot1, Dot::mint("a", 1));
/// assert_eq!(dot2, Dot::mint("a", 2));
///
/// // If one dot is produced after another, it is also ordered after:
/// assert!(dot2 > dot1);
///
/// // The context considers any dot it produced as observed:
/// assert!(cause.dot_in(&dot1));
/// assert!(cause.dot_in(&dot2));
/// ```
///
/// ## Tracking causal history
///
/// ```rust
/// # use dot_kernel::{Dot, DotContext};
/// let mut cause = DotContext::new();
///
/// // With nothing observed, no dots are in the context:
/// assert!(!cause.dot_in(&Dot::mint("a", 1)));
///
/// // Once a dot is observed, that dot is in the context, but no others:
/// cause.insert_dot(Dot::mint("a", 1));
/// assert!(cause.dot_in(&Dot::mint("a", 1)));
/// assert!(!cause.dot_in(&Dot::mint("a", 2)));
/// assert!(!cause.dot_in(&Dot::mint("b", 1)));
///
/// // The context can track out-of-order dots:
/// cause.insert_dot(Dot::mint("a", 10));
/// assert!(cause.dot_in(&Dot::mint("a", 10)));
/// assert!(!cause.dot_in(&Dot::mint("a", 9)));
/// assert!(!cause.dot_in(&Dot::mint("a", 11)));
///
/// // Contiguous dots are absorbed into the compact form; the cloud only
/// // holds dots above a gap:
/// cause.extend([Dot::mint("a", 2), Dot::mint("a", 3)]);
/// assert_eq!(cause.contiguous(&"a".parse().unwrap()), 3);
/// assert_eq!(cause.cloud_dots().count(), 1);
/// ```
#[derive(Default, Clone, PartialEq, Eq)]
pub struct DotContext {
    /// Compact causal context: `id -> c` asserts that every dot
    /// `(id, 1)..=(id, c)` has been observed. Entries are always >= 1.
    ccc: BTreeMap<ReplicaId, u64>,
    /// Dot cloud: dots observed out of order, ie, with a gap below them.
    cloud: BTreeSet<Dot>,
}

impl fmt::Debug for DotContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for DotContext {
    /// Renders the context as `Context: CC (a:1 b:3) DC (c:4)`.
    ///
    /// This format is meant for humans and is not a stable contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Context: CC (")?;
        for (i, (id, max)) in self.ccc.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{id}{DOT_DELIMITER}{max}")?;
        }
        write!(f, ") DC (")?;
        for (i, dot) in self.cloud.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{dot}")?;
        }
        write!(f, ")")
    }
}

impl DotContext {
    /// Constructs a new, empty [`DotContext`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Determines if the given `dot` has been observed by this context.
    ///
    /// A dot `(id, n)` is a member iff `n` is at or below the contiguous
    /// watermark for `id`, or the dot sits in the cloud. Membership is
    /// monotone: once a dot is in, no operation takes it out.
    #[must_use]
    pub fn dot_in(&self, dot: &Dot) -> bool {
        self.ccc
            .get(&dot.id)
            .is_some_and(|&max| dot.counter.get() <= max)
            || self.cloud.contains(dot)
    }

    /// Produces (and records) the next [`Dot`] for the given replica.
    ///
    /// The counters handed out for a given replica form the contiguous
    /// sequence 1, 2, 3, …, so the returned dot is never already a member.
    pub fn make_dot(&mut self, id: &ReplicaId) -> Dot {
        let counter = *self
            .ccc
            .entry(id.clone())
            .and_modify(|max| *max += 1)
            .or_insert(1);
        let dot = Dot {
            id: id.clone(),
            counter: NonZeroU64::new(counter).expect("watermark was just incremented past 0"),
        };
        // A replica only mints dots for its own id, and its own dots are
        // contiguous, so the cloud can never already hold the minted dot.
        debug_assert!(
            !self.cloud.contains(&dot),
            "minted dot {dot} was already observed"
        );
        dot
    }

    /// Records an observed [`Dot`] and compacts.
    pub fn insert_dot(&mut self, dot: Dot) {
        self.cloud.insert(dot);
        self.compact();
    }

    /// Records multiple observed [`Dot`]s, compacting once at the end.
    fn insert_dots(&mut self, dots: impl IntoIterator<Item = Dot>) {
        self.cloud.extend(dots);
        self.compact();
    }

    /// Normalizes the representation.
    ///
    /// Absorbs cloud dots that have become contiguous with the compact form
    /// into it, and discards cloud dots the compact form already dominates.
    /// Because the cloud iterates in ascending `(id, counter)` order, a
    /// single pass reaches the fixpoint: absorbing `(id, k)` is always
    /// considered before `(id, k + 1)`.
    ///
    /// Compaction never changes membership, only the representation.
    pub fn compact(&mut self) {
        let cloud = std::mem::take(&mut self.cloud);
        for dot in cloud {
            let seq = dot.counter.get();
            let watermark = self.ccc.get(&dot.id).copied().unwrap_or(0);
            if seq <= watermark {
                // dominated by the compact form
            } else if seq == watermark + 1 {
                self.ccc.insert(dot.id, seq);
            } else {
                self.cloud.insert(dot);
            }
        }
    }

    /// Incorporates the observations of another context into this one.
    ///
    /// After the join, all dots known to `other` are considered observed by
    /// `self`. The operation is idempotent, commutative, and associative.
    ///
    /// ```rust
    /// # use dot_kernel::{Dot, DotContext};
    /// let mut cause1 = DotContext::from_iter([
    ///     Dot::mint("a", 1),
    ///     Dot::mint("a", 2),
    ///     Dot::mint("a", 4),
    /// ]);
    /// let cause2 = DotContext::from_iter([
    ///     Dot::mint("a", 3),
    ///     Dot::mint("b", 1),
    /// ]);
    ///
    /// cause1.join(&cause2);
    ///
    /// assert!(cause1.dot_in(&Dot::mint("a", 3)));
    /// assert!(cause1.dot_in(&Dot::mint("b", 1)));
    /// // a:3 filled the gap, so a:4 is now contiguous too:
    /// assert_eq!(cause1.contiguous(&"a".parse().unwrap()), 4);
    /// assert!(!cause1.dot_in(&Dot::mint("a", 5)));
    /// ```
    pub fn join(&mut self, other: &DotContext) {
        // Joining a context into itself must not mutate mid-iteration, and
        // is a no-op anyway.
        if std::ptr::eq(self, other) {
            return;
        }
        for (id, &theirs) in &other.ccc {
            self.ccc
                .entry(id.clone())
                .and_modify(|ours| *ours = (*ours).max(theirs))
                .or_insert(theirs);
        }
        self.cloud.extend(other.cloud.iter().cloned());
        self.compact();
    }

    /// The contiguous watermark for the given replica: the greatest counter
    /// `c` such that every dot `(id, 1)..=(id, c)` has been observed, or 0 if
    /// none have.
    #[must_use]
    pub fn contiguous(&self, id: &ReplicaId) -> u64 {
        self.ccc.get(id).copied().unwrap_or(0)
    }

    /// Iterator over the non-contiguous dots currently held in the cloud.
    pub fn cloud_dots(&self) -> impl Iterator<Item = &Dot> {
        self.cloud.iter()
    }

    /// True if nothing has been observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        debug_assert!(
            self.ccc.values().all(|&max| max >= 1),
            "compact entries must assert at least one dot"
        );
        self.ccc.is_empty() && self.cloud.is_empty()
    }
}

impl FromIterator<Dot> for DotContext {
    fn from_iter<T: IntoIterator<Item = Dot>>(iter: T) -> Self {
        let mut cc = DotContext::default();
        cc.insert_dots(iter);
        cc
    }
}

impl Extend<Dot> for DotContext {
    fn extend<T: IntoIterator<Item = Dot>>(&mut self, iter: T) {
        self.insert_dots(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{dot, rid};
    use ahash::HashSet;
    use std::cmp::Ordering;

    #[test]
    fn parse_rejects_malformed() {
        assert_eq!("a:1".parse::<Dot>(), Ok(Dot::mint("a", 1)));
        assert_eq!("a".parse::<Dot>(), Err(InvalidDotFormat::MissingDelimiter));
        assert_eq!("".parse::<Dot>(), Err(InvalidDotFormat::MissingDelimiter));
        assert_eq!(
            ":1".parse::<Dot>(),
            Err(InvalidDotFormat::Id(InvalidDot::EmptyId))
        );
        assert_eq!("a:".parse::<Dot>(), Err(InvalidDotFormat::Counter));
        assert_eq!("a:x".parse::<Dot>(), Err(InvalidDotFormat::Counter));
        assert_eq!("a:+1".parse::<Dot>(), Err(InvalidDotFormat::Counter));
        assert_eq!("a:1x".parse::<Dot>(), Err(InvalidDotFormat::Counter));
        assert_eq!(
            "a:0".parse::<Dot>(),
            Err(InvalidDotFormat::Id(InvalidDot::ZeroCounter))
        );
        // a second delimiter lands in the counter, which then fails to parse
        assert_eq!("a:b:1".parse::<Dot>(), Err(InvalidDotFormat::Counter));
    }

    #[test]
    fn replica_id_rejects_malformed() {
        assert_eq!(ReplicaId::new(""), Err(InvalidDot::EmptyId));
        assert_eq!(ReplicaId::new("a:b"), Err(InvalidDot::ReservedDelimiter));
        assert_eq!(Dot::try_from(("a", 0)), Err(InvalidDot::ZeroCounter));
    }

    #[quickcheck]
    fn dot_round_trip(dot: Dot) {
        assert_eq!(dot.to_string().parse::<Dot>(), Ok(dot));
    }

    #[quickcheck]
    fn dot_order_is_total(a: Dot, b: Dot, c: Dot) {
        assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
        assert_eq!(a.cmp(&b) == Ordering::Equal, a == b);
        if a.cmp(&b) != Ordering::Greater && b.cmp(&c) != Ordering::Greater {
            assert_ne!(a.cmp(&c), Ordering::Greater);
        }
    }

    #[test]
    fn dot_order_is_id_then_counter() {
        assert!(Dot::mint("a", 9) < Dot::mint("b", 1));
        assert!(Dot::mint("a", 1) < Dot::mint("a", 2));
        assert_eq!(Dot::mint("a", 1), Dot::mint("a", 1));
    }

    #[test]
    fn make_dot_is_contiguous() {
        let mut cc = DotContext::new();
        let a = rid("a");
        let b = rid("b");
        assert_eq!(cc.make_dot(&a), dot("a", 1));
        assert_eq!(cc.make_dot(&a), dot("a", 2));
        assert_eq!(cc.make_dot(&b), dot("b", 1));
        assert_eq!(cc.make_dot(&a), dot("a", 3));
        assert_eq!(cc.contiguous(&a), 3);
        assert_eq!(cc.contiguous(&b), 1);
        assert_eq!(cc.cloud_dots().count(), 0);
    }

    #[test]
    fn compaction_absorbs_out_of_order() {
        // insertion order must not matter for the final representation
        let cc = DotContext::from_iter([dot("a", 2), dot("a", 1)]);
        assert_eq!(cc.contiguous(&rid("a")), 2);
        assert_eq!(cc.cloud_dots().count(), 0);
    }

    #[test]
    fn compaction_leaves_gapped_dots_in_cloud() {
        let mut cc = DotContext::from_iter([dot("a", 1), dot("a", 3), dot("a", 5)]);
        assert_eq!(cc.contiguous(&rid("a")), 1);
        assert_eq!(cc.cloud_dots().count(), 2);

        // a:2 fills the gap below a:3, but a:5 still has one
        cc.insert_dot(dot("a", 2));
        assert_eq!(cc.contiguous(&rid("a")), 3);
        assert_eq!(cc.cloud_dots().collect::<Vec<_>>(), [&dot("a", 5)]);

        cc.insert_dot(dot("a", 4));
        assert_eq!(cc.contiguous(&rid("a")), 5);
        assert_eq!(cc.cloud_dots().count(), 0);
    }

    #[quickcheck]
    fn membership_matches_inserted_set(dots: Vec<Dot>, other_dots: Vec<Dot>) -> bool {
        let cc = DotContext::from_iter(dots.iter().cloned());

        // NOTE: we need the extra set operation here since there _could_ be
        // dots repeated between `dots` and `other_dots`, in which case they
        // _will_ be in the context.
        let has: HashSet<_> = dots.into_iter().collect();
        let mut doesnt_have = other_dots.into_iter().filter(|dot| !has.contains(dot));

        has.iter().all(|dot| cc.dot_in(dot)) && doesnt_have.all(|dot| !cc.dot_in(&dot))
    }

    #[quickcheck]
    fn compaction_invariant(dots: Vec<Dot>) {
        let cc = DotContext::from_iter(dots);
        for dot in cc.cloud_dots() {
            assert!(
                dot.counter().get() > cc.contiguous(dot.actor()) + 1,
                "cloud dot {dot} is contiguous or dominated in {cc}"
            );
        }
    }

    #[quickcheck]
    fn compaction_preserves_membership(dots: Vec<Dot>, probes: Vec<Dot>) {
        // build a deliberately un-normalized context by writing the raw parts
        let mut raw = DotContext::new();
        for dot in &dots {
            raw.cloud.insert(dot.clone());
        }
        let mut compacted = raw.clone();
        compacted.compact();
        for probe in dots.iter().chain(&probes) {
            assert_eq!(raw.dot_in(probe), compacted.dot_in(probe), "probe {probe}");
        }
    }

    #[quickcheck]
    fn join_is_idempotent(dots: Vec<Dot>) {
        let mut a = DotContext::from_iter(dots);
        let pre = a.clone();
        a.join(&pre);
        assert_eq!(a, pre);
    }

    #[quickcheck]
    fn join_is_commutative(a_dots: Vec<Dot>, b_dots: Vec<Dot>) {
        let a = DotContext::from_iter(a_dots);
        let b = DotContext::from_iter(b_dots);
        let mut ab = a.clone();
        ab.join(&b);
        let mut ba = b.clone();
        ba.join(&a);
        assert_eq!(ab, ba);
    }

    #[quickcheck]
    fn join_is_associative(a_dots: Vec<Dot>, b_dots: Vec<Dot>, c_dots: Vec<Dot>) {
        let a = DotContext::from_iter(a_dots);
        let b = DotContext::from_iter(b_dots);
        let c = DotContext::from_iter(c_dots);

        // (a ⊔ b) ⊔ c
        let mut left = a.clone();
        left.join(&b);
        left.join(&c);

        // a ⊔ (b ⊔ c)
        let mut bc = b.clone();
        bc.join(&c);
        let mut right = a.clone();
        right.join(&bc);

        assert_eq!(left, right);
    }

    #[quickcheck]
    fn membership_is_monotone_across_join(a_dots: Vec<Dot>, b_dots: Vec<Dot>) {
        let mut a = DotContext::from_iter(a_dots.iter().cloned());
        let b = DotContext::from_iter(b_dots);
        a.join(&b);
        for dot in &a_dots {
            assert!(a.dot_in(dot), "{dot} fell out of {a}");
        }
    }

    #[test]
    fn display_form() {
        let cc = DotContext::from_iter([dot("a", 1), dot("a", 2), dot("b", 1), dot("c", 4)]);
        assert_eq!(cc.to_string(), "Context: CC (a:2 b:1) DC (c:4)");
        assert_eq!(DotContext::new().to_string(), "Context: CC () DC ()");
    }
}
