// SPDX-License-Identifier: MIT OR Apache-2.0
//! Helpers shared by the in-crate test modules.
use crate::causal_context::{Dot, ReplicaId};
use quickcheck::{Arbitrary, Gen};

/// Shorthand replica-id constructor for tests.
pub(crate) fn rid(id: &str) -> ReplicaId {
    ReplicaId::new(id).expect("test replica ids are well-formed")
}

/// Shorthand dot constructor for tests.
pub(crate) fn dot(id: &str, counter: u64) -> Dot {
    Dot::mint(id, counter)
}

impl Arbitrary for ReplicaId {
    fn arbitrary(g: &mut Gen) -> Self {
        // a tiny id alphabet so that generated dots collide across inputs
        rid(*g.choose(&["a", "b", "c", "d"]).unwrap())
    }
}

impl Arbitrary for Dot {
    fn arbitrary(g: &mut Gen) -> Self {
        // small counters make consecutive sequences (and thus compaction)
        // likely
        let counter = u64::from(u8::arbitrary(g) % 8) + 1;
        Dot::mint(ReplicaId::arbitrary(g).as_str(), counter)
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        let id = self.actor().clone();
        Box::new(
            self.counter()
                .get()
                .shrink()
                .filter(|&c| c >= 1)
                .map(move |c| Dot::mint(id.as_str(), c)),
        )
    }
}
