// SPDX-License-Identifier: MIT OR Apache-2.0
use criterion::{Criterion, criterion_group, criterion_main};
use dot_kernel::{Dot, DotContext, DotKernel, MvReg, ReplicaId};
use std::hint::black_box;

fn rid(id: &str) -> ReplicaId {
    ReplicaId::new(id).unwrap()
}

fn context_compaction(c: &mut Criterion) {
    // every even dot first, then every odd one: worst case for the cloud
    let evens: Vec<Dot> = (1..=1_000u64).map(|n| Dot::mint("a", n * 2)).collect();
    let odds: Vec<Dot> = (0..1_000u64).map(|n| Dot::mint("a", n * 2 + 1)).collect();

    c.bench_function("context/compact_interleaved", |b| {
        b.iter(|| {
            let mut cc = DotContext::from_iter(evens.iter().cloned());
            cc.extend(odds.iter().cloned());
            black_box(cc)
        })
    });
}

fn context_join(c: &mut Criterion) {
    let left = DotContext::from_iter((1..=10_000u64).map(|n| Dot::mint("a", n)));
    let right = DotContext::from_iter(
        (1..=100u64)
            .flat_map(|n| [Dot::mint("b", n), Dot::mint("a", 10_000 + n)]),
    );

    c.bench_function("context/join", |b| {
        b.iter(|| {
            let mut cc = left.clone();
            cc.join(black_box(&right));
            black_box(cc)
        })
    });
}

fn kernel_join(c: &mut Criterion) {
    // two replicas with a shared prefix and divergent writes/removals
    let mut base = DotKernel::new();
    let root = rid("root");
    for n in 0..1_000u64 {
        base.add(&root, n);
    }
    let mut left = base.clone();
    let a = rid("a");
    for n in 0..500u64 {
        left.add(&a, n);
        left.remove_value(&(n * 2));
    }
    let mut right = base;
    let b = rid("b");
    for n in 0..500u64 {
        right.add(&b, n);
        right.remove_value(&(n * 3));
    }

    c.bench_function("kernel/join_divergent", |bench| {
        bench.iter(|| {
            let mut k = left.clone();
            k.join(black_box(&right));
            black_box(k)
        })
    });
}

fn mvreg_write(c: &mut Criterion) {
    c.bench_function("mvreg/write_delta", |b| {
        let mut reg = MvReg::new(rid("n1"));
        b.iter(|| black_box(reg.write(black_box(42u64))))
    });
}

criterion_group!(
    benches,
    context_compaction,
    context_join,
    kernel_join,
    mvreg_write
);
criterion_main!(benches);
