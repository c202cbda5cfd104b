// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Benchmarks for lock and code arbitration.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use briefcase_arbiter::briefcase::{Coordinator, NoLocalChanges, StaticContainment};
use briefcase_arbiter::config::{CoordinatorConfig, StoreConfig};
use briefcase_arbiter::repository::{RepositoryManager, Request, ResponseOptions};
use briefcase_arbiter::resource::{
    Code, CodeSet, CodeSpecId, Lock, LockRequest, LockableId, LockableIdSet, ReplicaId,
};
use briefcase_arbiter::server::Authority;
use tempfile::TempDir;

fn create_test_authority() -> (Arc<Authority>, TempDir) {
    let dir = TempDir::new().unwrap();
    let authority = Authority::open(&StoreConfig::at_path(dir.path())).unwrap();
    (Arc::new(authority), dir)
}

fn graph(containers: u64, per_container: u64) -> Arc<StaticContainment> {
    let mut graph = StaticContainment::new();
    for c in 0..containers {
        for o in 0..per_container {
            graph.insert(c + 1, 1_000 + c * per_container + o);
        }
    }
    Arc::new(graph)
}

fn lock_request(first: u64, count: u64) -> LockRequest {
    (first..first + count)
        .map(|id| Lock::exclusive(LockableId::object(id)))
        .collect()
}

fn bench_acquire(c: &mut Criterion) {
    let (authority, _dir) = create_test_authority();
    let counter = AtomicU64::new(0);

    let mut group = c.benchmark_group("authority");
    group.throughput(Throughput::Elements(10));

    group.bench_function("acquire_10_locks", |b| {
        b.iter_batched(
            || {
                let base = counter.fetch_add(10, Ordering::Relaxed);
                Request::new(lock_request(base, 10), CodeSet::new())
            },
            |request| {
                let response = authority.process_request(&request, ReplicaId(1), false).unwrap();
                black_box(response)
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

fn bench_conflict(c: &mut Criterion) {
    let (authority, _dir) = create_test_authority();
    let held = Request::new(lock_request(0, 1_000), CodeSet::new());
    authority.process_request(&held, ReplicaId(1), false).unwrap();

    let mut group = c.benchmark_group("authority");
    group.throughput(Throughput::Elements(1));

    group.bench_function("denied_lock", |b| {
        b.iter_batched(
            || {
                let id = rand::random::<u64>() % 1_000;
                Request::new(lock_request(id, 1), CodeSet::new()).with_options(ResponseOptions::ALL)
            },
            |request| authority.process_request(&request, ReplicaId(2), false).unwrap(),
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

fn bench_reserve_codes(c: &mut Criterion) {
    let (authority, _dir) = create_test_authority();
    let counter = AtomicU64::new(0);

    let mut group = c.benchmark_group("authority");
    group.throughput(Throughput::Elements(10));

    group.bench_function("reserve_10_codes", |b| {
        b.iter_batched(
            || {
                let base = counter.fetch_add(10, Ordering::Relaxed);
                let codes: CodeSet = (base..base + 10)
                    .map(|i| Code::new(CodeSpecId(1), "", format!("TAG-{:06}", i)))
                    .collect();
                Request::new(LockRequest::new(), codes)
            },
            |request| authority.process_request(&request, ReplicaId(1), false).unwrap(),
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

fn bench_query_states(c: &mut Criterion) {
    let (authority, _dir) = create_test_authority();
    for replica in 1..=4 {
        let shared: LockRequest = (0..500)
            .map(|id| Lock::shared(LockableId::object(id)))
            .collect();
        authority
            .process_request(&Request::new(shared, CodeSet::new()), ReplicaId(replica), false)
            .unwrap();
    }
    let ids: LockableIdSet = (0..100).map(LockableId::object).collect();

    c.bench_function("authority::query_states_100", |b| {
        b.iter(|| {
            let states = authority.query_states(&ids, &CodeSet::new()).unwrap();
            black_box(states)
        })
    });
}

fn bench_coordinator_cached(c: &mut Criterion) {
    let (authority, _dir) = create_test_authority();
    let coordinator = Coordinator::new(
        ReplicaId(1),
        authority,
        graph(10, 100),
        Arc::new(NoLocalChanges),
        CoordinatorConfig::default(),
    );
    let container: LockRequest = std::iter::once(Lock::exclusive(LockableId::container(1))).collect();
    coordinator.acquire_locks(&container).unwrap();

    c.bench_function("coordinator::acquire_cached", |b| {
        b.iter_batched(
            || lock_request(1_000 + rand::random::<u64>() % 100, 1),
            |locks| coordinator.acquire_locks(&locks).unwrap(),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_acquire,
    bench_conflict,
    bench_reserve_codes,
    bench_query_states,
    bench_coordinator_cached,
);
criterion_main!(benches);
