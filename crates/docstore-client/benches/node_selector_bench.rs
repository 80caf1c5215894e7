// Criterion benchmarks for docstore-client
//
// Run benchmarks with:
//   cargo bench -p docstore-client
//
// For detailed output with plots:
//   cargo bench -p docstore-client -- --save-baseline main

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use docstore_client::{NodeSelector, ReadBalanceBehavior, ResponseCache};
use docstore_common::{ServerNode, Topology};
use hyper::body::Bytes;
use hyper::Method;
use std::time::Duration;

fn topology(count: usize) -> Topology {
    let nodes = (0..count)
        .map(|i| ServerNode::new(format!("http://node{}:8080", i), "db"))
        .collect();
    Topology::new(1, nodes)
}

fn bench_select_node(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_node");

    for node_count in [1, 3, 5, 10].iter() {
        group.bench_with_input(BenchmarkId::new("round_robin", node_count), node_count, |b, &count| {
            let topology = topology(count);
            let selector = NodeSelector::new();
            b.iter(|| selector.select_node(black_box(&topology), true, ReadBalanceBehavior::RoundRobin));
        });

        group.bench_with_input(BenchmarkId::new("fastest_node", node_count), node_count, |b, &count| {
            let topology = topology(count);
            let selector = NodeSelector::new();
            for (i, node) in topology.nodes.iter().enumerate() {
                selector.record_latency(node, Duration::from_millis(10 + i as u64));
            }
            b.iter(|| selector.select_node(black_box(&topology), true, ReadBalanceBehavior::FastestNode));
        });
    }

    group.finish();
}

fn bench_record_failure(c: &mut Criterion) {
    let mut group = c.benchmark_group("node_health");

    group.bench_function("record_failure_then_success", |b| {
        let selector = NodeSelector::new();
        let node = ServerNode::new("http://node0:8080", "db");
        b.iter(|| {
            selector.record_failure(black_box(&node));
            selector.record_success(black_box(&node));
        });
    });

    group.finish();
}

fn bench_response_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("response_cache");
    let payload = Bytes::from_static(br#"{"Databases":["northwind","orders"]}"#);

    group.bench_function("lookup_hit", |b| {
        let cache = ResponseCache::new(1024);
        cache.store(&Method::GET, "http://node0:8080/databases?start=0", "v1", payload.clone(), 0);
        b.iter(|| cache.lookup(&Method::GET, black_box("http://node0:8080/databases?start=0")));
    });

    group.bench_function("lookup_miss", |b| {
        let cache = ResponseCache::new(1024);
        b.iter(|| cache.lookup(&Method::GET, black_box("http://node0:8080/databases?start=0")));
    });

    group.bench_function("store_with_eviction", |b| {
        let cache = ResponseCache::new(64);
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            cache.store(
                &Method::GET,
                &format!("http://node0:8080/docs?id={}", i),
                "v1",
                payload.clone(),
                0,
            );
        });
    });

    group.finish();
}

criterion_group!(benches, bench_select_node, bench_record_failure, bench_response_cache);
criterion_main!(benches);
