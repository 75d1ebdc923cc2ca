//! # Observation Dispatch Benchmarks
//!
//! Cost of turning operator observations into state changes: voting,
//! consensus, memo parsing and the resulting handler, for batches of
//! inbound transactions inside one open block.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use shared_types::{Asset, Coin};
use tc_01_keeper::{NodeStatus, PoolStatus, Vault};
use tc_03_state_machine::Msg;
use tc_tests::harness::{address, bnb, observed_in, TestNet};

const OPERATORS: usize = 4;

/// Four active operators sharing one asgard, a BNB pool and block 2 open.
fn network() -> (TestNet, Vault) {
    let mut net = TestNet::new();
    let nodes: Vec<_> = (1..=OPERATORS)
        .map(|i| net.operator(i, NodeStatus::Active, 1_000_000_000))
        .collect();
    let asgard = net.asgard("asgard", 1, &nodes.iter().collect::<Vec<_>>(), vec![]);
    net.pool(&bnb(), 1_000_000_000, 1_000_000_000, PoolStatus::Enabled);
    net.begin(2).expect("open block");
    (net, asgard)
}

/// One observation per operator for each of `count` inbounds.
fn observations(asgard: &Vault, count: usize) -> Vec<Msg> {
    let mut msgs = Vec::with_capacity(count * OPERATORS);
    for n in 0..count {
        let coins = vec![Coin::new(bnb(), 1_000), Coin::new(Asset::rune(), 1_000)];
        for signer in 1..=OPERATORS {
            msgs.push(observed_in(
                &format!("bench-in-{n}"),
                "bnb1donor",
                asgard,
                coins.clone(),
                "ADD:BNB.BNB",
                &address(signer),
            ));
        }
    }
    msgs
}

fn bench_observed_inbounds(c: &mut Criterion) {
    let mut group = c.benchmark_group("observation-dispatch");

    for count in [1usize, 10, 100] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("observed_add", count), &count, |b, &count| {
            b.iter_batched(
                || {
                    let (net, asgard) = network();
                    let msgs = observations(&asgard, count);
                    (net, msgs)
                },
                |(mut net, msgs)| {
                    for msg in &msgs {
                        black_box(net.deliver(msg).is_ok());
                    }
                    net
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_block_close(c: &mut Criterion) {
    let mut group = c.benchmark_group("block-close");
    group.bench_function("end_block_after_100_inbounds", |b| {
        b.iter_batched(
            || {
                let (mut net, asgard) = network();
                for msg in observations(&asgard, 100) {
                    let _ = net.deliver(&msg);
                }
                net
            },
            |mut net| black_box(net.end().map(|updates| updates.len())),
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group!(benches, bench_observed_inbounds, bench_block_close);
criterion_main!(benches);
