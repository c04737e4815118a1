use criterion::measurement::WallTime;
use criterion::{
    black_box, criterion_group, criterion_main, BenchmarkGroup, BenchmarkId, Criterion, Throughput,
};

use zfx_dissemination::analysis::summarize;
use zfx_dissemination::audit::AuditEvent;
use zfx_dissemination::dissemination::plan_round;
use zfx_dissemination::message::{Message, Payload, Sequence};
use zfx_dissemination::node::{Snapshot, Topology};

use tai64::Tai64N;

pub fn run_topology_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("topology_benchmark");
    let sizes = vec![100, 1000, 5000];

    full_mesh_benchmark(&mut group, sizes.clone());
    multicast_benchmark(&mut group, sizes.clone());

    group.finish();
}

pub fn run_gossip_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("gossip_benchmark");
    for n in [100usize, 500, 1000].iter() {
        let topology = Topology::full_mesh(*n);
        let snapshots = informed_snapshots(*n);
        group.throughput(Throughput::Elements(*n as u64));
        group.bench_with_input(BenchmarkId::new("plan_round", n), n, |b, _| {
            b.iter(|| plan_round(black_box(&snapshots), &topology, 2))
        });
    }
    group.finish();
}

pub fn run_sequence_benchmark(c: &mut Criterion) {
    let sequence = Sequence::new();
    c.bench_function("sequence_next", |b| b.iter(|| black_box(sequence.next())));
}

pub fn run_summary_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("summary_benchmark");
    for n in [100usize, 1000, 10000].iter() {
        let snapshots = informed_snapshots(100);
        let events = send_events(*n);
        let started = Tai64N::now();
        group.throughput(Throughput::Elements(*n as u64));
        group.bench_with_input(BenchmarkId::new("summarize", n), n, |b, _| {
            b.iter(|| summarize(1, "GossipPush", started, black_box(&events), &snapshots, 1, false))
        });
    }
    group.finish();
}

fn full_mesh_benchmark(group: &mut BenchmarkGroup<WallTime>, sizes: Vec<usize>) {
    for n in sizes.iter() {
        group.bench_with_input(BenchmarkId::new("full_mesh", n), n, |b, n| {
            b.iter(|| Topology::full_mesh(black_box(*n)))
        });
    }
}

fn multicast_benchmark(group: &mut BenchmarkGroup<WallTime>, sizes: Vec<usize>) {
    for n in sizes.iter() {
        group.bench_with_input(BenchmarkId::new("multicast", n), n, |b, n| {
            b.iter(|| Topology::multicast(black_box(*n), 8).unwrap())
        });
    }
}

fn informed_snapshots(n: usize) -> Vec<Snapshot> {
    (0..n)
        .map(|id| Snapshot {
            node_id: id,
            alive: id % 10 != 3,
            knowledge: if id % 2 == 0 { Message::new(0, Payload::Ok, 1) } else { Message::empty(id) },
        })
        .collect()
}

fn send_events(n: usize) -> Vec<AuditEvent> {
    let knowledge = Message::empty(0);
    (0..n)
        .map(|i| {
            let message = Message::new(i % 37, Payload::Ok, i as u64 + 1);
            AuditEvent::send(1, (i + 1) % 37, true, &message, &knowledge)
        })
        .collect()
}

criterion_group!(
    benches,
    run_topology_benchmark,
    run_gossip_benchmark,
    run_sequence_benchmark,
    run_summary_benchmark
);
criterion_main!(benches);
