// Health check and event handler benchmarks
//
// Measures:
// - Full sweep over N producers (steady state, all up)
// - Alive handling for an up producer
// - Message processing start/end pair

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use feedwatch_core::config::{ProducerConfig, RecoveryConfig};
use feedwatch_core::core::{MessageInterest, ProducerScope};
use feedwatch_core::runtime::TimeSource;
use feedwatch_core::testing::TestHarness;
use std::time::Duration;

fn harness_with_producers(count: u32) -> TestHarness {
    let producers = (1..=count)
        .map(|id| ProducerConfig::new(id, format!("p{}", id), vec![ProducerScope::Live]))
        .collect();
    let harness = TestHarness::with_config(RecoveryConfig::with_producers(producers));
    for id in 1..=count {
        harness.bring_up(id);
    }
    harness
}

// ============================================================================
// HEALTH CHECK BENCHMARKS
// ============================================================================

fn bench_health_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("health_check");
    group.measurement_time(Duration::from_secs(2));

    for count in [1u32, 16, 128] {
        group.bench_with_input(BenchmarkId::new("sweep_all_up", count), &count, |b, &count| {
            let harness = harness_with_producers(count);
            b.iter(|| harness.manager.run_health_check())
        });
    }

    group.finish();
}

// ============================================================================
// EVENT HANDLER BENCHMARKS
// ============================================================================

fn bench_event_handlers(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_handlers");
    group.measurement_time(Duration::from_secs(2));

    group.bench_function("alive_up_producer", |b| {
        let harness = harness_with_producers(1);
        let now = harness.clock.now_millis();
        b.iter(|| {
            harness
                .manager
                .on_alive_received(black_box(1), now - 1_000, now, true, true)
        })
    });

    group.bench_function("message_processing_pair", |b| {
        let harness = harness_with_producers(1);
        let now = harness.clock.now_millis();
        b.iter(|| {
            harness.manager.on_message_processing_started(-1, 1, None, now);
            harness
                .manager
                .on_message_processing_ended(-1, black_box(1), now - 100, None);
        })
    });

    group.bench_function("stale_completion", |b| {
        let harness = harness_with_producers(1);
        b.iter(|| {
            harness.manager.on_snapshot_complete_received(
                1,
                0,
                black_box(1),
                MessageInterest::AllMessages,
            )
        })
    });

    group.finish();
}

criterion_group!(benches, bench_health_check, bench_event_handlers);
criterion_main!(benches);
