//! 합성 이벤트 벤치마크
//!
//! 이벤트 배치 생성, 직렬화, 역직렬화 성능을 측정합니다.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use logwire_core::event::{MockScenario, SyntheticEvent, battery, build_payloads};

fn sample_event() -> SyntheticEvent {
    SyntheticEvent::new(
        "tenant2",
        "thirdPartyB",
        "order",
        "paid",
        "subCat3",
        Some(MockScenario::DelayedResponse),
    )
}

fn bench_battery(c: &mut Criterion) {
    let mut group = c.benchmark_group("battery");

    for count in [8usize, 64, 512] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("generate", count), &count, |b, &count| {
            b.iter(|| battery(black_box(count)));
        });

        let events = battery(count);
        group.bench_with_input(BenchmarkId::new("build_payloads", count), &events, |b, events| {
            b.iter(|| build_payloads(black_box(events)));
        });
    }

    group.finish();
}

fn bench_event_serialization(c: &mut Criterion) {
    let event = sample_event();
    let encoded = event.to_bytes().unwrap();

    let mut group = c.benchmark_group("event_serialization");
    group.throughput(Throughput::Elements(1));

    group.bench_function("to_bytes", |b| {
        b.iter(|| black_box(&event).to_bytes());
    });

    group.bench_function("from_slice", |b| {
        b.iter(|| SyntheticEvent::from_slice(black_box(&encoded)));
    });

    group.finish();
}

criterion_group!(benches, bench_battery, bench_event_serialization);
criterion_main!(benches);
