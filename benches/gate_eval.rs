//! Quality-gate evaluation benchmark.
//!
//! The gate runs once per tick while an anchor awaits hosting; it should
//! stay trivially cheap next to the quality estimate it guards.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use anchorage::geometry::{PlaneAlignment, Pose, Vec3};
use anchorage::quality::{MappingQuality, QualityGate, QualityIndicator};

fn bench_gate_eval(c: &mut Criterion) {
    let gate = QualityGate::default();
    let mut indicator = QualityIndicator::new(Vec3::ZERO, 0.25, PlaneAlignment::HorizontalUp);
    let camera = Pose::at(Vec3::new(1.2, 1.5, -2.0));
    indicator.observe(&camera, MappingQuality::Sufficient, &gate);

    c.bench_function("gate_evaluate", |b| {
        b.iter(|| {
            black_box(gate.evaluate(
                black_box(&camera),
                black_box(&indicator),
                black_box(MappingQuality::Sufficient),
            ))
        })
    });

    c.bench_function("indicator_observe", |b| {
        b.iter(|| {
            let mut ind = indicator.clone();
            ind.observe(
                black_box(&camera),
                black_box(MappingQuality::Sufficient),
                &gate,
            );
            black_box(ind)
        })
    });
}

criterion_group!(benches, bench_gate_eval);
criterion_main!(benches);
