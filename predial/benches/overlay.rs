//! Benchmarks du calcul d'intersections et de superpositions

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use geo::polygon;
use predial::{
    calculate_intersections, detect_overlaps, Areal, Attributes, Crs, TracingSink,
    ExternalFeature, Layer, LayerSpec, PairBudget, ParcelPolygon, ParcelSet,
};

fn square(x: f64, y: f64, size: f64) -> Areal {
    Areal::Polygon(polygon![
        (x: x, y: y),
        (x: x + size, y: y),
        (x: x + size, y: y + size),
        (x: x, y: y + size),
    ])
}

/// Parcelles en damier, légèrement décalées pour créer des recouvrements
fn parcels(n: usize) -> ParcelSet {
    let side = (n as f64).sqrt().ceil() as usize;
    let features = (0..n)
        .map(|i| ParcelPolygon {
            id: i + 1,
            predio_id: format!("P{}", i / 4),
            subpoligono_id: format!("P{}_subpoligono_{}", i / 4, i + 1),
            geometry: square((i % side) as f64 * 0.9, (i / side) as f64 * 0.9, 1.0),
        })
        .collect();
    ParcelSet::new(Some(Crs::WGS84), features)
}

fn layer(n: usize) -> Layer {
    let side = (n as f64).sqrt().ceil() as usize;
    let features = (0..n)
        .map(|i| ExternalFeature {
            id: i.to_string(),
            geometry: square((i % side) as f64 * 1.7 + 0.3, (i / side) as f64 * 1.7 + 0.2, 1.5),
            attributes: Attributes::new(),
        })
        .collect();
    Layer::new(Some(Crs::WGS84), features)
}

fn bench_intersections(c: &mut Criterion) {
    let mut group = c.benchmark_group("intersections");
    let spec = LayerSpec::new("bench");

    for &n in &[100usize, 1_000, 5_000] {
        let parcels = parcels(100);
        let layer = layer(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &layer, |b, layer| {
            b.iter(|| {
                let records = calculate_intersections(
                    black_box(&parcels),
                    black_box(layer),
                    &spec,
                    PairBudget::unlimited(),
                    &mut TracingSink,
                )
                .unwrap();
                black_box(records)
            })
        });
    }

    group.finish();
}

fn bench_overlaps(c: &mut Criterion) {
    let mut group = c.benchmark_group("overlaps");

    for &n in &[100usize, 1_000] {
        let parcels = parcels(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &parcels, |b, parcels| {
            b.iter(|| {
                let records =
                    detect_overlaps(black_box(parcels), PairBudget::unlimited(), &mut TracingSink)
                        .unwrap();
                black_box(records)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_intersections, bench_overlaps);
criterion_main!(benches);
