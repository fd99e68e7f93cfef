use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fieldmap_core::{Code, CodeKind, DetectionId, FieldItem, ImageId, PlantPartKind, WorldRect};
use fieldmap_plants::{
    cluster_fragments, ClusterParams, Fragment, LocalizerParams, PlantCluster,
    RecursivePlantLocalizer,
};
use nalgebra::{Point2, Point3};

/// Plants every 0.6 along y, each split into `parts` fragments with a small
/// deterministic jitter.
fn row_fragments(plants: usize, parts: usize) -> Vec<Fragment> {
    let kinds = [PlantPartKind::Leaf, PlantPartKind::Stick, PlantPartKind::Tag];
    let mut out = Vec::with_capacity(plants * parts);
    for p in 0..plants {
        for k in 0..parts {
            let jitter = ((p * 7 + k * 13) % 11) as f64 * 0.004 - 0.02;
            let center = Point2::new(jitter, 0.3 + 0.6 * p as f64 + 0.03 * k as f64);
            out.push(Fragment {
                detection: DetectionId(out.len()),
                kind: kinds[k % kinds.len()],
                bounds: WorldRect::centered(center, 0.04),
                image: ImageId(p % 3),
            });
        }
    }
    out
}

fn group_code(name: &str, y: f64) -> FieldItem {
    FieldItem::Code(Code {
        kind: CodeKind::Group,
        name: name.into(),
        position: Point3::new(0.0, y, 0.0),
        item: None,
        row: Some(1),
    })
}

fn bench_cluster(c: &mut Criterion) {
    let params = ClusterParams::default();
    let small = row_fragments(10, 3);
    let large = row_fragments(40, 3);

    c.bench_function("cluster_30_fragments", |b| {
        b.iter(|| cluster_fragments(black_box(small.clone()), &params))
    });
    c.bench_function("cluster_120_fragments", |b| {
        b.iter(|| cluster_fragments(black_box(large.clone()), &params))
    });
}

fn bench_localize(c: &mut Criterion) {
    let clusters: Vec<PlantCluster> =
        cluster_fragments(row_fragments(20, 3), &ClusterParams::default());
    let localizer = RecursivePlantLocalizer::new(LocalizerParams::default());
    let start = group_code("100", 0.0);
    let end = group_code("101", 12.0);

    c.bench_function("localize_20_plants_bidirectional", |b| {
        b.iter(|| localizer.locate(black_box(&start), black_box(&end), &clusters))
    });
}

criterion_group!(
    name = plants;
    config = Criterion::default().sample_size(30);
    targets = bench_cluster, bench_localize
);
criterion_main!(plants);
