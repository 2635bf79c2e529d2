use criterion::{black_box, criterion_group, criterion_main, Criterion};

use mediportal::core::data::{fill_buckets, Range, Window};
use mediportal::core::slug::{slugify, unique_slug};
use mediportal::models::analytics::{BucketRow, EventKind};
use mediportal::models::Timestamp;

fn slug_benchmarks(c: &mut Criterion) {
    c.bench_function("slugify accented name", |b| {
        b.iter(|| slugify(black_box("Dra. María José Fernández-Núñez")))
    });

    let existing: Vec<String> = std::iter::once("ana-garcia".to_string())
        .chain((2..200).map(|n| format!("ana-garcia-{}", n)))
        .collect();
    c.bench_function("unique_slug with 200 clashes", |b| {
        b.iter(|| unique_slug(black_box("ana-garcia"), black_box(&existing)))
    });
}

fn bucket_benchmarks(c: &mut Criterion) {
    let now = Timestamp::from_unix(1_750_000_000).unwrap_or_else(Timestamp::now);
    let window = Window::ending_at(Range::Quarter, now);
    let rows: Vec<BucketRow> = (0..90)
        .flat_map(|day| {
            EventKind::ALL.into_iter().map(move |event_type| BucketRow {
                day,
                event_type,
                count: day + 1,
            })
        })
        .collect();

    c.bench_function("fill_buckets 90d", |b| {
        b.iter(|| fill_buckets(black_box(&window), black_box(&rows)))
    });
}

criterion_group!(benches, slug_benchmarks, bucket_benchmarks);
criterion_main!(benches);
