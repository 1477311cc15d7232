use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use folio_core::attributes::Attributes;
use folio_core::pipeline::{SaveContext, SaveMethod, prepare};
use folio_core::slug::{SlugCandidates, normalize};
use folio_core::{AuditContext, Column, ColumnDefault, Entity, PrincipalId, Record, TableSchema};
use folio_infra::{InMemoryStore, Store};
use serde_json::json;

static ARTICLES: TableSchema = TableSchema {
    name: "articles",
    columns: &[
        Column::increments("id"),
        Column::uuid("uuid").unique(),
        Column::string("title", 150),
        Column::text("body").nullable(),
        Column::boolean("featured").default_to(ColumnDefault::Bool(false)),
        Column::date_time("published_at").nullable(),
        Column::date_time("created_at"),
        Column::uuid("created_by").nullable(),
        Column::date_time("updated_at").nullable(),
        Column::uuid("updated_by").nullable(),
    ],
};

struct Articles;

impl Entity for Articles {
    fn table(&self) -> &'static TableSchema {
        &ARTICLES
    }
}

fn proposed(extra_fields: usize) -> Attributes {
    let mut attrs = json!({
        "title": "Benchmarking the save path",
        "body": "Lorem ipsum dolor sit amet",
        "featured": true,
        "published_at": "2024-03-01 12:30:00",
    })
    .as_object()
    .cloned()
    .unwrap_or_default();
    for i in 0..extra_fields {
        attrs.insert(format!("unknown_{i}"), json!(i));
    }
    attrs
}

/// Benchmark: in-memory stages for growing amounts of junk input.
fn bench_prepare(c: &mut Criterion) {
    let mut group = c.benchmark_group("prepare");
    let audit = AuditContext::new(PrincipalId::new());

    for extra in [0usize, 10, 100] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(extra), &extra, |b, &extra| {
            let attrs = proposed(extra);
            b.iter(|| {
                let mut record = Record::forge(&ARTICLES, attrs.clone());
                let ctx = SaveContext::new(SaveMethod::Insert, audit);
                prepare(&mut record, &Articles, &ctx).ok();
                black_box(record);
            });
        });
    }

    group.finish();
}

/// Benchmark: slug normalization plus a long candidate walk.
fn bench_slugs(c: &mut Criterion) {
    let mut group = c.benchmark_group("slug");

    group.bench_function("normalize_unicode_title", |b| {
        b.iter(|| normalize(black_box("  Ærøskøbing: “Crème Brûlée” & more… ?  "), "post"));
    });

    group.bench_function("walk_1000_candidates", |b| {
        b.iter(|| {
            let mut candidates = SlugCandidates::new("hello-world");
            for _ in 0..1_000 {
                candidates.advance();
            }
            black_box(candidates.into_inner());
        });
    });

    group.finish();
}

/// Benchmark: raw store insert vs. full prepare + insert.
fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    let audit = AuditContext::anonymous();

    group.bench_function("raw_store_insert", |b| {
        let store = InMemoryStore::new();
        let mut attrs = proposed(0);
        attrs.insert("created_at".into(), json!("2024-03-01T12:30:00.000Z"));
        b.iter(|| {
            runtime
                .block_on(store.insert(&ARTICLES, &attrs))
                .expect("insert");
        });
    });

    group.bench_function("prepare_then_insert", |b| {
        let store = InMemoryStore::new();
        let attrs = proposed(10);
        b.iter(|| {
            let mut record = Record::forge(&ARTICLES, attrs.clone());
            let ctx = SaveContext::new(SaveMethod::Insert, audit);
            prepare(&mut record, &Articles, &ctx).expect("valid");
            runtime
                .block_on(store.insert(&ARTICLES, record.attributes()))
                .expect("insert");
        });
    });

    group.finish();
}

criterion_group!(benches, bench_prepare, bench_slugs, bench_insert);
criterion_main!(benches);
