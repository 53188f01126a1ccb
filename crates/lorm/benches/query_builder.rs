use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use lorm::{EntityDescriptor, Query, Record, Registry, SelectPlan, SqlContext, Value, substitute};
use std::sync::Arc;

/// Register an entity with `n` fields (`f0`..) plus a `Rel` entity of `n` fields
/// reachable through relation `rel`.
fn registry_with_fields(n: usize) -> (Registry, Arc<EntityDescriptor>) {
    let registry = Registry::new();
    let mut related = EntityDescriptor::new("Rel", "rel");
    let mut primary = EntityDescriptor::new("Root", "root").primary_key("f0");
    for i in 0..n {
        primary = primary.field(format!("f{i}"), format!("col{i}"));
        related = related.field(format!("f{i}"), format!("rcol{i}"));
    }
    registry.register(related);
    let primary = registry.register(primary.relation("rel", "Rel", "[f0] = [Rel.f0]"));
    (registry, primary)
}

/// `[f0] = ? AND [f1] = ? ...` over `n` fields.
fn fragment(n: usize) -> String {
    (0..n)
        .map(|i| format!("[f{i}] = ?"))
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn bench_substitute(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_builder/substitute");

    for n in [1, 5, 10, 50] {
        let (registry, root) = registry_with_fields(n);
        let ctx = SqlContext::new("app_", &registry);
        let fragment = fragment(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &fragment, |b, fragment| {
            b.iter(|| black_box(substitute(fragment, &root, &ctx)));
        });
    }

    group.finish();
}

fn bench_select_sql(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_builder/select_sql");

    for n in [1, 5, 10, 50] {
        let (registry, root) = registry_with_fields(n);
        let ctx = SqlContext::new("app_", &registry);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let query = Query::with_descriptor(Arc::clone(&root))
                    .join("rel")
                    .find_fields((0..n).map(|i| (format!("f{i}"), i as i64)))
                    .order_asc("f0");
                black_box(query.select_sql(&ctx))
            });
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_builder/decode");

    for n in [5, 20, 100] {
        let (registry, root) = registry_with_fields(n);
        let ctx = SqlContext::new("", &registry);
        let plan = SelectPlan::resolve(&root, &["rel".to_string()], &ctx).expect("plan");
        let row: Vec<Value> = (0..plan.width() as i64).map(Value::Integer).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &row, |b, row| {
            b.iter(|| {
                let record: Record = plan.decode(row.clone()).expect("decode");
                black_box(record)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_substitute, bench_select_sql, bench_decode);
criterion_main!(benches);
