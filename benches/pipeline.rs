use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use csv_normalize::data::Cell;
use csv_normalize::dataset::Dataset;
use csv_normalize::{PipelineConfig, dtype_inference, normalize};

fn generate_orders(rows: usize) -> Dataset {
    let mut id = Vec::with_capacity(rows);
    let mut shipping = Vec::with_capacity(rows);
    let mut code = Vec::with_capacity(rows);
    let mut day = Vec::with_capacity(rows);
    let mut month = Vec::with_capacity(rows);
    let mut year = Vec::with_capacity(rows);
    let mut ordered_at = Vec::with_capacity(rows);
    for i in 0..rows {
        id.push(Cell::Integer(i as i64));
        shipping.push(Cell::Map(vec![
            ("carrier".to_string(), Cell::string(["ups", "dhl", "post"][i % 3])),
            ("weight".to_string(), Cell::Float((i % 17) as f64 * 0.5)),
        ]));
        code.push(if i % 4 == 0 {
            Cell::Integer(i as i64)
        } else {
            Cell::string(format!("{i}sku"))
        });
        day.push(Cell::Integer((i % 28 + 1) as i64));
        month.push(Cell::Integer((i % 12 + 1) as i64));
        year.push(Cell::Integer(2020 + (i % 5) as i64));
        ordered_at.push(Cell::string(format!(
            "{:02}/{:02}/2024",
            i % 28 + 1,
            i % 12 + 1
        )));
    }
    Dataset::from_named([
        ("id", id.clone()),
        ("shipping", shipping),
        ("code", code),
        ("day", day),
        ("month", month),
        ("year", year),
        ("ordered_at", ordered_at),
        ("id_copy", id),
    ])
    .expect("valid dataset")
}

fn bench_pipeline(c: &mut Criterion) {
    let dataset = generate_orders(10_000);
    let config = PipelineConfig::default();

    let mut group = c.benchmark_group("pipeline");
    group.sample_size(20);
    group.bench_function("normalize", |b| {
        b.iter_batched(
            || dataset.clone(),
            |data| normalize(data, &config).expect("normalize"),
            BatchSize::LargeInput,
        )
    });
    group.bench_function("dtype_inference", |b| {
        b.iter_batched(
            || dataset.clone(),
            dtype_inference,
            BatchSize::LargeInput,
        )
    });
    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
