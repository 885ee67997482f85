//! Performance benchmarks for pdf-cropper
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lopdf::{dictionary, Object};
use pdf_cropper::{Backend, BackendChoice, CropMargins, Rotation};

/// Generate an n-page US Letter PDF with one small content stream per page.
fn generate_pdf(page_count: usize) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::new();
    for _ in 0..page_count {
        let content_id = doc.add_object(Object::Stream(lopdf::Stream::new(
            dictionary! {},
            b"0 0 m 612 792 l S".to_vec(),
        )));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("failed to generate bench PDF");
    buf
}

/// The four quarters of a page, the common two-up split workload doubled.
fn quarter_regions() -> [CropMargins; 4] {
    [
        CropMargins::new(0.0, 0.0, 0.5, 0.5),
        CropMargins::new(0.5, 0.0, 0.0, 0.5),
        CropMargins::new(0.0, 0.5, 0.5, 0.0),
        CropMargins::new(0.5, 0.5, 0.0, 0.0),
    ]
}

/// Benchmark document loading
fn bench_load(c: &mut Criterion) {
    let backend = Backend::new(BackendChoice::Auto).unwrap();

    let mut group = c.benchmark_group("load");
    for page_count in [1, 16, 64] {
        let data = generate_pdf(page_count);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_pages", page_count)),
            &data,
            |b, data| {
                b.iter(|| {
                    let document = backend.load_from_bytes(black_box(data)).unwrap();
                    black_box(document.page_count())
                });
            },
        );
    }
    group.finish();
}

/// Benchmark cropping fan-out: four regions per source page
fn bench_crop_fan_out(c: &mut Criterion) {
    let backend = Backend::new(BackendChoice::Auto).unwrap();
    let regions = quarter_regions();

    let mut group = c.benchmark_group("crop_fan_out");
    for page_count in [1, 16] {
        let data = generate_pdf(page_count);
        let document = backend.load_from_bytes(&data).unwrap();
        group.throughput(Throughput::Elements((page_count * regions.len()) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_pages_x4", page_count)),
            &document,
            |b, document| {
                b.iter(|| {
                    let mut writer = backend.writer().unwrap();
                    for page in 1..=document.page_count() {
                        writer
                            .add_page_cropped(document, page, &regions, Rotation::None)
                            .unwrap();
                    }
                    black_box(writer.page_count())
                });
            },
        );
    }
    group.finish();
}

/// Benchmark the full pipeline: load, crop every page in half, serialize
fn bench_split_pipeline(c: &mut Criterion) {
    let backend = Backend::new(BackendChoice::Auto).unwrap();
    let data = generate_pdf(16);
    let halves = [
        CropMargins::new(0.0, 0.0, 0.5, 0.0),
        CropMargins::new(0.5, 0.0, 0.0, 0.0),
    ];

    let mut group = c.benchmark_group("split_pipeline");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("16_pages_two_up", |b| {
        b.iter(|| {
            let document = backend.load_from_bytes(black_box(&data)).unwrap();
            let mut writer = backend.writer().unwrap();
            for page in 1..=document.page_count() {
                writer
                    .add_page_cropped(&document, page, &halves, Rotation::None)
                    .unwrap();
            }
            black_box(writer.to_bytes().unwrap())
        });
    });
    group.finish();
}

/// Benchmark serialization alone (the guarded path)
fn bench_serialize(c: &mut Criterion) {
    let backend = Backend::new(BackendChoice::Auto).unwrap();
    let data = generate_pdf(16);
    let document = backend.load_from_bytes(&data).unwrap();
    let regions = quarter_regions();

    let mut writer = backend.writer().unwrap();
    for page in 1..=document.page_count() {
        writer
            .add_page_cropped(&document, page, &regions, Rotation::None)
            .unwrap();
    }

    c.bench_function("serialize_64_pages", |b| {
        b.iter(|| black_box(writer.to_bytes().unwrap()));
    });
}

criterion_group!(
    benches,
    bench_load,
    bench_crop_fan_out,
    bench_split_pipeline,
    bench_serialize,
);

criterion_main!(benches);
