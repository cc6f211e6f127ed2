//! Performance benchmarks for listing parsing, hashing and canonicalization

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use bls_mirror::canonical::canonicalize;
use bls_mirror::hash::sha256_hex;
use bls_mirror::listing::{parse_listing, ListingOptions};

fn listing_document(files: usize) -> String {
    let mut html = String::from(
        "<html><body><pre><A HREF=\"/pub/time.series/\">[To Parent Directory]</A><br>\n",
    );
    for i in 0..files {
        html.push_str(&format!(
            " 1/8/2026  8:30 AM   {:>10} <A HREF=\"/pub/time.series/pr/pr.data.{}.Series\">pr.data.{}.Series</A><br>\n",
            i * 1024,
            i,
            i
        ));
    }
    html.push_str("</pre></body></html>\n");
    html
}

fn population_document(rows: usize) -> String {
    let rows: Vec<String> = (0..rows)
        .map(|i| {
            format!(
                r#"{{"value": {}, "date": "{}", "country": {{"value": "United States", "id": "US"}}, "unit": "", "obs_status": "", "decimal": 0}}"#,
                300_000_000 + i,
                1960 + i
            )
        })
        .collect();
    format!(r#"[{{"page": 1, "pages": 1, "total": {}}}, [{}]]"#, rows.len(), rows.join(", "))
}

fn bench_parse_listing(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_listing");
    let options = ListingOptions::default();

    for files in [10, 100, 1000] {
        let doc = listing_document(files);
        group.throughput(Throughput::Bytes(doc.len() as u64));
        group.bench_with_input(BenchmarkId::new("files", files), &doc, |b, doc| {
            b.iter(|| parse_listing(black_box(doc.as_bytes()), &options))
        });
    }

    group.finish();
}

fn bench_sha256(c: &mut Criterion) {
    let mut group = c.benchmark_group("sha256_hex");

    for size in [1024usize, 1024 * 1024, 16 * 1024 * 1024] {
        let data = vec![b'x'; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("bytes", size), &data, |b, data| {
            b.iter(|| sha256_hex(black_box(data)))
        });
    }

    group.finish();
}

fn bench_canonicalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("canonicalize");

    for rows in [10, 100, 1000] {
        let doc = population_document(rows);
        group.throughput(Throughput::Bytes(doc.len() as u64));
        group.bench_with_input(BenchmarkId::new("rows", rows), &doc, |b, doc| {
            b.iter(|| canonicalize(black_box(doc.as_bytes())).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse_listing, bench_sha256, bench_canonicalize);
criterion_main!(benches);
