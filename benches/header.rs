use std::io::Read;
use std::time::Duration;

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use csvy::header::{split_header, write_header};
use csvy::metadata::Metadata;
use csvy::options::{ReadOptions, WriteOptions, YamlOptions};
use csvy::read::read_to_list_from_reader;

fn header_yaml(keys: usize) -> String {
    let mut yaml = String::new();
    for i in 0..keys {
        yaml.push_str(&format!("key_{i}:\n  label: column {i}\n  units: [m, s]\n"));
    }
    yaml
}

fn csvy_text(comment: &str, keys: usize, rows: usize) -> String {
    let mut text = format!("{comment}---\n");
    for line in header_yaml(keys).lines() {
        text.push_str(comment);
        text.push_str(line);
        text.push('\n');
    }
    text.push_str(&format!("{comment}---\n"));
    text.push_str("id,value,label\n");
    for i in 0..rows {
        text.push_str(&format!("{i},{}.5,row {i}\n", i * 3));
    }
    text
}

fn bench_split_header(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_header");
    for comment in ["", "# "] {
        let text = csvy_text(comment, 200, 0);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_function(format!("comment={comment:?}"), |b| {
            b.iter(|| {
                let framed = split_header(black_box(text.as_bytes()), &YamlOptions::default()).unwrap();
                black_box(framed.metadata());
            })
        });
    }
    group.finish();
}

fn bench_skip_payload(c: &mut Criterion) {
    let text = csvy_text("#", 20, 10_000);
    c.bench_function("split_header_then_drain_payload", |b| {
        b.iter(|| {
            let framed = split_header(text.as_bytes(), &YamlOptions::default()).unwrap();
            let (_, mut payload) = framed.into_parts();
            let mut sink = Vec::with_capacity(text.len());
            payload.read_to_end(&mut sink).unwrap();
            black_box(sink.len());
        })
    });
}

fn bench_write_header(c: &mut Criterion) {
    let metadata: Metadata = serde_yaml::from_str(&header_yaml(200)).unwrap();
    let opts = WriteOptions {
        comment: "# ".to_string(),
        ..Default::default()
    };
    c.bench_function("write_header_200_keys", |b| {
        b.iter(|| {
            let mut out = Vec::new();
            black_box(write_header(&mut out, black_box(&metadata), &opts).unwrap());
        })
    });
}

fn bench_read_to_list(c: &mut Criterion) {
    let text = csvy_text("#", 20, 10_000);
    c.bench_function("read_to_list_10_000_rows", |b| {
        b.iter(|| {
            let (rows, _) = read_to_list_from_reader(text.as_bytes(), &ReadOptions::default()).unwrap();
            black_box(rows.len());
        })
    });
}

criterion_group!(benches, bench_split_header, bench_write_header);
criterion_group!(
    name = long_benches;
    config = Criterion::default().sample_size(20).measurement_time(Duration::from_secs(10));
    targets = bench_skip_payload, bench_read_to_list
);
criterion_main!(benches, long_benches);
