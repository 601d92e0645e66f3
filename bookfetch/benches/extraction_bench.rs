//! Benchmarks for page segmentation and ranking.

use bookfetch::models::{ContentRecord, ContentSource, Genre, PageClass, PageType};
use bookfetch::ranking;
use bookfetch::segmenter::{clean_layout_artifacts, select_page};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn sample_book() -> String {
    let mut text = String::from("THE SAMPLE\nCopyright 1901\nContents\n");
    for chapter in 1..=30 {
        text.push_str(&format!("\u{c}{chapter}\nCHAPTER {chapter}\n"));
        for line in 0..120 {
            text.push_str(&format!(
                "Chapter {chapter} line {line} keeps the narrative moving at an even pace.\n"
            ));
        }
    }
    text
}

fn segmenter_benchmark(c: &mut Criterion) {
    let raw = sample_book();
    let cleaned = clean_layout_artifacts(&raw);

    c.bench_function("clean_layout_artifacts", |b| {
        b.iter(|| clean_layout_artifacts(black_box(&raw)))
    });
    c.bench_function("select_page_fiction", |b| {
        b.iter(|| select_page(black_box(&cleaned), PageClass::FirstContentPage, Genre::Fiction))
    });
}

fn ranking_benchmark(c: &mut Criterion) {
    let records: Vec<ContentRecord> = ContentSource::ALL
        .iter()
        .enumerate()
        .map(|(i, source)| {
            let text = "x".repeat(200 + i * 37);
            if i % 2 == 0 {
                ContentRecord::content(text, *source, 70 + i as u8, PageType::Content)
            } else {
                ContentRecord::access_info(text, *source, 50 + i as u8)
            }
        })
        .collect();

    c.bench_function("pick", |b| b.iter(|| ranking::pick(black_box(&records))));
}

criterion_group!(benches, segmenter_benchmark, ranking_benchmark);
criterion_main!(benches);
