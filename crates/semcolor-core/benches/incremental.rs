use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use semcolor_core::{AnalyzerOptions, Edit, IncrementalAnalyzer, TextBuffer, Token, TokenKind};
use std::sync::Arc;
use std::time::Duration;

fn large_document(line_count: usize) -> Vec<Edit> {
    (0..line_count)
        .map(|i| Edit::insert_line(i, format!("{i} + 1 EQUALS {} (semcolor benchmark line)", i + 1)))
        .collect()
}

fn equals_token(line: usize, text: &str) -> Option<Token> {
    text.find("EQUALS")
        .map(|at| Token::new(line, at, "EQUALS".len(), TokenKind::Match))
}

fn bench_open_large_document(c: &mut Criterion) {
    let edits = large_document(50_000);
    c.bench_function("open/50k_lines", |b| {
        b.iter(|| {
            let buffer = TextBuffer::new();
            buffer.replace(black_box(&edits)).unwrap();
            black_box(buffer.len());
        })
    });
}

fn bench_typing_in_middle(c: &mut Criterion) {
    let edits = large_document(50_000);
    c.bench_function("typing_middle/100_inserts", |b| {
        b.iter_batched(
            || {
                let buffer = TextBuffer::new();
                buffer.replace(&edits).unwrap();
                buffer
            },
            |buffer| {
                let line = 25_000;
                for _ in 0..100 {
                    let column = buffer.snapshot().line_len(line).unwrap();
                    buffer.replace(&[Edit::new(line, column, 0, "x")]).unwrap();
                }
                black_box(buffer.version());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_analysis_after_single_edit(c: &mut Criterion) {
    let edits = large_document(20_000);
    let mut buffer = TextBuffer::new();
    let analyzer = IncrementalAnalyzer::attach(
        &mut buffer,
        Arc::new(equals_token),
        &AnalyzerOptions::default(),
    )
    .unwrap();
    buffer.replace(&edits).unwrap();
    assert!(analyzer.wait_idle(Duration::from_secs(60)));

    c.bench_function("analysis/single_line_edit_20k_lines", |b| {
        b.iter(|| {
            buffer.replace(&[Edit::new(10_000, 0, 0, " ")]).unwrap();
            assert!(analyzer.wait_idle(Duration::from_secs(60)));
            black_box(analyzer.take_patch());
        })
    });
}

criterion_group!(
    benches,
    bench_open_large_document,
    bench_typing_in_middle,
    bench_analysis_after_single_edit
);
criterion_main!(benches);
