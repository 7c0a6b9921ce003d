use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use wordbook::ranking::rank;
use wordbook::similarity::similarity_score;

/// Synthetic history of `n` distinct words
fn history(n: usize) -> Vec<String> {
    const STEMS: [&str; 8] = [
        "greet", "welcome", "hello", "doggo", "beep", "serendip", "lexic", "wander",
    ];
    (0..n)
        .map(|i| format!("{}{}", STEMS[i % STEMS.len()], i))
        .collect()
}

fn bench_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("score");
    let cases = vec![
        ("short", "Doggo", "gg"),
        ("exact", "Greetings", "greetings"),
        ("long_candidate", "Pneumonoultramicroscopicsilicovolcanoconiosis", "silico"),
    ];
    for (name, candidate, query) in cases {
        group.bench_function(name, |b| {
            b.iter(|| similarity_score(black_box(candidate), black_box(query)))
        });
    }
    group.finish();
}

fn bench_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank");
    group.sample_size(20);

    for size in [10, 100, 1_000] {
        let words = history(size);
        group.bench_function(format!("history_{size}"), |b| {
            b.iter(|| rank(black_box(&words), black_box("wel")))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_score, bench_rank);
criterion_main!(benches);
