use std::hint::black_box;

use bugtriage::bugzilla::{Bug, Change, HistoryEntry};
use bugtriage::labeling::{LabelOptions, derive_labels};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

const BUG_COUNT: usize = 10_000;
const HISTORY_LEN: usize = 20;

fn keyword_entry(step: usize, added: &str, removed: &str) -> HistoryEntry {
    HistoryEntry {
        when: Some(format!("2020-01-01T00:{:02}:00Z", step % 60)),
        who: None,
        changes: vec![Change {
            field_name: "keywords".to_string(),
            added: vec![added.to_string()],
            removed: vec![removed.to_string()],
        }],
    }
}

fn synthetic_bugs() -> Vec<Bug> {
    (0..BUG_COUNT)
        .map(|i| {
            let history = (0..HISTORY_LEN)
                .map(|step| match (i + step) % 4 {
                    0 => keyword_entry(step, "dev-doc-needed", ""),
                    1 => keyword_entry(step, "", "dev-doc-needed"),
                    2 => keyword_entry(step, "dev-doc-complete", "dev-doc-needed"),
                    _ => keyword_entry(step, "perf", ""),
                })
                .collect();
            Bug {
                history,
                ..Bug::new(i as u64)
            }
        })
        .collect()
}

fn bench_derive_labels(c: &mut Criterion) {
    let bugs = synthetic_bugs();
    c.bench_with_input(
        BenchmarkId::new("derive_labels", BUG_COUNT),
        &bugs,
        |b, bugs| {
            b.iter(|| {
                let labels = derive_labels(bugs.iter().cloned().map(Ok), LabelOptions::default())
                    .expect("labels");
                black_box(labels.counts());
            });
        },
    );
}

criterion_group!(benches, bench_derive_labels);
criterion_main!(benches);
