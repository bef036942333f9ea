#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use kitty_agenda_core::{Priority, StatusFilter, Task, TaskId, TaskQuery, UserId, derive_view};
use time::macros::{date, datetime};
use time::{Date, Duration};

const TODAY: Date = date!(2025 - 03 - 10);

fn build_tasks(count: usize) -> Vec<Task> {
    let owner = UserId::new();
    (0..count)
        .map(|idx| {
            let offset = i64::try_from(idx % 21).unwrap_or(0) - 7;
            Task {
                id: TaskId::new(),
                owner,
                title: format!("task {idx}"),
                description: (idx % 3 == 0).then(|| format!("notes for exam {idx}")),
                priority: Priority::ALL[idx % 3],
                due_date: (idx % 5 != 0).then(|| TODAY + Duration::days(offset)),
                completed: idx % 4 == 0,
                created_at: datetime!(2025-03-01 09:00 UTC),
                updated_at: datetime!(2025-03-01 09:00 UTC),
            }
        })
        .collect()
}

fn derive_view_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("derive_view");
    for count in [100usize, 1_000, 10_000] {
        let tasks = build_tasks(count);
        for (name, query) in [
            ("all", TaskQuery::default()),
            ("urgent", TaskQuery::with_filter(StatusFilter::Urgent)),
            ("search", TaskQuery::default().search("EXAM")),
        ] {
            group.bench_with_input(BenchmarkId::new(name, count), &tasks, |b, tasks| {
                b.iter(|| {
                    let view = derive_view(black_box(tasks), black_box(&query), TODAY);
                    black_box(view.stats)
                });
            });
        }
    }
    group.finish();
}

criterion_group!(benches, derive_view_benchmark);
criterion_main!(benches);
