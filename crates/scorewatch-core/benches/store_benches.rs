use criterion::{Criterion, black_box, criterion_group, criterion_main};
use scorewatch_core::store::ScoreStore;
use scorewatch_core::types::Timestamp;

fn bench_record_sample(c: &mut Criterion) {
    c.bench_function("record_sample_at_cap", |b| {
        let mut store = ScoreStore::new();
        for i in 0..100 {
            store
                .record_sample("alice", i, false, Timestamp::from_millis(i))
                .unwrap();
        }
        let mut i = 100i64;
        b.iter(|| {
            i += 1;
            black_box(
                store
                    .record_sample("alice", i, i % 2 == 0, Timestamp::from_millis(i))
                    .unwrap(),
            );
        });
    });
}

fn bench_recent_alerts(c: &mut Criterion) {
    let mut store = ScoreStore::new();
    for user in 0..200 {
        let name = format!("user{user}");
        for i in 0..60 {
            store
                .record_sample(&name, i, false, Timestamp::from_millis(i * 1000 + user))
                .unwrap();
        }
    }

    c.bench_function("recent_alerts_20_of_10k", |b| {
        b.iter(|| black_box(store.recent_alerts(black_box(20))));
    });
}

criterion_group!(benches, bench_record_sample, bench_recent_alerts);
criterion_main!(benches);
