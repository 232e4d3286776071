use chrono::{DateTime, Duration, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use dit_core::config::RatingConfig;
use dit_core::model::RankingSnapshot;
use dit_triage::{compute_ratings, rank_issues};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const TIERS: [(&str, usize, usize); 3] = [("small", 50, 100), ("medium", 500, 1_000), ("large", 2_000, 10_000)];

fn synthetic_history(issue_count: usize, snapshot_count: usize, seed: u64) -> Vec<RankingSnapshot> {
    let mut rng = StdRng::seed_from_u64(seed);
    let ids: Vec<String> = (0..issue_count).map(|i| format!("i{i:05}")).collect();
    let start = DateTime::<Utc>::UNIX_EPOCH;

    (0..snapshot_count)
        .map(|n| {
            let len = rng.gen_range(2..=8.min(issue_count));
            let picked: Vec<String> = ids.choose_multiple(&mut rng, len).cloned().collect();
            let minutes = i64::try_from(n).unwrap_or(i64::MAX);
            RankingSnapshot::new(Some(start + Duration::minutes(minutes)), picked)
        })
        .collect()
}

fn bench_ratings(c: &mut Criterion) {
    let config = RatingConfig::default();
    let mut group = c.benchmark_group("ratings.replay");

    for (name, issues, snapshots) in TIERS {
        let history = synthetic_history(issues, snapshots, 0x5EED_u64 + issues as u64);
        group.throughput(Throughput::Elements(history.len() as u64));

        group.bench_with_input(BenchmarkId::new("compute", name), &history, |b, history| {
            b.iter(|| black_box(compute_ratings(history, &config)));
        });

        let ratings = compute_ratings(&history, &config);
        group.bench_with_input(BenchmarkId::new("rank", name), &ratings, |b, ratings| {
            b.iter(|| black_box(rank_issues(ratings)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_ratings);
criterion_main!(benches);
