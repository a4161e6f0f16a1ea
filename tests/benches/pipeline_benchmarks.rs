//! # Pipeline Benchmarks
//!
//! Hot-path costs of the vote pipeline:
//!
//! | Group | What |
//! |-------|------|
//! | ranking | hot / controversy / confidence for one aggregate |
//! | listing | top-N selection over a container's candidates |
//! | tree | full rebuild versus rank-only resort |
//! | vote | one vote through the ledger and the fan-out |
//!
//! ```bash
//! cargo bench --package tp-tests --bench pipeline_benchmarks -- tree
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared_types::{ContainerId, ItemId, ItemInfo, SortOrder, UserId, VoteDirection};
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tp_02_ranking::{confidence, controversy, hot};
use tp_04_comment_tree::{CommentTree, NodeRank};
use tp_05_listing_index::top_n;
use tp_tests::integration::fixtures::{Pipeline, EPOCH_MS};

const ROOT: ItemId = ItemId(1);

fn bench_ranking(c: &mut Criterion) {
    let mut group = c.benchmark_group("ranking");
    group.bench_function("hot", |b| {
        b.iter(|| hot(black_box(1_250), black_box(310), black_box(EPOCH_MS)))
    });
    group.bench_function("controversy", |b| {
        b.iter(|| controversy(black_box(1_250), black_box(1_190)))
    });
    group.bench_function("confidence", |b| {
        b.iter(|| confidence(black_box(1_250), black_box(310)))
    });
    group.finish();
}

fn bench_listing_top_n(c: &mut Criterion) {
    let mut group = c.benchmark_group("listing");
    let mut rng = StdRng::seed_from_u64(7);
    for size in [1_000usize, 10_000, 100_000] {
        let candidates: Vec<(ItemId, f64)> = (1..=size as u64)
            .map(|id| (ItemId(id), rng.gen_range(-50.0..5_000.0)))
            .collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("top_1000", size), &candidates, |b, candidates| {
            b.iter(|| top_n(candidates.iter().copied(), 1_000))
        });
    }
    group.finish();
}

/// A discussion of `size` comments where every comment after the first ten
/// replies to a random earlier one.
fn discussion(size: u64, rng: &mut StdRng) -> (Vec<ItemInfo>, HashMap<ItemId, NodeRank>) {
    let mut comments = Vec::with_capacity(size as usize);
    let mut ranks = HashMap::with_capacity(size as usize);
    for n in 0..size {
        let id = ItemId(ROOT.0 + 1 + n);
        let parent = (n >= 10).then(|| ItemId(ROOT.0 + 1 + rng.gen_range(0..n)));
        comments.push(ItemInfo::comment(id, ContainerId(1), ROOT, parent, UserId(n + 1), EPOCH_MS + n));
        let score = rng.gen_range(-5..200);
        ranks.insert(id, NodeRank { score, rank: score as f64 });
    }
    (comments, ranks)
}

fn bench_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree");
    let mut rng = StdRng::seed_from_u64(11);
    for size in [100u64, 1_000, 10_000] {
        let (comments, ranks) = discussion(size, &mut rng);
        group.throughput(Throughput::Elements(size));

        group.bench_with_input(BenchmarkId::new("rebuild", size), &size, |b, _| {
            b.iter(|| CommentTree::build(ROOT, SortOrder::Best, &comments, &ranks))
        });

        let (tree, _) = CommentTree::build(ROOT, SortOrder::Best, &comments, &ranks);
        let target = ItemId(ROOT.0 + 1 + size / 2);
        let affected = BTreeSet::from([target]);
        let mut bumped = ranks.clone();
        if let Some(rank) = bumped.get_mut(&target) {
            rank.score += 50;
            rank.rank += 50.0;
        }
        group.bench_with_input(BenchmarkId::new("resort_one", size), &size, |b, _| {
            b.iter_batched(
                || tree.clone(),
                |mut tree| tree.resort(&affected, &bumped),
                criterion::BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

fn bench_vote(c: &mut Criterion) {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => panic!("tokio runtime: {e}"),
    };
    let pipeline = Pipeline::new();
    let link = pipeline.link(1, 1, 0);
    let mut voter = 0u64;

    let mut group = c.benchmark_group("vote");
    group.bench_function("apply_and_fan_out", |b| {
        b.iter(|| {
            voter += 1;
            runtime.block_on(pipeline.cast(voter, link, VoteDirection::Up))
        })
    });
    group.finish();
}

criterion_group!(
    name = pipeline_benches;
    config = Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(5));
    targets = bench_ranking, bench_listing_top_n, bench_tree, bench_vote,
);

criterion_main!(pipeline_benches);
