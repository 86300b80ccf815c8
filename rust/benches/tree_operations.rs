use anchored_btree::{BucketTree, UniqueTree};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ORDERS: [usize; 2] = [9, 25];
const SEED: u64 = 42;

fn generate_keys(size: usize) -> Vec<i32> {
    let mut rng = StdRng::seed_from_u64(SEED);
    (0..size).map(|_| rng.gen_range(0..size as i32 * 4)).collect()
}

fn filled_tree(order: usize, keys: &[i32]) -> UniqueTree<i32, i32> {
    let tree = UniqueTree::new(order).unwrap();
    for key in keys {
        tree.insert_if_absent(*key, *key).unwrap();
    }
    tree
}

fn bench_insertion(c: &mut Criterion) {
    let mut group = c.benchmark_group("insertion");
    group.sample_size(20);

    for size in [1_000, 10_000] {
        let keys = generate_keys(size);
        for order in ORDERS {
            group.bench_with_input(
                BenchmarkId::new(format!("random_order_{}", order), size),
                &keys,
                |b, keys| b.iter(|| black_box(filled_tree(order, keys))),
            );
            group.bench_with_input(
                BenchmarkId::new(format!("sequential_order_{}", order), size),
                &size,
                |b, size| {
                    b.iter(|| {
                        let tree = UniqueTree::<i32, i32>::new(order).unwrap();
                        for key in 0..*size as i32 {
                            tree.insert(key, key).unwrap();
                        }
                        black_box(tree)
                    })
                },
            );
        }
    }
    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");
    let keys = generate_keys(10_000);

    for order in ORDERS {
        let tree = filled_tree(order, &keys);
        group.bench_function(BenchmarkId::new("get", order), |b| {
            b.iter(|| {
                for key in keys.iter().step_by(10) {
                    black_box(tree.get(key));
                }
            })
        });
        group.bench_function(BenchmarkId::new("closest_at_or_below", order), |b| {
            b.iter(|| {
                for key in keys.iter().step_by(10) {
                    black_box(tree.closest_at_or_below(&(key + 1)));
                }
            })
        });
        group.bench_function(BenchmarkId::new("iterate", order), |b| {
            b.iter(|| black_box(tree.entries().count()))
        });
    }
    group.finish();
}

fn bench_removal(c: &mut Criterion) {
    let mut group = c.benchmark_group("removal");
    group.sample_size(20);
    let keys = generate_keys(5_000);

    for order in ORDERS {
        group.bench_function(BenchmarkId::new("remove_all", order), |b| {
            b.iter_batched(
                || filled_tree(order, &keys),
                |tree| {
                    for key in &keys {
                        black_box(tree.remove(key).unwrap());
                    }
                },
                criterion::BatchSize::LargeInput,
            )
        });
        group.bench_function(BenchmarkId::new("destroy_all", order), |b| {
            b.iter_batched(
                || filled_tree(order, &keys),
                |tree| black_box(tree.destroy_all(1_000).unwrap()),
                criterion::BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

fn bench_buckets(c: &mut Criterion) {
    let mut group = c.benchmark_group("buckets");
    group.sample_size(20);

    group.bench_function("insert_shared_keys", |b| {
        b.iter(|| {
            let tree = BucketTree::<i32, u32>::with_default_order().unwrap();
            for i in 0..5_000u32 {
                tree.insert((i % 500) as i32, i).unwrap();
            }
            black_box(tree)
        })
    });
    group.finish();
}

criterion_group!(benches, bench_insertion, bench_lookup, bench_removal, bench_buckets);
criterion_main!(benches);
