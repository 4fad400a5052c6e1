//! Benchmarks for walk generation over precomputed transition tables.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::hint::black_box;
use walkgen::{
    generate_node_walks, generate_walks_streaming, NoProgress, Overrides, TransitionGraph,
    TransitionNode, WalkConfig,
};

fn ring(n: usize) -> Vec<Vec<usize>> {
    let mut adj = vec![Vec::new(); n];
    for i in 0..n {
        adj[i].push((i + 1) % n);
        adj[i].push((i + n - 1) % n);
        adj[i].sort_unstable();
    }
    adj
}

/// Preferential attachment graph (Barabási–Albert) with `m` edges per new node.
///
/// Heavy-tailed degrees make the second-order tables uneven, closer to real graphs than a ring.
fn barabasi_albert(n: usize, m: usize, seed: u64) -> Vec<Vec<usize>> {
    assert!(n >= m.max(2));
    assert!(m >= 1);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];

    // Start with a clique of size m+1.
    let init = m + 1;
    let mut targets: Vec<usize> = Vec::new(); // node ids repeated by degree
    for i in 0..init {
        for j in (i + 1)..init {
            adj[i].push(j);
            adj[j].push(i);
        }
    }
    for i in 0..init {
        for _ in 0..adj[i].len() {
            targets.push(i);
        }
    }

    for v in init..n {
        let mut chosen: Vec<usize> = Vec::with_capacity(m);
        while chosen.len() < m {
            let u = targets[rng.random_range(0..targets.len())];
            if u != v && !chosen.contains(&u) {
                chosen.push(u);
            }
        }
        for &u in &chosen {
            adj[v].push(u);
            adj[u].push(v);
            targets.push(u);
            targets.push(v);
        }
    }

    for nbrs in &mut adj {
        nbrs.sort_unstable();
        nbrs.dedup();
    }
    adj
}

/// node2vec-style tables (return parameter `p`, in-out parameter `q`) for an undirected graph.
fn node2vec_tables(adj: &[Vec<usize>], p: f64, q: f64) -> TransitionGraph<usize> {
    let mut g = TransitionGraph::new();
    for (cur, nbrs) in adj.iter().enumerate() {
        let mut node = TransitionNode::new();
        if !nbrs.is_empty() {
            let k = nbrs.len() as f64;
            node = node.with_first_travel(nbrs.clone(), vec![1.0 / k; nbrs.len()]);
        }
        for &prev in nbrs {
            let mut w: Vec<f64> = nbrs
                .iter()
                .map(|&x| {
                    if x == prev {
                        1.0 / p
                    } else if adj[prev].binary_search(&x).is_ok() {
                        1.0
                    } else {
                        1.0 / q
                    }
                })
                .collect();
            let s: f64 = w.iter().sum();
            w.iter_mut().for_each(|x| *x /= s);
            node = node.with_transitions(prev, nbrs.clone(), w);
        }
        g.insert(cur, node);
    }
    g
}

fn bench_walk_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("walk_generation");

    for n in [1_000usize, 10_000] {
        let graphs = [
            ("ring", node2vec_tables(&ring(n), 0.5, 2.0)),
            ("ba_m4", node2vec_tables(&barabasi_albert(n, 4, 123), 0.5, 2.0)),
        ];

        // Keep total work bounded.
        let config = WalkConfig { walk_length: 40, num_walks: 2, seed: 123, ..WalkConfig::default() };
        let overrides = Overrides::new();

        for (name, g) in graphs {
            group.bench_with_input(BenchmarkId::new(format!("{name}/collect"), n), &n, |b, _| {
                b.iter(|| {
                    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
                    let walks = generate_node_walks(black_box(&g), &overrides, config, &mut rng);
                    black_box(walks).unwrap();
                })
            });

            group.bench_with_input(BenchmarkId::new(format!("{name}/streaming"), n), &n, |b, _| {
                b.iter(|| {
                    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
                    let mut steps = 0usize;
                    generate_walks_streaming(
                        black_box(&g),
                        &overrides,
                        config,
                        &mut rng,
                        &mut NoProgress,
                        |w| steps += w.len(),
                    )
                    .unwrap();
                    black_box(steps);
                })
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_walk_generation);
criterion_main!(benches);
