//! Second-order random walk generation.
//!
//! For every walk iteration the node set is reshuffled and one walk is started from each
//! node, subject to per-source [`SamplingOverride`]s. The first step of a walk samples from
//! the source's first-travel distribution; later steps sample from the current node's table
//! conditioned on the previous node.
//!
//! Second-order context is a stack of visited nodes rather than just `(prev, cur)`: when a
//! step returns to the node the walk just came from, the two most recent entries are popped
//! before the returning node is pushed, so the next step is conditioned on the grandparent
//! context. The emitted walk is never rewound.

use crate::graph::TransitionGraph;
use crate::progress::{Progress, TracingProgress};
use crate::sampling::sample_cdf;
use crate::{Error, Result};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};

/// Global walk parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WalkConfig {
    /// Default walk length in nodes (the source counts as the first node).
    pub walk_length: usize,
    /// Number of walk iterations; each starts at most one walk from every node.
    pub num_walks: usize,
    /// Seed for the entry points that own their RNG.
    pub seed: u64,
    /// Suppress progress ticks.
    pub quiet: bool,
    /// Reject graphs with dangling candidate references instead of truncating walks.
    pub strict_references: bool,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self { walk_length: 80, num_walks: 10, seed: 42, quiet: true, strict_references: false }
    }
}

impl WalkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.walk_length == 0 {
            return Err(Error::InvalidParameter("walk_length must be >= 1".to_string()));
        }
        if self.num_walks == 0 {
            return Err(Error::InvalidParameter("num_walks must be >= 1".to_string()));
        }
        Ok(())
    }
}

/// Per-source overrides of the global walk parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SamplingOverride {
    /// Walk-count ceiling: the source is skipped from walk iteration `num_walks` onwards.
    pub num_walks: Option<usize>,
    pub walk_length: Option<usize>,
}

impl SamplingOverride {
    pub fn with_num_walks(mut self, num_walks: usize) -> Self {
        self.num_walks = Some(num_walks);
        self
    }

    pub fn with_walk_length(mut self, walk_length: usize) -> Self {
        self.walk_length = Some(walk_length);
        self
    }

    fn skips(&self, walk_index: usize) -> bool {
        matches!(self.num_walks, Some(ceiling) if ceiling <= walk_index)
    }
}

/// Source node → override.
pub type Overrides<N> = BTreeMap<N, SamplingOverride>;

/// A walk in its external, textual form.
pub type Walk = Vec<String>;

/// Unordered collection of walks.
pub type WalkBatch = Vec<Walk>;

/// Counters for one generation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Walks emitted.
    pub walks: usize,
    /// Walk iterations that ran to completion.
    pub iterations: usize,
    /// Walks that stopped early on a dead end.
    pub dead_ends: usize,
    /// Walks that stopped early on a candidate with no transition entry.
    pub truncated: usize,
    /// The run stopped because the cancellation flag was raised.
    pub cancelled: bool,
}

/// Walks plus the counters of the run that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkRun<N> {
    pub walks: Vec<Vec<N>>,
    pub summary: RunSummary,
}

/// Generate walks with a `ChaCha8Rng` seeded from `config.seed`, as strings.
pub fn generate_walks<N>(
    graph: &TransitionGraph<N>,
    overrides: &Overrides<N>,
    config: WalkConfig,
) -> Result<WalkBatch>
where
    N: Ord + Clone + Display,
{
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let walks = generate_node_walks(graph, overrides, config, &mut rng)?;
    Ok(stringify_walks(&walks))
}

/// Generate walks with a caller-supplied RNG, keeping node identifiers typed.
pub fn generate_node_walks<N, R>(
    graph: &TransitionGraph<N>,
    overrides: &Overrides<N>,
    config: WalkConfig,
    rng: &mut R,
) -> Result<Vec<Vec<N>>>
where
    N: Ord + Clone + Display,
    R: Rng,
{
    generate_node_walks_for_iterations(graph, overrides, config, 0..config.num_walks, rng)
}

/// Generate only the walk iterations in `iterations`.
///
/// This is the sharding primitive: disjoint ranges covering `0..config.num_walks` can run on
/// independent workers (each with its own RNG) and their outputs concatenated. Skip rules
/// see the global walk index, so sharding does not change which sources are skipped.
pub fn generate_node_walks_for_iterations<N, R>(
    graph: &TransitionGraph<N>,
    overrides: &Overrides<N>,
    config: WalkConfig,
    iterations: Range<usize>,
    rng: &mut R,
) -> Result<Vec<Vec<N>>>
where
    N: Ord + Clone + Display,
    R: Rng,
{
    prepare(graph, overrides, config)?;
    if iterations.end > config.num_walks {
        return Err(Error::InvalidParameter(format!(
            "iteration range {iterations:?} exceeds num_walks {}",
            config.num_walks
        )));
    }

    let mut walks = Vec::new();
    let mut progress = TracingProgress::default();
    let summary = run_iterations(
        graph,
        overrides,
        config,
        iterations,
        rng,
        &mut progress,
        None,
        |walk| walks.push(walk.iter().map(|&n| n.clone()).collect()),
    );
    finish(&summary);
    Ok(walks)
}

/// Generate walks without collecting them.
///
/// `on_walk` sees each walk as a borrowed slice of node references; one buffer is reused for
/// the whole run.
pub fn generate_walks_streaming<N, R, P, F>(
    graph: &TransitionGraph<N>,
    overrides: &Overrides<N>,
    config: WalkConfig,
    rng: &mut R,
    progress: &mut P,
    on_walk: F,
) -> Result<RunSummary>
where
    N: Ord + Display,
    R: Rng,
    P: Progress,
    F: FnMut(&[&N]),
{
    prepare(graph, overrides, config)?;
    let summary = run_iterations(
        graph,
        overrides,
        config,
        0..config.num_walks,
        rng,
        progress,
        None,
        on_walk,
    );
    finish(&summary);
    Ok(summary)
}

/// Generate walks, stopping early once `cancel` is raised.
///
/// The flag is checked before each walk iteration and before each source. On cancellation
/// the walks produced so far are returned with `summary.cancelled` set.
pub fn generate_walks_cancellable<N, R>(
    graph: &TransitionGraph<N>,
    overrides: &Overrides<N>,
    config: WalkConfig,
    rng: &mut R,
    cancel: &AtomicBool,
) -> Result<WalkRun<N>>
where
    N: Ord + Clone + Display,
    R: Rng,
{
    prepare(graph, overrides, config)?;
    let mut walks = Vec::new();
    let mut progress = TracingProgress::default();
    let summary = run_iterations(
        graph,
        overrides,
        config,
        0..config.num_walks,
        rng,
        &mut progress,
        Some(cancel),
        |walk| walks.push(walk.iter().map(|&n| n.clone()).collect()),
    );
    finish(&summary);
    Ok(WalkRun { walks, summary })
}

/// Deterministic parallel walk generation.
///
/// Walk iterations are spread over the Rayon pool. Iteration `i` draws from its own
/// `ChaCha8Rng` seeded by `mix64(seed ^ i)`, and batches are concatenated in iteration
/// order, so the output is stable for a fixed seed regardless of thread count.
#[cfg(feature = "parallel")]
pub fn generate_walks_parallel<N>(
    graph: &TransitionGraph<N>,
    overrides: &Overrides<N>,
    config: WalkConfig,
) -> Result<WalkBatch>
where
    N: Ord + Display + Sync,
{
    parallel_walks(graph, overrides, config, |worker| {
        worker.map_or_else(TracingProgress::default, TracingProgress::for_worker)
    })
}

/// Parallel driver; `make_progress` builds the sink for the worker that finished an iteration.
#[cfg(feature = "parallel")]
fn parallel_walks<N, P, M>(
    graph: &TransitionGraph<N>,
    overrides: &Overrides<N>,
    config: WalkConfig,
    make_progress: M,
) -> Result<WalkBatch>
where
    N: Ord + Display + Sync,
    P: Progress,
    M: Fn(Option<usize>) -> P + Sync,
{
    use rayon::prelude::*;
    use std::sync::atomic::AtomicUsize;

    prepare(graph, overrides, config)?;

    // Iterations finish out of order, so ticks carry a shared completion count.
    let completed = AtomicUsize::new(0);
    let per_iteration: Vec<(WalkBatch, RunSummary)> = (0..config.num_walks)
        .into_par_iter()
        .map(|walk_index| {
            let mut rng = ChaCha8Rng::seed_from_u64(mix64(config.seed ^ walk_index as u64));
            let mut batch = Vec::with_capacity(graph.len());
            let summary = run_iterations(
                graph,
                overrides,
                WalkConfig { quiet: true, ..config },
                walk_index..walk_index + 1,
                &mut rng,
                &mut (),
                None,
                |walk| batch.push(walk.iter().map(|n| n.to_string()).collect()),
            );
            if !config.quiet {
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                make_progress(rayon::current_thread_index()).tick(done, config.num_walks);
            }
            (batch, summary)
        })
        .collect();

    let mut total = RunSummary::default();
    let mut walks = Vec::new();
    for (batch, summary) in per_iteration {
        total.walks += summary.walks;
        total.iterations += summary.iterations;
        total.dead_ends += summary.dead_ends;
        total.truncated += summary.truncated;
        walks.extend(batch);
    }
    finish(&total);
    Ok(walks)
}

/// Convert typed walks to their textual form.
pub fn stringify_walks<N: Display>(walks: &[Vec<N>]) -> WalkBatch {
    walks.iter().map(|walk| walk.iter().map(ToString::to_string).collect()).collect()
}

fn prepare<N: Ord + Display>(
    graph: &TransitionGraph<N>,
    overrides: &Overrides<N>,
    config: WalkConfig,
) -> Result<()> {
    config.validate()?;
    if graph.is_empty() {
        return Err(Error::InvalidParameter("transition graph has no nodes".to_string()));
    }
    for (node, over) in overrides {
        if over.walk_length == Some(0) {
            return Err(Error::InvalidParameter(format!(
                "walk_length override for {node} must be >= 1"
            )));
        }
        if !graph.contains(node) {
            tracing::warn!(node = %node, "ignoring override for node not in graph");
        }
    }
    graph.validate()?;
    if config.strict_references {
        graph.check_references()?;
    }
    tracing::debug!(
        nodes = graph.len(),
        overrides = overrides.len(),
        walk_length = config.walk_length,
        num_walks = config.num_walks,
        "starting walk generation"
    );
    Ok(())
}

fn finish(summary: &RunSummary) {
    if summary.truncated > 0 {
        tracing::warn!(
            truncated = summary.truncated,
            "walks truncated at candidates with no transition entry"
        );
    }
    tracing::debug!(
        walks = summary.walks,
        iterations = summary.iterations,
        dead_ends = summary.dead_ends,
        cancelled = summary.cancelled,
        "walk generation finished"
    );
}

#[allow(clippy::too_many_arguments)]
fn run_iterations<'g, N, R, P, F>(
    graph: &'g TransitionGraph<N>,
    overrides: &Overrides<N>,
    config: WalkConfig,
    iterations: Range<usize>,
    rng: &mut R,
    progress: &mut P,
    cancel: Option<&AtomicBool>,
    mut on_walk: F,
) -> RunSummary
where
    N: Ord,
    R: Rng,
    P: Progress,
    F: FnMut(&[&'g N]),
{
    let cancelled = || cancel.is_some_and(|flag| flag.load(Ordering::Relaxed));

    let mut sources: Vec<&'g N> = Vec::with_capacity(graph.len());
    let mut walk: Vec<&'g N> = Vec::new();
    let mut states: Vec<&'g N> = Vec::new();
    let mut summary = RunSummary::default();

    'iterations: for walk_index in iterations {
        if cancelled() {
            summary.cancelled = true;
            break;
        }

        // Fresh permutation of the sorted node list, so sharded runs sharing one RNG stream
        // reproduce the unsharded run.
        sources.clear();
        sources.extend(graph.nodes());
        sources.shuffle(rng);
        for &source in &sources {
            if cancelled() {
                summary.cancelled = true;
                break 'iterations;
            }

            let over = overrides.get(source);
            if over.is_some_and(|o| o.skips(walk_index)) {
                continue;
            }
            let length = over.and_then(|o| o.walk_length).unwrap_or(config.walk_length);

            match walk_from(graph, source, length, rng, &mut walk, &mut states) {
                WalkEnd::Complete => {}
                WalkEnd::DeadEnd => summary.dead_ends += 1,
                WalkEnd::Truncated => summary.truncated += 1,
            }
            on_walk(&walk);
            summary.walks += 1;
        }

        summary.iterations += 1;
        if !config.quiet {
            progress.tick(walk_index + 1, config.num_walks);
        }
    }

    summary
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkEnd {
    Complete,
    DeadEnd,
    Truncated,
}

/// Fill `walk` with one walk from `source`; `states` is scratch space for the context stack.
fn walk_from<'g, N: Ord, R: Rng>(
    graph: &'g TransitionGraph<N>,
    source: &'g N,
    length: usize,
    rng: &mut R,
    walk: &mut Vec<&'g N>,
    states: &mut Vec<&'g N>,
) -> WalkEnd {
    walk.clear();
    states.clear();
    walk.push(source);
    states.push(source);

    while walk.len() < length {
        let depth = states.len();
        let current = states[depth - 1];
        let step = if depth == 1 {
            graph.first_travel(current)
        } else {
            graph.transitions(current, states[depth - 2])
        };
        let Some((candidates, weights)) = step else {
            return WalkEnd::DeadEnd;
        };

        let Some(index) = sample_cdf(rng, weights) else {
            return WalkEnd::DeadEnd;
        };
        let next = &candidates[index];
        if !graph.contains(next) {
            return WalkEnd::Truncated;
        }
        walk.push(next);

        // Returning to the previous node rewinds the context to the grandparent.
        if depth > 1 && next == states[depth - 2] {
            states.truncate(depth - 2);
        }
        states.push(next);
    }

    WalkEnd::Complete
}

#[cfg(feature = "parallel")]
fn mix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58476d1ce4e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d049bb133111eb);
    x ^= x >> 31;
    x
}
