use crate::config::ProgressConfig;
use crate::events::{EventBus, SearchEventKind};
use crate::filters::SearchFilter;
use crate::statistic::SearchStatistic;
use hashbrown::HashSet;
use reweave_core::{
    Executor, FitManager, FitResult, IpfSink, Model, SearchDirection, VariableList,
};
use reweave_error::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// One evaluated model in a search.
#[derive(Clone, Debug)]
pub struct SearchCandidate {
    pub model: Model,
    pub name: String,
    pub score: f64,
    pub result: FitResult,
    pub level: usize,
}

/// Everything a finished search hands back: the global candidate list
/// sorted best-first, plus counters and timing.
#[derive(Clone, Debug)]
pub struct SearchReport {
    pub candidates: Vec<SearchCandidate>,
    pub total_evaluated: usize,
    pub levels_run: usize,
    pub elapsed: Duration,
}

impl SearchReport {
    pub fn best(&self) -> Option<&SearchCandidate> {
        self.candidates.first()
    }
}

/// What one worker brings back from expanding one seed.
#[derive(Default)]
struct WorkerBatch {
    candidates: Vec<SearchCandidate>,
    evaluated: usize,
    loopless: usize,
    loopy: usize,
}

/// Level-by-level beam search over the model lattice. Each level's seeds
/// are expanded by workers holding private manager clones; the driver
/// merges, deduplicates by canonical name, sorts by the target statistic,
/// and keeps the best `width` as the next level's seeds.
pub struct SearchEngine {
    pub(crate) manager: FitManager,
    pub(crate) filter: SearchFilter,
    pub(crate) statistic: SearchStatistic,
    pub(crate) width: usize,
    pub(crate) levels: usize,
    pub(crate) executor: Executor,
    pub(crate) progress: ProgressConfig,
    pub(crate) bus: EventBus,
    pub(crate) start: Option<Model>,
}

impl SearchEngine {
    pub fn builder() -> crate::builder::SearchBuilder {
        crate::builder::SearchBuilder::default()
    }

    pub fn vars(&self) -> &VariableList {
        self.manager.vars()
    }

    pub fn run(&mut self) -> Result<SearchReport> {
        let direction = self.manager.direction();
        let start_model = self
            .start
            .clone()
            .unwrap_or_else(|| self.manager.start_model());

        if self.bus.is_active() && self.progress.enabled {
            let bus = self.bus.clone();
            let sink: IpfSink =
                Arc::new(move |iteration| bus.publish(SearchEventKind::IpfIteration(iteration.clone())));
            let ipf = self.manager.ipf_config_mut();
            ipf.progress = Some(sink);
            ipf.progress_interval = self.progress.ipf_interval;
        }

        let started = Instant::now();
        self.bus.publish(SearchEventKind::SearchStarted {
            total_levels: self.levels,
            statistic_name: self.statistic.name().to_string(),
        });

        // Level 0: the start model seeds the beam.
        let mut manager = self.manager.clone();
        let start_result = manager.fit(&start_model)?;
        let start_name = start_model.name(manager.vars());
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(start_name.clone());

        let mut global: Vec<SearchCandidate> = vec![SearchCandidate {
            score: self.statistic.value(&start_result),
            name: start_name.clone(),
            model: start_model.clone(),
            result: start_result,
            level: 0,
        }];
        let mut best_name = start_name;
        let mut best_score = global[0].score;

        let mut seeds: Vec<Model> = vec![start_model];
        let mut total_evaluated = 1usize;
        let mut levels_run = 0usize;

        for level in 1..=self.levels {
            let level_started = Instant::now();
            let batches = self.expand_level(&manager, &seeds, level, direction);

            let mut in_level = 0usize;
            let mut unreported = 0usize;
            let mut loopless = 0usize;
            let mut loopy = 0usize;
            let mut level_candidates: Vec<SearchCandidate> = Vec::new();

            for batch in batches {
                total_evaluated += batch.evaluated;
                in_level += batch.evaluated;
                unreported += batch.evaluated;
                loopless += batch.loopless;
                loopy += batch.loopy;
                for candidate in batch.candidates {
                    if seen.insert(candidate.name.clone()) {
                        level_candidates.push(candidate);
                    }
                }
                if self.progress.model_batch_size > 0
                    && unreported >= self.progress.model_batch_size
                {
                    self.bus.publish(SearchEventKind::ModelBatch {
                        evaluated: unreported,
                        in_level,
                        total_evaluated,
                    });
                    unreported = 0;
                }
            }

            // stable sort keeps first-seen order among equal scores
            level_candidates.sort_by(|a, b| self.statistic.compare(a.score, b.score));

            for candidate in &level_candidates {
                if self.statistic.improves(candidate.score, best_score) {
                    best_score = candidate.score;
                    best_name = candidate.name.clone();
                }
            }
            global.extend(level_candidates.iter().cloned());

            seeds = level_candidates
                .into_iter()
                .take(self.width)
                .map(|candidate| candidate.model)
                .collect();
            levels_run = level;

            let level_time = level_started.elapsed();
            debug!(
                level,
                evaluated = in_level,
                best = %best_name,
                "search level complete"
            );
            self.bus.publish(SearchEventKind::SearchLevel {
                level,
                total_levels: self.levels,
                total_evaluated,
                loopless_count: loopless,
                loop_count: loopy,
                best_name: best_name.clone(),
                best_stat: best_score,
                level_time,
                elapsed: started.elapsed(),
                avg_per_model: level_time / in_level.max(1) as u32,
            });

            if seeds.is_empty() {
                break;
            }
        }

        global.sort_by(|a, b| self.statistic.compare(a.score, b.score));
        let elapsed = started.elapsed();
        self.bus.publish(SearchEventKind::SearchComplete {
            total_evaluated,
            best_name: best_name.clone(),
            best_stat: best_score,
            elapsed,
        });

        Ok(SearchReport {
            candidates: global,
            total_evaluated,
            levels_run,
            elapsed,
        })
    }

    /// Scatter-gather expansion: one job per seed, each owning a manager
    /// clone. With a single seed the batch runs inline; the per-clone cost
    /// is not worth a worker handoff.
    fn expand_level(
        &self,
        manager: &FitManager,
        seeds: &[Model],
        level: usize,
        direction: SearchDirection,
    ) -> Vec<WorkerBatch> {
        let jobs: Vec<_> = seeds
            .iter()
            .map(|seed| {
                let seed = seed.clone();
                let mut worker = manager.clone();
                let filter = self.filter;
                let statistic = self.statistic;
                move || expand_seed(&mut worker, &seed, filter, statistic, direction, level)
            })
            .collect();

        if self.executor.is_parallel() && jobs.len() >= 2 {
            self.executor.execute_batch(jobs)
        } else {
            jobs.into_iter().map(|mut job| job()).collect()
        }
    }
}

/// Expand one seed and fit every neighbor. Fit errors are logged and
/// skipped, so a bad seed contributes a short batch instead of aborting
/// the search.
fn expand_seed(
    worker: &mut FitManager,
    seed: &Model,
    filter: SearchFilter,
    statistic: SearchStatistic,
    direction: SearchDirection,
    level: usize,
) -> WorkerBatch {
    let mut batch = WorkerBatch::default();
    let neighbors = filter.neighbors(seed, worker.vars(), direction);
    let mut local_seen: HashSet<String> = HashSet::with_capacity(neighbors.len());

    for neighbor in neighbors {
        let name = neighbor.name(worker.vars());
        if !local_seen.insert(name.clone()) {
            continue;
        }
        match worker.fit(&neighbor) {
            Ok(result) => {
                batch.evaluated += 1;
                if result.has_loops {
                    batch.loopy += 1;
                } else {
                    batch.loopless += 1;
                }
                batch.candidates.push(SearchCandidate {
                    score: statistic.value(&result),
                    name,
                    model: neighbor,
                    result,
                    level,
                });
            }
            Err(err) => {
                warn!(model = %name, %err, "fit failed during search");
            }
        }
    }
    batch
}
