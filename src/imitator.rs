//! Run orchestration: chromosome partitioning, sample calibration, and the
//! worker-thread fan-out/join.
//!
//! One `Imitator` is built once from the parsed CLI/config and owns the
//! whole run. Grounded in `original_source/Imitator.cpp`'s `ChromsThreads`
//! partitioning and `SetSample`/`AutoSample` calibration, re-expressed with
//! `std::thread` + `Arc` in place of the original's raw pthread handles.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Result};

use crate::cache::AvrFragCache;
use crate::config::{DistrParams, RunConfig};
use crate::counters::{ConsoleView, Context, GlobalCounts};
use crate::cutter::ChromCutter;
use crate::error::SimError;
use crate::mda::pcr_doublings;
use crate::parser::features::FeatureSet;
use crate::parser::genome::Genome;
use crate::random::Random;
use crate::types::{ChromId, ChromSize, Ground, TaskMode};
use crate::writer::{FormatWriter, Primer};

pub struct Imitator {
    genome: Genome,
    features: FeatureSet,
    chrom_filter: Option<String>,
    distr: Arc<DistrParams>,
    config: Arc<RunConfig>,
}

impl Imitator {
    pub fn new(
        genome: Genome,
        features: FeatureSet,
        chrom_filter: Option<String>,
        distr: DistrParams,
        config: RunConfig,
    ) -> Self {
        Imitator {
            genome,
            features,
            chrom_filter,
            distr: Arc::new(distr),
            config: Arc::new(config),
        }
    }

    /// The chromosomes this run will actually simulate: the `--chrom`
    /// restriction if given, otherwise every chromosome a template feature
    /// lands on, or every chromosome at all when the feature file is empty
    /// (a pure-control run with nothing to be foreground about).
    fn build_chrom_set(&self) -> Vec<ChromSize> {
        let mut chroms = if let Some(name) = &self.chrom_filter {
            self.genome.filter_one(name).into_iter().collect::<Vec<_>>()
        } else {
            self.genome.chrom_sizes()
        };

        let any_features = chroms.iter().any(|c| self.features.has_any(c.id.as_str()));
        for c in &mut chroms {
            c.treated = if self.chrom_filter.is_some() {
                true
            } else if any_features {
                self.features.has_any(c.id.as_str())
            } else {
                true
            };
        }
        chroms.into_iter().filter(|c| c.treated).collect()
    }

    /// Zig-zag ("snake") assignment of chromosomes, sorted descending by
    /// length, across `thread_count` slots so cumulative length per slot
    /// stays balanced; the resulting partitions are then sorted by total
    /// weight ascending so the lightest lands first (run on the
    /// orchestrating thread, which doesn't get its own spawned worker).
    fn partition(mut chroms: Vec<ChromSize>, thread_count: u32) -> Vec<Vec<ChromSize>> {
        let slots = (thread_count.max(1)) as usize;
        chroms.sort_by(|a, b| b.def_len.cmp(&a.def_len));

        let mut buckets: Vec<Vec<ChromSize>> = (0..slots).map(|_| Vec::new()).collect();
        for (i, chrom) in chroms.into_iter().enumerate() {
            let round = i / slots;
            let pos = if round % 2 == 0 {
                i % slots
            } else {
                slots - 1 - (i % slots)
            };
            buckets[pos].push(chrom);
        }
        buckets.sort_by_key(|b| b.iter().map(|c| c.def_len as u64).sum::<u64>());
        buckets
    }

    /// Runs one reference-chromosome trial pass (cell count forced to 1, in
    /// control mode so no feature lookup is needed) and returns
    /// `(selected_total, recorded_total)`.
    fn trial_pass(&self, reference: &ChromSize, seed: u32, force_mda: bool) -> (u64, u64) {
        let mut trial_cfg = (*self.config).clone();
        trial_cfg.cell_count = 1;
        if force_mda {
            trial_cfg.mda_enabled = true;
        }
        let trial_cfg = Arc::new(trial_cfg);

        let mut cutter = ChromCutter::new(seed, Arc::clone(&self.distr), trial_cfg);
        let counts = GlobalCounts::new();
        let primer = Primer::new(vec![reference.id.clone()], vec![]);
        let mut handle = primer.handle();
        handle.set_chrom(reference.id.clone());
        let _ = cutter.cut_chromosome(reference, &[], TaskMode::Control, 1.0, &counts, &mut handle);
        (counts.bg.selected_total(), counts.bg.recorded_total())
    }

    /// Calibrates (or reuses a cached) average-fragment-length record, then
    /// derives the `AutoSample` factor that keeps the estimated total read
    /// count within `rd_lim`.
    fn set_sample(&self, cache: &mut AvrFragCache, resolved_seed: u32, treated: &[ChromSize]) -> f64 {
        let Some(reference) = treated.iter().max_by_key(|c| c.def_len).cloned() else {
            return 1.0;
        };
        let read_len = self.config.read_len;
        let need_mda = self.config.mda_enabled;

        let have_recorded = cache.find(read_len).is_some_and(|r| r.recorded_avr > 0.0);
        let have_mda = cache.find(read_len).is_some_and(|r| r.mda_avr > 0.0);

        if !have_recorded {
            let (selected, recorded) = self.trial_pass(&reference, resolved_seed, false);
            let rec = cache.get_or_init(read_len);
            rec.selected_avr = avr_per_base(selected, reference.def_len);
            rec.recorded_avr = avr_per_base(recorded, reference.def_len);
        }
        if need_mda && !have_mda {
            let (_, recorded_mda) = self.trial_pass(&reference, resolved_seed.wrapping_add(1), true);
            let rec = cache.get_or_init(read_len);
            rec.mda_avr = avr_per_base(recorded_mda, reference.def_len);
        }

        let rec = cache.find(read_len).copied().unwrap_or_default();
        let denom = if need_mda { rec.mda_avr } else { rec.recorded_avr };
        if denom <= 0.0 {
            return 1.0;
        }
        let count_factor = self.config.cell_count as f64 / denom;

        let mut total_estimate = 0.0;
        for chrom in treated {
            for &ground in &Ground::ALL {
                total_estimate += self.config.sample(ground.index())
                    * chrom.def_len as f64
                    * count_factor
                    * self.config.seq_mode.seq_mult() as f64;
            }
        }
        if self.config.pcr_cycles > 0 {
            total_estimate *= pcr_doublings(self.config.pcr_cycles) as f64;
        }

        let max_reads = self.config.rd_lim as f64;
        if total_estimate <= max_reads {
            1.0
        } else {
            max_reads / total_estimate
        }
    }

    /// Runs the whole simulation: calibration, partitioning, worker
    /// fan-out/join, and final totals. `cache_stem` is the path the
    /// average-length cache file is derived from (typically the output
    /// stem). `test_writers` is mandatory; `control_writers` is required
    /// exactly when `RunConfig::control` is set.
    pub fn run(
        &self,
        cache_stem: &Path,
        test_writers: Vec<Box<dyn FormatWriter>>,
        control_writers: Option<Vec<Box<dyn FormatWriter>>>,
    ) -> Result<()> {
        let treated = self.build_chrom_set();
        if treated.is_empty() {
            bail!("no chromosome selected for simulation");
        }
        if self.config.control && control_writers.is_none() {
            bail!("control mode requested but no control writers were supplied");
        }

        let resolved_seed = Random::resolve_seed(self.config.seed);

        let mut cache = AvrFragCache::open(cache_stem, &self.distr)?;
        let auto_sample = self.set_sample(&mut cache, resolved_seed, &treated);
        cache.flush_on_exit()?;
        if auto_sample < 1.0 {
            eprintln!(
                "reads-budget estimate exceeds rd-lim, scaling sample by {:.4}",
                auto_sample
            );
        }

        let partitions = Self::partition(treated.clone(), self.config.thread_count);

        let adjusted_rd_lim = self
            .config
            .rd_lim
            .saturating_sub((self.config.thread_count / 2) as u64);
        let mut run_cfg = (*self.config).clone();
        run_cfg.rd_lim = adjusted_rd_lim;
        let run_cfg = Arc::new(run_cfg);

        let mut order: Vec<ChromId> = treated.iter().map(|c| c.id.clone()).collect();
        order.sort();

        let test_primer = Primer::new(order.clone(), test_writers);
        let control_primer = if self.config.control {
            Some(Primer::new(order, control_writers.unwrap_or_default()))
        } else {
            None
        };

        let ctx = Arc::new(Context::new(self.config.control));
        let console = Arc::new(ConsoleView::new());
        let features = Arc::new(self.features.clone());

        let started = Instant::now();

        let mut partitions = partitions.into_iter();
        let main_partition = partitions.next().unwrap_or_default();

        let mut handles = Vec::new();
        for (i, partition) in partitions.enumerate() {
            let thread_idx = i + 1;
            let features = Arc::clone(&features);
            let distr = Arc::clone(&self.distr);
            let config = Arc::clone(&run_cfg);
            let ctx = Arc::clone(&ctx);
            let test_primer = Arc::clone(&test_primer);
            let control_primer = control_primer.clone();
            let console = Arc::clone(&console);
            handles.push(std::thread::spawn(move || {
                run_partition(
                    thread_idx,
                    partition,
                    &features,
                    &distr,
                    &config,
                    &ctx,
                    &test_primer,
                    control_primer.as_ref(),
                    &console,
                    resolved_seed,
                    auto_sample,
                );
            }));
        }

        run_partition(
            0,
            main_partition,
            &features,
            &self.distr,
            &run_cfg,
            &ctx,
            &test_primer,
            control_primer.as_ref(),
            &console,
            resolved_seed,
            auto_sample,
        );

        for h in handles {
            let _ = h.join();
        }

        console.print_totals(&ctx, started.elapsed());
        test_primer.close()?;
        if let Some(cp) = &control_primer {
            cp.close()?;
        }
        Ok(())
    }
}

/// Runs one partition of chromosomes to completion on the calling thread,
/// across `{Test, Control}`. Any worker error is logged with `thread_idx`
/// and stops just this thread's remaining work; it is never propagated as a
/// panic, so the other threads still join and whatever totals accumulated
/// still get printed.
#[allow(clippy::too_many_arguments)]
fn run_partition(
    thread_idx: usize,
    partition: Vec<ChromSize>,
    features: &FeatureSet,
    distr: &Arc<DistrParams>,
    config: &Arc<RunConfig>,
    ctx: &Context,
    test_primer: &Arc<Primer>,
    control_primer: Option<&Arc<Primer>>,
    console: &ConsoleView,
    resolved_seed: u32,
    auto_sample: f64,
) {
    let mut test_handle = test_primer.handle();
    let mut control_handle = control_primer.map(|p| p.handle());

    for chrom in &partition {
        let feats = features.chrom(chrom.id.as_str());
        let seed = chrom_seed(resolved_seed, &chrom.id);
        let mut cutter = ChromCutter::new(seed, Arc::clone(distr), Arc::clone(config));

        test_handle.set_chrom(chrom.id.clone());
        if let Err(e) = cutter.cut_chromosome(chrom, feats, TaskMode::Test, auto_sample, &ctx.test, &mut test_handle) {
            report_worker_error(console, thread_idx, e);
            return;
        }
        if let Err(e) = test_handle.write_chrom(chrom.id.clone()) {
            report_worker_error(console, thread_idx, e);
            return;
        }

        if let (Some(handle), Some(counts)) = (control_handle.as_mut(), ctx.control.as_ref()) {
            handle.set_chrom(chrom.id.clone());
            if let Err(e) = cutter.cut_chromosome(chrom, feats, TaskMode::Control, auto_sample, counts, handle) {
                report_worker_error(console, thread_idx, e);
                return;
            }
            if let Err(e) = handle.write_chrom(chrom.id.clone()) {
                report_worker_error(console, thread_idx, e);
                return;
            }
        }
    }
}

/// Wraps a worker-thread failure as a `SimError::WorkerPanic` before handing
/// it to the console view, so the typed error (not just an ad hoc string) is
/// what callers matching on `SimError` would see if this were ever
/// propagated instead of logged.
fn report_worker_error(console: &ConsoleView, thread_idx: usize, err: anyhow::Error) {
    let wrapped = SimError::WorkerPanic {
        thread_idx,
        message: err.to_string(),
    };
    console.log_worker_error(thread_idx, &wrapped);
}

/// Derives a chromosome's PRNG seed from the run's base seed, independent of
/// which thread or partition the chromosome ends up assigned to.
fn chrom_seed(base: u32, id: &ChromId) -> u32 {
    let mut h: u32 = base ^ 0x9e37_79b9;
    for byte in id.as_str().bytes() {
        h ^= byte as u32;
        h = h.wrapping_mul(16_777_619);
    }
    if h == 0 {
        1
    } else {
        h
    }
}

fn avr_per_base(count: u64, len: u32) -> f64 {
    if count == 0 {
        0.0
    } else {
        len as f64 / count as f64
    }
}
