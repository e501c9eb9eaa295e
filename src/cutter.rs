//! The per-thread work engine: fragmentation, feature-gated selection, MDA,
//! size-selection, and sequencing for one chromosome at a time.
//!
//! One `ChromCutter` lives on each worker thread's stack; it borrows shared,
//! read-only data (`Arc<DistrParams>`, `Arc<RunConfig>`) and owns its own
//! `Random` stream, `MdaSplitter` scratch buffer, and read-naming counter.

use std::sync::Arc;

use anyhow::Result;

use crate::config::{DistrParams, RunConfig};
use crate::counters::GlobalCounts;
use crate::mda::pcr_doublings;
use crate::mda::MdaSplitter;
use crate::random::Random;
use crate::types::{ChromSize, Feature, Ground, Provenance, ReadRecord, Region, Strand, TaskMode};
use crate::writer::WriterHandle;

/// Outcome of one chromosome pass. A caught exception in the original is
/// modelled here as an ordinary `Result::Err`; this enum is the status half
/// of that contract — used for early-out control flow that is *not* an
/// error (reaching the end of the chromosome, or the shared reads budget).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutStatus {
    Continue,
    EndOfChrom,
    ReadsBudgetReached,
}

pub struct ChromCutter {
    rng: Random,
    mda: MdaSplitter,
    distr: Arc<DistrParams>,
    config: Arc<RunConfig>,
    read_seq: u64,
}

impl ChromCutter {
    pub fn new(seed: u32, distr: Arc<DistrParams>, config: Arc<RunConfig>) -> Self {
        ChromCutter {
            rng: Random::new(seed),
            mda: MdaSplitter::new(),
            distr,
            config,
            read_seq: 0,
        }
    }

    fn next_name(&mut self, mode: TaskMode, ground: Ground) -> String {
        self.read_seq += 1;
        format!("{mode}_{ground}_{}", self.read_seq)
    }

    /// Runs one chromosome for `cell_count * (autosome ? 2 : 1)` simulated
    /// cells in the given mode, streaming emitted reads to `writer` and
    /// updating `counts`. Returns as soon as the shared reads budget trips.
    pub fn cut_chromosome(
        &mut self,
        chrom: &ChromSize,
        features: &[Feature],
        mode: TaskMode,
        auto_sample: f64,
        counts: &GlobalCounts,
        writer: &mut WriterHandle,
    ) -> Result<CutStatus> {
        let cells = self.config.cell_count as u64 * if chrom.is_autosome() { 2 } else { 1 };

        for _ in 0..cells {
            let status = match mode {
                TaskMode::Test => self.run_cell_test(chrom, features, auto_sample, counts, writer)?,
                TaskMode::Control => {
                    self.run_cell_background(chrom, &chrom.def_region(), auto_sample, counts, writer)?
                }
            };
            if status == CutStatus::ReadsBudgetReached {
                return Ok(CutStatus::ReadsBudgetReached);
            }
        }
        Ok(CutStatus::EndOfChrom)
    }

    /// One cell's worth of fragments in test mode: a foreground pass over
    /// every template feature, then a background tail pass over whatever of
    /// the chromosome the foreground pass didn't reach.
    fn run_cell_test(
        &mut self,
        chrom: &ChromSize,
        features: &[Feature],
        auto_sample: f64,
        counts: &GlobalCounts,
        writer: &mut WriterHandle,
    ) -> Result<CutStatus> {
        let jitter_span = self
            .distr
            .ss_mean
            .unwrap_or(self.config.read_len as f64)
            .max(1.0) as u32;
        let mut p = chrom.def_start + self.rng.range(jitter_span.max(1));
        let stop_at = chrom.def_end().saturating_sub(self.config.read_len);

        for feature in features {
            if feature.start() < p {
                continue;
            }
            while p < stop_at && p < feature.end() {
                let (status, new_p) =
                    self.attempt_fragment(p, chrom, feature, Ground::Foreground, TaskMode::Test, auto_sample, counts, writer)?;
                p = new_p;
                if status == CutStatus::ReadsBudgetReached {
                    return Ok(status);
                }
            }
            if p >= stop_at {
                return Ok(CutStatus::EndOfChrom);
            }
        }

        // background tail: whatever of the chromosome remains after the
        // last feature, using the whole chromosome as one pseudo-feature.
        let tail = Region::new(p, chrom.def_end());
        self.run_cell_background(chrom, &tail, auto_sample, counts, writer)
    }

    /// Background-only pass over `region` (used for the test-mode tail and
    /// the whole of control mode, where `region` is the entire chromosome).
    fn run_cell_background(
        &mut self,
        chrom: &ChromSize,
        region: &Region,
        auto_sample: f64,
        counts: &GlobalCounts,
        writer: &mut WriterHandle,
    ) -> Result<CutStatus> {
        let stop_at = chrom.def_end().saturating_sub(self.config.read_len);
        let whole_feature = Feature {
            region: *region,
            score: 1.0,
        };
        let mut p = region.start;
        while p < stop_at && p < region.end {
            let (status, new_p) = self.attempt_fragment(
                p,
                chrom,
                &whole_feature,
                Ground::Background,
                TaskMode::Control,
                auto_sample,
                counts,
                writer,
            )?;
            p = new_p;
            if status == CutStatus::ReadsBudgetReached {
                return Ok(status);
            }
        }
        Ok(CutStatus::EndOfChrom)
    }

    /// Samples and processes one candidate fragment starting at `p`.
    /// Returns the cutter's next cursor position and a status.
    #[allow(clippy::too_many_arguments)]
    fn attempt_fragment(
        &mut self,
        p: u32,
        chrom: &ChromSize,
        feature: &Feature,
        ground_hint: Ground,
        mode: TaskMode,
        auto_sample: f64,
        counts: &GlobalCounts,
        writer: &mut WriterHandle,
    ) -> Result<(CutStatus, u32)> {
        let len = self
            .rng
            .lognormal(self.distr.ln_mean, self.distr.ln_sigma)
            .round()
            .max(1.0) as u32;
        let frag_end = (p as u64 + len as u64).min(chrom.def_end() as u64) as u32;
        let frag = Region::new(p, frag_end);

        let (min_len, max_len) = if self.distr.is_size_selection() {
            self.rng
                .size_selection_bounds(self.distr.ss_mean, self.distr.ss_sigma, self.config.read_len)
        } else {
            (self.config.read_len as f64, f64::INFINITY)
        };

        let next_p = frag_end.max(p + 1);
        if (len as f64) < min_len {
            return Ok((CutStatus::Continue, next_p));
        }

        let ground = if frag.end >= feature.start() {
            ground_hint
        } else if ground_hint == Ground::Foreground {
            Ground::Background
        } else {
            ground_hint
        };

        let variants = self.exo_trim(frag, feature);

        for variant in &variants {
            if !self.accept_edge_flatten(variant, feature) {
                continue;
            }
            let accept_p = match ground {
                Ground::Background => 1.0,
                Ground::Foreground => feature.score,
            };
            if !self.rng.bernoulli(accept_p) {
                continue;
            }

            if (variant.len() as f64) <= max_len {
                counts.ground(ground).add_selected(1);
            }

            if variant.len() < self.config.read_len {
                continue;
            }
            if !self.rng.bernoulli(self.config.sample(ground.index())) {
                continue;
            }

            let fractions: Vec<_> = self
                .mda
                .split(&mut self.rng, variant.len(), self.config.read_len, self.config.mda_enabled)
                .to_vec();

            for fraction in fractions {
                if fraction.length < 0 {
                    continue;
                }
                if (fraction.length as f64) > max_len {
                    continue;
                }
                if !self.rng.bernoulli(auto_sample) {
                    continue;
                }
                let sub_start = variant.start + fraction.shift;
                let sub_end = sub_start + fraction.length as u32;
                let status = self.emit_reads(sub_start, sub_end, ground, mode, counts, writer)?;
                if status == CutStatus::ReadsBudgetReached {
                    return Ok((status, next_p));
                }
            }
        }

        Ok((CutStatus::Continue, next_p))
    }

    /// Optional per-strand exponential trim toward the feature boundary.
    /// Disabled by default (see `RunConfig::exo_trim_rate`); returns the
    /// untrimmed fragment alone when off, or up to two independently trimmed
    /// variants when on.
    fn exo_trim(&mut self, frag: Region, feature: &Feature) -> Vec<Region> {
        let Some(rate) = self.config.exo_trim_rate else {
            return vec![frag];
        };
        let left_trim = self.rng.exponential(rate).min((feature.start().saturating_sub(frag.start)) as f64) as u32;
        let right_trim = self
            .rng
            .exponential(rate)
            .min((frag.end.saturating_sub(feature.end())) as f64) as u32;
        let trimmed = Region::new(
            (frag.start + left_trim).min(frag.end),
            frag.end.saturating_sub(right_trim).max(frag.start),
        );
        if trimmed == frag {
            vec![frag]
        } else {
            vec![frag, trimmed]
        }
    }

    /// Binding-site edge flattening: within `flat_len` of a feature
    /// boundary, accept with probability proportional to how far into the
    /// unstable zone the fragment's edge actually falls.
    fn accept_edge_flatten(&mut self, frag: &Region, feature: &Feature) -> bool {
        let flat_len = self.config.flat_len;
        if flat_len == 0 {
            return true;
        }
        let dist_to_start = frag.end.abs_diff(feature.start());
        let dist_to_end = frag.end.abs_diff(feature.end());
        let u_zone = dist_to_start.min(dist_to_end);
        if u_zone >= flat_len {
            return true;
        }
        let p = (u_zone.min(flat_len) as f64) / flat_len as f64;
        self.rng.bernoulli(p)
    }

    /// Emits `pcr_doublings(cycles)` reads for one surviving (MDA) fragment,
    /// alternating strand, the first tagged `Primer` and the rest
    /// `Amplified`. Returns as soon as the shared budget trips.
    fn emit_reads(
        &mut self,
        start: u32,
        end: u32,
        ground: Ground,
        mode: TaskMode,
        counts: &GlobalCounts,
        writer: &mut WriterHandle,
    ) -> Result<CutStatus> {
        if end <= start || end - start < self.config.read_len {
            return Ok(CutStatus::Continue);
        }
        let copies = pcr_doublings(self.config.pcr_cycles);
        let mut strand = if self.rng.boolean() { Strand::Forward } else { Strand::Reverse };
        let budget = self.config.rd_lim / self.config.seq_mode.seq_mult();

        for i in 0..copies {
            let provenance = if i == 0 { Provenance::Primer } else { Provenance::Amplified };
            let name = self.next_name(mode, ground);
            let mate_strand = match self.config.seq_mode {
                crate::config::SeqMode::Paired => Some(strand.flip()),
                crate::config::SeqMode::Single => None,
            };
            let record = ReadRecord {
                frag_start: start,
                frag_end: end,
                read_len: self.config.read_len,
                strand,
                mate_strand,
                name,
                ground,
                provenance,
            };
            writer.add_read(record);

            let primer = provenance == Provenance::Primer;
            counts.ground(ground).add_recorded(primer);
            if counts.recorded_total() >= budget {
                return Ok(CutStatus::ReadsBudgetReached);
            }
            strand = strand.flip();
        }
        Ok(CutStatus::Continue)
    }
}
