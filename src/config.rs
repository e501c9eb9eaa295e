//! Run-wide configuration: distribution parameters and the parsed CLI surface.
//!
//! Built once in `main`, then shared behind `Arc` with every worker thread.

use std::fmt;

/// Lognormal fragment-length and optional size-selection/variable-read-length
/// parameters. Immutable once constructed; cheap to clone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistrParams {
    pub ln_mean: f64,
    pub ln_sigma: f64,
    pub ss_mean: Option<f64>,
    pub ss_sigma: f64,
    pub read_len_mean: Option<f64>,
    pub read_len_sigma: f64,
}

impl DistrParams {
    pub fn new(ln_mean: f64, ln_sigma: f64) -> Self {
        DistrParams {
            ln_mean,
            ln_sigma,
            ss_mean: None,
            ss_sigma: 0.0,
            read_len_mean: None,
            read_len_sigma: 0.0,
        }
    }

    /// `ss_mean == Some(0.0)` counts as disabled, matching the CLI's "off" default.
    pub fn with_size_selection(mut self, mean: f64, sigma: f64) -> Self {
        self.ss_mean = if mean > 0.0 { Some(mean) } else { None };
        self.ss_sigma = sigma;
        self
    }

    pub fn with_variable_read_len(mut self, mean: f64, sigma: f64) -> Self {
        self.read_len_mean = if mean > 0.0 { Some(mean) } else { None };
        self.read_len_sigma = sigma;
        self
    }

    #[inline]
    pub fn is_size_selection(&self) -> bool {
        self.ss_mean.is_some()
    }

    #[inline]
    pub fn is_variable_read_len(&self) -> bool {
        self.read_len_mean.is_some()
    }

    /// Key used by the average-length cache file name, stable across runs with
    /// identical distribution parameters.
    pub fn cache_key(&self) -> String {
        match self.ss_mean {
            Some(ss_mean) => format!(
                "{}-{}-{}-{}",
                fmt_param(self.ln_mean),
                fmt_param(self.ln_sigma),
                fmt_param(ss_mean),
                fmt_param(self.ss_sigma)
            ),
            None => format!("{}-{}", fmt_param(self.ln_mean), fmt_param(self.ln_sigma)),
        }
    }
}

fn fmt_param(v: f64) -> String {
    format!("{v}").replace('.', "_")
}

/// Sequencing mode requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqMode {
    Single,
    Paired,
}

impl fmt::Display for SeqMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeqMode::Single => write!(f, "SE"),
            SeqMode::Paired => write!(f, "PE"),
        }
    }
}

impl SeqMode {
    /// Multiplier applied to the reads budget: paired-end counts two reads per fragment.
    pub fn seq_mult(self) -> u64 {
        match self {
            SeqMode::Single => 1,
            SeqMode::Paired => 2,
        }
    }
}

/// Output file formats the ordered writer can be asked to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Fastq,
    Bed,
    Sam,
    Wig,
    Freq,
}

impl OutputFormat {
    pub fn parse_list(s: &str) -> Vec<OutputFormat> {
        s.split(',')
            .filter_map(|tok| match tok.trim().to_uppercase().as_str() {
                "FQ" | "FASTQ" => Some(OutputFormat::Fastq),
                "BED" => Some(OutputFormat::Bed),
                "SAM" => Some(OutputFormat::Sam),
                "WIG" => Some(OutputFormat::Wig),
                "FREQ" => Some(OutputFormat::Freq),
                _ => None,
            })
            .collect()
    }
}

/// Full resolved run configuration, built once from CLI args and shared
/// read-only across all worker threads.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub cell_count: u32,
    pub sample_fg: f64,
    pub sample_bg: f64,
    pub mda_enabled: bool,
    pub pcr_cycles: u8,
    pub seq_mode: SeqMode,
    pub read_len: u32,
    pub formats: Vec<OutputFormat>,
    pub control: bool,
    pub out_stem: String,
    pub thread_count: u32,
    pub seed: u32,
    pub rd_lim: u64,
    pub mapq: u32,
    pub exo_trim_rate: Option<f64>,
    pub flat_len: u32,
    pub uniform_score: bool,
    pub pcr_mda_inflation: bool,
}

impl RunConfig {
    /// Fraction `[0, 1]` of cells sampled per ground, indexed by `Ground::index()`.
    pub fn sample(&self, ground_index: usize) -> f64 {
        match ground_index {
            0 => self.sample_fg / 100.0,
            _ => self.sample_bg / 100.0,
        }
    }
}
