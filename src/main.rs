//! CLI entry point for chipsim.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use chipsim::config::{DistrParams, OutputFormat, RunConfig, SeqMode};
use chipsim::error::SimError;
use chipsim::parser::{parse_features, Genome};
use chipsim::writer::bed::BedWriter;
use chipsim::writer::bedgraph::BedGraphWriter;
use chipsim::writer::distribution::DistributionWriter;
use chipsim::writer::fastq::FastqWriter;
use chipsim::writer::sam::SamWriter;
use chipsim::writer::wig::WigWriter;
use chipsim::writer::FormatWriter;
use chipsim::{ChromSize, Imitator};

/// In silico ChIP-seq read simulator.
#[derive(Parser, Debug)]
#[command(name = "chipsim")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Reference chrom-sizes file
    #[arg(short = 'g', long = "genome")]
    genome: PathBuf,

    /// Template binding-site features (BED)
    #[arg(short = 'b', long = "bed")]
    bed: Option<PathBuf>,

    /// Nominal cell count, [1, 2000000]
    #[arg(short = 'n', long = "cells", default_value_t = 1)]
    cells: u32,

    /// Foreground,background sample percentages
    #[arg(short = 'G', long = "sample", default_value = "100,1")]
    sample: String,

    /// Enable multiple displacement amplification
    #[arg(short = 'D', long = "mda")]
    mda: bool,

    /// PCR cycles, [0, 500]
    #[arg(short = 'a', long = "pcr-cycles", default_value_t = 0)]
    pcr_cycles: u8,

    /// Restrict simulation to one chromosome
    #[arg(short = 'c', long = "chrom")]
    chrom: Option<String>,

    /// Sequencing mode: SE or PE
    #[arg(short = 'm', long = "mode", default_value = "SE")]
    mode: String,

    /// Fragment lognormal mu,sigma
    #[arg(short = 'L', long = "frag-dist", default_value = "5.46,0.4")]
    frag_dist: String,

    /// Size-selection normal mean,sigma (off by default)
    #[arg(short = 'S', long = "size-sel")]
    size_sel: Option<String>,

    /// Read length
    #[arg(short = 'r', long = "read-len", default_value_t = 50)]
    read_len: u32,

    /// Subset of {FQ,BED,SAM,WIG,FREQ}
    #[arg(short = 'f', long = "formats", default_value = "FQ")]
    formats: String,

    /// Also generate a control (input) file
    #[arg(short = 'C', long = "control")]
    control: bool,

    /// Output stem
    #[arg(short = 'o', long = "output", default_value = "mTest")]
    output: String,

    /// Worker-thread count (0 = auto-detect from available cores)
    #[arg(short = 'P', long = "threads", default_value_t = 0)]
    threads: u32,

    /// PRNG seed (0 = time-derived)
    #[arg(long = "seed", default_value_t = 0)]
    seed: u32,

    /// Cap on total recorded reads
    #[arg(long = "rd-lim", default_value_t = 200_000_000)]
    rd_lim: u64,

    /// Mapping-quality constant written to SAM/BED records
    #[arg(long = "mapq", default_value_t = 60)]
    mapq: u32,

    /// Binding-site edge flattening window
    #[arg(long = "flat-len", default_value_t = 0)]
    flat_len: u32,

    /// Ignore the BED score column; treat every feature as full-strength
    #[arg(long = "uniform-score")]
    uniform_score: bool,

    /// Supplemental EXO-trim exponential rate (off by default)
    #[arg(long = "exo-trim")]
    exo_trim: Option<f64>,

    /// Apply the PCR/MDA inflation factor to the reads-budget estimate
    #[arg(long = "pcr-mda-inflation")]
    pcr_mda_inflation: bool,

    /// Split BedGraph output into separate .pos/.neg files by strand
    #[arg(long = "bg-split-strand")]
    bg_split_strand: bool,
}

fn parse_two_f64(s: &str, flag: &str) -> Result<(f64, f64)> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 2 {
        bail!("{flag} expects two comma-separated numbers, got {s:?}");
    }
    let a: f64 = parts[0]
        .trim()
        .parse()
        .with_context(|| format!("invalid {flag} value {s:?}"))?;
    let b: f64 = parts[1]
        .trim()
        .parse()
        .with_context(|| format!("invalid {flag} value {s:?}"))?;
    Ok((a, b))
}

/// Derives a control-file stem from the test stem by swapping a "test"
/// substring (case-insensitive) for "Input", or appending "_input" otherwise.
fn control_stem(stem: &str) -> String {
    if let Some(idx) = stem.to_lowercase().find("test") {
        format!("{}{}{}", &stem[..idx], "Input", &stem[idx + 4..])
    } else {
        format!("{stem}_input")
    }
}

fn build_writers(
    out_stem: &str,
    config: &RunConfig,
    distr: &DistrParams,
    chroms: &[ChromSize],
    command_line: &str,
    bg_split_strand: bool,
) -> Result<Vec<Box<dyn FormatWriter>>> {
    let mut writers: Vec<Box<dyn FormatWriter>> = Vec::new();
    for fmt in &config.formats {
        match fmt {
            OutputFormat::Fastq => writers.push(Box::new(
                FastqWriter::new(
                    out_stem,
                    config.seq_mode,
                    config.read_len,
                    distr.is_variable_read_len(),
                )
                .with_context(|| format!("failed to open FASTQ writer for {out_stem}"))?,
            )),
            OutputFormat::Bed => writers.push(Box::new(
                BedWriter::new(out_stem, config.mapq)
                    .with_context(|| format!("failed to open BED writer for {out_stem}"))?,
            )),
            OutputFormat::Sam => writers.push(Box::new(
                SamWriter::new(out_stem, config.seq_mode, config.mapq, chroms, command_line)
                    .with_context(|| format!("failed to open SAM writer for {out_stem}"))?,
            )),
            // WIG and BedGraph both read off the same per-chromosome coverage
            // map, so requesting WIG also gets a matching BedGraph alongside it.
            OutputFormat::Wig => {
                writers.push(Box::new(
                    WigWriter::new(out_stem)
                        .with_context(|| format!("failed to open WIG writer for {out_stem}"))?,
                ));
                writers.push(Box::new(
                    BedGraphWriter::new(out_stem, bg_split_strand)
                        .with_context(|| format!("failed to open BedGraph writer for {out_stem}"))?,
                ));
            }
            OutputFormat::Freq => writers.push(Box::new(DistributionWriter::new(out_stem, *distr))),
        }
    }
    Ok(writers)
}

fn run() -> Result<()> {
    let args = Args::parse();
    let command_line: String = std::env::args().collect::<Vec<_>>().join(" ");

    if !(1..=2_000_000).contains(&args.cells) {
        bail!("--cells must be within [1, 2000000], got {}", args.cells);
    }
    if args.pcr_cycles as u32 > 500 {
        bail!("--pcr-cycles must be within [0, 500], got {}", args.pcr_cycles);
    }
    if !args.genome.exists() {
        bail!("reference genome not found: {}", args.genome.display());
    }

    let (sample_fg, sample_bg) = parse_two_f64(&args.sample, "--sample")?;
    let (ln_mean, ln_sigma) = parse_two_f64(&args.frag_dist, "--frag-dist")?;

    let mut distr = DistrParams::new(ln_mean, ln_sigma);
    if let Some(ss) = &args.size_sel {
        let (ss_mean, ss_sigma) = parse_two_f64(ss, "--size-sel")?;
        distr = distr.with_size_selection(ss_mean, ss_sigma);
    }

    let seq_mode = match args.mode.to_uppercase().as_str() {
        "SE" => SeqMode::Single,
        "PE" => SeqMode::Paired,
        other => bail!("--mode must be SE or PE, got {other:?}"),
    };

    let formats = OutputFormat::parse_list(&args.formats);
    if formats.is_empty() {
        bail!("--formats resolved to no known output format: {:?}", args.formats);
    }

    let genome = Genome::from_file(&args.genome)
        .with_context(|| format!("failed to read reference genome {}", args.genome.display()))?;

    let features = match &args.bed {
        Some(path) => parse_features(path, args.uniform_score)
            .with_context(|| format!("failed to read features file {}", path.display()))?,
        None => Default::default(),
    };

    let thread_count = if args.threads == 0 {
        num_cpus::get() as u32
    } else {
        args.threads
    };

    let config = RunConfig {
        cell_count: args.cells,
        sample_fg,
        sample_bg,
        mda_enabled: args.mda,
        pcr_cycles: args.pcr_cycles,
        seq_mode,
        read_len: args.read_len,
        formats,
        control: args.control,
        out_stem: args.output.clone(),
        thread_count: thread_count.max(1),
        seed: args.seed,
        rd_lim: args.rd_lim,
        mapq: args.mapq,
        exo_trim_rate: args.exo_trim,
        flat_len: args.flat_len,
        uniform_score: args.uniform_score,
        pcr_mda_inflation: args.pcr_mda_inflation,
    };

    let chroms = match &args.chrom {
        Some(name) => genome
            .filter_one(name)
            .map(|c| vec![c])
            .ok_or_else(|| SimError::UnknownChrom(name.clone()))?,
        None => genome.chrom_sizes(),
    };

    let test_writers = build_writers(
        &config.out_stem,
        &config,
        &distr,
        &chroms,
        &command_line,
        args.bg_split_strand,
    )?;
    let control_writers = if config.control {
        Some(build_writers(
            &control_stem(&config.out_stem),
            &config,
            &distr,
            &chroms,
            &command_line,
            args.bg_split_strand,
        )?)
    } else {
        None
    };

    let cache_stem = PathBuf::from(&config.out_stem);
    let imitator = Imitator::new(genome, features, args.chrom.clone(), distr, config);
    imitator.run(&cache_stem, test_writers, control_writers)?;

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
