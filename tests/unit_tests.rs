//! Black-box tests against chipsim's public library API: building a `Genome`
//! and `FeatureSet` from in-memory files and driving `Imitator::run` directly,
//! without going through the CLI binary. Complements the `#[cfg(test)]`
//! modules co-located in each `src/` file, which cover unit-level behavior.

use ahash::AHashMap;
use chipsim::config::{DistrParams, OutputFormat, RunConfig, SeqMode};
use chipsim::parser::FeatureSet;
use chipsim::writer::bed::BedWriter;
use chipsim::writer::distribution::DistributionWriter;
use chipsim::writer::fastq::FastqWriter;
use chipsim::writer::FormatWriter;
use chipsim::{Feature, Genome, Imitator};
use tempfile::tempdir;

fn base_config(out_stem: &str) -> RunConfig {
    RunConfig {
        cell_count: 4,
        sample_fg: 100.0,
        sample_bg: 10.0,
        mda_enabled: false,
        pcr_cycles: 0,
        seq_mode: SeqMode::Single,
        read_len: 30,
        formats: vec![OutputFormat::Bed],
        control: false,
        out_stem: out_stem.to_string(),
        thread_count: 2,
        seed: 13,
        rd_lim: 1_000_000,
        mapq: 40,
        exo_trim_rate: None,
        flat_len: 0,
        uniform_score: true,
        pcr_mda_inflation: false,
    }
}

fn writers(out_stem: &str, config: &RunConfig) -> Vec<Box<dyn FormatWriter>> {
    vec![Box::new(BedWriter::new(out_stem, config.mapq).unwrap())]
}

#[test]
fn imitator_run_produces_bed_records_within_a_chromosome() {
    let dir = tempdir().unwrap();
    let sizes_path = dir.path().join("genome.sizes");
    std::fs::write(&sizes_path, "chr1\t50000\n").unwrap();
    let genome = Genome::from_file(&sizes_path).unwrap();

    let mut by_chrom = AHashMap::new();
    by_chrom.insert("chr1".to_string(), vec![Feature::new(1000, 40000, 1.0)]);
    let features = FeatureSet { by_chrom };

    let out_stem = dir.path().join("mTest");
    let config = base_config(out_stem.to_str().unwrap());
    let test_writers = writers(out_stem.to_str().unwrap(), &config);

    let imitator = Imitator::new(genome, features, None, DistrParams::new(5.46, 0.4), config);
    imitator.run(&out_stem, test_writers, None).unwrap();

    let content = std::fs::read_to_string(format!("{}.bed", out_stem.display())).unwrap();
    assert!(!content.is_empty());
    for line in content.lines() {
        let fields: Vec<&str> = line.split('\t').collect();
        assert_eq!(fields[0], "chr1");
        let start: u32 = fields[1].parse().unwrap();
        let end: u32 = fields[2].parse().unwrap();
        assert!(end > start);
        assert!(end <= 50000);
    }
}

#[test]
fn imitator_run_with_no_features_still_emits_background() {
    let dir = tempdir().unwrap();
    let sizes_path = dir.path().join("genome.sizes");
    std::fs::write(&sizes_path, "chr1\t30000\n").unwrap();
    let genome = Genome::from_file(&sizes_path).unwrap();
    let features = FeatureSet::default();

    let out_stem = dir.path().join("mTest");
    let config = base_config(out_stem.to_str().unwrap());
    let test_writers = writers(out_stem.to_str().unwrap(), &config);

    let imitator = Imitator::new(genome, features, None, DistrParams::new(5.46, 0.4), config);
    imitator.run(&out_stem, test_writers, None).unwrap();

    let content = std::fs::read_to_string(format!("{}.bed", out_stem.display())).unwrap();
    assert!(!content.is_empty(), "a feature-less genome should still produce background reads");
}

#[test]
fn imitator_run_rejects_unmatched_chrom_filter() {
    let dir = tempdir().unwrap();
    let sizes_path = dir.path().join("genome.sizes");
    std::fs::write(&sizes_path, "chr1\t10000\n").unwrap();
    let genome = Genome::from_file(&sizes_path).unwrap();
    let features = FeatureSet::default();

    let out_stem = dir.path().join("mTest");
    let config = base_config(out_stem.to_str().unwrap());
    let test_writers = writers(out_stem.to_str().unwrap(), &config);

    let imitator = Imitator::new(
        genome,
        features,
        Some("chrZZZ".to_string()),
        DistrParams::new(5.46, 0.4),
        config,
    );
    let result = imitator.run(&out_stem, test_writers, None);
    assert!(result.is_err());
}

#[test]
fn imitator_run_with_control_writes_two_stems() {
    let dir = tempdir().unwrap();
    let sizes_path = dir.path().join("genome.sizes");
    std::fs::write(&sizes_path, "chr1\t40000\n").unwrap();
    let genome = Genome::from_file(&sizes_path).unwrap();

    let mut by_chrom = AHashMap::new();
    by_chrom.insert("chr1".to_string(), vec![Feature::new(5000, 20000, 1.0)]);
    let features = FeatureSet { by_chrom };

    let test_stem = dir.path().join("mTest");
    let control_stem = dir.path().join("mInput");
    let mut config = base_config(test_stem.to_str().unwrap());
    config.control = true;

    let test_writers = writers(test_stem.to_str().unwrap(), &config);
    let control_writers = writers(control_stem.to_str().unwrap(), &config);

    let imitator = Imitator::new(genome, features, None, DistrParams::new(5.46, 0.4), config);
    imitator
        .run(&test_stem, test_writers, Some(control_writers))
        .unwrap();

    assert!(std::path::Path::new(&format!("{}.bed", test_stem.display())).exists());
    assert!(std::path::Path::new(&format!("{}.bed", control_stem.display())).exists());
}

#[test]
fn multi_format_run_keeps_fastq_and_freq_counts_consistent() {
    let dir = tempdir().unwrap();
    let sizes_path = dir.path().join("genome.sizes");
    std::fs::write(&sizes_path, "chr1\t40000\n").unwrap();
    let genome = Genome::from_file(&sizes_path).unwrap();

    let mut by_chrom = AHashMap::new();
    by_chrom.insert("chr1".to_string(), vec![Feature::new(2000, 30000, 1.0)]);
    let features = FeatureSet { by_chrom };

    let out_stem = dir.path().join("mTest");
    let mut config = base_config(out_stem.to_str().unwrap());
    config.formats = vec![OutputFormat::Fastq, OutputFormat::Freq];

    let distr = DistrParams::new(5.46, 0.4);
    let test_writers: Vec<Box<dyn FormatWriter>> = vec![
        Box::new(FastqWriter::new(out_stem.to_str().unwrap(), config.seq_mode, config.read_len, false).unwrap()),
        Box::new(DistributionWriter::new(out_stem.to_str().unwrap(), distr)),
    ];

    let imitator = Imitator::new(genome, features, None, distr, config);
    imitator.run(&out_stem, test_writers, None).unwrap();

    let fq = std::fs::read_to_string(format!("{}.fq", out_stem.display())).unwrap();
    let fq_records = fq.lines().count() / 4;

    let read_freq = std::fs::read_to_string(format!("{}.read.freq", out_stem.display())).unwrap();
    let freq_total: u64 = read_freq
        .lines()
        .skip(1)
        .map(|l| l.split('\t').nth(1).unwrap().parse::<u64>().unwrap())
        .sum();

    assert_eq!(fq_records as u64, freq_total);
}
