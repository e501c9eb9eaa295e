//! End-to-end CLI scenarios, driving the compiled `chipsim` binary the way a
//! user would. Mirrors the literal scenarios in the testable-properties
//! section: a trivial single-cell BED run, a reads-budget cap, paired-end
//! mate symmetry, chromosome-ordered output, and the BedGraph coverage
//! integral.

use assert_cmd::Command;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_genome(dir: &Path, lines: &[(&str, u32)]) -> std::path::PathBuf {
    let path = dir.join("genome.sizes");
    let body: String = lines
        .iter()
        .map(|(name, len)| format!("{name}\t{len}\n"))
        .collect();
    fs::write(&path, body).unwrap();
    path
}

fn write_bed(dir: &Path, lines: &[(&str, u32, u32, f64)]) -> std::path::PathBuf {
    let path = dir.join("features.bed");
    let body: String = lines
        .iter()
        .map(|(chrom, s, e, score)| format!("{chrom}\t{s}\t{e}\tf\t{}\t+\n", (score * 1000.0) as u32))
        .collect();
    fs::write(&path, body).unwrap();
    path
}

/// S1: trivial single-cell SE run against one small chromosome, BED output
/// only. Every record must be exactly `read_len` long and land on chr1.
#[test]
fn s1_trivial_single_cell_se_bed() {
    let dir = tempdir().unwrap();
    let genome = write_genome(dir.path(), &[("chr1", 100_000)]);
    let bed = write_bed(dir.path(), &[("chr1", 20_000, 80_000, 1.0)]);
    let out_stem = dir.path().join("mTest");

    Command::cargo_bin("chipsim")
        .unwrap()
        .current_dir(dir.path())
        .args([
            "-g",
            genome.to_str().unwrap(),
            "-b",
            bed.to_str().unwrap(),
            "-n",
            "1",
            "-f",
            "BED",
            "-L",
            "200,40",
            "--seed",
            "42",
            "-r",
            "50",
            "-o",
            out_stem.to_str().unwrap(),
        ])
        .assert()
        .success();

    let bed_path = format!("{}.bed", out_stem.display());
    let content = fs::read_to_string(&bed_path).unwrap();
    assert!(!content.is_empty(), "expected at least one BED record");
    for line in content.lines() {
        let fields: Vec<&str> = line.split('\t').collect();
        assert_eq!(fields.len(), 6);
        assert_eq!(fields[0], "chr1");
        let start: u32 = fields[1].parse().unwrap();
        let end: u32 = fields[2].parse().unwrap();
        assert_eq!(end - start, 50);
    }
}

/// S2: a tight reads-budget cap must be respected, and the run must report
/// a sub-1.0 auto-sample scaling factor on stderr.
#[test]
fn s2_reads_limit_cap() {
    let dir = tempdir().unwrap();
    let genome = write_genome(dir.path(), &[("chr1", 2_000_000)]);
    let out_stem = dir.path().join("mTest");

    let output = Command::cargo_bin("chipsim")
        .unwrap()
        .current_dir(dir.path())
        .args([
            "-g",
            genome.to_str().unwrap(),
            "-n",
            "1000",
            "--rd-lim",
            "10000",
            "-f",
            "FQ",
            "-m",
            "SE",
            "--seed",
            "1",
            "-o",
            out_stem.to_str().unwrap(),
        ])
        .assert()
        .success()
        .get_output()
        .clone();

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("scaling sample"),
        "expected an auto-sample scaling message, got: {stderr}"
    );

    let fq_path = format!("{}.fq", out_stem.display());
    let content = fs::read_to_string(&fq_path).unwrap();
    let record_count = content.lines().count() / 4;
    assert!(record_count <= 10_000, "got {record_count} records");
}

/// S3: paired-end mode must emit equal mate counts and SAM pairs sharing a
/// QNAME prefix with opposite-signed TLEN.
#[test]
fn s3_paired_end_equal_mates() {
    let dir = tempdir().unwrap();
    let genome = write_genome(dir.path(), &[("chr1", 200_000)]);
    let out_stem = dir.path().join("mTest");

    Command::cargo_bin("chipsim")
        .unwrap()
        .current_dir(dir.path())
        .args([
            "-g",
            genome.to_str().unwrap(),
            "-m",
            "PE",
            "-f",
            "FQ,SAM",
            "-n",
            "5",
            "--seed",
            "7",
            "-o",
            out_stem.to_str().unwrap(),
        ])
        .assert()
        .success();

    let fq1 = fs::read_to_string(format!("{}_1.fq", out_stem.display())).unwrap();
    let fq2 = fs::read_to_string(format!("{}_2.fq", out_stem.display())).unwrap();
    assert_eq!(fq1.lines().count(), fq2.lines().count());
    assert!(fq1.lines().count() > 0);

    let sam = fs::read_to_string(format!("{}.sam", out_stem.display())).unwrap();
    let records: Vec<&str> = sam.lines().filter(|l| !l.starts_with('@')).collect();
    assert_eq!(records.len() % 2, 0);
    for pair in records.chunks(2) {
        let f1: Vec<&str> = pair[0].split('\t').collect();
        let f2: Vec<&str> = pair[1].split('\t').collect();
        assert_eq!(f1[0], f2[0], "QNAME must match between mates");
        let tlen1: i64 = f1[8].parse().unwrap();
        let tlen2: i64 = f2[8].parse().unwrap();
        assert_eq!(tlen1, -tlen2);
    }
}

/// S4: with multiple chromosomes and multiple threads, output must be
/// ordered by the reference's own chromosome order, not completion order.
#[test]
fn s4_ordered_output_across_threads() {
    let dir = tempdir().unwrap();
    let genome = write_genome(
        dir.path(),
        &[("chr1", 50_000), ("chr10", 50_000), ("chr2", 50_000), ("chrX", 50_000)],
    );
    let out_stem = dir.path().join("mTest");

    Command::cargo_bin("chipsim")
        .unwrap()
        .current_dir(dir.path())
        .args([
            "-g",
            genome.to_str().unwrap(),
            "-n",
            "3",
            "-f",
            "BED",
            "-P",
            "4",
            "--seed",
            "11",
            "-o",
            out_stem.to_str().unwrap(),
        ])
        .assert()
        .success();

    let content = fs::read_to_string(format!("{}.bed", out_stem.display())).unwrap();
    let mut seen_order: Vec<String> = Vec::new();
    for line in content.lines() {
        let chrom = line.split('\t').next().unwrap().to_string();
        if seen_order.last() != Some(&chrom) {
            seen_order.push(chrom);
        }
    }
    assert_eq!(seen_order, vec!["chr1", "chr2", "chr10", "chrX"]);
}

/// S5: the BedGraph coverage integral must equal `read_len * BED record count`.
#[test]
fn s5_coverage_integral_matches_bed_count() {
    let dir = tempdir().unwrap();
    let genome = write_genome(dir.path(), &[("chr1", 100_000)]);
    let out_stem = dir.path().join("mTest");

    Command::cargo_bin("chipsim")
        .unwrap()
        .current_dir(dir.path())
        .args([
            "-g",
            genome.to_str().unwrap(),
            "-f",
            "BED,WIG",
            "-L",
            "200,0.01",
            "-n",
            "5",
            "--seed",
            "123",
            "-r",
            "50",
            "-o",
            out_stem.to_str().unwrap(),
        ])
        .assert()
        .success();

    let bed_count = fs::read_to_string(format!("{}.bed", out_stem.display()))
        .unwrap()
        .lines()
        .count();

    let bg = fs::read_to_string(format!("{}.bg", out_stem.display())).unwrap();
    let mut integral: u64 = 0;
    for line in bg.lines().skip(1) {
        let fields: Vec<&str> = line.split('\t').collect();
        let s: u64 = fields[1].parse().unwrap();
        let e: u64 = fields[2].parse().unwrap();
        let v: u64 = fields[3].parse().unwrap();
        integral += (e - s) * v;
    }
    assert_eq!(integral, 50 * bed_count as u64);
}

/// S6: two runs with identical CLI args and an explicit seed produce
/// byte-identical output.
#[test]
fn s6_deterministic_with_same_seed() {
    let dir = tempdir().unwrap();
    let genome = write_genome(dir.path(), &[("chr1", 80_000)]);

    let run = |stem: &std::path::Path| {
        Command::cargo_bin("chipsim")
            .unwrap()
            .current_dir(dir.path())
            .args([
                "-g",
                genome.to_str().unwrap(),
                "-n",
                "10",
                "-f",
                "BED",
                "--seed",
                "99",
                "-o",
                stem.to_str().unwrap(),
            ])
            .assert()
            .success();
    };

    let stem_a = dir.path().join("runA");
    let stem_b = dir.path().join("runB");
    run(&stem_a);
    run(&stem_b);

    let a = fs::read_to_string(format!("{}.bed", stem_a.display())).unwrap();
    let b = fs::read_to_string(format!("{}.bed", stem_b.display())).unwrap();
    assert_eq!(a, b);
}

/// Exit code 1 and a stderr message on a missing reference file.
#[test]
fn missing_genome_file_is_a_config_error() {
    let dir = tempdir().unwrap();
    let out_stem = dir.path().join("mTest");

    Command::cargo_bin("chipsim")
        .unwrap()
        .args([
            "-g",
            dir.path().join("does-not-exist.sizes").to_str().unwrap(),
            "-o",
            out_stem.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .code(1);
}

/// `-C` must produce a second, distinct control output stem alongside the
/// test stem.
#[test]
fn control_mode_writes_a_second_stem() {
    let dir = tempdir().unwrap();
    let genome = write_genome(dir.path(), &[("chr1", 60_000)]);
    let out_stem = dir.path().join("mTest");

    Command::cargo_bin("chipsim")
        .unwrap()
        .current_dir(dir.path())
        .args([
            "-g",
            genome.to_str().unwrap(),
            "-n",
            "2",
            "-f",
            "BED",
            "-C",
            "--seed",
            "5",
            "-o",
            out_stem.to_str().unwrap(),
        ])
        .assert()
        .success();

    assert!(std::path::Path::new(&format!("{}.bed", out_stem.display())).exists());
    assert!(std::path::Path::new(&format!("{}.bed", dir.path().join("mInput").display())).exists());
}
