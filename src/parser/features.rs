//! BED features reader.
//!
//! Reads the template binding-site features that drive foreground selection:
//! chrom, start, end and (if present) a BED score column rescaled to `[0, 1]`.

use ahash::AHashMap;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufRead;
use std::path::Path;

use crate::parser::util::create_buffered_reader;
use crate::types::Feature;

/// Parsed features, grouped by chromosome name, in file order.
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    pub by_chrom: AHashMap<String, Vec<Feature>>,
}

impl FeatureSet {
    pub fn chrom(&self, name: &str) -> &[Feature] {
        self.by_chrom.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_any(&self, name: &str) -> bool {
        self.by_chrom.get(name).is_some_and(|v| !v.is_empty())
    }
}

/// Parses a BED file of binding-site features. Supports plain and
/// gzip-compressed input. When `uniform_score` is set, every feature's
/// score is forced to `1.0` regardless of the file's score column.
pub fn parse_features(path: &Path, uniform_score: bool) -> Result<FeatureSet> {
    let file = File::open(path).with_context(|| format!("failed to open features file {path:?}"))?;
    let reader = create_buffered_reader(file, path);
    parse_features_reader(reader, uniform_score)
}

fn parse_features_reader<R: BufRead>(reader: R, uniform_score: bool) -> Result<FeatureSet> {
    let mut by_chrom: AHashMap<String, Vec<Feature>> = AHashMap::new();

    for line in reader.lines() {
        let line = line.context("failed to read features line")?;
        let trimmed = line.trim_end();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("track") {
            continue;
        }
        let fields: Vec<&str> = trimmed.split('\t').collect();
        if fields.len() < 3 {
            continue;
        }
        let chrom = fields[0].to_string();
        let Ok(start) = fields[1].parse::<u32>() else {
            continue;
        };
        let Ok(end) = fields[2].parse::<u32>() else {
            continue;
        };
        let score = if uniform_score {
            1.0
        } else {
            fields
                .get(4)
                .and_then(|s| s.parse::<f64>().ok())
                .map(|raw| (raw / 1000.0).clamp(0.0, 1.0))
                .unwrap_or(1.0)
        };

        by_chrom
            .entry(chrom)
            .or_default()
            .push(Feature::new(start, end, score));
    }

    for features in by_chrom.values_mut() {
        features.sort_by_key(|f| f.start());
    }

    Ok(FeatureSet { by_chrom })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    #[test]
    fn test_parses_basic_fields() {
        let text = "chr1\t100\t200\nchr1\t300\t400\n";
        let fs = parse_features_reader(BufReader::new(text.as_bytes()), false).unwrap();
        assert_eq!(fs.chrom("chr1").len(), 2);
        assert_eq!(fs.chrom("chr1")[0].score, 1.0);
    }

    #[test]
    fn test_score_column_rescaled() {
        let text = "chr1\t100\t200\tname1\t500\t+\n";
        let fs = parse_features_reader(BufReader::new(text.as_bytes()), false).unwrap();
        assert_eq!(fs.chrom("chr1")[0].score, 0.5);
    }

    #[test]
    fn test_uniform_score_overrides_file() {
        let text = "chr1\t100\t200\tname1\t200\t+\n";
        let fs = parse_features_reader(BufReader::new(text.as_bytes()), true).unwrap();
        assert_eq!(fs.chrom("chr1")[0].score, 1.0);
    }

    #[test]
    fn test_sorted_by_start() {
        let text = "chr1\t300\t400\nchr1\t100\t200\n";
        let fs = parse_features_reader(BufReader::new(text.as_bytes()), false).unwrap();
        let starts: Vec<u32> = fs.chrom("chr1").iter().map(|f| f.start()).collect();
        assert_eq!(starts, vec![100, 300]);
    }

    #[test]
    fn test_skips_track_and_comment_lines() {
        let text = "track name=foo\n#comment\nchr1\t100\t200\n";
        let fs = parse_features_reader(BufReader::new(text.as_bytes()), false).unwrap();
        assert_eq!(fs.chrom("chr1").len(), 1);
    }

    #[test]
    fn test_has_any() {
        let text = "chr1\t100\t200\n";
        let fs = parse_features_reader(BufReader::new(text.as_bytes()), false).unwrap();
        assert!(fs.has_any("chr1"));
        assert!(!fs.has_any("chr2"));
    }
}
