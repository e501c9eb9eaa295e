//! Chromosome-sizes reader.
//!
//! Builds the `Genome`: an order-preserving chrom-name -> size map, so
//! chromosomes not named numerically (contigs, scaffolds) still iterate in
//! the order they appeared in the input file when that's all the ordering
//! information available.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::fs::File;
use std::io::BufRead;
use std::path::Path;

use crate::parser::util::create_buffered_reader;
use crate::types::{ChromId, ChromSize};

/// Chrom-sizes table, in file order. `ChromId`'s own `Ord` impl is used
/// whenever simulation needs genome order rather than file order.
#[derive(Debug, Clone, Default)]
pub struct Genome {
    sizes: IndexMap<String, u32>,
}

impl Genome {
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open chrom-sizes file {path:?}"))?;
        let reader = create_buffered_reader(file, path);
        Self::from_reader(reader)
    }

    fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut sizes = IndexMap::new();
        for line in reader.lines() {
            let line = line.context("failed to read chrom-sizes line")?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let (Some(name), Some(len_str)) = (fields.next(), fields.next()) else {
                continue;
            };
            let len: u32 = len_str
                .parse()
                .with_context(|| format!("invalid chromosome length {len_str:?}"))?;
            sizes.insert(name.to_string(), len);
        }
        Ok(Genome { sizes })
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sizes.contains_key(name)
    }

    /// All chromosomes as `ChromSize`s, with `def_start = 0` and
    /// `def_len = real_len` (no gap discovery without a reference FASTA).
    /// `treated` is left `false`; callers mark the ones actually simulated.
    pub fn chrom_sizes(&self) -> Vec<ChromSize> {
        self.sizes
            .iter()
            .map(|(name, &real_len)| ChromSize {
                id: ChromId::new(name.clone()),
                real_len,
                def_len: real_len,
                def_start: 0,
                treated: false,
            })
            .collect()
    }

    /// Restricts to a single named chromosome, as used by `--chrom`.
    pub fn filter_one(&self, name: &str) -> Option<ChromSize> {
        self.sizes.get(name).map(|&real_len| ChromSize {
            id: ChromId::new(name.to_string()),
            real_len,
            def_len: real_len,
            def_start: 0,
            treated: false,
        })
    }
}
