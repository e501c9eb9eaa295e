//! Fragment-length and read-length distribution histograms.
//!
//! Unlike the other format writers, this one never writes per-chromosome —
//! it only accumulates `count[length]` in memory and writes both files once,
//! on `close()`.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};

use crate::config::DistrParams;
use crate::types::ChromId;
use crate::writer::{DataSet, FormatWriter};

pub struct DistributionWriter {
    out_stem: String,
    params: DistrParams,
    frag_counts: BTreeMap<u32, u64>,
    read_counts: BTreeMap<u32, u64>,
}

impl DistributionWriter {
    pub fn new(out_stem: &str, params: DistrParams) -> Self {
        DistributionWriter {
            out_stem: out_stem.to_string(),
            params,
            frag_counts: BTreeMap::new(),
            read_counts: BTreeMap::new(),
        }
    }

    fn write_histogram(path: &str, header: &str, counts: &BTreeMap<u32, u64>) -> Result<()> {
        let mut out =
            BufWriter::new(File::create(path).with_context(|| format!("failed to create {path}"))?);
        writeln!(out, "#{header}")?;
        for (length, count) in counts {
            writeln!(out, "{length}\t{count}")?;
        }
        out.flush()?;
        Ok(())
    }
}

impl FormatWriter for DistributionWriter {
    fn write_chrom_data(&mut self, _id: &ChromId, data: &DataSet) -> Result<()> {
        for record in &data.reads {
            *self.frag_counts.entry(record.frag_len()).or_insert(0) += 1;
            *self.read_counts.entry(record.read_len).or_insert(0) += 1;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let header = format!(
            "lnMean={} lnSigma={} ssMean={} ssSigma={}",
            self.params.ln_mean,
            self.params.ln_sigma,
            self.params.ss_mean.unwrap_or(0.0),
            self.params.ss_sigma,
        );
        Self::write_histogram(
            &format!("{}.frag.freq", self.out_stem),
            &header,
            &self.frag_counts,
        )?;
        Self::write_histogram(
            &format!("{}.read.freq", self.out_stem),
            &header,
            &self.read_counts,
        )?;
        Ok(())
    }
}
