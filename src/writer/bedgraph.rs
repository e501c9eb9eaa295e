//! BedGraph coverage output, optionally split by strand.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};

use crate::types::ChromId;
use crate::writer::{DataSet, FormatWriter};

pub struct BedGraphWriter {
    track_name: String,
    total: BufWriter<File>,
    split: Option<(BufWriter<File>, BufWriter<File>)>,
}

impl BedGraphWriter {
    pub fn new(out_stem: &str, split_by_strand: bool) -> Result<Self> {
        let path = format!("{out_stem}.bg");
        let mut total =
            BufWriter::new(File::create(&path).with_context(|| format!("failed to create {path}"))?);
        writeln!(total, "track type=bedGraph name={out_stem}")?;

        let split = if split_by_strand {
            let pos_path = format!("{out_stem}.pos.bg");
            let neg_path = format!("{out_stem}.neg.bg");
            let mut pos = BufWriter::new(
                File::create(&pos_path).with_context(|| format!("failed to create {pos_path}"))?,
            );
            let mut neg = BufWriter::new(
                File::create(&neg_path).with_context(|| format!("failed to create {neg_path}"))?,
            );
            writeln!(pos, "track type=bedGraph name={out_stem}.pos")?;
            writeln!(neg, "track type=bedGraph name={out_stem}.neg")?;
            Some((pos, neg))
        } else {
            None
        };

        Ok(BedGraphWriter {
            track_name: out_stem.to_string(),
            total,
            split,
        })
    }

    fn write_segments(out: &mut BufWriter<File>, id: &ChromId, segs: impl Iterator<Item = (u32, u32, u32)>) -> Result<()> {
        for (s, e, v) in segs {
            writeln!(out, "{}\t{}\t{}\t{}", id.as_str(), s, e, v)?;
        }
        Ok(())
    }
}

impl FormatWriter for BedGraphWriter {
    fn write_chrom_data(&mut self, id: &ChromId, data: &DataSet) -> Result<()> {
        Self::write_segments(&mut self.total, id, data.coverage.segments())?;
        if let Some((pos, neg)) = self.split.as_mut() {
            Self::write_segments(pos, id, data.coverage_fwd.segments())?;
            Self::write_segments(neg, id, data.coverage_rev.segments())?;
        }
        let _ = &self.track_name;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.total.flush()?;
        if let Some((pos, neg)) = self.split.as_mut() {
            pos.flush()?;
            neg.flush()?;
        }
        Ok(())
    }
}
