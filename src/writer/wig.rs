//! Variable-step WIG output.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};

use crate::types::ChromId;
use crate::writer::{DataSet, FormatWriter};

pub struct WigWriter {
    out: BufWriter<File>,
}

impl WigWriter {
    pub fn new(out_stem: &str) -> Result<Self> {
        let path = format!("{out_stem}.wig");
        let out = BufWriter::new(File::create(&path).with_context(|| format!("failed to create {path}"))?);
        Ok(WigWriter { out })
    }
}

impl FormatWriter for WigWriter {
    fn write_chrom_data(&mut self, id: &ChromId, data: &DataSet) -> Result<()> {
        if data.coverage.is_empty() {
            return Ok(());
        }
        writeln!(self.out, "variableStep chrom={}", id.as_str())?;
        for (pos, value) in data.coverage.wig_points() {
            writeln!(self.out, "{}\t{}", pos, value)?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
