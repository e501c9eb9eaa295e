//! BED6 read output.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};

use crate::types::ChromId;
use crate::writer::{DataSet, FormatWriter};

pub struct BedWriter {
    out: BufWriter<File>,
    mapq: u32,
}

impl BedWriter {
    pub fn new(out_stem: &str, mapq: u32) -> Result<Self> {
        let path = format!("{out_stem}.bed");
        let out = BufWriter::new(File::create(&path).with_context(|| format!("failed to create {path}"))?);
        Ok(BedWriter { out, mapq })
    }
}

impl FormatWriter for BedWriter {
    fn write_chrom_data(&mut self, id: &ChromId, data: &DataSet) -> Result<()> {
        for record in &data.reads {
            let r = record.mate1_region();
            writeln!(
                self.out,
                "{}\t{}\t{}\t{}\t{}\t{}",
                id.as_str(),
                r.start,
                r.end,
                record.name,
                self.mapq,
                record.strand.sign()
            )?;
            if let Some(r2) = record.mate2_region() {
                let mate_strand = record.mate_strand.unwrap();
                writeln!(
                    self.out,
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    id.as_str(),
                    r2.start,
                    r2.end,
                    record.name,
                    self.mapq,
                    mate_strand.sign()
                )?;
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
