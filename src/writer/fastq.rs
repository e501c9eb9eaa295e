//! FASTQ output.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};

use crate::config::SeqMode;
use crate::types::{ChromId, ReadRecord};
use crate::writer::{DataSet, FormatWriter};

pub struct FastqWriter {
    seq_mode: SeqMode,
    read_len: u32,
    variable_len: bool,
    mate1: BufWriter<File>,
    mate2: Option<BufWriter<File>>,
    quality_template: String,
}

impl FastqWriter {
    pub fn new(out_stem: &str, seq_mode: SeqMode, read_len: u32, variable_len: bool) -> Result<Self> {
        let quality_template = "I".repeat(read_len as usize);
        match seq_mode {
            SeqMode::Single => {
                let path = format!("{out_stem}.fq");
                let mate1 = BufWriter::new(
                    File::create(&path).with_context(|| format!("failed to create {path}"))?,
                );
                Ok(FastqWriter {
                    seq_mode,
                    read_len,
                    variable_len,
                    mate1,
                    mate2: None,
                    quality_template,
                })
            }
            SeqMode::Paired => {
                let path1 = format!("{out_stem}_1.fq");
                let path2 = format!("{out_stem}_2.fq");
                let mate1 = BufWriter::new(
                    File::create(&path1).with_context(|| format!("failed to create {path1}"))?,
                );
                let mate2 = BufWriter::new(
                    File::create(&path2).with_context(|| format!("failed to create {path2}"))?,
                );
                Ok(FastqWriter {
                    seq_mode,
                    read_len,
                    variable_len,
                    mate1,
                    mate2: Some(mate2),
                    quality_template,
                })
            }
        }
    }

    fn write_record(
        out: &mut BufWriter<File>,
        name: &str,
        read_len: u32,
        quality: &str,
        variable_len: bool,
    ) -> Result<()> {
        if variable_len {
            writeln!(out, "@{name} length={read_len}")?;
        } else {
            writeln!(out, "@{name}")?;
        }
        writeln!(out, "{}", "N".repeat(read_len as usize))?;
        writeln!(out, "+")?;
        writeln!(out, "{quality}")?;
        Ok(())
    }

    fn quality_for(&self, len: u32) -> String {
        if len as usize == self.quality_template.len() {
            self.quality_template.clone()
        } else {
            "I".repeat(len as usize)
        }
    }
}

fn record_name(record: &ReadRecord, id: &ChromId, suffix: Option<char>) -> String {
    match suffix {
        Some(c) => format!("{}_{}/{c}", id.as_str(), record.name),
        None => format!("{}_{}", id.as_str(), record.name),
    }
}

impl FormatWriter for FastqWriter {
    fn write_chrom_data(&mut self, id: &ChromId, data: &DataSet) -> Result<()> {
        for record in &data.reads {
            let q = self.quality_for(self.read_len);
            match self.seq_mode {
                SeqMode::Single => {
                    let name = record_name(record, id, None);
                    Self::write_record(&mut self.mate1, &name, self.read_len, &q, self.variable_len)?;
                }
                SeqMode::Paired => {
                    let name1 = record_name(record, id, Some('1'));
                    let name2 = record_name(record, id, Some('2'));
                    Self::write_record(&mut self.mate1, &name1, self.read_len, &q, self.variable_len)?;
                    if let Some(mate2) = self.mate2.as_mut() {
                        Self::write_record(mate2, &name2, self.read_len, &q, self.variable_len)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.mate1.flush()?;
        if let Some(mate2) = self.mate2.as_mut() {
            mate2.flush()?;
        }
        Ok(())
    }
}
