//! SAM alignment output (SAMv1.0, unsorted).

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};

use crate::config::SeqMode;
use crate::types::{ChromId, ChromSize, Strand};
use crate::writer::{DataSet, FormatWriter};

const SEQ_BASE: char = 'N';
const QUAL_BASE: char = 'I';

pub struct SamWriter {
    out: BufWriter<File>,
    seq_mode: SeqMode,
    mapq: u32,
}

impl SamWriter {
    /// Opens `{out_stem}.sam` and writes the header: `@HD`, one `@SQ` per
    /// chromosome in genome order, and a single `@PG` carrying the
    /// reconstructed command line.
    pub fn new(
        out_stem: &str,
        seq_mode: SeqMode,
        mapq: u32,
        chroms: &[ChromSize],
        command_line: &str,
    ) -> Result<Self> {
        let path = format!("{out_stem}.sam");
        let mut out =
            BufWriter::new(File::create(&path).with_context(|| format!("failed to create {path}"))?);
        writeln!(out, "@HD\tVN:1.0\tSO:unsorted")?;
        for c in chroms {
            writeln!(out, "@SQ\tSN:{}\tLN:{}", c.id.as_str(), c.real_len)?;
        }
        writeln!(out, "@PG\tID:chipsim\tPN:chipsim\tCL:{command_line}")?;
        Ok(SamWriter {
            out,
            seq_mode,
            mapq,
        })
    }

    fn qname(id: &ChromId, name: &str) -> String {
        format!("{}_{}", id.as_str(), name)
    }
}

impl FormatWriter for SamWriter {
    fn write_chrom_data(&mut self, id: &ChromId, data: &DataSet) -> Result<()> {
        for record in &data.reads {
            let r1 = record.mate1_region();
            let seq = SEQ_BASE.to_string().repeat(record.read_len as usize);
            let qual = QUAL_BASE.to_string().repeat(record.read_len as usize);
            let qname = Self::qname(id, &record.name);

            match (self.seq_mode, record.mate_strand) {
                (SeqMode::Paired, Some(_)) => {
                    let r2 = record
                        .mate2_region()
                        .expect("paired record must have a second mate region");
                    let tlen = record.frag_len() as i64;
                    writeln!(
                        self.out,
                        "{qname}\t99\t{}\t{}\t{}\t{}M\t=\t{}\t{}\t{seq}\t{qual}",
                        id.as_str(),
                        r1.start + 1,
                        self.mapq,
                        record.read_len,
                        r2.start + 1,
                        tlen,
                    )?;
                    writeln!(
                        self.out,
                        "{qname}\t147\t{}\t{}\t{}\t{}M\t=\t{}\t{}\t{seq}\t{qual}",
                        id.as_str(),
                        r2.start + 1,
                        self.mapq,
                        record.read_len,
                        r1.start + 1,
                        -tlen,
                    )?;
                }
                _ => {
                    let flag = if record.strand == Strand::Forward { 0 } else { 16 };
                    writeln!(
                        self.out,
                        "{qname}\t{flag}\t{}\t{}\t{}\t{}M\t*\t0\t0\t{seq}\t{qual}",
                        id.as_str(),
                        r1.start + 1,
                        self.mapq,
                        record.read_len,
                    )?;
                }
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
