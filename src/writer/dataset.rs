//! Per-chromosome staging area held by the ordered writer.

use crate::coverage::{CoverageMap, FreqMap};
use crate::types::{ReadRecord, Strand};

/// Everything accumulated for one chromosome before it is flushed to disk.
///
/// Workers append into a thread-local `DataSet` while they own a
/// chromosome; only the completed, merged dataset is ever seen behind the
/// ordered writer's mutex.
#[derive(Debug, Default)]
pub struct DataSet {
    pub reads: Vec<ReadRecord>,
    pub coverage: CoverageMap,
    pub coverage_fwd: CoverageMap,
    pub coverage_rev: CoverageMap,
    pub density: FreqMap,
    pub closed: bool,
    pub unsaved: bool,
}

impl DataSet {
    pub fn new() -> Self {
        DataSet::default()
    }

    pub fn add_frag(&mut self, start: u32, end: u32) {
        self.coverage.add_region(start, end);
        self.unsaved = true;
    }

    pub fn add_read(&mut self, record: ReadRecord) {
        let mate1 = record.mate1_region();
        self.coverage.add_region(mate1.start, mate1.end);
        match record.strand {
            Strand::Forward => self.coverage_fwd.add_region(mate1.start, mate1.end),
            Strand::Reverse => self.coverage_rev.add_region(mate1.start, mate1.end),
        }
        self.density.add_pos(mate1.start);

        if let Some(mate2) = record.mate2_region() {
            let mate_strand = record.mate_strand.unwrap();
            self.coverage.add_region(mate2.start, mate2.end);
            match mate_strand {
                Strand::Forward => self.coverage_fwd.add_region(mate2.start, mate2.end),
                Strand::Reverse => self.coverage_rev.add_region(mate2.start, mate2.end),
            }
            self.density.add_pos(mate2.start);
        }

        self.reads.push(record);
        self.unsaved = true;
    }

    /// Merges another (thread-local) dataset's contents into this one. Used
    /// when a worker revisits a chromosome it already staged data for.
    pub fn merge(&mut self, other: DataSet) {
        self.reads.extend(other.reads);
        for (s, e, v) in other.coverage.segments() {
            for _ in 0..v {
                self.coverage.add_region(s, e);
            }
        }
        for (s, e, v) in other.coverage_fwd.segments() {
            for _ in 0..v {
                self.coverage_fwd.add_region(s, e);
            }
        }
        for (s, e, v) in other.coverage_rev.segments() {
            for _ in 0..v {
                self.coverage_rev.add_region(s, e);
            }
        }
        for (pos, count) in other.density.iter() {
            for _ in 0..count {
                self.density.add_pos(pos);
            }
        }
        self.unsaved = self.unsaved || other.unsaved;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Ground, Provenance};

    fn read(start: u32, len: u32, strand: Strand) -> ReadRecord {
        ReadRecord {
            frag_start: start,
            frag_end: start + 100,
            read_len: len,
            strand,
            mate_strand: None,
            name: "r".to_string(),
            ground: Ground::Foreground,
            provenance: Provenance::Primer,
        }
    }

    #[test]
    fn test_add_read_updates_strand_maps_and_density() {
        let mut ds = DataSet::new();
        ds.add_read(read(10, 50, Strand::Forward));
        ds.add_read(read(200, 50, Strand::Reverse));
        assert_eq!(ds.reads.len(), 2);
        assert!(!ds.coverage_fwd.is_empty());
        assert!(!ds.coverage_rev.is_empty());
        assert!(!ds.density.is_empty());
    }

    #[test]
    fn test_add_frag_marks_unsaved() {
        let mut ds = DataSet::new();
        assert!(!ds.unsaved);
        ds.add_frag(0, 100);
        assert!(ds.unsaved);
    }

    #[test]
    fn test_merge_combines_reads() {
        let mut a = DataSet::new();
        a.add_read(read(0, 50, Strand::Forward));
        let mut b = DataSet::new();
        b.add_read(read(500, 50, Strand::Reverse));
        a.merge(b);
        assert_eq!(a.reads.len(), 2);
    }
}
