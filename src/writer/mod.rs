//! Ordered, format-fanning writer.
//!
//! Chromosomes finish simulation in whatever order their owning thread
//! happens to reach them; this module buffers out-of-order completions and
//! drains only the prefix that is contiguous with genome order, the same
//! "buffer, then drain the ready prefix" pattern the teacher's sequence-id
//! based result writer uses, generalized from a linear counter to a sorted
//! chromosome order.

pub mod bed;
pub mod bedgraph;
pub mod dataset;
pub mod distribution;
pub mod fastq;
pub mod sam;
pub mod wig;

use anyhow::Result;
use std::sync::{Arc, Mutex};

use crate::types::{ChromId, ReadRecord};
pub use dataset::DataSet;

/// Implemented by every concrete output format.
pub trait FormatWriter: Send {
    fn write_chrom_data(&mut self, id: &ChromId, data: &DataSet) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}

struct PrimerState {
    order: Vec<ChromId>,
    next_index: usize,
    datasets: std::collections::HashMap<ChromId, DataSet>,
    writers: Vec<Box<dyn FormatWriter>>,
}

impl PrimerState {
    /// Writes every contiguous run of closed-and-unsaved chromosomes
    /// starting at the current cursor, stopping at the first chromosome
    /// that either hasn't arrived yet or hasn't been closed yet.
    fn dispatch_ready(&mut self) -> Result<()> {
        while self.next_index < self.order.len() {
            let id = self.order[self.next_index].clone();
            let ready = match self.datasets.get(&id) {
                Some(ds) => ds.closed && ds.unsaved,
                None => false,
            };
            if !ready {
                break;
            }
            let ds = self.datasets.get(&id).unwrap();
            for writer in &mut self.writers {
                writer.write_chrom_data(&id, ds)?;
            }
            self.datasets.get_mut(&id).unwrap().unsaved = false;
            self.datasets.remove(&id);
            self.next_index += 1;
        }
        Ok(())
    }
}

/// Owns the genome-wide chromosome order, the shared dataset map, and the
/// open format writers. Cheap to clone behind `Arc` into per-thread handles.
pub struct Primer {
    state: Mutex<PrimerState>,
}

impl Primer {
    pub fn new(order: Vec<ChromId>, writers: Vec<Box<dyn FormatWriter>>) -> Arc<Self> {
        Arc::new(Primer {
            state: Mutex::new(PrimerState {
                order,
                next_index: 0,
                datasets: std::collections::HashMap::new(),
                writers,
            }),
        })
    }

    pub fn handle(self: &Arc<Self>) -> WriterHandle {
        WriterHandle {
            primer: Arc::clone(self),
            local: DataSet::new(),
            current_chrom: None,
        }
    }

    /// Closes every format writer. Called once after all worker threads
    /// have joined and every chromosome has been drained.
    pub fn close(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        for writer in &mut state.writers {
            writer.close()?;
        }
        Ok(())
    }

    /// `true` once every chromosome in the genome order has been flushed.
    pub fn is_drained(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.next_index >= state.order.len()
    }
}

/// Per-worker-thread handle: an `Arc` reference to the shared primer plus a
/// local staging `DataSet` for whichever chromosome the thread currently
/// owns. Appends never touch the mutex; only `set_chrom`/`write_chrom` do.
pub struct WriterHandle {
    primer: Arc<Primer>,
    local: DataSet,
    current_chrom: Option<ChromId>,
}

impl WriterHandle {
    fn flush_local(&mut self) {
        let Some(id) = self.current_chrom.take() else {
            return;
        };
        let local = std::mem::take(&mut self.local);
        let mut state = self.primer.state.lock().unwrap_or_else(|e| e.into_inner());
        state.datasets.entry(id).or_default().merge(local);
    }

    /// Switches this handle's staging area to `id`, flushing whatever was
    /// staged for the previous chromosome (without closing it).
    pub fn set_chrom(&mut self, id: ChromId) {
        self.flush_local();
        self.current_chrom = Some(id);
        self.local = DataSet::new();
    }

    pub fn add_frag(&mut self, start: u32, end: u32) {
        self.local.add_frag(start, end);
    }

    pub fn add_read(&mut self, record: ReadRecord) {
        self.local.add_read(record);
    }

    /// Marks `id` closed and triggers a dispatch of every now-contiguous,
    /// ready chromosome. `id` must be the chromosome this handle currently
    /// owns (or one it previously flushed under `set_chrom`).
    pub fn write_chrom(&mut self, id: ChromId) -> Result<()> {
        if self.current_chrom.as_ref() == Some(&id) {
            self.flush_local();
        }
        {
            let mut state = self.primer.state.lock().unwrap_or_else(|e| e.into_inner());
            state.datasets.entry(id).or_default().closed = true;
            state.dispatch_ready()?;
        }
        Ok(())
    }
}
