//! Persistent average-fragment-length cache.
//!
//! Calibration is expensive (it runs a trial pass over a reference
//! chromosome), so results are cached to a small tab-separated text file
//! keyed by the run's distribution parameters and looked up by read length.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::DistrParams;
use crate::error::SimError;

/// One calibration record for a specific read length.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AvrFragRecord {
    pub read_len: u32,
    pub selected_avr: f64,
    pub recorded_avr: f64,
    pub mda_avr: f64,
}

/// Loaded cache file plus a dirty flag tracking whether it needs rewriting.
#[derive(Debug)]
pub struct AvrFragCache {
    path: PathBuf,
    records: Vec<AvrFragRecord>,
    changed: bool,
}

impl AvrFragCache {
    /// Builds the cache path from the output stem and distribution parameters,
    /// then loads any existing file. A missing file is not an error.
    pub fn open(stem: &Path, params: &DistrParams) -> Result<Self> {
        let path = cache_path(stem, params);
        let records = if path.exists() {
            load(&path).with_context(|| format!("failed to read average-length cache {path:?}"))?
        } else {
            Vec::new()
        };
        Ok(AvrFragCache {
            path,
            records,
            changed: false,
        })
    }

    /// Returns the record for `read_len`, inserting a zeroed one (and
    /// marking the cache dirty) if none exists yet.
    pub fn get_or_init(&mut self, read_len: u32) -> &mut AvrFragRecord {
        if let Some(idx) = self.records.iter().position(|r| r.read_len == read_len) {
            return &mut self.records[idx];
        }
        self.changed = true;
        self.records.push(AvrFragRecord {
            read_len,
            ..Default::default()
        });
        self.records.last_mut().unwrap()
    }

    pub fn find(&self, read_len: u32) -> Option<&AvrFragRecord> {
        self.records.iter().find(|r| r.read_len == read_len)
    }

    /// Rewrites the cache file if it changed since it was opened. Called
    /// explicitly from orchestration at shutdown, never from `Drop`, so the
    /// write order relative to other shutdown work stays under the caller's
    /// control.
    pub fn flush_on_exit(&self) -> Result<()> {
        if !self.changed {
            return Ok(());
        }
        let mut sorted = self.records.clone();
        sorted.sort_by_key(|r| r.read_len);

        let mut body = String::from("#read_len\tselected_avr\trecorded_avr\tmda_avr\n");
        for r in &sorted {
            body.push_str(&format!(
                "{}\t{}\t{}\t{}\n",
                r.read_len, r.selected_avr, r.recorded_avr, r.mda_avr
            ));
        }
        let mut f = fs::File::create(&self.path)
            .with_context(|| format!("failed to create average-length cache {:?}", self.path))?;
        f.write_all(body.as_bytes())
            .with_context(|| format!("failed to write average-length cache {:?}", self.path))?;
        Ok(())
    }
}

fn cache_path(stem: &Path, params: &DistrParams) -> PathBuf {
    let mut name = stem
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push('-');
    name.push_str(&params.cache_key());
    name.push_str(".ini");
    stem.with_file_name(name)
}

fn load(path: &Path) -> Result<Vec<AvrFragRecord>> {
    let text = fs::read_to_string(path)?;
    let mut records = Vec::new();
    for line in text.lines() {
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 4 {
            return Err(SimError::CacheFormat(line.to_string()).into());
        }
        let (Ok(read_len), Ok(selected_avr), Ok(recorded_avr), Ok(mda_avr)) = (
            fields[0].parse::<u32>(),
            fields[1].parse::<f64>(),
            fields[2].parse::<f64>(),
            fields[3].parse::<f64>(),
        ) else {
            return Err(SimError::CacheFormat(line.to_string()).into());
        };
        records.push(AvrFragRecord {
            read_len,
            selected_avr,
            recorded_avr,
            mda_avr,
        });
    }
    Ok(records)
}
