//! Cumulative coverage and density maps.
//!
//! Both are sorted maps from chromosome position to an accumulated value,
//! built incrementally as fragments/reads are generated rather than by a
//! sweep-line batch rebuild, since insertions interleave with per-thread
//! counter checks.

use std::collections::BTreeMap;

/// Piecewise-constant coverage depth over a chromosome.
///
/// Grounded directly in the original `AccumCover::AddRegion` algorithm: no
/// two adjacent entries ever hold equal values, so the map stays as small as
/// the actual number of depth changes.
#[derive(Debug, Clone, Default)]
pub struct CoverageMap(BTreeMap<u32, u32>);

impl CoverageMap {
    pub fn new() -> Self {
        CoverageMap(BTreeMap::new())
    }

    /// Adds one unit of coverage over the half-open interval `[start, end)`.
    pub fn add_region(&mut self, start: u32, end: u32) {
        if end <= start {
            return;
        }

        // value just before `start`, or 0 if nothing precedes it.
        let pred_at_start = self
            .0
            .range(..start)
            .next_back()
            .map(|(_, v)| *v)
            .unwrap_or(0);

        match self.0.get(&start).copied() {
            Some(existing) => {
                let new_val = existing + 1;
                if new_val == pred_at_start {
                    self.0.remove(&start);
                } else {
                    self.0.insert(start, new_val);
                }
            }
            None => {
                self.0.insert(start, pred_at_start + 1);
            }
        }

        // value just before `end` (after the start insert above), used to
        // seed the end breakpoint if one doesn't already exist.
        let pred_at_end = self
            .0
            .range(..end)
            .next_back()
            .map(|(_, v)| *v)
            .unwrap_or(0);

        if !self.0.contains_key(&end) {
            self.0.insert(end, pred_at_end);
        }

        // bump every breakpoint strictly inside (start, end)
        let interior: Vec<u32> = self
            .0
            .range((
                std::ops::Bound::Excluded(start),
                std::ops::Bound::Excluded(end),
            ))
            .map(|(k, _)| *k)
            .collect();
        for k in interior {
            if let Some(v) = self.0.get_mut(&k) {
                *v += 1;
            }
        }

        // if end's value now equals its predecessor, it's redundant.
        let pred_before_end = self
            .0
            .range(..end)
            .next_back()
            .map(|(_, v)| *v)
            .unwrap_or(0);
        if self.0.get(&end).copied() == Some(pred_before_end) {
            self.0.remove(&end);
        }
    }

    /// `(start, end, value)` triples for every non-zero segment, in position order.
    pub fn segments(&self) -> impl Iterator<Item = (u32, u32, u32)> + '_ {
        let mut iter = self.0.iter().peekable();
        std::iter::from_fn(move || loop {
            let (&pos, &val) = iter.next()?;
            let next_pos = match iter.peek() {
                Some((&np, _)) => np,
                None => return None,
            };
            if val > 0 {
                return Some((pos, next_pos, val));
            }
        })
    }

    /// Raw `(pos, value)` breakpoints, suitable for variable-step WIG output.
    pub fn wig_points(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.0.iter().map(|(&k, &v)| (k, v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Position -> point-count density map (used for read/fragment-start frequency).
#[derive(Debug, Clone, Default)]
pub struct FreqMap(BTreeMap<u32, u32>);

impl FreqMap {
    pub fn new() -> Self {
        FreqMap(BTreeMap::new())
    }

    pub fn add_pos(&mut self, pos: u32) {
        *self.0.entry(pos).or_insert(0) += 1;
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.0.iter().map(|(&k, &v)| (k, v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
