//! Thread-safe run counters and the console summary view.
//!
//! Mirrors the teacher's `PerfMetrics`: plain atomics updated with
//! `Ordering::Relaxed` (no cross-counter synchronization is required — the
//! reads-budget check tolerates the resulting slight overshoot) plus a
//! mutex-guarded print routine so progress lines from different threads
//! never interleave mid-line.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::types::Ground;

/// Atomic counterpart of `FragCnt`, updated concurrently by every worker
/// thread that touches a given ground.
#[derive(Debug, Default)]
pub struct AtomicFragCnt {
    pub selected: AtomicU64,
    pub recorded_primer: AtomicU64,
    pub recorded_amplified: AtomicU64,
}

impl AtomicFragCnt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_selected(&self, n: u64) {
        self.selected.fetch_add(n, Ordering::Relaxed);
    }

    /// Records one emitted read, returning the new combined recorded total
    /// (`primer + amplified`) so the caller can compare it against the
    /// reads budget without a second pair of loads racing against updates
    /// from other threads in between.
    pub fn add_recorded(&self, primer: bool) -> u64 {
        let new_val = if primer {
            self.recorded_primer.fetch_add(1, Ordering::Relaxed) + 1
        } else {
            self.recorded_amplified.fetch_add(1, Ordering::Relaxed) + 1
        };
        new_val
            + if primer {
                self.recorded_amplified.load(Ordering::Relaxed)
            } else {
                self.recorded_primer.load(Ordering::Relaxed)
            }
    }

    pub fn recorded_total(&self) -> u64 {
        self.recorded_primer.load(Ordering::Relaxed) + self.recorded_amplified.load(Ordering::Relaxed)
    }

    pub fn selected_total(&self) -> u64 {
        self.selected.load(Ordering::Relaxed)
    }
}

/// Counters for one task mode (test or control), split by ground.
#[derive(Debug, Default)]
pub struct GlobalCounts {
    pub cell_cnt: AtomicU64,
    pub fg: AtomicFragCnt,
    pub bg: AtomicFragCnt,
}

impl GlobalCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ground(&self, ground: Ground) -> &AtomicFragCnt {
        match ground {
            Ground::Foreground => &self.fg,
            Ground::Background => &self.bg,
        }
    }

    /// Combined recorded reads across both grounds, the quantity the
    /// reads-budget cutoff compares against.
    pub fn recorded_total(&self) -> u64 {
        self.fg.recorded_total() + self.bg.recorded_total()
    }
}

/// All counters for a run: the test pass, plus an optional control pass.
#[derive(Debug, Default)]
pub struct Context {
    pub test: GlobalCounts,
    pub control: Option<GlobalCounts>,
}

impl Context {
    pub fn new(with_control: bool) -> Self {
        Context {
            test: GlobalCounts::new(),
            control: if with_control {
                Some(GlobalCounts::new())
            } else {
                None
            },
        }
    }
}

/// Prints an aligned totals summary to stderr, guarded so concurrent
/// progress output from worker threads never interleaves mid-line.
pub struct ConsoleView {
    lock: Mutex<()>,
}

impl ConsoleView {
    pub fn new() -> Self {
        ConsoleView { lock: Mutex::new(()) }
    }

    pub fn print_totals(&self, ctx: &Context, elapsed: Duration) {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        print_mode("test", &ctx.test);
        if let Some(control) = &ctx.control {
            print_mode("control", control);
        }
        eprintln!("elapsed: {:.2}s", elapsed.as_secs_f64());
    }

    /// Logs a worker error without poisoning the run, tagged with the
    /// thread index that caught it.
    pub fn log_worker_error(&self, thread_idx: usize, err: &dyn fmt::Display) {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        eprintln!("[thread {thread_idx}] {err}");
    }
}

impl Default for ConsoleView {
    fn default() -> Self {
        Self::new()
    }
}

fn print_mode(name: &str, counts: &GlobalCounts) {
    let fg_sel = counts.fg.selected_total();
    let bg_sel = counts.bg.selected_total();
    let fg_rec = counts.fg.recorded_total();
    let bg_rec = counts.bg.recorded_total();
    let width = [fg_sel, bg_sel, fg_rec, bg_rec]
        .iter()
        .map(|v| v.to_string().len())
        .max()
        .unwrap_or(1);
    eprintln!("{name} totals:");
    eprintln!("  FG selected: {fg_sel:>width$}  recorded: {fg_rec:>width$}");
    eprintln!("  BG selected: {bg_sel:>width$}  recorded: {bg_rec:>width$}");
}
