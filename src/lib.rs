//! chipsim - in silico ChIP-seq read simulator.
//!
//! Simulates the wet-lab ChIP-seq protocol end to end: chromatin
//! fragmentation, feature-gated (binding-site) selection, multiple
//! displacement amplification, per-sample loss, PCR doubling, optional
//! size selection, and sequencing, emitting reads in FASTQ, BED, SAM,
//! BedGraph, WIG and fragment/read-length frequency formats.
//!
//! # Example
//!
//! ```ignore
//! use chipsim::config::{DistrParams, RunConfig};
//! use chipsim::imitator::Imitator;
//! use chipsim::parser::{parse_features, Genome};
//!
//! let genome = Genome::from_file(genome_path)?;
//! let features = parse_features(features_path, false)?;
//! let imitator = Imitator::new(genome, features, None, distr, config);
//! imitator.run(&cache_stem, test_writers, control_writers)?;
//! ```

pub mod cache;
pub mod config;
pub mod counters;
pub mod coverage;
pub mod cutter;
pub mod error;
pub mod imitator;
pub mod mda;
pub mod parser;
pub mod random;
pub mod types;
pub mod writer;

pub use config::{DistrParams, RunConfig};
pub use imitator::Imitator;
pub use parser::{parse_features, FeatureSet, Genome};
pub use types::{ChromId, ChromSize, Feature, Ground, Region, Strand, TaskMode};
