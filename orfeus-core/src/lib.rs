//! # orfeus
//!
//! Prokaryotic gene prediction: a dynamic-programming model over coding
//! potential, ribosome-binding-site motifs and start/stop codon
//! statistics.
//!
//! ## Overview
//!
//! The engine consumes one nucleotide sequence per invocation and emits an
//! ordered [`Genes`] collection. The pipeline: encode the sequence into a
//! compact two-bit form, obtain a statistical model (trained on the
//! sequence in single mode, or drawn from the precomputed bank in meta
//! mode), materialize candidate start/stop nodes over all six frames,
//! score them, and select the optimal gene chain by dynamic programming.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use orfeus_core::{FinderConfig, GeneFinder};
//!
//! let finder = GeneFinder::new(FinderConfig::meta())?;
//! let genes = finder.find_genes("TTCTTAAGGAGGTTTTCCATGAAA...")?;
//!
//! for gene in &genes {
//!     println!("{}..{} ({})", gene.begin, gene.end, gene.strand);
//! }
//!
//! let mut gff = Vec::new();
//! genes.write_gff(&mut gff, "contig_1")?;
//! # Ok::<(), orfeus_core::OrfeusError>(())
//! ```
//!
//! ## Modes
//!
//! - **Single** (default): train the model on the input itself; suited to
//!   complete genomes. Inputs too short to train on fall back to a
//!   generic bank model.
//! - **Meta**: score the precomputed bank models for the sequence's GC
//!   bucket and keep the best; suited to fragments and mixed samples.
//!
//! ## Concurrency
//!
//! One invocation is CPU-bound and runs to completion; process many
//! sequences by running independent invocations on worker threads. The
//! bank and any caller-supplied model are read-only and safely shared.

pub mod bitmap;
pub mod config;
pub mod constants;
pub mod dp;
pub mod error;
pub mod finder;
pub mod gencode;
pub mod genes;
pub mod model;
pub mod node;
pub mod sequence;
pub mod training;

pub use config::{FinderConfig, Mode, Strictness};
pub use error::OrfeusError;
pub use finder::GeneFinder;
pub use genes::{Gene, Genes, RunInfo};
pub use model::TrainingModel;
pub use training::bank::TableBank;
