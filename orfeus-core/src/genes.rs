//! The durable output: gene records and the ordered collection around
//! them, with tabular / GFF writers and a versioned byte format.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::constants::VERSION;
use crate::error::OrfeusError;

/// Serialization header: magic plus format version.
const MAGIC: &[u8; 4] = b"ORFS";
const FORMAT_VERSION: u8 = 1;

/// One predicted gene. Immutable once built; coordinates are 1-based and
/// inclusive, `begin <= end` on both strands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gene {
    pub begin: usize,
    pub end: usize,
    /// +1 forward, -1 reverse.
    pub strand: i8,
    /// Truncated by the sequence boundary on the 5' / 3' side.
    pub partial_begin: bool,
    pub partial_end: bool,
    /// Start codon label: "ATG", "GTG", "TTG" or "Edge".
    pub start_codon: String,
    /// RBS motif label, "None" when absent.
    pub rbs_motif: String,
    /// RBS spacer label, "None" when absent.
    pub rbs_spacer: String,
    /// GC fraction of the gene.
    pub gc: f64,
    /// Genetic code the gene was called under.
    pub translation_table: u8,
    /// Logistic confidence, capped at 99.99.
    pub confidence: f64,
    /// Total score and its components.
    pub score: f64,
    pub coding_score: f64,
    pub start_score: f64,
    pub rbs_score: f64,
    pub upstream_score: f64,
    pub type_score: f64,
    /// Protein translation, stop codon excluded.
    pub translation: String,
}

impl Gene {
    /// Length in nucleotides.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.begin + 1
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    fn partial_label(&self) -> &'static str {
        match (self.partial_begin, self.partial_end) {
            (false, false) => "00",
            (false, true) => "01",
            (true, false) => "10",
            (true, true) => "11",
        }
    }
}

/// Metadata the writers need about the run that produced the genes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunInfo {
    pub sequence_length: usize,
    pub sequence_gc: f64,
    pub translation_table: u8,
    pub uses_sd: bool,
    pub meta_mode: bool,
}

/// Ordered gene predictions for one sequence.
///
/// Ordered by ascending begin coordinate, forward strand first on ties.
/// Supports signed indexing with negative wraparound, forward and reverse
/// iteration, and byte-level round-tripping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Genes {
    run: RunInfo,
    genes: Vec<Gene>,
}

impl Genes {
    #[must_use]
    pub fn new(mut genes: Vec<Gene>, run: RunInfo) -> Self {
        genes.sort_by(|a, b| a.begin.cmp(&b.begin).then(b.strand.cmp(&a.strand)));
        Self { run, genes }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    /// Empty collections are falsy: no genes cleared the thresholds.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    #[must_use]
    pub const fn run(&self) -> &RunInfo {
        &self.run
    }

    /// Signed positional access: negative indices count from the end.
    /// `index >= len` and `index < -len` both fail.
    pub fn get(&self, index: isize) -> Result<&Gene, OrfeusError> {
        let len = self.genes.len();
        let out_of_bounds = || OrfeusError::IndexOutOfBounds { index, len };
        let normalized = if index < 0 {
            index
                .checked_add(len as isize)
                .filter(|i| *i >= 0)
                .ok_or_else(out_of_bounds)?
        } else {
            index
        };
        usize::try_from(normalized)
            .ok()
            .and_then(|i| self.genes.get(i))
            .ok_or_else(out_of_bounds)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Gene> {
        self.genes.iter()
    }

    /// Dedicated reverse-order iterator.
    pub fn iter_rev(&self) -> impl Iterator<Item = &Gene> {
        self.genes.iter().rev()
    }

    /// Tab-separated per-gene score table with a commented header block.
    ///
    /// Column order is fixed: Beg, End, Std, Total, CodPot, StrtSc, Codon,
    /// RBSMot, Spacer, RBSScr, UpsScr, TypeScr, GCCont. Score columns are
    /// text-formatted floats and not bit-exact across platforms.
    pub fn write_scores<W: Write>(
        &self,
        writer: &mut W,
        sequence_id: &str,
    ) -> Result<(), OrfeusError> {
        writeln!(
            writer,
            "# Sequence Data: seqnum=1;seqlen={};seqhdr=\"{}\"",
            self.run.sequence_length, sequence_id
        )?;
        writeln!(
            writer,
            "# Run Data: version=orfeus.v{};run_type={};transl_table={};gc_cont={:.2};uses_sd={}",
            VERSION,
            if self.run.meta_mode { "Meta" } else { "Single" },
            self.run.translation_table,
            self.run.sequence_gc * 100.0,
            i32::from(self.run.uses_sd),
        )?;
        writeln!(
            writer,
            "Beg\tEnd\tStd\tTotal\tCodPot\tStrtSc\tCodon\tRBSMot\tSpacer\tRBSScr\tUpsScr\tTypeScr\tGCCont"
        )?;
        for gene in &self.genes {
            writeln!(
                writer,
                "{}\t{}\t{}\t{:.2}\t{:.2}\t{:.2}\t{}\t{}\t{}\t{:.2}\t{:.2}\t{:.2}\t{:.3}",
                gene.begin,
                gene.end,
                if gene.strand >= 0 { '+' } else { '-' },
                gene.score,
                gene.coding_score,
                gene.start_score,
                gene.start_codon,
                gene.rbs_motif,
                gene.rbs_spacer,
                gene.rbs_score,
                gene.upstream_score,
                gene.type_score,
                gene.gc,
            )?;
        }
        Ok(())
    }

    /// GFF3 feature table: version line, sequence-region line, one CDS row
    /// per gene with semicolon-delimited attributes.
    pub fn write_gff<W: Write>(
        &self,
        writer: &mut W,
        sequence_id: &str,
    ) -> Result<(), OrfeusError> {
        writeln!(writer, "##gff-version  3")?;
        writeln!(
            writer,
            "##sequence-region {} 1 {}",
            sequence_id, self.run.sequence_length
        )?;
        writeln!(
            writer,
            "# Model Data: version=orfeus.v{};run_type={};transl_table={};gc_cont={:.2};uses_sd={}",
            VERSION,
            if self.run.meta_mode { "Meta" } else { "Single" },
            self.run.translation_table,
            self.run.sequence_gc * 100.0,
            i32::from(self.run.uses_sd),
        )?;
        for (i, gene) in self.genes.iter().enumerate() {
            writeln!(
                writer,
                "{}\torfeus_v{}\tCDS\t{}\t{}\t{:.1}\t{}\t0\tID={}_{};partial={};start_type={};rbs_motif={};rbs_spacer={};gc_cont={:.3};conf={:.2};score={:.2};cscore={:.2};sscore={:.2};rscore={:.2};uscore={:.2};tscore={:.2};",
                sequence_id,
                VERSION,
                gene.begin,
                gene.end,
                gene.score,
                if gene.strand >= 0 { '+' } else { '-' },
                sequence_id,
                i + 1,
                gene.partial_label(),
                gene.start_codon,
                gene.rbs_motif,
                gene.rbs_spacer,
                gene.gc,
                gene.confidence,
                gene.score,
                gene.coding_score,
                gene.start_score,
                gene.rbs_score,
                gene.upstream_score,
                gene.type_score,
            )?;
        }
        Ok(())
    }

    /// Serialize into the versioned byte format.
    pub fn to_bytes(&self) -> Result<Vec<u8>, OrfeusError> {
        let payload = bincode::serialize(self)
            .map_err(|e| OrfeusError::Serialization(e.to_string()))?;
        let mut bytes = Vec::with_capacity(payload.len() + 5);
        bytes.extend_from_slice(MAGIC);
        bytes.push(FORMAT_VERSION);
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Reconstruct a collection serialized with [`Genes::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, OrfeusError> {
        if bytes.len() < 5 || &bytes[..4] != MAGIC {
            return Err(OrfeusError::Serialization(
                "missing gene record header".to_string(),
            ));
        }
        if bytes[4] != FORMAT_VERSION {
            return Err(OrfeusError::Serialization(format!(
                "unsupported gene record version {}",
                bytes[4]
            )));
        }
        bincode::deserialize(&bytes[5..]).map_err(|e| OrfeusError::Serialization(e.to_string()))
    }
}

impl std::ops::Index<usize> for Genes {
    type Output = Gene;

    fn index(&self, index: usize) -> &Gene {
        &self.genes[index]
    }
}

impl<'a> IntoIterator for &'a Genes {
    type Item = &'a Gene;
    type IntoIter = std::slice::Iter<'a, Gene>;

    fn into_iter(self) -> Self::IntoIter {
        self.genes.iter()
    }
}
