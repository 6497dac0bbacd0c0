//! The public gene-finding operation: encode, model, score, select, emit.

use bio::bio_types::strand::Strand;

use crate::config::{FinderConfig, Mode};
use crate::constants::{MAX_CONFIDENCE, MIN_SCAN_LENGTH, RBS_LABELS};
use crate::dp::refine::{extract_genes, refine_starts, GeneDraft};
use crate::dp::{eliminate_bad_genes, predict_path, record_star_pointers};
use crate::error::OrfeusError;
use crate::gencode::{self, DEFAULT_TABLE};
use crate::genes::{Gene, Genes, RunInfo};
use crate::model::TrainingModel;
use crate::node::score::score_nodes;
use crate::node::{generate_nodes, sort_nodes, Node};
use crate::sequence::{kmer_text, EncodedSequence};
use crate::training::{bank::TableBank, train_model};

/// Gene finder for one configuration, reusable across sequences.
#[derive(Debug, Clone, Default)]
pub struct GeneFinder {
    config: FinderConfig,
}

impl GeneFinder {
    /// Build a finder, validating any explicitly requested genetic code.
    pub fn new(config: FinderConfig) -> Result<Self, OrfeusError> {
        if let Some(table) = config.translation_table {
            gencode::check_table(table)?;
        }
        Ok(Self { config })
    }

    #[must_use]
    pub const fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Predict genes in a nucleotide sequence.
    ///
    /// Single mode trains on the sequence itself, falling back to a bank
    /// model when it is too short to train on. Meta mode scores the bank's
    /// candidate models and keeps the best. A well-formed sequence with no
    /// gene over the thresholds yields an empty collection, not an error.
    pub fn find_genes(&self, sequence: &str) -> Result<Genes, OrfeusError> {
        let seq = EncodedSequence::encode(sequence.as_bytes(), self.config.strictness)?;

        if seq.len() < MIN_SCAN_LENGTH {
            let table = self.config.translation_table.unwrap_or(DEFAULT_TABLE);
            return Ok(Genes::new(vec![], self.run_info(&seq, table, true, false)));
        }

        match self.config.mode {
            Mode::Single => {
                let table = self.config.translation_table.unwrap_or(DEFAULT_TABLE);
                match train_model(&seq, table, self.config.closed_ends, self.config.min_gene_length)
                {
                    Ok(model) => Ok(self.predict(&seq, &model, false)),
                    // Too little data to train on: recover with the generic
                    // bank model for this GC and table.
                    Err(OrfeusError::InsufficientData(_)) => {
                        let model = TableBank::global().fallback(seq.gc(), table);
                        Ok(self.predict(&seq, &model, false))
                    }
                    Err(err) => Err(err),
                }
            }
            Mode::Meta => Ok(self.predict_meta(&seq, TableBank::global())),
        }
    }

    /// Predict genes with a caller-supplied pre-trained model.
    pub fn find_genes_with_model(
        &self,
        sequence: &str,
        model: &TrainingModel,
    ) -> Result<Genes, OrfeusError> {
        gencode::check_table(model.translation_table)?;
        let seq = EncodedSequence::encode(sequence.as_bytes(), self.config.strictness)?;
        if seq.len() < MIN_SCAN_LENGTH {
            return Ok(Genes::new(
                vec![],
                self.run_info(&seq, model.translation_table, model.uses_sd, false),
            ));
        }
        Ok(self.predict(&seq, model, self.config.mode == Mode::Meta))
    }

    /// Try every bank candidate for the sequence's GC bucket and keep the
    /// model whose optimal path scores highest; this resolves the
    /// translation-table ambiguity.
    fn predict_meta(&self, seq: &EncodedSequence, bank: &TableBank) -> Genes {
        let mut best: Option<(f64, Genes)> = None;
        for model in bank.candidates(seq.gc()) {
            if let Some(wanted) = self.config.translation_table {
                if model.translation_table != wanted {
                    continue;
                }
            }
            let (nodes, terminal) = self.run_pipeline(seq, model, true);
            let score = terminal.map_or(f64::NEG_INFINITY, |t| nodes[t].path_score);
            let replace = match &best {
                Some((best_score, _)) => score > *best_score,
                None => true,
            };
            if replace {
                let genes = self.emit(seq, &nodes, terminal, model, true);
                best = Some((score, genes));
            }
        }
        if let Some((_, genes)) = best {
            return genes;
        }
        // The requested table has no precomputed entry: synthesize one.
        let table = self.config.translation_table.unwrap_or(DEFAULT_TABLE);
        let model = bank.fallback(seq.gc(), table);
        self.predict(seq, &model, true)
    }

    fn predict(&self, seq: &EncodedSequence, model: &TrainingModel, is_meta: bool) -> Genes {
        let (nodes, terminal) = self.run_pipeline(seq, model, is_meta);
        self.emit(seq, &nodes, terminal, model, is_meta)
    }

    fn run_pipeline(
        &self,
        seq: &EncodedSequence,
        model: &TrainingModel,
        is_meta: bool,
    ) -> (Vec<Node>, Option<usize>) {
        let mut nodes = generate_nodes(
            seq,
            model,
            self.config.closed_ends,
            self.config.min_gene_length,
        );
        sort_nodes(&mut nodes);
        score_nodes(seq, &mut nodes, model, self.config.closed_ends, is_meta);
        record_star_pointers(&mut nodes, model, true);
        let terminal = predict_path(&mut nodes, model, true);
        eliminate_bad_genes(&mut nodes, terminal, model);
        (nodes, terminal)
    }

    fn emit(
        &self,
        seq: &EncodedSequence,
        nodes: &[Node],
        terminal: Option<usize>,
        model: &TrainingModel,
        is_meta: bool,
    ) -> Genes {
        let run = self.run_info(seq, model.translation_table, model.uses_sd, is_meta);
        let Some(terminal) = terminal else {
            return Genes::new(vec![], run);
        };

        let mut drafts = extract_genes(nodes, terminal);
        refine_starts(nodes, &mut drafts, model);

        let genes = drafts
            .iter()
            .map(|draft| annotate(draft, nodes, seq, model))
            .collect();
        Genes::new(genes, run)
    }

    fn run_info(&self, seq: &EncodedSequence, table: u8, uses_sd: bool, is_meta: bool) -> RunInfo {
        RunInfo {
            sequence_length: seq.len(),
            sequence_gc: seq.gc(),
            translation_table: table,
            uses_sd,
            meta_mode: is_meta,
        }
    }
}

/// Turn one located draft into a durable gene record.
fn annotate(
    draft: &GeneDraft,
    nodes: &[Node],
    seq: &EncodedSequence,
    model: &TrainingModel,
) -> Gene {
    let start = &nodes[draft.start_node];
    let stop = &nodes[draft.stop_node];
    let forward = draft.strand == Strand::Forward;

    let partial_begin = (start.edge && forward) || (stop.edge && !forward);
    let partial_end = (stop.edge && forward) || (start.edge && !forward);

    let start_codon = if start.edge {
        "Edge".to_string()
    } else {
        start.kind.label().to_string()
    };

    let (rbs_motif, rbs_spacer) = rbs_labels(start, model);
    let score = start.gene_score();

    Gene {
        begin: draft.begin,
        end: draft.end,
        strand: if forward { 1 } else { -1 },
        partial_begin,
        partial_end,
        start_codon,
        rbs_motif,
        rbs_spacer,
        gc: start.gc,
        translation_table: model.translation_table,
        confidence: confidence(score, model.start_weight),
        score,
        coding_score: start.coding,
        start_score: start.start_score,
        rbs_score: start.rbs_score,
        upstream_score: start.upstream_score,
        type_score: start.type_score,
        translation: translate_orf(seq, draft, model.translation_table),
    }
}

/// RBS motif and spacer labels for a start node.
fn rbs_labels(start: &Node, model: &TrainingModel) -> (String, String) {
    let weight = model.start_weight;
    let exact = model.rbs_weights[start.rbs[0]] * weight;
    let mismatch = model.rbs_weights[start.rbs[1]] * weight;
    let sd_labels = || {
        let class = if exact > mismatch {
            start.rbs[0]
        } else {
            start.rbs[1]
        };
        let (motif, spacer) = RBS_LABELS[class.min(RBS_LABELS.len() - 1)];
        (motif.to_string(), spacer.to_string())
    };

    if model.uses_sd {
        return sd_labels();
    }

    let motif_scaled = start.motif.score * weight;
    if model.no_motif_weight > -0.5 && exact.max(mismatch) > motif_scaled {
        sd_labels()
    } else if start.motif.len == 0 {
        ("None".to_string(), "None".to_string())
    } else {
        (
            kmer_text(start.motif.index, start.motif.len),
            format!("{}bp", start.motif.spacer),
        )
    }
}

/// Logistic confidence from the total score.
fn confidence(score: f64, start_weight: f64) -> f64 {
    let normalized = score / start_weight;
    if normalized < 41.0 {
        let odds = normalized.exp();
        (odds / (odds + 1.0) * 100.0).max(50.0)
    } else {
        MAX_CONFIDENCE
    }
}

/// Translate the gene's complete codons; the terminal stop is excluded.
fn translate_orf(seq: &EncodedSequence, draft: &GeneDraft, table: u8) -> String {
    let len = seq.len();
    let mut protein = String::with_capacity((draft.end - draft.begin + 1) / 3);

    match draft.strand {
        Strand::Forward => {
            let mut pos = draft.begin - 1;
            while pos + 2 <= draft.end - 1 {
                protein.push(gencode::translate(seq.forward().codon(pos), table));
                pos += 3;
            }
        }
        _ => {
            let mut pos = len - draft.end;
            let last = len - (draft.begin - 1) - 1;
            while pos + 2 <= last {
                protein.push(gencode::translate(seq.reverse().codon(pos), table));
                pos += 3;
            }
        }
    }

    if protein.ends_with('*') {
        protein.pop();
    }
    protein
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_bounds() {
        assert_eq!(confidence(-50.0, 4.35), 50.0);
        assert!(confidence(10.0, 4.35) > 50.0);
        assert!(confidence(10.0, 4.35) < MAX_CONFIDENCE);
        assert_eq!(confidence(500.0, 4.35), MAX_CONFIDENCE);
    }

    #[test]
    fn finder_rejects_bad_table() {
        let config = FinderConfig {
            translation_table: Some(8),
            ..FinderConfig::default()
        };
        assert!(matches!(
            GeneFinder::new(config),
            Err(OrfeusError::UnsupportedTable(8))
        ));
    }

    #[test]
    fn empty_input_is_an_error() {
        let finder = GeneFinder::new(FinderConfig::default()).unwrap();
        assert!(matches!(
            finder.find_genes(""),
            Err(OrfeusError::EmptyInput)
        ));
    }

    #[test]
    fn invalid_characters_are_an_error() {
        let finder = GeneFinder::new(FinderConfig::default()).unwrap();
        assert!(matches!(
            finder.find_genes("ACGT!!"),
            Err(OrfeusError::InvalidSequence(_))
        ));
    }

    #[test]
    fn trivial_sequence_yields_empty_collection() {
        let finder = GeneFinder::new(FinderConfig::default()).unwrap();
        let genes = finder.find_genes("TTT").unwrap();
        assert!(genes.is_empty());
    }

    #[test]
    fn meta_mode_finds_genes_in_fragment() {
        // A single strong ORF with an SD site, far below training length:
        // meta mode must still call it.
        let mut raw = String::from("TTCTTAAGGAGGTTTTCC");
        raw.push_str("ATG");
        for _ in 0..80 {
            raw.push_str("GCTGAAAAACGT");
        }
        raw.push_str("TAA");
        raw.push_str("TTCTTATTTT");

        let finder = GeneFinder::new(FinderConfig::meta()).unwrap();
        let genes = finder.find_genes(&raw).unwrap();
        assert!(!genes.is_empty(), "expected at least one gene");
        let gene = genes.get(0).unwrap();
        assert_eq!(gene.strand, 1);
        assert_eq!(gene.start_codon, "ATG");
        assert!(gene.translation.starts_with('M'));
        assert!(!gene.translation.contains('*'));
    }

    #[test]
    fn single_mode_falls_back_on_short_input() {
        let mut raw = String::from("AGGAGGTTTTCC");
        raw.push_str("ATG");
        for _ in 0..60 {
            raw.push_str("GCTGAAAAACGT");
        }
        raw.push_str("TAATTT");

        let config = FinderConfig::default();
        let finder = GeneFinder::new(config).unwrap();
        // Far below the single-mode training floor; must not error.
        let genes = finder.find_genes(&raw).unwrap();
        let _ = genes.len();
    }

    #[test]
    fn idempotent_for_fixed_input() {
        let mut raw = String::from("TTCTTAAGGAGGTTTTCC");
        raw.push_str("ATG");
        for _ in 0..50 {
            raw.push_str("GCTGAAAAACGT");
        }
        raw.push_str("TAATTCTTATTTT");

        let finder = GeneFinder::new(FinderConfig::meta()).unwrap();
        let first = finder.find_genes(&raw).unwrap();
        let second = finder.find_genes(&raw).unwrap();
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a, b);
        }
    }
}
