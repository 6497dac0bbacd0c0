//! The trained statistical model consumed by the node scorer.

use crate::constants::{
    NUM_HEXAMERS, NUM_MOTIF_SIZES, NUM_RBS_CLASSES, NUM_START_TYPES, NUM_UPSTREAM_POSITIONS,
    START_WEIGHT,
};
use crate::gencode::DEFAULT_TABLE;

/// Non-SD motif weights, indexed `[length - 3][spacer class][motif index]`.
pub type MotifWeights = [[[f64; NUM_HEXAMERS]; NUM_MOTIF_SIZES]; NUM_MOTIF_SIZES];

fn boxed_motif_weights() -> Box<MotifWeights> {
    // Heap-allocate without staging the 512 KiB array on the stack.
    vec![[[0.0; NUM_HEXAMERS]; NUM_MOTIF_SIZES]; NUM_MOTIF_SIZES]
        .into_boxed_slice()
        .try_into()
        .expect("motif weight table has a fixed shape")
}

/// Everything the scorer needs to know about an organism (or GC bucket):
/// codon usage, start preferences, RBS motif weights, frame bias.
///
/// Built once (trained in single mode, synthesized per bank bucket in meta
/// mode) and read-only thereafter, so a single model may be shared across
/// concurrent invocations.
#[derive(Debug, Clone)]
pub struct TrainingModel {
    /// GC fraction the model was built for.
    pub gc: f64,
    /// Genetic code id.
    pub translation_table: u8,
    /// Whether start scoring uses Shine-Dalgarno motifs.
    pub uses_sd: bool,
    /// Start codon type weights [ATG, GTG, TTG].
    pub start_weights: [f64; NUM_START_TYPES],
    /// Shine-Dalgarno motif class weights.
    pub rbs_weights: Box<[f64; NUM_RBS_CLASSES]>,
    /// Upstream base composition log-odds `[position][base]`.
    pub upstream: Box<[[f64; 4]; NUM_UPSTREAM_POSITIONS]>,
    /// Non-SD motif weights.
    pub motif_weights: Box<MotifWeights>,
    /// Weight of "no motif found" in non-SD mode.
    pub no_motif_weight: f64,
    /// Global multiplier on start-signal scores.
    pub start_weight: f64,
    /// GC frame bias factors.
    pub frame_bias: [f64; 3],
    /// Hexamer log-odds coding table.
    pub hexamers: Box<[f64; NUM_HEXAMERS]>,
}

impl Default for TrainingModel {
    fn default() -> Self {
        Self {
            gc: 0.5,
            translation_table: DEFAULT_TABLE,
            uses_sd: true,
            start_weights: [0.0; NUM_START_TYPES],
            rbs_weights: Box::new([0.0; NUM_RBS_CLASSES]),
            upstream: Box::new([[0.0; 4]; NUM_UPSTREAM_POSITIONS]),
            motif_weights: boxed_motif_weights(),
            no_motif_weight: 0.0,
            start_weight: START_WEIGHT,
            frame_bias: [1.0; 3],
            hexamers: Box::new([0.0; NUM_HEXAMERS]),
        }
    }
}

impl TrainingModel {
    /// Empty model for the given table and GC, ready for training.
    #[must_use]
    pub fn for_training(gc: f64, translation_table: u8) -> Self {
        Self {
            gc,
            translation_table,
            uses_sd: false,
            frame_bias: [0.0; 3],
            ..Self::default()
        }
    }

    /// Probability that a random codon under this model's GC is not a stop.
    ///
    /// Drives the ORF length factor: the longer an open frame survives by
    /// chance, the more surprising (and gene-like) it is.
    #[must_use]
    pub fn no_stop_probability(&self) -> f64 {
        let at = 1.0 - self.gc;
        let at2 = at * at;
        if self.translation_table == DEFAULT_TABLE {
            // TAA+TAG then TGA under the standard stop set.
            1.0 - (at2 * self.gc / 4.0 + at2 * at / 8.0)
        } else {
            1.0 - (at2 * self.gc / 8.0 + at2 * at / 8.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_shape() {
        let model = TrainingModel::default();
        assert_eq!(model.translation_table, 11);
        assert!(model.uses_sd);
        assert_eq!(model.hexamers.len(), NUM_HEXAMERS);
        assert_eq!(model.rbs_weights.len(), NUM_RBS_CLASSES);
    }

    #[test]
    fn no_stop_probability_plausible() {
        let model = TrainingModel::default();
        let p = model.no_stop_probability();
        assert!(p > 0.9 && p < 1.0);
        // AT-rich genomes hit stops more often.
        let at_rich = TrainingModel {
            gc: 0.3,
            ..TrainingModel::default()
        };
        assert!(at_rich.no_stop_probability() < p);
    }

    #[test]
    fn training_constructor() {
        let model = TrainingModel::for_training(0.42, 4);
        assert_eq!(model.translation_table, 4);
        assert!((model.gc - 0.42).abs() < 1e-12);
        assert!(!model.uses_sd);
        assert_eq!(model.frame_bias, [0.0; 3]);
    }
}
