//! Tuned coefficients and structural limits of the scoring model.

/// Version string reported in output headers.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// -- sequence ---------------------------------------------------------------

/// Shortest sequence single-mode training will accept.
pub const MIN_SINGLE_TRAINING_LENGTH: usize = 20_000;

/// Shortest sequence worth scanning at all.
pub const MIN_SCAN_LENGTH: usize = 70;

/// Unknown-base run length that becomes a hard mask.
pub const MASK_RUN_LENGTH: usize = 50;

/// Window width of the GC-frame profile.
pub const GC_FRAME_WINDOW: usize = 120;

/// SIMD chunk width for the bulk encoder.
pub const ENCODE_CHUNK: usize = 32;

// -- gene geometry ----------------------------------------------------------

/// Minimum ORF length for an interior gene.
pub const MIN_GENE_LENGTH: usize = 90;

/// Minimum ORF length for a boundary-truncated gene.
pub const MIN_EDGE_GENE_LENGTH: usize = 60;

/// Largest tolerated same-strand overlap.
pub const MAX_SAME_STRAND_OVERLAP: usize = 60;

/// Largest tolerated opposite-strand overlap.
pub const MAX_OPPOSITE_STRAND_OVERLAP: i32 = 200;

/// Operon distance scale in nucleotides.
pub const OPERON_DISTANCE: f64 = 60.0;

/// Overlap/distance penalty coefficient.
pub const OVERLAP_PENALTY: f64 = 0.15;

// -- node search ------------------------------------------------------------

/// DP connection window, in node indices.
pub const NODE_WINDOW: usize = 500;

/// Start-refinement window, in node indices.
pub const REFINE_WINDOW: usize = 100;

/// Genes past this count are truncated with a warning.
pub const MAX_GENES: usize = 30_000;

// -- hexamer model ----------------------------------------------------------

/// Hexamer (dicodon) length.
pub const HEXAMER_LENGTH: usize = 6;

/// 4^6 hexamer states.
pub const NUM_HEXAMERS: usize = 4096;

/// Log-odds clamp applied to all trained weights.
pub const WEIGHT_MIN: f64 = -4.0;
pub const WEIGHT_MAX: f64 = 4.0;

/// Hexamer log-odds clamp.
pub const HEXAMER_SCORE_MIN: f64 = -5.0;
pub const HEXAMER_SCORE_MAX: f64 = 5.0;

/// Sentinel for "no score seen yet in this frame".
pub const CODING_SENTINEL: f64 = -10_000.0;

// -- start / RBS model ------------------------------------------------------

/// Number of start codon types (ATG, GTG, TTG).
pub const NUM_START_TYPES: usize = 3;

/// Number of Shine-Dalgarno motif classes.
pub const NUM_RBS_CLASSES: usize = 28;

/// Upstream positions sampled for composition scoring.
pub const NUM_UPSTREAM_POSITIONS: usize = 32;

/// Non-SD motif lengths 3..=6 give four size classes.
pub const NUM_MOTIF_SIZES: usize = 4;

/// Shortest and longest non-SD motif.
pub const MIN_MOTIF_LENGTH: usize = 3;
pub const MAX_MOTIF_LENGTH: usize = 6;

/// SD scan window relative to the start codon.
pub const RBS_WINDOW_UPSTREAM: usize = 20;
pub const RBS_WINDOW_DOWNSTREAM: usize = 6;

/// Spacer bounds for SD motif classification.
pub const MIN_SPACER: usize = 4;
pub const MAX_SPACER: usize = 15;

/// Minimum cumulative base score for an SD match.
pub const MIN_SD_SCORE: f64 = 6.0;

/// Floor returned when no upstream motif window exists.
pub const NO_MOTIF_FLOOR: f64 = -100.0;

/// Poor-motif rejection threshold offset in the final training stage.
pub const MOTIF_KEEP_OFFSET: f64 = 0.69;

/// Motif weight floor.
pub const MOTIF_SCORE_MIN: f64 = -4.0;

/// Upstream scan geometry: positions 1..45 upstream, skipping 3..=14.
pub const UPSTREAM_SCAN_END: usize = 45;
pub const UPSTREAM_SKIP_FROM: usize = 2;
pub const UPSTREAM_SKIP_TO: usize = 15;

/// Upstream composition contribution weight.
pub const UPSTREAM_WEIGHT: f64 = 0.4;

// -- score shaping ----------------------------------------------------------

/// Multiplier applied to all start-signal weights.
pub const START_WEIGHT: f64 = 4.35;

/// Edge gene bonus / upstream penalty (in START_WEIGHT units).
pub const EDGE_BONUS: f64 = 0.74;
pub const EDGE_UPSTREAM_PENALTY: f64 = -1.0;

/// Penalty applied to negative-coding starts.
pub const NEGATIVE_CODING_PENALTY: f64 = 0.5;

/// ORFs shorter than this get their start signals dampened.
pub const SHORT_GENE_LENGTH: usize = 250;

/// Length-factor shaping.
pub const MIN_GENE_CODONS: i32 = 80;
pub const MAX_GENE_CODONS: i32 = 1000;
pub const GENE_SIZE_SCALE: f64 = 920.0;
pub const LENGTH_FACTOR_GATE: f64 = 3.0;
pub const LENGTH_FACTOR_SHARE: f64 = 0.5;

/// Coding score under which meta-mode fragments draw penalties.
pub const META_CODING_GATE: f64 = 5.0;

/// Meta-mode fragment penalties.
pub const META_SHORT_SEQ_LENGTH: usize = 3000;
pub const META_MIN_GENE_LENGTH: usize = 120;
pub const META_PENALTY: f64 = 7.5;
pub const META_PENALTY_SCALE: f64 = 2700.0;
pub const META_FALLBACK_LENGTH: usize = 1500;

/// Confidence cap for reported genes.
pub const MAX_CONFIDENCE: f64 = 99.99;

// -- training ---------------------------------------------------------------

/// Fixed iteration counts for start training.
pub const SD_TRAINING_ITERATIONS: usize = 10;
pub const NONSD_TRAINING_ITERATIONS: usize = 20;

/// Initial ORF score threshold for the training set; halved when fewer
/// than nodes/GENE_RATIO genes clear it.
pub const TRAINING_SCORE_THRESHOLD: f64 = 35.0;
pub const GENE_RATIO: f64 = 2000.0;

/// Coverage a 3-base motif needs across training genes to be "good".
pub const MOTIF_COVERAGE: f64 = 0.2;

/// GC bounds for the upstream background model.
pub const GC_FLOOR: f64 = 0.1;
pub const GC_CEIL: f64 = 0.9;
pub const EXTREME_AT_FREQ: f64 = 0.9;
pub const EXTREME_GC_FREQ: f64 = 0.1;

/// SD decision thresholds over the trained RBS weights.
pub const SD_STRONG: f64 = 2.0;
pub const SD_HIGH: f64 = 1.0;
pub const SD_LOW: f64 = -0.5;

// -- meta-mode bank ---------------------------------------------------------

/// GC bucket range of the bank, in percent.
pub const BANK_GC_MIN: u8 = 30;
pub const BANK_GC_MAX: u8 = 70;

/// Candidate translation tables tried by meta mode.
pub const BANK_TABLES: [u8; 2] = [11, 4];

/// Shine-Dalgarno motif class labels: (motif, spacer range).
pub const RBS_LABELS: [(&str, &str); NUM_RBS_CLASSES] = [
    ("None", "None"),
    ("GGA/GAG/AGG", "3-4bp"),
    ("3Base/5BMM", "13-15bp"),
    ("4Base/6BMM", "13-15bp"),
    ("AGxAG", "11-12bp"),
    ("AGxAG", "3-4bp"),
    ("GGA/GAG/AGG", "11-12bp"),
    ("GGxGG", "11-12bp"),
    ("GGxGG", "3-4bp"),
    ("AGxAG", "5-10bp"),
    ("AGGAG(G)/GGAGG", "13-15bp"),
    ("AGGA/GGAG/GAGG", "3-4bp"),
    ("AGGA/GGAG/GAGG", "11-12bp"),
    ("GGA/GAG/AGG", "5-10bp"),
    ("GGxGG", "5-10bp"),
    ("AGGA", "5-10bp"),
    ("GGAG/GAGG", "5-10bp"),
    ("AGxAGG/AGGxGG", "11-12bp"),
    ("AGxAGG/AGGxGG", "3-4bp"),
    ("AGxAGG/AGGxGG", "5-10bp"),
    ("AGGAG/GGAGG", "11-12bp"),
    ("AGGAG", "3-4bp"),
    ("AGGAG", "5-10bp"),
    ("GGAGG", "3-4bp"),
    ("GGAGG", "5-10bp"),
    ("AGGAGG", "11-12bp"),
    ("AGGAGG", "3-4bp"),
    ("AGGAGG", "5-10bp"),
];
