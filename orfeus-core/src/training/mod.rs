//! Single-mode training: estimate the statistical model from the input
//! sequence itself.
//!
//! The procedure bootstraps from GC-frame agreement: an initial DP pass
//! picks long, frame-consistent ORFs; hexamer statistics from those ORFs
//! give a first coding model; iterative start training then refines the
//! start-type, RBS and upstream-composition weights against it. Iteration
//! counts are fixed, not convergence-driven.

pub mod bank;

use bio::bio_types::strand::Strand;
use rayon::prelude::*;

use crate::constants::{
    EXTREME_AT_FREQ, EXTREME_GC_FREQ, GC_CEIL, GC_FLOOR, GENE_RATIO, HEXAMER_LENGTH,
    HEXAMER_SCORE_MAX, HEXAMER_SCORE_MIN, MIN_MOTIF_LENGTH, MIN_SINGLE_TRAINING_LENGTH,
    MOTIF_COVERAGE, NONSD_TRAINING_ITERATIONS, NUM_HEXAMERS, NUM_MOTIF_SIZES, NUM_RBS_CLASSES,
    NUM_START_TYPES, NUM_UPSTREAM_POSITIONS, SD_HIGH, SD_LOW, SD_STRONG, SD_TRAINING_ITERATIONS,
    TRAINING_SCORE_THRESHOLD, UPSTREAM_SCAN_END, UPSTREAM_SKIP_FROM, UPSTREAM_SKIP_TO, WEIGHT_MAX,
    WEIGHT_MIN,
};
use crate::dp::{predict_path, record_star_pointers};
use crate::error::OrfeusError;
use crate::model::{MotifWeights, TrainingModel};
use crate::node::coding::coding_scores;
use crate::node::frame_bias::record_frame_bias;
use crate::node::rbs::{best_upstream_motif, scan_rbs};
use crate::node::{generate_nodes, sort_nodes, traceback_indices, Node, NodeKind};
use crate::sequence::{background_hexamers, gc_frame_profile, EncodedSequence, PackedDna};

type MotifCounts = MotifWeights;
type MotifFlags = [[[i32; NUM_HEXAMERS]; NUM_MOTIF_SIZES]; NUM_MOTIF_SIZES];

fn boxed_counts() -> Box<MotifCounts> {
    vec![[[0.0; NUM_HEXAMERS]; NUM_MOTIF_SIZES]; NUM_MOTIF_SIZES]
        .into_boxed_slice()
        .try_into()
        .expect("fixed shape")
}

fn boxed_flags() -> Box<MotifFlags> {
    vec![[[0i32; NUM_HEXAMERS]; NUM_MOTIF_SIZES]; NUM_MOTIF_SIZES]
        .into_boxed_slice()
        .try_into()
        .expect("fixed shape")
}

/// Train a model on one sequence.
///
/// Fails with `InsufficientData` when the sequence is shorter than
/// [`MIN_SINGLE_TRAINING_LENGTH`]; the caller recovers by switching to a
/// bank model.
pub fn train_model(
    seq: &EncodedSequence,
    translation_table: u8,
    closed: bool,
    min_gene: usize,
) -> Result<TrainingModel, OrfeusError> {
    if seq.len() < MIN_SINGLE_TRAINING_LENGTH {
        return Err(OrfeusError::InsufficientData(format!(
            "{} bp is below the {} bp single-mode training floor",
            seq.len(),
            MIN_SINGLE_TRAINING_LENGTH
        )));
    }

    let mut model = TrainingModel::for_training(seq.gc(), translation_table);

    let mut nodes = generate_nodes(seq, &model, closed, min_gene);
    sort_nodes(&mut nodes);

    let profile = gc_frame_profile(seq.forward());
    record_frame_bias(&profile, &mut nodes, &mut model);

    record_star_pointers(&mut nodes, &model, false);
    let bootstrap = predict_path(&mut nodes, &model, false);

    hexamer_statistics(&mut model, seq, &nodes, bootstrap.unwrap_or(0));
    coding_scores(seq.forward(), seq.reverse(), &mut nodes, &model);
    scan_rbs(seq.forward(), seq.reverse(), &mut nodes, &model);

    train_starts_sd(seq, &nodes, &mut model);
    model.uses_sd = uses_sd_motifs(&model);
    if !model.uses_sd {
        train_starts_nonsd(seq, &mut nodes, &mut model);
    }

    Ok(model)
}

/// Does the trained RBS weight profile look Shine-Dalgarno driven?
#[must_use]
pub fn uses_sd_motifs(model: &TrainingModel) -> bool {
    let w = model.rbs_weights.as_ref();
    if w[0] >= 0.0 {
        return false;
    }
    if w[16] < SD_HIGH
        && w[13] < SD_HIGH
        && w[15] < SD_HIGH
        && (w[0] >= SD_LOW || (w[22] < SD_STRONG && w[24] < SD_STRONG && w[27] < SD_STRONG))
    {
        return false;
    }
    true
}

/// Count in-frame hexamers over the genes of the bootstrap path and store
/// their log-odds against the genome-wide background.
pub fn hexamer_statistics(
    model: &mut TrainingModel,
    seq: &EncodedSequence,
    nodes: &[Node],
    path_terminal: usize,
) {
    if nodes.is_empty() {
        return;
    }
    let background = background_hexamers(seq.forward(), seq.reverse());
    let len = seq.len();

    let mut counts = vec![0u32; NUM_HEXAMERS];
    let mut total = 0u32;

    #[derive(Clone, Copy)]
    enum Open {
        No,
        Forward { end: usize },
        Reverse { begin: usize },
    }
    let mut open = Open::No;

    // The traceback runs right to left: forward genes appear stop first,
    // reverse genes start first.
    for idx in traceback_indices(nodes, path_terminal) {
        let node = &nodes[idx];
        let is_stop = node.kind == NodeKind::Stop;
        match (node.strand, is_stop) {
            (Strand::Forward, true) => {
                open = Open::Forward {
                    end: node.pos + 2,
                };
            }
            (Strand::Reverse, false) => {
                open = Open::Reverse {
                    begin: len - node.pos - 1,
                };
            }
            (Strand::Forward, false) => {
                if let Open::Forward { end } = open {
                    count_orf_hexamers(seq.forward(), node.pos, end, &mut counts, &mut total);
                }
                open = Open::No;
            }
            (Strand::Reverse, true) => {
                if let Open::Reverse { begin } = open {
                    let end = len - node.pos + 1;
                    count_orf_hexamers(seq.reverse(), begin, end, &mut counts, &mut total);
                }
                open = Open::No;
            }
            _ => {}
        }
    }

    if total == 0 {
        return;
    }
    let total = f64::from(total);
    for (score, (&count, &bg)) in model
        .hexamers
        .iter_mut()
        .zip(counts.iter().zip(background.iter()))
    {
        let freq = f64::from(count) / total;
        *score = hexamer_log_odds(freq, bg);
    }
}

fn count_orf_hexamers(
    dna: &PackedDna,
    begin: usize,
    end: usize,
    counts: &mut [u32],
    total: &mut u32,
) {
    let mut pos = begin;
    while pos + HEXAMER_LENGTH <= end.min(dna.len()) {
        counts[dna.kmer(pos, HEXAMER_LENGTH)] += 1;
        *total += 1;
        pos += 3;
    }
}

fn hexamer_log_odds(freq: f64, background: f64) -> f64 {
    let score = if freq == 0.0 && background > 0.0 {
        HEXAMER_SCORE_MIN
    } else if background == 0.0 {
        0.0
    } else {
        (freq / background).ln()
    };
    score.clamp(HEXAMER_SCORE_MIN, HEXAMER_SCORE_MAX)
}

/// Pick the stronger of a node's exact / mismatch SD classes under the
/// current weights, with a guard band so a weak exact match does not beat
/// a strong mismatch.
fn pick_rbs(node: &Node, weights: &[f64; NUM_RBS_CLASSES]) -> usize {
    let [exact, mismatch] = node.rbs;
    if weights[exact] > weights[mismatch] + SD_HIGH || mismatch == 0 {
        exact
    } else if weights[exact] < weights[mismatch] - SD_HIGH || exact == 0 {
        mismatch
    } else {
        exact.max(mismatch)
    }
}

/// Iterative Shine-Dalgarno start training.
pub fn train_starts_sd(seq: &EncodedSequence, nodes: &[Node], model: &mut TrainingModel) {
    let weight = model.start_weight;
    let mut type_background = [0.0f64; NUM_START_TYPES];
    let mut rbs_background = [0.0f64; NUM_RBS_CLASSES];

    model.start_weights = [0.0; NUM_START_TYPES];
    model.rbs_weights = Box::new([0.0; NUM_RBS_CLASSES]);
    model.upstream = Box::new([[0.0; 4]; NUM_UPSTREAM_POSITIONS]);

    let mut total = 0.0;
    for node in nodes {
        if node.kind == NodeKind::Stop {
            continue;
        }
        type_background[node.kind.start_index()] += 1.0;
        total += 1.0;
    }
    if total > 0.0 {
        for w in &mut type_background {
            *w /= total;
        }
    }

    let mut threshold = TRAINING_SCORE_THRESHOLD;

    for iteration in 0..SD_TRAINING_ITERATIONS {
        let last_iteration = iteration == SD_TRAINING_ITERATIONS - 1;

        rbs_background.fill(0.0);
        let mut background_total = 0.0;
        for node in nodes {
            if node.kind == NodeKind::Stop || node.edge {
                continue;
            }
            rbs_background[pick_rbs(node, &model.rbs_weights)] += 1.0;
            background_total += 1.0;
        }
        if background_total > 0.0 {
            for w in &mut rbs_background {
                *w /= background_total;
            }
        }

        let mut rbs_real = [0.0f64; NUM_RBS_CLASSES];
        let mut type_real = [0.0f64; NUM_START_TYPES];

        for strand in [Strand::Forward, Strand::Reverse] {
            select_training_starts(
                seq,
                nodes,
                model,
                strand,
                weight,
                threshold,
                last_iteration,
                &mut rbs_real,
                &mut type_real,
            );
        }

        renormalize(&mut model.rbs_weights[..], &rbs_real, &rbs_background);
        renormalize(&mut model.start_weights[..], &type_real, &type_background);

        let selected: f64 = type_real.iter().sum();
        if selected <= nodes.len() as f64 / GENE_RATIO {
            threshold /= 2.0;
        }
    }

    upstream_to_log_odds(model);
}

/// One strand's pass of the SD training iteration: per open frame, keep the
/// best-scoring start and credit its RBS class and codon type when the
/// frame clears the threshold.
#[allow(clippy::too_many_arguments)]
fn select_training_starts(
    seq: &EncodedSequence,
    nodes: &[Node],
    model: &mut TrainingModel,
    strand: Strand,
    weight: f64,
    threshold: f64,
    count_upstream: bool,
    rbs_real: &mut [f64; NUM_RBS_CLASSES],
    type_real: &mut [f64; NUM_START_TYPES],
) {
    let mut best_score = [0.0f64; 3];
    let mut best_node: [Option<usize>; 3] = [None; 3];
    let mut best_rbs = [0usize; 3];
    let mut best_type = [0usize; 3];

    let order: Box<dyn Iterator<Item = usize>> = match strand {
        Strand::Forward => Box::new(0..nodes.len()),
        _ => Box::new((0..nodes.len()).rev()),
    };

    for i in order {
        let node = &nodes[i];
        if node.kind.is_start() && node.edge {
            continue;
        }
        let frame = node.frame();

        if node.kind == NodeKind::Stop && node.strand == strand {
            if best_score[frame] >= threshold {
                if let Some(chosen) = best_node[frame] {
                    rbs_real[best_rbs[frame]] += 1.0;
                    type_real[best_type[frame]] += 1.0;
                    if count_upstream {
                        let (dna, start) = match strand {
                            Strand::Forward => (seq.forward(), nodes[chosen].pos),
                            _ => (seq.reverse(), seq.len() - 1 - nodes[chosen].pos),
                        };
                        tally_upstream_composition(dna, start, model);
                    }
                }
            }
            best_score[frame] = 0.0;
            best_node[frame] = None;
            best_rbs[frame] = 0;
            best_type[frame] = 0;
        } else if node.strand == strand && node.kind.is_start() {
            let rbs = pick_rbs(node, &model.rbs_weights);
            let score = node.coding
                + weight * model.rbs_weights[rbs]
                + weight * model.start_weights[node.kind.start_index()];
            if score >= best_score[frame] {
                best_score[frame] = score;
                best_node[frame] = Some(i);
                best_rbs[frame] = rbs;
                best_type[frame] = node.kind.start_index();
            }
        }
    }
}

/// Add the bases upstream of one selected start into the composition table.
fn tally_upstream_composition(dna: &PackedDna, start: usize, model: &mut TrainingModel) {
    let mut row = 0;
    for i in 1..UPSTREAM_SCAN_END {
        if i > UPSTREAM_SKIP_FROM && i < UPSTREAM_SKIP_TO {
            continue;
        }
        if start >= i {
            let base = dna.code(start - i) as usize;
            model.upstream[row][base] += 1.0;
        }
        row += 1;
    }
}

/// Normalize raw counts and write clamped log-odds weights.
fn renormalize(weights: &mut [f64], real: &[f64], background: &[f64]) {
    let total: f64 = real.iter().sum();
    if total == 0.0 {
        weights.fill(0.0);
        return;
    }
    for ((w, &r), &bg) in weights.iter_mut().zip(real).zip(background) {
        let freq = r / total;
        *w = if bg != 0.0 {
            (freq / bg).ln().clamp(WEIGHT_MIN, WEIGHT_MAX)
        } else {
            WEIGHT_MIN
        };
    }
}

/// Convert raw upstream composition counts to clamped log-odds against the
/// GC-derived background base frequencies.
fn upstream_to_log_odds(model: &mut TrainingModel) {
    let gc = model.gc;
    model
        .upstream
        .par_iter_mut()
        .for_each(|row| {
            let sum: f64 = row.iter().sum();
            if sum == 0.0 {
                *row = [0.0; 4];
                return;
            }
            for (base, value) in row.iter_mut().enumerate() {
                let freq = *value / sum;
                let is_at = base == 0 || base == 3;
                let background = if gc > GC_FLOOR && gc < GC_CEIL {
                    if is_at {
                        (1.0 - gc) / 2.0
                    } else {
                        gc / 2.0
                    }
                } else if gc <= GC_FLOOR {
                    if is_at {
                        EXTREME_AT_FREQ
                    } else {
                        EXTREME_GC_FREQ
                    }
                } else if is_at {
                    EXTREME_GC_FREQ
                } else {
                    EXTREME_AT_FREQ
                };
                *value = (freq / background).ln().clamp(WEIGHT_MIN, WEIGHT_MAX);
            }
        });
}

const fn nonsd_stage(iteration: usize) -> usize {
    if iteration < 4 {
        0
    } else if iteration < 12 {
        1
    } else {
        2
    }
}

/// Iterative non-SD motif training: learn which upstream 3-6 bp motifs
/// separate real starts from the background.
pub fn train_starts_nonsd(
    seq: &EncodedSequence,
    nodes: &mut [Node],
    model: &mut TrainingModel,
) {
    let weight = model.start_weight;
    let mut type_background = [0.0f64; NUM_START_TYPES];
    let mut threshold = TRAINING_SCORE_THRESHOLD;

    model.start_weights = [0.0; NUM_START_TYPES];
    model.upstream = Box::new([[0.0; 4]; NUM_UPSTREAM_POSITIONS]);
    model.motif_weights = boxed_counts();
    model.no_motif_weight = 0.0;

    let mut total = 0.0;
    for node in nodes.iter() {
        if node.kind.is_start() {
            type_background[node.kind.start_index()] += 1.0;
            total += 1.0;
        }
    }
    if total > 0.0 {
        for w in &mut type_background {
            *w /= total;
        }
    }

    let mut good = boxed_flags();

    for iteration in 0..NONSD_TRAINING_ITERATIONS {
        let stage = nonsd_stage(iteration);
        let last_iteration = iteration == NONSD_TRAINING_ITERATIONS - 1;

        // Background: every candidate start contributes its motif window.
        let mut background = boxed_counts();
        let mut zero_background = 0.0;
        for i in 0..nodes.len() {
            if nodes[i].kind == NodeKind::Stop || nodes[i].edge {
                continue;
            }
            best_upstream_motif(
                seq.forward(),
                seq.reverse(),
                &mut nodes[i],
                model,
                stage == 2,
            );
            count_motifs(
                seq,
                &nodes[i],
                stage,
                &mut background,
                &mut zero_background,
            );
        }
        let mut bg_total = zero_background;
        for size in background.iter() {
            for spacer in size {
                bg_total += spacer.iter().sum::<f64>();
            }
        }
        if bg_total > 0.0 {
            for size in background.iter_mut() {
                for spacer in size.iter_mut() {
                    for v in spacer.iter_mut() {
                        *v /= bg_total;
                    }
                }
            }
            zero_background /= bg_total;
        }

        // Real counts: the best start per open frame, where it clears the
        // threshold.
        let mut real = boxed_counts();
        let mut zero_real = 0.0;
        let mut type_real = [0.0f64; NUM_START_TYPES];
        let mut gene_count = 0.0;

        for strand in [Strand::Forward, Strand::Reverse] {
            let order: Box<dyn Iterator<Item = usize>> = match strand {
                Strand::Forward => Box::new(0..nodes.len()),
                _ => Box::new((0..nodes.len()).rev()),
            };
            let mut best_score = [0.0f64; 3];
            let mut best_node: [Option<usize>; 3] = [None; 3];

            for i in order {
                if nodes[i].kind.is_start() && nodes[i].edge {
                    continue;
                }
                let frame = nodes[i].frame();
                if nodes[i].kind == NodeKind::Stop && nodes[i].strand == strand {
                    if best_score[frame] >= threshold {
                        if let Some(chosen) = best_node[frame] {
                            gene_count += 1.0;
                            type_real[nodes[chosen].kind.start_index()] += 1.0;
                            count_motifs(seq, &nodes[chosen], stage, &mut real, &mut zero_real);
                            if last_iteration {
                                let (dna, start) = match strand {
                                    Strand::Forward => (seq.forward(), nodes[chosen].pos),
                                    _ => (seq.reverse(), seq.len() - 1 - nodes[chosen].pos),
                                };
                                tally_upstream_composition(dna, start, model);
                            }
                        }
                    }
                    best_score[frame] = 0.0;
                    best_node[frame] = None;
                } else if nodes[i].strand == strand && nodes[i].kind.is_start() {
                    let score = nodes[i].coding
                        + weight * nodes[i].motif.score
                        + weight * model.start_weights[nodes[i].kind.start_index()];
                    if score >= best_score[frame] {
                        best_score[frame] = score;
                        best_node[frame] = Some(i);
                    }
                }
            }
        }

        if stage < 2 {
            coverage_map(&real, &mut good, gene_count);
        }
        motif_weights_from_counts(&real, &background, zero_real, zero_background, &good, model);

        renormalize(&mut model.start_weights[..], &type_real, &type_background);

        if gene_count <= nodes.len() as f64 / GENE_RATIO {
            threshold /= 2.0;
        }
    }

    upstream_to_log_odds(model);
}

/// Accumulate motif counts for one start, stage-dependent:
/// stage 0 counts every window, stage 1 the chosen motif plus shorter
/// sub-windows, stage 2 only the chosen motif.
fn count_motifs(
    seq: &EncodedSequence,
    node: &Node,
    stage: usize,
    counts: &mut MotifCounts,
    zero_count: &mut f64,
) {
    if node.kind == NodeKind::Stop || node.edge {
        return;
    }
    if node.motif.len == 0 {
        *zero_count += 1.0;
        return;
    }

    let len = seq.len();
    let (dna, start) = match node.strand {
        Strand::Forward => (seq.forward(), node.pos),
        _ => (seq.reverse(), len - 1 - node.pos),
    };

    match stage {
        0 => {
            for size in 0..NUM_MOTIF_SIZES {
                let motif_len = size + MIN_MOTIF_LENGTH;
                let from = start as isize - 18 - size as isize;
                let to = start as isize - 6 - size as isize;
                for j in from..=to {
                    if j < 0 || j as usize + motif_len > len {
                        continue;
                    }
                    let index = dna.kmer(j as usize, motif_len);
                    for spacer in 0..NUM_MOTIF_SIZES {
                        counts[size][spacer][index] += 1.0;
                    }
                }
            }
        }
        1 => {
            let motif = &node.motif;
            counts[motif.len - MIN_MOTIF_LENGTH][motif.spacer_class][motif.index] += 1.0;
            for size in 0..motif.len - MIN_MOTIF_LENGTH {
                let sub_len = size + MIN_MOTIF_LENGTH;
                let from = start as isize - (motif.spacer + motif.len) as isize;
                let to = start as isize - (motif.spacer + sub_len) as isize;
                for j in from..=to {
                    if j < 0 || j as usize + sub_len > len {
                        continue;
                    }
                    let spacer = spacer_class_for(j as usize, start, size);
                    let index = dna.kmer(j as usize, sub_len);
                    counts[size][spacer][index] += 1.0;
                }
            }
        }
        _ => {
            let motif = &node.motif;
            counts[motif.len - MIN_MOTIF_LENGTH][motif.spacer_class][motif.index] += 1.0;
        }
    }
}

const fn spacer_class_for(pos: usize, start: usize, size: usize) -> usize {
    if pos + 16 + size <= start {
        3
    } else if pos + 14 + size <= start {
        2
    } else if pos + 7 + size >= start {
        1
    } else {
        0
    }
}

/// Decide which motifs are trustworthy: 3-mers by raw coverage, longer
/// motifs by decomposition into covered 3-mers (one interior mismatch
/// allowed from 5-mers up).
fn coverage_map(real: &MotifCounts, good: &mut MotifFlags, gene_count: f64) {
    *good = [[[0; NUM_HEXAMERS]; NUM_MOTIF_SIZES]; NUM_MOTIF_SIZES];
    if gene_count <= 0.0 {
        return;
    }

    for spacer in 0..NUM_MOTIF_SIZES {
        for idx in 0..64 {
            if real[0][spacer][idx] / gene_count >= MOTIF_COVERAGE {
                for other in 0..NUM_MOTIF_SIZES {
                    good[0][other][idx] = 1;
                }
            }
        }
    }

    for spacer in 0..NUM_MOTIF_SIZES {
        for idx in 0..256 {
            let hi = (idx & 252) >> 2;
            let lo = idx & 63;
            if good[0][spacer][hi] != 0 && good[0][spacer][lo] != 0 {
                good[1][spacer][idx] = 1;
            }
        }
    }

    for spacer in 0..NUM_MOTIF_SIZES {
        for idx in 0..1024 {
            let a = (idx & 1008) >> 4;
            let b = (idx & 252) >> 2;
            let c = idx & 63;
            if good[0][spacer][a] == 0 || good[0][spacer][b] == 0 || good[0][spacer][c] == 0 {
                continue;
            }
            good[2][spacer][idx] = 1;
            // Interior mismatches of the middle base still count, weaker.
            let mut variant = idx;
            let mut k = 0;
            while k <= 16 {
                variant ^= k;
                let mut l = 0;
                while l <= 32 {
                    variant ^= l;
                    if good[2][spacer][variant] == 0 {
                        good[2][spacer][variant] = 2;
                    }
                    l += 32;
                }
                k += 16;
            }
        }
    }

    for spacer in 0..NUM_MOTIF_SIZES {
        for idx in 0..NUM_HEXAMERS {
            let hi = (idx & 4092) >> 2;
            let lo = idx & 1023;
            if good[2][spacer][hi] == 0 || good[2][spacer][lo] == 0 {
                continue;
            }
            good[3][spacer][idx] = if good[2][spacer][hi] == 1 && good[2][spacer][lo] == 1 {
                1
            } else {
                2
            };
        }
    }
}

/// Fold bad-motif counts into the no-motif class, then write clamped
/// log-odds weights for the good motifs.
fn motif_weights_from_counts(
    real: &MotifCounts,
    background: &MotifCounts,
    zero_real: f64,
    zero_background: f64,
    good: &MotifFlags,
    model: &mut TrainingModel,
) {
    let mut sum_real = zero_real;
    for size in real.iter() {
        for spacer in size {
            sum_real += spacer.iter().sum::<f64>();
        }
    }
    if sum_real == 0.0 {
        model.motif_weights = boxed_counts();
        model.no_motif_weight = 0.0;
        return;
    }

    let mut zreal = zero_real;
    let mut zbg = zero_background;

    for size in 0..NUM_MOTIF_SIZES {
        for spacer in 0..NUM_MOTIF_SIZES {
            for idx in 0..NUM_HEXAMERS {
                let r = real[size][spacer][idx];
                if good[size][spacer][idx] == 0 {
                    zreal += r;
                    zbg += r;
                    model.motif_weights[size][spacer][idx] = WEIGHT_MIN;
                } else {
                    let freq = r / sum_real;
                    let bg = background[size][spacer][idx];
                    model.motif_weights[size][spacer][idx] = if bg != 0.0 {
                        (freq / bg).ln().clamp(WEIGHT_MIN, WEIGHT_MAX)
                    } else {
                        WEIGHT_MIN
                    };
                }
            }
        }
    }

    let zfreq = zreal / sum_real;
    model.no_motif_weight = if zbg != 0.0 {
        (zfreq / zbg).ln().clamp(WEIGHT_MIN, WEIGHT_MAX)
    } else {
        WEIGHT_MIN
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Strictness;
    use crate::constants::MIN_GENE_LENGTH;

    /// Synthetic genome: tandem genes with SD sites and AT-rich spacers.
    fn synthetic_genome(copies: usize) -> Vec<u8> {
        let gene = b"AGGAGGTTTTCCATGAAACGTATTAGCACCGAAGCTGCTGAAGCGGCAGAACGCATTGCTGAACGTTTAGCAGCAGAAGCTGCTGAAGCGGCAGAACGCGAATAA";
        let spacer = b"TTTTCTTTTCTTTTAATTTTCT";
        let mut raw = Vec::new();
        for _ in 0..copies {
            raw.extend_from_slice(gene);
            raw.extend_from_slice(spacer);
        }
        raw
    }

    #[test]
    fn training_rejects_short_sequences() {
        let seq =
            EncodedSequence::encode(&synthetic_genome(3), Strictness::Permissive).unwrap();
        let err = train_model(&seq, 11, false, MIN_GENE_LENGTH).unwrap_err();
        assert!(matches!(err, OrfeusError::InsufficientData(_)));
    }

    #[test]
    fn training_produces_usable_model() {
        let raw = synthetic_genome(200);
        assert!(raw.len() >= MIN_SINGLE_TRAINING_LENGTH);
        let seq = EncodedSequence::encode(&raw, Strictness::Permissive).unwrap();
        let model = train_model(&seq, 11, false, MIN_GENE_LENGTH).unwrap();

        assert_eq!(model.translation_table, 11);
        assert!((model.gc - seq.gc()).abs() < 1e-12);
        assert!(model.hexamers.iter().any(|&h| h != 0.0));
        assert!(model.hexamers.iter().all(|h| h.is_finite()));
        assert!(model
            .rbs_weights
            .iter()
            .chain(model.start_weights.iter())
            .all(|w| w.is_finite()));
    }

    #[test]
    fn hexamer_log_odds_edges() {
        assert_eq!(hexamer_log_odds(0.0, 0.5), HEXAMER_SCORE_MIN);
        assert_eq!(hexamer_log_odds(0.5, 0.0), 0.0);
        assert!((hexamer_log_odds(0.2, 0.1) - 2f64.ln()).abs() < 1e-12);
        assert_eq!(hexamer_log_odds(1.0, 1e-9), HEXAMER_SCORE_MAX);
    }

    #[test]
    fn renormalize_writes_log_odds() {
        let mut weights = [0.0f64; 3];
        let real = [8.0, 1.0, 1.0];
        let background = [0.4, 0.3, 0.3];
        renormalize(&mut weights, &real, &background);
        assert!(weights[0] > 0.0);
        assert!(weights[1] < 0.0);
        assert!(weights.iter().all(|w| (WEIGHT_MIN..=WEIGHT_MAX).contains(w)));
    }

    #[test]
    fn renormalize_zero_real_clears() {
        let mut weights = [1.0f64; 3];
        renormalize(&mut weights, &[0.0; 3], &[0.3; 3]);
        assert_eq!(weights, [0.0; 3]);
    }

    #[test]
    fn sd_decision_thresholds() {
        let mut model = TrainingModel::default();
        model.rbs_weights[0] = 0.5;
        assert!(!uses_sd_motifs(&model));

        model.rbs_weights[0] = -1.0;
        model.rbs_weights[16] = 2.0;
        assert!(uses_sd_motifs(&model));

        let mut weak = TrainingModel::default();
        weak.rbs_weights[0] = -0.2;
        assert!(!uses_sd_motifs(&weak));
    }

    #[test]
    fn coverage_map_empty_counts() {
        let real = boxed_counts();
        let mut good = boxed_flags();
        coverage_map(&real, &mut good, 100.0);
        let any = good
            .iter()
            .flat_map(|s| s.iter())
            .flat_map(|s| s.iter())
            .any(|&v| v != 0);
        assert!(!any);
    }

    #[test]
    fn coverage_map_propagates_3mers() {
        let mut real = boxed_counts();
        // AGG (0,2,2) -> index 0b001010 = 10; cover it heavily.
        real[0][0][10] = 50.0;
        let mut good = boxed_flags();
        coverage_map(&real, &mut good, 100.0);
        assert_eq!(good[0][0][10], 1);
        assert_eq!(good[0][3][10], 1);
        // The 4-mer AGGA decomposes into AGG and GGA; cover GGA too and
        // the 4-mer becomes good.
        let gga = 0b10_1000;
        real[0][0][gga] = 50.0;
        let mut good2 = boxed_flags();
        coverage_map(&real, &mut good2, 100.0);
        let agga = (10 << 2) | 0;
        assert_eq!(good2[1][0][agga], 1);
    }
}
