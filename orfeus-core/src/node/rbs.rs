//! Ribosome-binding-site scoring.
//!
//! Shine-Dalgarno matches are graded into 28 motif classes by cumulative
//! base score and spacer distance, scanning exact matches and single
//! mismatches separately. Organisms without SD signals fall back to a free
//! search for the best-scoring 3-6 bp upstream motif.

use bio::bio_types::strand::Strand;
use rayon::prelude::*;

use crate::constants::{
    MAX_MOTIF_LENGTH, MAX_SPACER, MIN_MOTIF_LENGTH, MIN_SD_SCORE, MIN_SPACER, MOTIF_KEEP_OFFSET,
    MOTIF_SCORE_MIN, NO_MOTIF_FLOOR, RBS_WINDOW_DOWNSTREAM, RBS_WINDOW_UPSTREAM,
};
use crate::model::TrainingModel;
use crate::node::{Node, NodeKind, UpstreamMotif};
use crate::sequence::PackedDna;

/// Score both SD variants at one window position.
fn sd_pair(dna: &PackedDna, pos: usize, start: usize, weights: &[f64]) -> [usize; 2] {
    [
        sd_exact(dna, pos, start, weights),
        sd_mismatch(dna, pos, start, weights),
    ]
}

fn base_scores_exact(dna: &PackedDna, pos: usize, limit: usize) -> Vec<f64> {
    (0..limit)
        .map(|i| match (i % 3, dna.code(pos + i)) {
            (0, 0) => 2.0,
            (1 | 2, 2) => 3.0,
            _ => -10.0,
        })
        .collect()
}

fn base_scores_mismatch(dna: &PackedDna, pos: usize, limit: usize) -> Vec<f64> {
    (0..limit)
        .map(|i| match (i % 3, dna.code(pos + i)) {
            (0, 0) => 2.0,
            (0, _) => -3.0,
            (_, 2) => 3.0,
            _ => -2.0,
        })
        .collect()
}

fn better(candidate: usize, best: usize, weights: &[f64]) -> bool {
    weights[candidate] > weights[best]
        || (weights[candidate] == weights[best] && candidate > best)
}

/// Best exact Shine-Dalgarno class for a window at `pos` upstream of
/// `start`; 0 when nothing qualifies.
#[must_use]
pub fn sd_exact(dna: &PackedDna, pos: usize, start: usize, weights: &[f64]) -> usize {
    if start <= pos + MIN_SPACER {
        return 0;
    }
    let limit = MAX_MOTIF_LENGTH.min(start - MIN_SPACER - pos);
    if pos + limit > dna.len() {
        return 0;
    }
    let scores = base_scores_exact(dna, pos, limit);

    let mut best = 0;
    for len in (MIN_MOTIF_LENGTH..=limit).rev() {
        for offset in 0..=(limit - len) {
            let window = &scores[offset..offset + len];
            if window.iter().any(|&s| s < 0.0) {
                continue;
            }
            let cumulative: f64 = window.iter().sum::<f64>() - 2.0;
            let spacer = start - (pos + offset + len);
            if spacer > MAX_SPACER || cumulative < MIN_SD_SCORE {
                continue;
            }
            let class = exact_class(cumulative as i32, spacer_category(spacer, len));
            if better(class, best, weights) {
                best = class;
            }
        }
    }
    best
}

/// Best single-mismatch Shine-Dalgarno class; 0 when nothing qualifies.
#[must_use]
pub fn sd_mismatch(dna: &PackedDna, pos: usize, start: usize, weights: &[f64]) -> usize {
    if start <= pos + MIN_SPACER {
        return 0;
    }
    let limit = MAX_MOTIF_LENGTH.min(start - MIN_SPACER - pos);
    if pos + limit > dna.len() {
        return 0;
    }
    let scores = base_scores_mismatch(dna, pos, limit);

    let mut best = 0;
    for len in (5..=limit).rev() {
        for offset in 0..=(limit - len) {
            let mut cumulative = -2.0;
            let mut mismatches = 0;
            for (i, &s) in scores[offset..offset + len].iter().enumerate() {
                cumulative += s;
                if s < 0.0 {
                    mismatches += 1;
                    if i <= 1 || i >= len - 2 {
                        cumulative -= 10.0;
                    }
                }
            }
            if mismatches != 1 {
                continue;
            }
            let spacer = start - (pos + offset + len);
            if spacer > MAX_SPACER || cumulative < MIN_SD_SCORE {
                continue;
            }
            let class = mismatch_class(cumulative as i32, mismatch_spacer_category(spacer));
            if better(class, best, weights) {
                best = class;
            }
        }
    }
    best
}

const fn spacer_category(spacer: usize, motif_len: usize) -> usize {
    match spacer {
        0..=4 => {
            if motif_len < 5 {
                2
            } else {
                1
            }
        }
        5..=10 => 0,
        11..=12 => {
            if motif_len < 5 {
                1
            } else {
                2
            }
        }
        _ => 3,
    }
}

const fn mismatch_spacer_category(spacer: usize) -> usize {
    match spacer {
        0..=4 => 1,
        5..=10 => 0,
        11..=12 => 2,
        _ => 3,
    }
}

const fn exact_class(score: i32, category: usize) -> usize {
    match (score, category) {
        (6, 2) => 1,
        (6, 3) => 2,
        (8 | 9, 3) => 3,
        (6, 1) => 6,
        (11 | 12 | 14, 3) => 10,
        (8 | 9, 2) => 11,
        (8 | 9, 1) => 12,
        (6, 0) => 13,
        (8, 0) => 15,
        (9, 0) => 16,
        (11 | 12, 2) => 20,
        (11, 1) => 21,
        (11, 0) => 22,
        (12, 1) => 23,
        (12, 0) => 24,
        (14, 2) => 25,
        (14, 1) => 26,
        (14, 0) => 27,
        _ => 0,
    }
}

const fn mismatch_class(score: i32, category: usize) -> usize {
    match (score, category) {
        (6 | 7, 3) => 2,
        (9, 3) => 3,
        (6, 2) => 4,
        (6, 1) => 5,
        (6, 0) => 9,
        (7, 2) => 7,
        (7, 1) => 8,
        (7, 0) => 14,
        (9, 2) => 17,
        (9, 1) => 18,
        (9, 0) => 19,
        _ => 0,
    }
}

/// Record the best exact / mismatch SD classes for every start node.
pub fn scan_rbs(forward: &PackedDna, reverse: &PackedDna, nodes: &mut [Node], model: &TrainingModel) {
    let len = forward.len();
    nodes
        .par_iter_mut()
        .filter(|n| n.kind.is_start() && !n.edge)
        .for_each(|node| {
            node.rbs = [0, 0];
            let (dna, start) = match node.strand {
                Strand::Forward => (forward, node.pos),
                _ => (reverse, len - 1 - node.pos),
            };
            let lo = start.saturating_sub(RBS_WINDOW_UPSTREAM);
            let hi = start.saturating_sub(RBS_WINDOW_DOWNSTREAM);
            for j in lo..=hi {
                let pair = sd_pair(dna, j, start, model.rbs_weights.as_ref());
                if pair[0] > node.rbs[0] {
                    node.rbs[0] = pair[0];
                }
                if pair[1] > node.rbs[1] {
                    node.rbs[1] = pair[1];
                }
            }
        });
}

/// Best-scoring upstream motif for one start (non-SD organisms).
///
/// Searches 3-6 bp motifs with spacers of 3-15 bp against the trained
/// motif weights. In the final stage (`final_stage`) poor motifs collapse
/// to the no-motif class.
pub fn best_upstream_motif(
    dna_forward: &PackedDna,
    dna_reverse: &PackedDna,
    node: &mut Node,
    model: &TrainingModel,
    final_stage: bool,
) {
    if node.kind == NodeKind::Stop || node.edge {
        return;
    }

    let len = dna_forward.len();
    let (dna, start) = match node.strand {
        Strand::Forward => (dna_forward, node.pos),
        _ => (dna_reverse, len - 1 - node.pos),
    };

    let mut best_score = NO_MOTIF_FLOOR;
    let mut best = UpstreamMotif::default();

    for size in (0..4usize).rev() {
        let motif_len = size + 3;
        let from = start as isize - 18 - size as isize;
        let to = start as isize - 6 - size as isize;
        for j in from..=to {
            if j < 0 || (j as usize) + motif_len > len {
                continue;
            }
            let j_pos = j as usize;
            let spacer = (start as isize - j - size as isize - 3) as usize;
            let spacer_class = if j <= start as isize - 16 - size as isize {
                3
            } else if j <= start as isize - 14 - size as isize {
                2
            } else if j >= start as isize - 7 - size as isize {
                1
            } else {
                0
            };
            let index = dna.kmer(j_pos, motif_len);
            let score = model.motif_weights[size][spacer_class][index];
            if score > best_score {
                best_score = score;
                best = UpstreamMotif {
                    index,
                    len: motif_len,
                    spacer_class,
                    spacer,
                    score,
                };
            }
        }
    }

    let poor =
        best_score == MOTIF_SCORE_MIN || best_score < model.no_motif_weight + MOTIF_KEEP_OFFSET;
    node.motif = if final_stage && poor {
        UpstreamMotif {
            score: model.no_motif_weight,
            ..UpstreamMotif::default()
        }
    } else {
        best
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Strictness;
    use crate::sequence::EncodedSequence;

    fn encode(raw: &[u8]) -> EncodedSequence {
        EncodedSequence::encode(raw, Strictness::Permissive).unwrap()
    }

    #[test]
    fn perfect_sd_motif_classified() {
        // AGGAGG 6 bp upstream of the start at position 13.
        let seq = encode(b"CAGGAGGCCCCCCATGAAACCC");
        let weights = [1.0; 28];
        let class = sd_exact(seq.forward(), 1, 13, &weights);
        assert!(class > 0, "AGGAGG with a 6 bp spacer must classify");
    }

    #[test]
    fn no_motif_in_at_desert() {
        let seq = encode(b"AAAAAAAAAAAAAAAAAAAAAAAAATGAAA");
        let weights = [1.0; 28];
        for j in 0..18 {
            assert_eq!(sd_exact(seq.forward(), j, 24, &weights), 0);
            assert_eq!(sd_mismatch(seq.forward(), j, 24, &weights), 0);
        }
    }

    #[test]
    fn window_too_close_returns_zero() {
        let seq = encode(b"AGGAGGATG");
        let weights = [1.0; 28];
        assert_eq!(sd_exact(seq.forward(), 5, 6, &weights), 0);
    }

    #[test]
    fn scan_rbs_fills_classes() {
        let mut raw = b"CAGGAGGCCCCCC".to_vec();
        raw.extend_from_slice(b"ATG");
        raw.extend(b"GCA".repeat(35));
        raw.extend_from_slice(b"TAA");
        let seq = encode(&raw);

        let mut nodes = vec![Node::at(
            13,
            Strand::Forward,
            NodeKind::Atg,
            (raw.len() - 3) as isize,
            false,
        )];
        let model = TrainingModel::default();
        scan_rbs(seq.forward(), seq.reverse(), &mut nodes, &model);
        assert!(
            nodes[0].rbs[0] > 0,
            "expected an exact SD class, got {:?}",
            nodes[0].rbs
        );
    }

    #[test]
    fn edge_and_stop_nodes_skipped() {
        let seq = encode(b"CAGGAGGCCCCCCATGAAATAAGGGTTTCCC");
        let model = TrainingModel::default();
        let mut nodes = vec![
            Node::at(13, Strand::Forward, NodeKind::Stop, 13, false),
            Node::at(13, Strand::Forward, NodeKind::Atg, 90, true),
        ];
        nodes[0].rbs = [5, 5];
        nodes[1].rbs = [5, 5];
        scan_rbs(seq.forward(), seq.reverse(), &mut nodes, &model);
        assert_eq!(nodes[0].rbs, [5, 5]);
        assert_eq!(nodes[1].rbs, [5, 5]);
    }

    #[test]
    fn upstream_motif_prefers_weighted_kmer() {
        let seq = encode(b"CCCCTATACCCCCCCATGAAACCCGGGTTTAAACCC");
        let mut model = TrainingModel::default();
        model.uses_sd = false;
        // Weight the TATA 4-mer (T=3,A=0 -> 0b11001100 = 204) heavily
        // for every spacer class.
        let tata = 0b1100_1100;
        for spacer in 0..4 {
            model.motif_weights[1][spacer][tata] = 3.5;
        }

        let mut node = Node::at(15, Strand::Forward, NodeKind::Atg, 33, false);
        best_upstream_motif(seq.forward(), seq.reverse(), &mut node, &model, false);
        assert_eq!(node.motif.len, 4);
        assert_eq!(node.motif.index, tata);
        assert!((node.motif.score - 3.5).abs() < 1e-12);
    }

    #[test]
    fn final_stage_collapses_poor_motifs() {
        let seq = encode(b"CCCCTATACCCCCCCATGAAACCCGGGTTTAAACCC");
        let mut model = TrainingModel::default();
        model.uses_sd = false;
        model.no_motif_weight = 1.0;

        let mut node = Node::at(15, Strand::Forward, NodeKind::Atg, 33, false);
        best_upstream_motif(seq.forward(), seq.reverse(), &mut node, &model, true);
        assert_eq!(node.motif.len, 0);
        assert!((node.motif.score - 1.0).abs() < 1e-12);
    }
}
