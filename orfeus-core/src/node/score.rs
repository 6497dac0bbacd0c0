//! Start scoring: combine coding potential, RBS signal, start-codon type
//! and upstream composition into each node's final score.

use bio::bio_types::strand::Strand;

use crate::constants::{
    EDGE_BONUS, EDGE_UPSTREAM_PENALTY, META_CODING_GATE, META_FALLBACK_LENGTH,
    META_MIN_GENE_LENGTH, META_PENALTY, META_PENALTY_SCALE, META_SHORT_SEQ_LENGTH,
    NEGATIVE_CODING_PENALTY, NODE_WINDOW, SHORT_GENE_LENGTH, UPSTREAM_SCAN_END,
    UPSTREAM_SKIP_FROM, UPSTREAM_SKIP_TO, UPSTREAM_WEIGHT,
};
use crate::model::TrainingModel;
use crate::node::coding::{coding_scores, orf_gc};
use crate::node::rbs::{best_upstream_motif, scan_rbs};
use crate::node::{Node, NodeKind};
use crate::sequence::EncodedSequence;

/// Score every node in place: coding, RBS, type, upstream, total.
pub fn score_nodes(
    seq: &EncodedSequence,
    nodes: &mut [Node],
    model: &TrainingModel,
    closed: bool,
    is_meta: bool,
) {
    if nodes.is_empty() {
        return;
    }

    orf_gc(seq.forward(), nodes);
    coding_scores(seq.forward(), seq.reverse(), nodes, model);

    if model.uses_sd {
        scan_rbs(seq.forward(), seq.reverse(), nodes, model);
    } else {
        for node in nodes.iter_mut() {
            best_upstream_motif(seq.forward(), seq.reverse(), node, model, true);
        }
    }

    let len = seq.len();
    let weight = model.start_weight;
    let edge_bonus = EDGE_BONUS * weight;
    let edge_upstream = EDGE_UPSTREAM_PENALTY * weight;
    let dangling_penalty = NEGATIVE_CODING_PENALTY * edge_bonus;

    for i in 0..nodes.len() {
        if nodes[i].kind == NodeKind::Stop {
            continue;
        }

        let gene_length = nodes[i].orf_length();
        let at_boundary = boundary(&nodes[i], len);
        let mut edge_count = usize::from(nodes[i].edge) + usize::from(!has_real_stop(&nodes[i], seq, model));

        score_type(&mut nodes[i], model, edge_count, edge_bonus);
        score_rbs(&mut nodes[i], model);
        score_upstream(&mut nodes[i], seq, model);
        if !closed && at_boundary && !nodes[i].edge {
            nodes[i].upstream_score += edge_upstream;
        }
        neighbour_edge_bonus(nodes, i, edge_upstream);

        // Starts parked on the boundary of an open-ended sequence become
        // edge genes themselves.
        if at_boundary && !nodes[i].edge && !closed {
            edge_count += 1;
            nodes[i].edge = true;
            nodes[i].type_score = 0.0;
            nodes[i].upstream_score = edge_bonus / edge_count as f64;
            nodes[i].rbs_score = 0.0;
        }

        // A start whose ORF dangles off one edge pays for the missing stop.
        if !nodes[i].edge && edge_count == 1 {
            nodes[i].upstream_score -= dangling_penalty;
        }

        if edge_count == 0 && gene_length < SHORT_GENE_LENGTH {
            dampen_short(&mut nodes[i], gene_length);
        }

        if is_meta
            && edge_count == 0
            && len < META_SHORT_SEQ_LENGTH
            && (nodes[i].coding < META_CODING_GATE || gene_length < META_MIN_GENE_LENGTH)
        {
            nodes[i].coding -=
                META_PENALTY / META_PENALTY_SCALE * (META_SHORT_SEQ_LENGTH - len) as f64;
        }

        nodes[i].start_score =
            nodes[i].type_score + nodes[i].rbs_score + nodes[i].upstream_score;

        if nodes[i].coding < 0.0 {
            if edge_count > 0 && !nodes[i].edge {
                if !is_meta || len > META_FALLBACK_LENGTH {
                    nodes[i].start_score -= weight;
                } else {
                    nodes[i].start_score -= 0.004f64.mul_add(-(len as f64), 10.31);
                }
            } else if is_meta && len < META_SHORT_SEQ_LENGTH && nodes[i].edge {
                let floor = (len as f64).sqrt() * 5.0;
                if gene_length as f64 >= floor {
                    if nodes[i].coding >= 0.0 {
                        nodes[i].coding = -1.0;
                    }
                    nodes[i].start_score = 0.0;
                    nodes[i].upstream_score = 0.0;
                }
            } else {
                nodes[i].start_score -= NEGATIVE_CODING_PENALTY;
            }
        } else if nodes[i].coding < META_CODING_GATE
            && is_meta
            && gene_length < META_MIN_GENE_LENGTH
            && nodes[i].start_score < 0.0
        {
            nodes[i].start_score -= weight;
        }

        nodes[i].path_score = 0.0;
    }
}

fn boundary(node: &Node, len: usize) -> bool {
    (node.pos <= 2 && node.strand == Strand::Forward)
        || (node.pos + 3 >= len && node.strand == Strand::Reverse)
}

fn has_real_stop(node: &Node, seq: &EncodedSequence, model: &TrainingModel) -> bool {
    if node.stop_pos < 0 {
        return false;
    }
    let stop = node.stop_pos as usize;
    let len = seq.len();
    match node.strand {
        Strand::Forward => {
            stop + 2 < len && seq.forward().is_stop(stop, model.translation_table)
        }
        _ => {
            stop >= 2
                && stop < len
                && seq
                    .reverse()
                    .is_stop(len - 1 - stop, model.translation_table)
        }
    }
}

fn score_type(node: &mut Node, model: &TrainingModel, edge_count: usize, edge_bonus: f64) {
    if node.edge {
        node.type_score = edge_bonus / edge_count.max(1) as f64;
        node.upstream_score = 0.0;
        node.rbs_score = 0.0;
    } else {
        node.type_score = model.start_weights[node.kind.start_index()] * model.start_weight;
    }
}

fn score_rbs(node: &mut Node, model: &TrainingModel) {
    if node.edge {
        return;
    }
    let sd = model.rbs_weights[node.rbs[0]].max(model.rbs_weights[node.rbs[1]])
        * model.start_weight;
    if model.uses_sd {
        node.rbs_score = sd;
    } else {
        node.rbs_score = model.start_weight * node.motif.score;
        if node.rbs_score < sd && model.no_motif_weight > -0.5 {
            node.rbs_score = sd;
        }
    }
}

fn score_upstream(node: &mut Node, seq: &EncodedSequence, model: &TrainingModel) {
    if node.edge {
        return;
    }
    let (dna, start) = match node.strand {
        Strand::Forward => (seq.forward(), node.pos),
        _ => (seq.reverse(), seq.len() - 1 - node.pos),
    };
    let mut score = 0.0;
    let mut row = 0;
    for i in 1..UPSTREAM_SCAN_END {
        if i > UPSTREAM_SKIP_FROM && i < UPSTREAM_SKIP_TO {
            continue;
        }
        if start >= i {
            let base = dna.code(start - i) as usize;
            score += UPSTREAM_WEIGHT * model.start_weight * model.upstream[row][base];
            row += 1;
        }
    }
    node.upstream_score = score;
}

/// Non-edge starts adjacent (in node order) to an edge start sharing their
/// stop inherit the edge upstream penalty, keeping the comparison fair.
fn neighbour_edge_bonus(nodes: &mut [Node], i: usize, edge_upstream: f64) {
    if nodes[i].edge {
        return;
    }
    let n = nodes.len();
    if i < NODE_WINDOW && nodes[i].strand == Strand::Forward {
        for j in (0..i).rev() {
            if nodes[j].edge && nodes[i].stop_pos == nodes[j].stop_pos {
                nodes[i].upstream_score += edge_upstream;
                break;
            }
        }
    } else if i >= n.saturating_sub(NODE_WINDOW) && nodes[i].strand == Strand::Reverse {
        for j in i + 1..n {
            if nodes[j].edge && nodes[i].stop_pos == nodes[j].stop_pos {
                nodes[i].upstream_score += edge_upstream;
                break;
            }
        }
    }
}

fn dampen_short(node: &mut Node, gene_length: usize) {
    let shrink = SHORT_GENE_LENGTH as f64 / gene_length as f64;
    let grow = gene_length as f64 / SHORT_GENE_LENGTH as f64;
    for score in [
        &mut node.rbs_score,
        &mut node.upstream_score,
        &mut node.type_score,
    ] {
        if *score < 0.0 {
            *score *= shrink;
        } else if *score > 0.0 {
            *score *= grow;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Strictness;
    use crate::constants::MIN_GENE_LENGTH;
    use crate::node::{generate_nodes, sort_nodes};

    fn scored_nodes(raw: &[u8], model: &TrainingModel, closed: bool, meta: bool) -> Vec<Node> {
        let seq = EncodedSequence::encode(raw, Strictness::Permissive).unwrap();
        let mut nodes = generate_nodes(&seq, model, closed, MIN_GENE_LENGTH);
        sort_nodes(&mut nodes);
        score_nodes(&seq, &mut nodes, model, closed, meta);
        nodes
    }

    fn orf(repeats: usize) -> Vec<u8> {
        [b"ATG".as_ref(), &b"GCA".repeat(repeats), b"TAA"].concat()
    }

    #[test]
    fn totals_are_finite() {
        let model = TrainingModel::default();
        let nodes = scored_nodes(&orf(60), &model, false, false);
        assert!(!nodes.is_empty());
        for node in &nodes {
            assert!(node.coding.is_finite());
            assert!(node.start_score.is_finite());
        }
    }

    #[test]
    fn atg_preference_shows_in_type_score() {
        let mut model = TrainingModel::default();
        model.start_weights = [1.0, 0.2, -0.5];
        let nodes = scored_nodes(&orf(90), &model, true, false);
        let start = nodes
            .iter()
            .find(|n| n.kind == NodeKind::Atg && n.pos == 0)
            .unwrap();
        assert!((start.type_score - model.start_weight).abs() < 1e-9);
    }

    #[test]
    fn boundary_start_becomes_edge_when_open() {
        let model = TrainingModel::default();
        let nodes = scored_nodes(&orf(60), &model, false, false);
        let start = nodes
            .iter()
            .find(|n| n.kind.is_start() && n.pos == 0)
            .unwrap();
        assert!(start.edge, "a start at position 0 of an open sequence is partial");
        assert_eq!(start.rbs_score, 0.0);
    }

    #[test]
    fn short_orf_signals_dampened() {
        let mut model = TrainingModel::default();
        model.start_weights = [1.0, 1.0, 1.0];
        // Interior gene of ~96 nt; positive signals shrink by ~96/250.
        let raw = [
            b"GGGTAAGGG".as_ref(),
            &orf(30),
            b"GGGTAAGGG".as_ref(),
        ]
        .concat();
        let nodes = scored_nodes(&raw, &model, true, false);
        let start = nodes
            .iter()
            .find(|n| n.kind == NodeKind::Atg && n.pos == 9)
            .unwrap();
        assert!(start.type_score < model.start_weight);
        assert!(start.type_score > 0.0);
    }

    #[test]
    fn meta_mode_penalizes_short_fragments() {
        let model = TrainingModel::default();
        let single = scored_nodes(&orf(40), &model, true, false);
        let meta = scored_nodes(&orf(40), &model, true, true);
        let s = single
            .iter()
            .find(|n| n.kind == NodeKind::Atg && n.pos == 0)
            .unwrap();
        let m = meta
            .iter()
            .find(|n| n.kind == NodeKind::Atg && n.pos == 0)
            .unwrap();
        assert!(m.coding < s.coding);
    }
}
