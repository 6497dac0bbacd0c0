//! GC-frame bias: how strongly each candidate ORF agrees with the
//! GC-richest reading frame of its neighbourhood.
//!
//! Used twice: the bootstrap DP pass scores ORFs purely by frame agreement
//! before any hexamer statistics exist, and single-mode training derives
//! its global frame bias factors from the same counts.

use bio::bio_types::strand::Strand;

use crate::model::TrainingModel;
use crate::node::{Node, NodeKind};
use crate::sequence::max_frame;

/// Fill each start node's `frame_gc` triplet and `best_frame` from the
/// windowed GC-frame profile, then derive the model's bias factors.
pub fn record_frame_bias(profile: &[i8], nodes: &mut [Node], model: &mut TrainingModel) {
    if nodes.is_empty() || profile.is_empty() {
        return;
    }

    let mut counts = [[0i32; 3]; 3];
    let mut last = [0usize; 3];

    // Forward strand, right to left.
    for i in (0..nodes.len()).rev() {
        if nodes[i].strand != Strand::Forward {
            continue;
        }
        let frame = nodes[i].frame();
        let offset = 3 - frame;
        if nodes[i].kind == NodeKind::Stop {
            counts[frame] = [0; 3];
            last[frame] = nodes[i].pos;
            if let Some(&g) = profile.get(nodes[i].pos) {
                if g >= 0 {
                    counts[frame][(g as usize + offset) % 3] = 1;
                }
            }
        } else {
            if last[frame] >= 3 {
                let mut pos = last[frame] - 3;
                while pos >= nodes[i].pos {
                    if let Some(&g) = profile.get(pos) {
                        if g >= 0 {
                            counts[frame][(g as usize + offset) % 3] += 1;
                        }
                    }
                    if pos < 3 {
                        break;
                    }
                    pos -= 3;
                }
            }
            attach(&mut nodes[i], &counts[frame]);
            last[frame] = nodes[i].pos;
        }
    }

    counts = [[0; 3]; 3];
    last = [0; 3];

    // Reverse strand, left to right.
    for node in nodes.iter_mut() {
        if node.strand != Strand::Reverse {
            continue;
        }
        let frame = node.frame();
        if node.kind == NodeKind::Stop {
            counts[frame] = [0; 3];
            last[frame] = node.pos;
            if let Some(&g) = profile.get(node.pos) {
                if g >= 0 {
                    counts[frame][((3 - g as usize) + frame) % 3] = 1;
                }
            }
        } else {
            let mut pos = last[frame] + 3;
            while pos <= node.pos && pos < profile.len() {
                let g = profile[pos];
                if g >= 0 {
                    counts[frame][((3 - g as usize) + frame) % 3] += 1;
                }
                pos += 3;
            }
            attach(node, &counts[frame]);
            last[frame] = node.pos;
        }
    }

    derive_bias(nodes, model);
}

fn attach(node: &mut Node, counts: &[i32; 3]) {
    node.best_frame = max_frame(counts[0], counts[1], counts[2]);

    let gene_length: isize = match node.strand {
        Strand::Forward => node.stop_pos + 3 - node.pos as isize,
        _ => node.pos as isize + 3 - node.stop_pos,
    };
    if gene_length > 0 {
        for (k, &count) in counts.iter().enumerate() {
            node.frame_gc[k] = 3.0 * f64::from(count) / gene_length as f64;
        }
    }
}

fn derive_bias(nodes: &[Node], model: &mut TrainingModel) {
    model.frame_bias = [0.0; 3];
    let mut total = 0.0;
    for node in nodes {
        if node.kind == NodeKind::Stop {
            continue;
        }
        let gene_length = node.orf_length() + 1;
        let contribution = node.frame_gc[node.best_frame] * gene_length as f64 / 1000.0;
        model.frame_bias[node.best_frame] += contribution;
        total += contribution;
    }
    if total > 0.0 {
        let norm = 3.0 / model.frame_bias.iter().sum::<f64>();
        for bias in &mut model.frame_bias {
            *bias *= norm;
        }
    }
}

/// Frame-agreement score used by the bootstrap DP pass.
#[inline]
#[must_use]
pub fn frame_bias_score(node: &Node, model: &TrainingModel) -> f64 {
    model.frame_bias[0] * node.frame_gc[0]
        + model.frame_bias[1] * node.frame_gc[1]
        + model.frame_bias[2] * node.frame_gc[2]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(pos: usize, strand: Strand, stop: isize) -> Node {
        Node::at(pos, strand, NodeKind::Atg, stop, false)
    }

    fn stop_node(pos: usize, strand: Strand, stop: isize) -> Node {
        Node::at(pos, strand, NodeKind::Stop, stop, false)
    }

    #[test]
    fn bias_normalizes_to_three() {
        let profile: Vec<i8> = (0..150).map(|i| (i % 3) as i8).collect();
        let mut nodes = vec![
            start(0, Strand::Forward, 120),
            stop_node(120, Strand::Forward, -6),
        ];
        let mut model = TrainingModel::for_training(0.5, 11);
        record_frame_bias(&profile, &mut nodes, &mut model);

        let sum: f64 = model.frame_bias.iter().sum();
        assert!(
            (sum - 3.0).abs() < 1e-9 || sum == 0.0,
            "bias sum = {sum}"
        );
        assert!(nodes[0].best_frame <= 2);
        assert!(nodes[0].frame_gc.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn reverse_nodes_counted() {
        let profile: Vec<i8> = vec![0; 150];
        let mut nodes = vec![
            stop_node(2, Strand::Reverse, 155),
            start(122, Strand::Reverse, 2),
        ];
        let mut model = TrainingModel::for_training(0.5, 11);
        record_frame_bias(&profile, &mut nodes, &mut model);
        assert!(nodes[1].frame_gc.iter().any(|&v| v > 0.0));
    }

    #[test]
    fn empty_inputs_are_noops() {
        let mut nodes = vec![];
        let mut model = TrainingModel::default();
        record_frame_bias(&[], &mut nodes, &mut model);
        assert_eq!(model.frame_bias, [1.0; 3]);
    }

    #[test]
    fn frame_score_weighs_bias() {
        let mut node = start(0, Strand::Forward, 120);
        node.frame_gc = [0.5, 0.3, 0.2];
        let mut model = TrainingModel::default();
        model.frame_bias = [2.0, 1.0, 0.5];
        let score = frame_bias_score(&node, &model);
        assert!((score - (1.0 + 0.3 + 0.1)).abs() < 1e-12);
    }
}
