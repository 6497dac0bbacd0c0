//! Coding-potential scoring: per-ORF GC and the hexamer log-odds score.
//!
//! Hexamer scores accumulate per frame between consecutive nodes, so one
//! sweep per strand prices every candidate ORF. Two further sweeps
//! normalize against the best start of each open frame and fold in the
//! length factor.

use bio::bio_types::strand::Strand;

use crate::constants::{
    CODING_SENTINEL, GENE_SIZE_SCALE, HEXAMER_LENGTH, LENGTH_FACTOR_GATE, LENGTH_FACTOR_SHARE,
    MAX_GENE_CODONS, MIN_GENE_CODONS,
};
use crate::model::TrainingModel;
use crate::node::{Node, NodeKind};
use crate::sequence::PackedDna;

/// Attach the GC fraction of each candidate ORF to its start node.
///
/// GC is strand-symmetric, so both strands read the forward buffer; counts
/// accumulate codon by codon between consecutive nodes of a frame.
pub fn orf_gc(forward: &PackedDna, nodes: &mut [Node]) {
    let len = forward.len();
    if nodes.is_empty() || len == 0 {
        return;
    }

    let codon_gc = |at: usize, back: bool| -> f64 {
        let span: [usize; 3] = if back {
            [at.saturating_sub(2), at.saturating_sub(1), at]
        } else {
            [at, at + 1, at + 2]
        };
        span.iter()
            .filter(|&&p| p < len && forward.is_gc(p))
            .count() as f64
    };

    // Forward strand, right to left.
    let mut gc = [0.0f64; 3];
    let mut last = [0usize; 3];
    for i in (0..nodes.len()).rev() {
        if nodes[i].strand != Strand::Forward {
            continue;
        }
        let frame = nodes[i].frame();
        if nodes[i].kind == NodeKind::Stop {
            last[frame] = nodes[i].pos;
            gc[frame] = codon_gc(nodes[i].pos, false);
        } else {
            if last[frame] >= 3 {
                let mut j = last[frame] - 3;
                while j >= nodes[i].pos {
                    gc[frame] += codon_gc(j, false);
                    if j < 3 {
                        break;
                    }
                    j -= 3;
                }
            }
            let span = (nodes[i].orf_length() + 3) as f64;
            nodes[i].gc = gc[frame] / span;
            last[frame] = nodes[i].pos;
        }
    }

    // Reverse strand, left to right (its stops sit left of its starts).
    gc = [0.0; 3];
    last = [0; 3];
    for node in nodes.iter_mut() {
        if node.strand != Strand::Reverse {
            continue;
        }
        let frame = node.frame();
        if node.kind == NodeKind::Stop {
            last[frame] = node.pos;
            gc[frame] = codon_gc(node.pos, true);
        } else {
            let mut j = last[frame] + 3;
            while j <= node.pos {
                gc[frame] += codon_gc(j, true);
                j += 3;
            }
            let span = (node.orf_length() + 3) as f64;
            node.gc = gc[frame] / span;
            last[frame] = node.pos;
        }
    }
}

/// Hexamer coding score for every start node, in three sweeps.
pub fn coding_scores(
    forward: &PackedDna,
    reverse: &PackedDna,
    nodes: &mut [Node],
    model: &TrainingModel,
) {
    accumulate(forward, reverse, nodes, model);
    normalize(nodes, Strand::Forward);
    normalize(nodes, Strand::Reverse);
    let no_stop = model.no_stop_probability();
    length_factor(nodes, Strand::Forward, no_stop);
    length_factor(nodes, Strand::Reverse, no_stop);
}

fn accumulate(forward: &PackedDna, reverse: &PackedDna, nodes: &mut [Node], model: &TrainingModel) {
    let len = forward.len();

    let mut score = [0.0f64; 3];
    let mut last = [0usize; 3];
    for i in (0..nodes.len()).rev() {
        if nodes[i].strand != Strand::Forward {
            continue;
        }
        let frame = nodes[i].frame();
        if nodes[i].kind == NodeKind::Stop {
            last[frame] = nodes[i].pos;
            score[frame] = 0.0;
        } else {
            if last[frame] >= 3 {
                let mut j = last[frame] - 3;
                while j >= nodes[i].pos {
                    if j + HEXAMER_LENGTH <= len {
                        score[frame] += model.hexamers[forward.kmer(j, HEXAMER_LENGTH)];
                    }
                    if j < 3 {
                        break;
                    }
                    j -= 3;
                }
            }
            nodes[i].coding = score[frame];
            last[frame] = nodes[i].pos;
        }
    }

    score = [0.0; 3];
    last = [0; 3];
    for node in nodes.iter_mut() {
        if node.strand != Strand::Reverse {
            continue;
        }
        let frame = node.frame();
        if node.kind == NodeKind::Stop {
            last[frame] = node.pos;
            score[frame] = 0.0;
        } else {
            let mut j = last[frame] + 3;
            while j <= node.pos {
                // Codon at forward coordinate j reads the reverse buffer
                // from len - 1 - j.
                let rc = len - 1 - j;
                if rc + HEXAMER_LENGTH <= len {
                    score[frame] += model.hexamers[reverse.kmer(rc, HEXAMER_LENGTH)];
                }
                j += 3;
            }
            node.coding = score[frame];
            last[frame] = node.pos;
        }
    }
}

/// Pull every start's score toward the best start sharing its open frame:
/// weaker alternatives lose exactly their deficit.
fn normalize(nodes: &mut [Node], strand: Strand) {
    let mut best = [CODING_SENTINEL; 3];
    let order: Box<dyn Iterator<Item = usize>> = match strand {
        Strand::Forward => Box::new(0..nodes.len()),
        _ => Box::new((0..nodes.len()).rev()),
    };
    for i in order {
        if nodes[i].strand != strand {
            continue;
        }
        let frame = nodes[i].frame();
        if nodes[i].kind == NodeKind::Stop {
            best[frame] = CODING_SENTINEL;
        } else if nodes[i].coding > best[frame] {
            best[frame] = nodes[i].coding;
        } else {
            nodes[i].coding -= best[frame] - nodes[i].coding;
        }
    }
}

fn size_in_codons(node: &Node) -> f64 {
    (node.orf_length() + 3) as f64 / 3.0
}

fn raw_length_factor(codons: f64, no_stop: f64) -> f64 {
    let odds = |p: f64| ((1.0 - p) / p).ln();
    let base = odds(no_stop.powi(MIN_GENE_CODONS));
    if codons > f64::from(MAX_GENE_CODONS) {
        let capped = odds(no_stop.powi(MAX_GENE_CODONS)) - base;
        capped * (codons - f64::from(MIN_GENE_CODONS)) / GENE_SIZE_SCALE
    } else {
        odds(no_stop.powf(codons)) - base
    }
}

fn length_factor(nodes: &mut [Node], strand: Strand, no_stop: f64) {
    let mut best = [CODING_SENTINEL; 3];
    let order: Box<dyn Iterator<Item = usize>> = match strand {
        Strand::Forward => Box::new(0..nodes.len()),
        _ => Box::new((0..nodes.len()).rev()),
    };
    for i in order {
        if nodes[i].strand != strand {
            continue;
        }
        let frame = nodes[i].frame();
        if nodes[i].kind == NodeKind::Stop {
            best[frame] = CODING_SENTINEL;
            continue;
        }

        let mut factor = raw_length_factor(size_in_codons(&nodes[i]), no_stop);
        if factor > best[frame] {
            best[frame] = factor;
        } else {
            // Downstream starts of the same ORF get a reduced share.
            let give_back = (best[frame] - factor).min(factor).max(0.0);
            factor -= give_back;
        }

        if factor > LENGTH_FACTOR_GATE && nodes[i].coding < LENGTH_FACTOR_SHARE * factor {
            nodes[i].coding = LENGTH_FACTOR_SHARE * factor;
        }
        nodes[i].coding += factor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Strictness;
    use crate::node::NodeKind;
    use crate::sequence::EncodedSequence;

    fn encode(raw: &[u8]) -> EncodedSequence {
        EncodedSequence::encode(raw, Strictness::Permissive).unwrap()
    }

    fn start(pos: usize, strand: Strand, stop: isize) -> Node {
        Node::at(pos, strand, NodeKind::Atg, stop, false)
    }

    fn stop(pos: usize, strand: Strand, stop: isize) -> Node {
        Node::at(pos, strand, NodeKind::Stop, stop, false)
    }

    #[test]
    fn orf_gc_forward() {
        // ORF of pure GC codons: fraction close to 1.
        let raw = [b"ATG".as_ref(), &b"GGC".repeat(40), b"TAA"].concat();
        let seq = encode(&raw);
        let mut nodes = vec![
            start(0, Strand::Forward, 123),
            stop(123, Strand::Forward, -6),
        ];
        orf_gc(seq.forward(), &mut nodes);
        assert!(nodes[0].gc > 0.8, "gc = {}", nodes[0].gc);
    }

    #[test]
    fn orf_gc_reverse() {
        let raw = [b"TTA".as_ref(), &b"GCC".repeat(40), b"CAT"].concat();
        let seq = encode(&raw);
        let len = seq.len();
        // Reverse gene: stop at forward pos 2, start at forward pos len-1.
        let mut nodes = vec![
            stop(2, Strand::Reverse, (len + 5) as isize),
            start(len - 1, Strand::Reverse, 2),
        ];
        orf_gc(seq.forward(), &mut nodes);
        assert!(nodes[1].gc > 0.8, "gc = {}", nodes[1].gc);
    }

    #[test]
    fn coding_rewards_trained_hexamers() {
        let raw = [b"ATG".as_ref(), &b"GCA".repeat(40), b"TAA"].concat();
        let seq = encode(&raw);
        let mut model = TrainingModel::default();
        // Weight the GCAGCA hexamer strongly.
        let idx = seq.forward().kmer(3, 6);
        model.hexamers[idx] = 2.0;

        let mut nodes = vec![
            start(0, Strand::Forward, 123),
            stop(123, Strand::Forward, -6),
        ];
        coding_scores(seq.forward(), seq.reverse(), &mut nodes, &model);
        assert!(
            nodes[0].coding > 10.0,
            "expected a strongly positive coding score, got {}",
            nodes[0].coding
        );
    }

    #[test]
    fn longer_orfs_outscore_shorter_ones() {
        let raw = [b"ATG".as_ref(), &b"GCA".repeat(120), b"TAA"].concat();
        let seq = encode(&raw);
        let stop_at = (raw.len() - 3) as isize;
        // Two starts into the same stop, one much later.
        let mut nodes = vec![
            start(0, Strand::Forward, stop_at),
            start(180, Strand::Forward, stop_at),
            stop(stop_at as usize, Strand::Forward, -6),
        ];
        let model = TrainingModel::default();
        coding_scores(seq.forward(), seq.reverse(), &mut nodes, &model);
        assert!(nodes[0].coding > nodes[1].coding);
    }

    #[test]
    fn raw_length_factor_monotone() {
        let no_stop = 0.95;
        let short = raw_length_factor(40.0, no_stop);
        let medium = raw_length_factor(200.0, no_stop);
        assert!(medium > short);
        assert!(raw_length_factor(1500.0, no_stop).is_finite());
    }
}
