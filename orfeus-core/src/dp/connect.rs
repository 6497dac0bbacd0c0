//! Typed node-pair transitions and their scores.
//!
//! Every ordered pair of nearby nodes is one of a small set of legal
//! transitions (a gene, an intergenic gap, an operon continuation, a
//! bounded overlap) or invalid. The DP pass asks this module for the score
//! of each candidate transition.

use bio::bio_types::strand::Strand;

use crate::constants::{
    MAX_OPPOSITE_STRAND_OVERLAP, MAX_SAME_STRAND_OVERLAP, NO_MOTIF_FLOOR, OPERON_DISTANCE,
    OVERLAP_PENALTY,
};
use crate::model::TrainingModel;
use crate::node::frame_bias::frame_bias_score;
use crate::node::{Node, NodeKind};

/// Legal transition types between two nodes in array order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connection {
    /// forward start -> forward stop: the gene itself.
    ForwardGene,
    /// reverse stop -> reverse start: a reverse gene.
    ReverseGene,
    /// forward stop -> forward start: an intergenic gap.
    ForwardIntergenic,
    /// reverse start -> reverse stop: gap on the reverse strand.
    ReverseIntergenic,
    /// forward stop -> reverse stop: three genes may interlock here.
    TripleOverlap,
    /// forward stop -> forward stop: operon continuation.
    ForwardOperon,
    /// reverse stop -> reverse stop: reverse operon continuation.
    ReverseOperon,
    /// forward stop -> reverse start overlapping it.
    OppositeOverlap,
    /// reverse start -> forward start, genes back to back.
    BackToBack,
    Invalid,
}

/// Classify the transition from `a` to `b` (`a` precedes `b`).
#[must_use]
pub fn classify(a: &Node, b: &Node) -> Connection {
    let a_stop = a.kind == NodeKind::Stop;
    let b_stop = b.kind == NodeKind::Stop;

    // Same-strand gene transitions must stay in frame.
    if a.strand == b.strand && a.frame() != b.frame() {
        if a.strand == Strand::Forward && !a_stop && b_stop {
            return Connection::Invalid;
        }
        if a.strand == Strand::Reverse && a_stop && !b_stop {
            return Connection::Invalid;
        }
    }

    match (a.strand, a_stop, b.strand, b_stop) {
        (Strand::Forward, false, Strand::Forward, true) => Connection::ForwardGene,
        (Strand::Reverse, true, Strand::Reverse, false) => Connection::ReverseGene,
        (Strand::Forward, true, Strand::Forward, false) => Connection::ForwardIntergenic,
        (Strand::Reverse, false, Strand::Reverse, true) => Connection::ReverseIntergenic,
        (Strand::Forward, true, Strand::Reverse, true) => Connection::TripleOverlap,
        (Strand::Forward, true, Strand::Forward, true) => Connection::ForwardOperon,
        (Strand::Reverse, true, Strand::Reverse, true) => Connection::ReverseOperon,
        (Strand::Forward, true, Strand::Reverse, false) => Connection::OppositeOverlap,
        (Strand::Reverse, false, Strand::Forward, false) => Connection::BackToBack,
        _ => Connection::Invalid,
    }
}

/// A node that cannot begin a chain yet: a forward stop or reverse start
/// with no incoming path is an ORF fragment hanging off the left edge.
#[must_use]
pub fn dangling(node: &Node) -> bool {
    node.traceback.is_none()
        && ((node.strand == Strand::Forward && node.kind == NodeKind::Stop)
            || (node.strand == Strand::Reverse && node.kind != NodeKind::Stop))
}

/// Distance-dependent score shift between two adjacent genes: an operon
/// bonus for tight same-strand spacing, a penalty for long gaps or strand
/// changes.
#[must_use]
pub fn intergenic_shift(n1: &Node, n2: &Node, model: &TrainingModel) -> f64 {
    let dist = n1.pos.abs_diff(n2.pos) as f64;
    let mut shift = 0.0;

    let overlap = same_strand_overlap(n1, n2);
    if operon_adjacent(n1, n2) {
        shift += adjacency_refund(n1, n2);
    }

    if dist > 3.0 * OPERON_DISTANCE || n1.strand != n2.strand {
        shift -= OVERLAP_PENALTY * model.start_weight;
    } else if (dist <= OPERON_DISTANCE && !overlap) || dist < OPERON_DISTANCE / 4.0 {
        shift += (2.0 - dist / OPERON_DISTANCE) * OVERLAP_PENALTY * model.start_weight;
    }

    shift
}

fn operon_adjacent(n1: &Node, n2: &Node) -> bool {
    n1.strand == n2.strand && (n1.pos + 2 == n2.pos || n1.pos == n2.pos + 1)
}

fn same_strand_overlap(n1: &Node, n2: &Node) -> bool {
    (n1.strand == Strand::Forward
        && n2.strand == Strand::Forward
        && n1.pos + 2 >= n2.pos)
        || (n1.strand == Strand::Reverse
            && n2.strand == Strand::Reverse
            && n1.pos >= n2.pos + 2)
}

/// Genes fused into an operon stop paying their negative start signals.
fn adjacency_refund(n1: &Node, n2: &Node) -> f64 {
    let downstream = if n1.strand == Strand::Forward { n2 } else { n1 };
    let mut refund = 0.0;
    if downstream.rbs_score < 0.0 {
        refund -= downstream.rbs_score;
    }
    if downstream.upstream_score < 0.0 {
        refund -= downstream.upstream_score;
    }
    refund
}

/// For each stop node, remember the best start per frame among the starts
/// whose ORF overlaps the stop. These "star pointers" let operon and
/// triple-overlap transitions reach through the stop.
pub fn record_star_pointers(nodes: &mut [Node], model: &TrainingModel, scored: bool) {
    let n = nodes.len();
    for i in 0..n {
        nodes[i].star_ptr = [None; 3];
        if nodes[i].kind != NodeKind::Stop || nodes[i].edge {
            continue;
        }

        let stop_pos = nodes[i].pos;
        let mut best = NO_MOTIF_FLOOR;

        if nodes[i].strand == Strand::Forward {
            for j in (0..=(i + 3).min(n - 1)).rev() {
                if nodes[j].pos > stop_pos + 2 {
                    continue;
                }
                if nodes[j].pos + MAX_SAME_STRAND_OVERLAP < stop_pos {
                    break;
                }
                if nodes[j].strand != Strand::Forward || !nodes[j].kind.is_start() {
                    continue;
                }
                if nodes[j].stop_pos <= stop_pos as isize {
                    continue;
                }
                let frame = nodes[j].frame();
                if !scored {
                    if nodes[i].star_ptr[frame].is_none() {
                        nodes[i].star_ptr[frame] = Some(j);
                    }
                } else {
                    let score =
                        nodes[j].gene_score() + intergenic_shift(&nodes[i], &nodes[j], model);
                    if score > best {
                        nodes[i].star_ptr[frame] = Some(j);
                        best = score;
                    }
                }
            }
        } else {
            for j in i.saturating_sub(3)..n {
                if nodes[j].pos < stop_pos.saturating_sub(2) {
                    continue;
                }
                if nodes[j].pos > stop_pos + MAX_SAME_STRAND_OVERLAP {
                    break;
                }
                if nodes[j].strand != Strand::Reverse || !nodes[j].kind.is_start() {
                    continue;
                }
                if nodes[j].stop_pos >= stop_pos as isize {
                    continue;
                }
                let frame = nodes[j].frame();
                if !scored {
                    if nodes[i].star_ptr[frame].is_none() {
                        nodes[i].star_ptr[frame] = Some(j);
                    }
                } else {
                    let score =
                        nodes[j].gene_score() + intergenic_shift(&nodes[j], &nodes[i], model);
                    if score > best {
                        nodes[i].star_ptr[frame] = Some(j);
                        best = score;
                    }
                }
            }
        }
    }
}

struct Transition {
    left: isize,
    right: isize,
    overlap: i32,
    frame: Option<usize>,
    score: f64,
    modifier: f64,
}

impl Transition {
    fn span(left: isize, right: isize) -> Self {
        Self {
            left,
            right,
            overlap: 0,
            frame: None,
            score: 0.0,
            modifier: 0.0,
        }
    }
}

/// Score the transition `source -> target`; update the target's DP state
/// when the new chain is at least as good as its current best.
///
/// `final_pass` selects full scoring; the bootstrap pass weighs pure
/// GC-frame agreement instead.
pub fn score_connection(
    nodes: &mut [Node],
    source: usize,
    target: usize,
    model: &TrainingModel,
    final_pass: bool,
) {
    if dangling(&nodes[source]) {
        return;
    }
    let kind = classify(&nodes[source], &nodes[target]);
    if kind == Connection::Invalid {
        return;
    }

    let Some(mut tr) = transition(nodes, source, target, kind, model, final_pass) else {
        return;
    };

    if !final_pass {
        tr.score = (tr.right - tr.left + 1 - tr.overlap as isize * 2) as f64 * tr.modifier;
    }

    if nodes[source].path_score + tr.score >= nodes[target].path_score {
        nodes[target].path_score = nodes[source].path_score + tr.score;
        nodes[target].traceback = Some(source);
        nodes[target].overlap_frame = tr.frame;
    }
}

fn transition(
    nodes: &[Node],
    source: usize,
    target: usize,
    kind: Connection,
    model: &TrainingModel,
    final_pass: bool,
) -> Option<Transition> {
    let s = &nodes[source];
    let t = &nodes[target];
    let s_pos = s.pos as isize;
    let t_pos = t.pos as isize;

    match kind {
        Connection::ForwardGene => {
            // The start must lie inside the target stop's ORF.
            if t.stop_pos >= s_pos {
                return None;
            }
            let mut tr = Transition::span(s_pos, t_pos + 2);
            if final_pass {
                tr.score = s.gene_score();
            } else {
                tr.modifier = frame_bias_score(s, model);
            }
            Some(tr)
        }
        Connection::ReverseGene => {
            if s.stop_pos <= t_pos {
                return None;
            }
            let mut tr = Transition::span(s_pos - 2, t_pos);
            if final_pass {
                tr.score = t.gene_score();
            } else {
                tr.modifier = frame_bias_score(t, model);
            }
            Some(tr)
        }
        Connection::ForwardIntergenic => {
            let tr_span = (s_pos + 2, t_pos);
            if tr_span.0 >= tr_span.1 {
                return None;
            }
            let mut tr = Transition::span(tr_span.0, tr_span.1);
            if final_pass {
                tr.score = intergenic_shift(s, t, model);
            }
            Some(tr)
        }
        Connection::ReverseIntergenic => {
            if s_pos >= t_pos - 2 {
                return None;
            }
            let mut tr = Transition::span(s_pos, t_pos - 2);
            if final_pass {
                tr.score = intergenic_shift(s, t, model);
            }
            Some(tr)
        }
        Connection::BackToBack => {
            if s_pos >= t_pos {
                return None;
            }
            let mut tr = Transition::span(s_pos, t_pos);
            if final_pass {
                tr.score = intergenic_shift(s, t, model);
            }
            Some(tr)
        }
        Connection::ForwardOperon => {
            if t.stop_pos >= s_pos {
                return None;
            }
            let p3 = s.star_ptr[t.frame()]?;
            let mut tr = Transition::span(nodes[p3].pos as isize, t_pos + 2);
            if final_pass {
                tr.score =
                    nodes[p3].gene_score() + intergenic_shift(s, &nodes[p3], model);
            } else {
                tr.modifier = frame_bias_score(&nodes[p3], model);
            }
            Some(tr)
        }
        Connection::ReverseOperon => {
            if s.stop_pos <= t_pos {
                return None;
            }
            let p3 = t.star_ptr[s.frame()]?;
            let mut tr = Transition::span(s_pos - 2, nodes[p3].pos as isize);
            if final_pass {
                tr.score =
                    nodes[p3].gene_score() + intergenic_shift(&nodes[p3], t, model);
            } else {
                tr.modifier = frame_bias_score(&nodes[p3], model);
            }
            Some(tr)
        }
        Connection::OppositeOverlap => {
            if t.stop_pos - 2 >= s_pos + 2 {
                return None;
            }
            let overlap = ((s_pos + 2) - (t.stop_pos - 2) + 1) as i32;
            if overlap >= MAX_OPPOSITE_STRAND_OVERLAP {
                return None;
            }
            if (s_pos - t.stop_pos + 1) >= (t_pos - s_pos + 4) {
                return None;
            }
            let bound = s
                .traceback
                .map(|idx| nodes[idx].pos as isize)
                .unwrap_or(0);
            if (s_pos - t.stop_pos + 1) >= (t.stop_pos - 3 - bound + 1) {
                return None;
            }
            let mut tr = Transition::span(t.stop_pos - 2, t_pos);
            tr.overlap = overlap;
            if final_pass {
                tr.score = OVERLAP_PENALTY
                    .mul_add(-model.start_weight, t.gene_score());
            } else {
                tr.modifier = frame_bias_score(t, model);
            }
            Some(tr)
        }
        Connection::TripleOverlap => {
            let left = s_pos + 2;
            let right = t_pos - 2;
            if left >= right {
                return None;
            }
            let mut tr = Transition::span(left, right);

            let mut best_val = 0.0;
            for frame in 0..3 {
                let Some(p3) = t.star_ptr[frame] else {
                    continue;
                };
                let overlap = (left - nodes[p3].stop_pos + 3) as i32;
                if overlap <= 0 || overlap >= MAX_OPPOSITE_STRAND_OVERLAP {
                    continue;
                }
                if overlap as isize >= nodes[p3].pos as isize - left {
                    continue;
                }
                let Some(back) = s.traceback else {
                    continue;
                };
                if overlap as isize >= nodes[p3].stop_pos - nodes[back].pos as isize - 2 {
                    continue;
                }
                let value = if final_pass {
                    nodes[p3].gene_score() + intergenic_shift(&nodes[p3], t, model)
                } else {
                    frame_bias_score(&nodes[p3], model)
                };
                if value > best_val {
                    tr.frame = Some(frame);
                    tr.overlap = overlap;
                    best_val = value;
                }
            }

            if let Some(frame) = tr.frame {
                if let Some(p3) = t.star_ptr[frame] {
                    if final_pass {
                        tr.score = nodes[p3].gene_score()
                            + intergenic_shift(&nodes[p3], t, model);
                    } else {
                        tr.modifier = frame_bias_score(&nodes[p3], model);
                    }
                }
            } else if final_pass {
                tr.score = intergenic_shift(s, t, model);
            }
            Some(tr)
        }
        Connection::Invalid => None,
    }
}
