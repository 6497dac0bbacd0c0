//! Gene extraction from the DP path, and the bounded start-refinement
//! pass that may move a gene's start to a better alternative sharing the
//! same stop codon.

use bio::bio_types::strand::Strand;

use crate::constants::{MAX_SAME_STRAND_OVERLAP, MAX_SPACER, MAX_GENES, REFINE_WINDOW};
use crate::dp::connect::intergenic_shift;
use crate::model::TrainingModel;
use crate::node::{forward_indices, traceback_indices, Node, NodeKind};

/// A gene located on the DP path, still expressed in node indices.
#[derive(Debug, Clone)]
pub struct GeneDraft {
    /// 1-based inclusive coordinates.
    pub begin: usize,
    pub end: usize,
    pub strand: Strand,
    pub start_node: usize,
    pub stop_node: usize,
}

/// Walk the forward-threaded path and pair starts with stops into drafts.
#[must_use]
pub fn extract_genes(nodes: &[Node], terminal: usize) -> Vec<GeneDraft> {
    let path_start = traceback_indices(nodes, terminal)
        .last()
        .unwrap_or(terminal);

    let mut drafts: Vec<GeneDraft> = Vec::new();
    let mut open: Option<GeneDraft> = None;

    for at in forward_indices(nodes, path_start) {
        if nodes[at].eliminated {
            continue;
        }
        let node = &nodes[at];
        match (node.strand, node.kind == NodeKind::Stop) {
            (Strand::Forward, false) => {
                open = Some(GeneDraft {
                    begin: node.pos + 1,
                    end: 0,
                    strand: Strand::Forward,
                    start_node: at,
                    stop_node: at,
                });
            }
            (Strand::Forward, true) => {
                if let Some(mut draft) = open.take() {
                    draft.end = node.pos + 3;
                    draft.stop_node = at;
                    drafts.push(draft);
                }
            }
            (Strand::Reverse, true) => {
                open = Some(GeneDraft {
                    begin: node.pos.saturating_sub(1).max(1),
                    end: 0,
                    strand: Strand::Reverse,
                    start_node: at,
                    stop_node: at,
                });
            }
            (Strand::Reverse, false) => {
                if let Some(mut draft) = open.take() {
                    draft.end = node.pos + 1;
                    draft.start_node = at;
                    drafts.push(draft);
                }
            }
            _ => {}
        }
        if drafts.len() >= MAX_GENES {
            eprintln!("warning: gene limit reached, truncating predictions");
            break;
        }
    }
    drafts
}

/// Try to move each gene's start to a better alternative with the same
/// stop. Alternatives are drawn from a bounded node window and must win
/// both on their own signals and after intergenic context.
pub fn refine_starts(nodes: &[Node], drafts: &mut [GeneDraft], model: &TrainingModel) {
    for i in 0..drafts.len() {
        let (prev, rest) = drafts.split_at_mut(i);
        let (current, next) = rest.split_first_mut().expect("index in range");
        refine_one(
            nodes,
            current,
            prev.last(),
            next.first(),
            model,
        );
    }
}

fn refine_one(
    nodes: &[Node],
    draft: &mut GeneDraft,
    prev: Option<&GeneDraft>,
    next: Option<&GeneDraft>,
    model: &TrainingModel,
) {
    let current_idx = draft.start_node;
    let current = &nodes[current_idx];
    let current_score = current.gene_score();
    let current_shift = context_shift(nodes, current_idx, prev, next, model).unwrap_or(0.0);

    let lo = current_idx.saturating_sub(REFINE_WINDOW);
    let hi = (current_idx + REFINE_WINDOW).min(nodes.len());

    let mut best: Option<(usize, f64, f64)> = None;
    for j in lo..hi {
        if j == current_idx {
            continue;
        }
        let node = &nodes[j];
        if node.kind == NodeKind::Stop || node.stop_pos != current.stop_pos {
            continue;
        }
        let Some(shift) = context_shift(nodes, j, prev, next, model) else {
            continue;
        };

        let mut score = node.gene_score();
        let dist = node.pos.abs_diff(current.pos);

        if node.edge && !current.edge {
            // An edge alternative keeps its raw score; the current start may
            // simply be a spurious interior call of a truncated gene.
        } else if node.type_score < current.type_score
            && score - node.type_score
                >= current_score - current.type_score + model.start_weight
            && node.rbs_score > current.rbs_score
            && node.upstream_score > current.upstream_score
            && node.coding > current.coding
            && dist > MAX_SPACER
        {
            score += current.type_score - node.type_score;
        } else if dist <= MAX_SPACER
            && node.rbs_score + node.type_score > current.rbs_score + current.type_score
            && !current.edge
            && !node.edge
        {
            if current.coding > node.coding {
                score += current.coding - node.coding;
            }
            if current.upstream_score > node.upstream_score {
                score += current.upstream_score - node.upstream_score;
            }
            if current_shift > shift {
                score += current_shift - shift;
            }
        } else if !node.edge || current.edge {
            continue;
        }

        match best {
            Some((_, b_score, b_shift)) if score + shift <= b_score + b_shift => {}
            _ => best = Some((j, score, shift)),
        }
    }

    if let Some((j, score, shift)) = best {
        if score + shift > current_score + current_shift {
            apply_alternative(nodes, draft, j);
        }
    }
}

/// Intergenic context of a candidate start against its draft neighbours;
/// `None` when the candidate geometrically conflicts with one of them.
fn context_shift(
    nodes: &[Node],
    candidate: usize,
    prev: Option<&GeneDraft>,
    next: Option<&GeneDraft>,
    model: &TrainingModel,
) -> Option<f64> {
    let node = &nodes[candidate];
    let mut shift = 0.0;

    if let Some(prev) = prev {
        let prev_start = &nodes[prev.start_node];
        if node.strand == Strand::Forward && prev_start.strand == Strand::Forward {
            let prev_stop = &nodes[prev.stop_node];
            if prev_stop.pos > node.pos + MAX_SAME_STRAND_OVERLAP {
                return None;
            }
            shift = intergenic_shift(prev_stop, node, model);
        } else if node.strand == Strand::Forward && prev_start.strand == Strand::Reverse {
            if prev_start.pos >= node.pos {
                return None;
            }
            shift = intergenic_shift(prev_start, node, model);
        }
    }

    if let Some(next) = next {
        let next_start = &nodes[next.start_node];
        if node.strand == Strand::Reverse && next_start.strand == Strand::Forward {
            if node.pos >= next_start.pos {
                return None;
            }
            shift = intergenic_shift(node, next_start, model);
        } else if node.strand == Strand::Reverse && next_start.strand == Strand::Reverse {
            let next_stop = &nodes[next.stop_node];
            if node.pos > next_stop.pos + MAX_SAME_STRAND_OVERLAP {
                return None;
            }
            shift = intergenic_shift(node, next_stop, model);
        }
    }

    Some(shift)
}

fn apply_alternative(nodes: &[Node], draft: &mut GeneDraft, new_start: usize) {
    if draft.start_node == new_start {
        return;
    }
    draft.start_node = new_start;
    let node = &nodes[new_start];
    if node.strand == Strand::Forward {
        draft.begin = node.pos + 1;
    } else {
        draft.end = node.pos + 1;
    }
}
