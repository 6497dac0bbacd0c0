//! Dynamic-programming path selection.
//!
//! Nodes, ordered by position, form a DAG whose edges are the legal
//! transitions of [`connect`]. One left-to-right pass computes the best
//! cumulative score ending at every node; the traceback from the best
//! terminal yields the gene chain, which is then repaired for overlap
//! artifacts and purged of negative-score genes.

pub mod connect;
pub mod refine;

use bio::bio_types::strand::Strand;

use crate::constants::NODE_WINDOW;
use crate::model::TrainingModel;
use crate::node::{forward_indices, traceback_indices, Node, NodeKind};

pub use connect::{intergenic_shift, record_star_pointers, score_connection};
pub use refine::refine_starts;

/// Run the DP and return the index of the best terminal node, or `None`
/// when no valid chain exists.
///
/// `final_pass = false` is the training bootstrap (GC-frame agreement
/// only); `final_pass = true` uses the fully scored nodes.
pub fn predict_path(
    nodes: &mut [Node],
    model: &TrainingModel,
    final_pass: bool,
) -> Option<usize> {
    if nodes.is_empty() {
        return None;
    }

    for node in nodes.iter_mut() {
        node.path_score = 0.0;
        node.traceback = None;
        node.trace_forward = None;
    }

    for i in 0..nodes.len() {
        let lo = window_start(nodes, i);
        for j in lo..i {
            score_connection(nodes, j, i, model, final_pass);
        }
    }

    let best = best_terminal(nodes)?;
    resolve_triple_overlaps(nodes, best);
    resolve_simple_overlaps(nodes, best);
    thread_forward(nodes, best);
    Some(best)
}

/// First candidate source index for node `i`: the DP window, stretched
/// leftwards when the node's own stop lies beyond it.
fn window_start(nodes: &[Node], i: usize) -> usize {
    let mut lo = i.saturating_sub(NODE_WINDOW);
    let node = &nodes[i];

    let needs_own_stop = (node.strand == Strand::Reverse && node.kind.is_start())
        || (node.strand == Strand::Forward && node.kind == NodeKind::Stop);
    if needs_own_stop && nodes[lo].pos as isize >= node.stop_pos {
        while lo > 0 && nodes[lo].pos as isize != node.stop_pos {
            lo -= 1;
        }
    }
    lo.saturating_sub(NODE_WINDOW)
}

/// A chain can only end on a forward stop or a reverse start.
fn is_terminal(node: &Node) -> bool {
    match node.strand {
        Strand::Forward => node.kind == NodeKind::Stop,
        Strand::Reverse => node.kind.is_start(),
        Strand::Unknown => false,
    }
}

fn best_terminal(nodes: &[Node]) -> Option<usize> {
    nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| is_terminal(n))
        .max_by(|(_, a), (_, b)| a.path_score.total_cmp(&b.path_score))
        .map(|(i, _)| i)
}

fn thread_forward(nodes: &mut [Node], terminal: usize) {
    let mut at = terminal;
    while let Some(prev) = nodes[at].traceback {
        nodes[prev].trace_forward = Some(at);
        at = prev;
    }
}

/// Rewire tracebacks where a reverse stop rode through a triple overlap:
/// the hidden middle gene recorded in `overlap_frame` is spliced back in.
fn resolve_triple_overlaps(nodes: &mut [Node], terminal: usize) {
    let chain: Vec<usize> = traceback_indices(nodes, terminal).collect();
    for pair in chain.windows(2) {
        let (current, next) = (pair[0], pair[1]);
        let needs_fix = nodes[current].strand == Strand::Reverse
            && nodes[current].kind == NodeKind::Stop
            && nodes[next].strand == Strand::Forward
            && nodes[next].kind == NodeKind::Stop
            && nodes[current].overlap_frame.is_some()
            && nodes[current].pos > nodes[next].pos;
        if !needs_fix {
            continue;
        }

        let frame = nodes[current].overlap_frame.unwrap();
        let Some(middle) = nodes[current].star_ptr[frame] else {
            continue;
        };
        // Find the stop terminating the hidden gene.
        let mut stop = middle;
        while stop > 0 && nodes[stop].pos as isize != nodes[middle].stop_pos {
            stop -= 1;
        }
        nodes[current].traceback = Some(middle);
        nodes[middle].traceback = Some(stop);
        nodes[stop].overlap_frame = None;
        nodes[stop].traceback = Some(next);
    }
}

/// Repair the remaining two-gene overlap shapes left in the traceback.
fn resolve_simple_overlaps(nodes: &mut [Node], terminal: usize) {
    let chain: Vec<usize> = traceback_indices(nodes, terminal).collect();
    for pair in chain.windows(2) {
        let (current, next) = (pair[0], pair[1]);
        let cur_stop = nodes[current].kind == NodeKind::Stop;
        let next_stop = nodes[next].kind == NodeKind::Stop;

        match (nodes[current].strand, cur_stop, nodes[next].strand, next_stop) {
            // A reverse start connected straight to a forward stop skipped
            // its own stop node; reinsert it.
            (Strand::Reverse, false, Strand::Forward, true) => {
                if let Some(stop) = (0..=current)
                    .rev()
                    .find(|&k| nodes[k].pos as isize == nodes[current].stop_pos)
                {
                    nodes[current].traceback = Some(stop);
                    nodes[stop].traceback = Some(next);
                }
            }
            // Operon transitions recorded stop->stop; splice the star
            // start of the connecting frame back in.
            (Strand::Forward, true, Strand::Forward, true) => {
                let frame = nodes[current].frame();
                nodes[current].traceback = nodes[next].star_ptr[frame];
                if let Some(start) = nodes[current].traceback {
                    nodes[start].traceback = Some(next);
                }
            }
            (Strand::Reverse, true, Strand::Reverse, true) => {
                let frame = nodes[next].frame();
                nodes[current].traceback = nodes[current].star_ptr[frame];
                if let Some(start) = nodes[current].traceback {
                    nodes[start].traceback = Some(next);
                }
            }
            _ => {}
        }
    }
}

/// Apply intergenic shifts along the final path, then mark genes whose
/// combined score went negative for removal.
pub fn eliminate_bad_genes(nodes: &mut [Node], terminal: Option<usize>, model: &TrainingModel) {
    let Some(terminal) = terminal else {
        return;
    };
    let path_start = traceback_indices(nodes, terminal).last().unwrap_or(terminal);

    let chain: Vec<usize> = forward_indices(nodes, path_start).collect();
    for pair in chain.windows(2) {
        let (at, next) = (pair[0], pair[1]);
        if next >= nodes.len() {
            break;
        }
        let at_stop = nodes[at].kind == NodeKind::Stop;
        match (nodes[at].strand, at_stop) {
            (Strand::Forward, true) => {
                let shift = intergenic_shift(&nodes[at], &nodes[next], model);
                nodes[next].start_score += shift;
            }
            (Strand::Reverse, false) => {
                let shift = intergenic_shift(&nodes[at], &nodes[next], model);
                nodes[at].start_score += shift;
            }
            _ => {}
        }
    }

    for pair in chain.windows(2) {
        let (at, next) = (pair[0], pair[1]);
        if next >= nodes.len() {
            break;
        }
        let at_stop = nodes[at].kind == NodeKind::Stop;
        match (nodes[at].strand, at_stop) {
            (Strand::Forward, false) if nodes[at].gene_score() < 0.0 => {
                nodes[at].eliminated = true;
                nodes[next].eliminated = true;
            }
            (Strand::Reverse, true) if nodes[next].gene_score() < 0.0 => {
                nodes[at].eliminated = true;
                nodes[next].eliminated = true;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::sort_nodes;

    fn start(pos: usize, strand: Strand, stop: isize) -> Node {
        Node::at(pos, strand, NodeKind::Atg, stop, false)
    }

    fn stop(pos: usize, strand: Strand, stop_pos: isize) -> Node {
        Node::at(pos, strand, NodeKind::Stop, stop_pos, false)
    }

    #[test]
    fn empty_nodes_no_path() {
        let mut nodes = vec![];
        assert!(predict_path(&mut nodes, &TrainingModel::default(), true).is_none());
    }

    #[test]
    fn lone_start_is_not_terminal() {
        let mut nodes = vec![start(100, Strand::Forward, 400)];
        assert!(predict_path(&mut nodes, &TrainingModel::default(), true).is_none());
    }

    #[test]
    fn single_forward_gene_selected() {
        let mut nodes = vec![
            start(99, Strand::Forward, 399),
            stop(399, Strand::Forward, -6),
        ];
        nodes[0].coding = 12.0;
        nodes[0].start_score = 3.0;
        sort_nodes(&mut nodes);

        let terminal = predict_path(&mut nodes, &TrainingModel::default(), true);
        assert_eq!(terminal, Some(1));
        assert_eq!(nodes[1].traceback, Some(0));
        assert!((nodes[1].path_score - 15.0).abs() < 1e-9);
        assert_eq!(nodes[0].trace_forward, Some(1));
    }

    #[test]
    fn reverse_gene_terminal_is_start() {
        let mut nodes = vec![
            stop(2, Strand::Reverse, 500),
            start(299, Strand::Reverse, 2),
        ];
        nodes[1].coding = 9.0;
        nodes[1].start_score = 2.0;

        let terminal = predict_path(&mut nodes, &TrainingModel::default(), true);
        assert_eq!(terminal, Some(1));
        assert_eq!(nodes[1].traceback, Some(0));
    }

    #[test]
    fn better_start_wins_the_stop() {
        // Two starts share one stop; the higher-scoring one is chosen.
        let mut nodes = vec![
            start(99, Strand::Forward, 399),
            start(198, Strand::Forward, 399),
            stop(399, Strand::Forward, -6),
        ];
        nodes[0].coding = 4.0;
        nodes[1].coding = 11.0;

        let terminal = predict_path(&mut nodes, &TrainingModel::default(), true).unwrap();
        assert_eq!(terminal, 2);
        assert_eq!(nodes[2].traceback, Some(1));
    }

    #[test]
    fn chained_genes_accumulate() {
        let mut nodes = vec![
            start(0, Strand::Forward, 300),
            stop(300, Strand::Forward, -6),
            start(402, Strand::Forward, 702),
            stop(702, Strand::Forward, 300),
        ];
        nodes[0].coding = 8.0;
        nodes[2].coding = 7.0;

        let terminal = predict_path(&mut nodes, &TrainingModel::default(), true).unwrap();
        assert_eq!(terminal, 3);
        let chain: Vec<usize> = traceback_indices(&nodes, terminal).collect();
        assert_eq!(chain, vec![3, 2, 1, 0]);
    }

    #[test]
    fn eliminate_marks_negative_genes() {
        let mut nodes = vec![
            start(0, Strand::Forward, 300),
            stop(300, Strand::Forward, -6),
            start(402, Strand::Forward, 702),
            stop(702, Strand::Forward, 300),
        ];
        nodes[0].coding = 8.0;
        nodes[2].coding = -20.0;
        // Thread the path by hand: 0 -> 1 -> 2 -> 3.
        nodes[3].traceback = Some(2);
        nodes[2].traceback = Some(1);
        nodes[1].traceback = Some(0);
        nodes[0].trace_forward = Some(1);
        nodes[1].trace_forward = Some(2);
        nodes[2].trace_forward = Some(3);
        let model = TrainingModel::default();
        eliminate_bad_genes(&mut nodes, Some(3), &model);

        assert!(!nodes[0].eliminated);
        assert!(!nodes[1].eliminated);
        assert!(nodes[2].eliminated);
        assert!(nodes[3].eliminated);
    }

    #[test]
    fn eliminate_none_is_noop() {
        let mut nodes = vec![start(0, Strand::Forward, 300)];
        eliminate_bad_genes(&mut nodes, None, &TrainingModel::default());
        assert!(!nodes[0].eliminated);
    }
}
