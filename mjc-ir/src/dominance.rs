//! Dominance and natural-loop analysis over the block CFG.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::graph::{Graph, Node};

/// The dominator tree of a graph's blocks.
pub struct Dominance {
    /// Blocks in reverse postorder, starting at the start block.
    rpo: Vec<Node>,
    rpo_index: FxHashMap<Node, usize>,
    idom: FxHashMap<Node, Node>,
}

/// Distinct predecessor blocks of `block`, skipping `Bad` edges.
pub fn block_preds(graph: &Graph, block: Node) -> Vec<Node> {
    let mut preds = Vec::new();
    for &pred in graph.ins(block) {
        if graph.is_bad(pred) {
            continue;
        }
        let pred_block = graph.block_of(pred);
        if !preds.contains(&pred_block) {
            preds.push(pred_block);
        }
    }
    preds
}

/// Distinct successor blocks of `block`.
pub fn block_succs(graph: &Graph, block: Node) -> Vec<Node> {
    let mut succs = Vec::new();
    for (succ, _) in graph.block_successors(block) {
        if !succs.contains(&succ) {
            succs.push(succ);
        }
    }
    succs
}

impl Dominance {
    /// Computes immediate dominators with the iterative algorithm over the
    /// reverse postorder.
    pub fn compute(graph: &Graph) -> Self {
        // depth-first search for the reverse postorder
        let mut postorder = Vec::new();
        let mut visited = FxHashSet::default();
        let mut stack = vec![(graph.start_block(), 0usize)];
        visited.insert(graph.start_block());
        while let Some(&(block, next)) = stack.last() {
            let succs = block_succs(graph, block);
            if next < succs.len() {
                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }
                let succ = succs[next];
                if visited.insert(succ) {
                    stack.push((succ, 0));
                }
            } else {
                postorder.push(block);
                stack.pop();
            }
        }
        let rpo: Vec<Node> = postorder.into_iter().rev().collect();
        let rpo_index: FxHashMap<Node, usize> =
            rpo.iter().enumerate().map(|(i, &b)| (b, i)).collect();

        let mut idom: FxHashMap<Node, Node> = FxHashMap::default();
        idom.insert(graph.start_block(), graph.start_block());
        let mut changed = true;
        while changed {
            changed = false;
            for &block in rpo.iter().skip(1) {
                let preds: Vec<Node> = block_preds(graph, block)
                    .into_iter()
                    .filter(|p| rpo_index.contains_key(p))
                    .collect();
                let mut new_idom: Option<Node> = None;
                for &pred in &preds {
                    if !idom.contains_key(&pred) {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => pred,
                        Some(current) => intersect(&idom, &rpo_index, pred, current),
                    });
                }
                if let Some(new_idom) = new_idom {
                    if idom.get(&block) != Some(&new_idom) {
                        idom.insert(block, new_idom);
                        changed = true;
                    }
                }
            }
        }

        Self { rpo, rpo_index, idom }
    }

    pub fn reverse_postorder(&self) -> &[Node] {
        &self.rpo
    }

    pub fn is_reachable(&self, block: Node) -> bool {
        self.rpo_index.contains_key(&block)
    }

    pub fn immediate_dominator(&self, block: Node) -> Option<Node> {
        self.idom.get(&block).copied()
    }

    /// Whether `a` dominates `b` (reflexively).
    pub fn dominates(&self, a: Node, b: Node) -> bool {
        let mut current = b;
        loop {
            if current == a {
                return true;
            }
            match self.idom.get(&current) {
                Some(&parent) if parent != current => current = parent,
                _ => return false,
            }
        }
    }
}

fn intersect(
    idom: &FxHashMap<Node, Node>,
    rpo_index: &FxHashMap<Node, usize>,
    mut a: Node,
    mut b: Node,
) -> Node {
    while a != b {
        while rpo_index[&a] > rpo_index[&b] {
            a = idom[&a];
        }
        while rpo_index[&b] > rpo_index[&a] {
            b = idom[&b];
        }
    }
    a
}

/// A natural loop: its header, the set of member blocks and the in-loop
/// blocks whose edges jump back to the header.
pub struct LoopInfo {
    pub header: Node,
    pub blocks: FxHashSet<Node>,
    pub back_edge_blocks: Vec<Node>,
}

impl LoopInfo {
    pub fn contains(&self, graph: &Graph, node: Node) -> bool {
        let block = if graph.is_block(node) { node } else { graph.block_of(node) };
        self.blocks.contains(&block)
    }
}

/// Finds all natural loops, innermost (smallest) first.
pub fn find_loops(graph: &Graph, dom: &Dominance) -> Vec<LoopInfo> {
    let mut loops: FxHashMap<Node, LoopInfo> = FxHashMap::default();
    for &block in dom.reverse_postorder() {
        for succ in block_succs(graph, block) {
            if !dom.dominates(succ, block) {
                continue;
            }
            // back edge block -> succ; collect the natural loop
            let entry = loops.entry(succ).or_insert_with(|| LoopInfo {
                header: succ,
                blocks: FxHashSet::from_iter([succ]),
                back_edge_blocks: Vec::new(),
            });
            entry.back_edge_blocks.push(block);
            let mut worklist = vec![block];
            while let Some(current) = worklist.pop() {
                if !entry.blocks.insert(current) {
                    continue;
                }
                for pred in block_preds(graph, current) {
                    if dom.is_reachable(pred) && !entry.blocks.contains(&pred) {
                        worklist.push(pred);
                    }
                }
            }
        }
    }
    let mut result: Vec<LoopInfo> = loops.into_values().collect();
    result.sort_by_key(|l| (l.blocks.len(), l.header));
    result
}

#[cfg(test)]
mod tests {
    use cranelift_entity::EntityRef;

    use crate::entity::{EntityId, GraphId};
    use crate::mode::Mode;
    use crate::op::pn;
    use crate::tarval::Tarval;

    use super::*;

    /// Builds a diamond: start -> (then | other) -> join -> end.
    fn diamond() -> (Graph, Node, Node, Node, Node) {
        let mut g = Graph::new(GraphId::new(0), EntityId::new(0));
        let sel = g.new_const(Tarval::Bool(true));
        let cond = g.new_cond(g.start_block(), sel);
        let proj_false = g.new_proj(cond, Mode::X, pn::COND_FALSE);
        let proj_true = g.new_proj(cond, Mode::X, pn::COND_TRUE);
        let then_block = g.new_block(&[proj_true]);
        let else_block = g.new_block(&[proj_false]);
        let jmp_then = g.new_jmp(then_block);
        let jmp_else = g.new_jmp(else_block);
        let join = g.new_block(&[jmp_then, jmp_else]);
        let ret = g.new_return(join, g.initial_mem(), None);
        g.add_block_pred(g.end_block(), ret);
        (g, then_block, else_block, join, ret)
    }

    #[test]
    fn diamond_dominance() {
        let (g, then_block, else_block, join, _) = diamond();
        let dom = Dominance::compute(&g);
        assert!(dom.dominates(g.start_block(), join));
        assert!(dom.dominates(g.start_block(), then_block));
        assert!(!dom.dominates(then_block, join));
        assert!(!dom.dominates(else_block, join));
        assert_eq!(dom.immediate_dominator(join), Some(g.start_block()));
        assert!(find_loops(&g, &dom).is_empty());
    }

    #[test]
    fn simple_loop_is_found() {
        let mut g = Graph::new(GraphId::new(0), EntityId::new(0));
        let jmp0 = g.new_jmp(g.start_block());
        let header = g.new_block(&[jmp0]);
        let sel = g.new_const(Tarval::Bool(true));
        let cond = g.new_cond(header, sel);
        let stay = g.new_proj(cond, Mode::X, pn::COND_TRUE);
        let exit = g.new_proj(cond, Mode::X, pn::COND_FALSE);
        let body = g.new_block(&[stay]);
        let back = g.new_jmp(body);
        g.add_block_pred(header, back);
        let after = g.new_block(&[exit]);
        let ret = g.new_return(after, g.initial_mem(), None);
        g.add_block_pred(g.end_block(), ret);

        let dom = Dominance::compute(&g);
        let loops = find_loops(&g, &dom);
        assert_eq!(loops.len(), 1);
        let l = &loops[0];
        assert_eq!(l.header, header);
        assert!(l.blocks.contains(&body));
        assert!(!l.blocks.contains(&after));
        assert_eq!(l.back_edge_blocks, vec![body]);
    }
}
