//! Blocking engine (C6): loop detection under SH/SHI/SHIQ.
//!
//! Grounded in `examples/original_source/Kernel/Blocking.cpp`'s
//! `isBlockedBy`/`isCommonlyBlockedBy`/`isABlockedBy`/`isCBlockedBy`
//! family: B1 (label subset) and B2 (universal-restriction agreement)
//! are always required once inverse roles are in play; SHIQ adds either
//! the `{B3,B4}` or `{B5,B6}` pair depending on cardinality direction.

use crate::reasoning::tableaux::dag::{ConceptDag, DagVertex};
use crate::reasoning::tableaux::graph::{ArcId, CompletionGraph, NodeId};
use crate::reasoning::tableaux::role::RoleSystem;

/// Which DL fragment's blocking regime is active, selected by what the
/// KB actually uses (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockingRegime {
    /// No inverse roles: B1 alone.
    Sh,
    /// Inverse roles, no number restrictions: B1 + B2.
    Shi,
    /// Inverse roles and qualified number restrictions: B1 + B2 and
    /// either {B3,B4} or {B5,B6}.
    Shiq,
}

/// Ancestor blocking is cheaper but incomplete for some axiom shapes;
/// anywhere blocking is required once the KB has both inverse roles and
/// qualified number restrictions (spec.md §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockingSearchStrategy {
    Ancestor,
    Anywhere,
}

/// Per-rule try/fail counters (spec.md §4.4 "Statistics counters",
/// SPEC_FULL.md §B.1). Indices 0..6 correspond to B1..B6; reset at the
/// start of every top-level consistency check, mirroring
/// `clearBlockingStat()`'s call site in the source.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockingStats {
    tries: [u64; 6],
    fails: [u64; 6],
    successes: u64,
}

impl BlockingStats {
    pub fn record_try(&mut self, rule: usize) {
        self.tries[rule] += 1;
    }

    pub fn record_fail(&mut self, rule: usize) {
        self.fails[rule] += 1;
    }

    pub fn record_success(&mut self) {
        self.successes += 1;
    }

    pub fn tries(&self, rule: usize) -> u64 {
        self.tries[rule]
    }

    pub fn fails(&self, rule: usize) -> u64 {
        self.fails[rule]
    }

    pub fn successes(&self) -> u64 {
        self.successes
    }

    pub fn reset(&mut self) {
        *self = BlockingStats::default();
    }
}

/// Stateless test battery for whether `candidate` blocks `node`, given
/// the active regime. Holds no graph state itself — it is handed the
/// graph, DAG and role system on each call, and writes statistics into
/// the caller's [`BlockingStats`].
pub struct BlockingEngine {
    pub regime: BlockingRegime,
    pub strategy: BlockingSearchStrategy,
}

impl BlockingEngine {
    pub fn new(regime: BlockingRegime, strategy: BlockingSearchStrategy) -> Self {
        BlockingEngine { regime, strategy }
    }

    /// Cheap-reject test (SPEC_FULL.md §B.2): if `w`'s `init` pointer is
    /// not `TOP` and is absent from `candidate`'s label, `candidate`
    /// cannot block `w` and the full B1..B6 battery is skipped.
    fn cheap_reject(&self, graph: &CompletionGraph, w: NodeId, candidate: NodeId) -> bool {
        let init = graph.node(w).init;
        if init.is_top() {
            return false;
        }
        !graph.node(candidate).label.contains(init)
    }

    /// Is `candidate` a valid blocker for `w`, under the active regime?
    /// `parent_arc` is `w`'s logical parent arc, needed for B2-B6's
    /// edge-label comparisons.
    pub fn is_blocked_by(
        &self,
        graph: &CompletionGraph,
        dag: &ConceptDag,
        roles: &dyn RoleSystem,
        stats: &mut BlockingStats,
        w: NodeId,
        candidate: NodeId,
    ) -> bool {
        if graph.node(candidate).is_nominal() || graph.node(candidate).cached {
            return false;
        }
        if self.cheap_reject(graph, w, candidate) {
            return false;
        }

        stats.record_try(0);
        if !label_subset(graph, w, candidate) {
            stats.record_fail(0);
            return false;
        }

        let result = match self.regime {
            BlockingRegime::Sh => true,
            BlockingRegime::Shi => self.b2(graph, dag, roles, stats, w, candidate),
            BlockingRegime::Shiq => {
                self.b2(graph, dag, roles, stats, w, candidate)
                    && (self.b3_b4(graph, dag, roles, stats, w, candidate)
                        || self.b5_b6(graph, dag, roles, stats, w, candidate))
            }
        };
        if result {
            stats.record_success();
        }
        result
    }

    /// B2: every `∀S.C` in `candidate`'s label that the `v↔w` edge's
    /// role admits a transition on must also hold of `v` (`w`'s parent).
    fn b2(
        &self,
        graph: &CompletionGraph,
        dag: &ConceptDag,
        roles: &dyn RoleSystem,
        stats: &mut BlockingStats,
        w: NodeId,
        candidate: NodeId,
    ) -> bool {
        stats.record_try(1);
        let Some(parent_arc) = graph.node(w).logical_parent_arc() else {
            stats.record_fail(1);
            return false;
        };
        let edge_role = graph.arc(parent_arc).role;
        let v = graph.arc(parent_arc).to;

        for entry in graph
            .node(candidate)
            .label
            .complex_entries()
            .iter()
            .chain(graph.node(candidate).label.simple_entries())
        {
            if !entry.concept.is_positive() {
                continue;
            }
            if let Some(DagVertex::Forall { state, role, child }) = dag.vertex(entry.concept) {
                if !roles.transition(*role, *state, edge_role).is_empty()
                    && !graph.node(v).label.contains(*child)
                {
                    stats.record_fail(1);
                    return false;
                }
            }
        }
        true
    }

    /// `{B3, B4}`: the at-most-direction pair, applied when `w` is not
    /// reached through an inverse relationship that would instead
    /// require `{B5,B6}`.
    fn b3_b4(
        &self,
        graph: &CompletionGraph,
        dag: &ConceptDag,
        roles: &dyn RoleSystem,
        stats: &mut BlockingStats,
        w: NodeId,
        candidate: NodeId,
    ) -> bool {
        let Some(parent_arc) = graph.node(w).logical_parent_arc() else {
            return false;
        };
        let edge_role = graph.arc(parent_arc).role;
        let v = graph.arc(parent_arc).to;

        for entry in graph.node(candidate).label.complex_entries() {
            stats.record_try(2);
            match dag.vertex(entry.concept) {
                Some(DagVertex::Le { n, role, child }) if entry.concept.is_positive() => {
                    let w_is_inv_succ = roles
                        .inverse(*role)
                        .map(|inv| inv == edge_role || roles.is_sub_role_of(edge_role, inv))
                        .unwrap_or(false);
                    let not_child_in_v = graph.node(v).label.contains(child.negate());
                    let child_in_v = graph.node(v).label.contains(*child);
                    let count = count_successors_labelled(graph, candidate, roles, *role, *child);
                    let ok = !w_is_inv_succ || not_child_in_v || (child_in_v && count < *n as usize);
                    if !ok {
                        stats.record_fail(2);
                        return false;
                    }
                }
                _ => {}
            }
        }

        for entry in graph.node(candidate).label.complex_entries() {
            stats.record_try(3);
            match dag.vertex(entry.concept) {
                Some(DagVertex::Le { n, role, child }) if !entry.concept.is_positive() => {
                    // A negated LE vertex in the label represents `≥ m`.
                    let m = *n + 1;
                    let w_is_inv_succ_with_e = roles
                        .inverse(*role)
                        .map(|inv| inv == edge_role)
                        .unwrap_or(false)
                        && graph.node(v).label.contains(*child)
                        && m == 1;
                    let enough_successors =
                        count_successors_labelled(graph, candidate, roles, *role, *child) >= m as usize;
                    if !(w_is_inv_succ_with_e || enough_successors) {
                        stats.record_fail(3);
                        return false;
                    }
                }
                _ => {}
            }
        }
        true
    }

    /// `{B5, B6}`: the inverse-direction pair.
    fn b5_b6(
        &self,
        graph: &CompletionGraph,
        dag: &ConceptDag,
        roles: &dyn RoleSystem,
        stats: &mut BlockingStats,
        w: NodeId,
        candidate: NodeId,
    ) -> bool {
        let Some(parent_arc) = graph.node(w).logical_parent_arc() else {
            return false;
        };
        let edge_role = graph.arc(parent_arc).role;
        let v = graph.arc(parent_arc).to;

        for entry in graph.node(candidate).label.complex_entries() {
            stats.record_try(4);
            if let Some(DagVertex::Le { role, child, .. }) = dag.vertex(entry.concept) {
                if entry.concept.is_positive() {
                    let w_is_inv_succ = roles
                        .inverse(*role)
                        .map(|inv| inv == edge_role)
                        .unwrap_or(false);
                    if w_is_inv_succ && !graph.node(v).label.contains(child.negate()) {
                        stats.record_fail(4);
                        return false;
                    }
                }
            }
        }

        for entry in graph.node(v).label.complex_entries() {
            stats.record_try(5);
            if let Some(DagVertex::Le { role, child, .. }) = dag.vertex(entry.concept) {
                if !entry.concept.is_positive() {
                    // negated LE on v means `≥ m U.F`; B6 checks the
                    // forward direction from v through the edge to w.
                    let is_u_succ = *role == edge_role || roles.is_sub_role_of(edge_role, *role);
                    if is_u_succ && !graph.node(w).label.contains(child.negate()) {
                        stats.record_fail(5);
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Walk `w`'s ancestor chain looking for the first valid blocker.
    pub fn find_ancestor_blocker(
        &self,
        graph: &CompletionGraph,
        dag: &ConceptDag,
        roles: &dyn RoleSystem,
        stats: &mut BlockingStats,
        w: NodeId,
    ) -> Option<NodeId> {
        let mut current = w;
        while let Some(parent_arc) = graph.node(current).logical_parent_arc() {
            let parent = graph.arc(parent_arc).to;
            if self.is_blocked_by(graph, dag, roles, stats, w, parent) {
                return Some(parent);
            }
            current = parent;
        }
        None
    }

    /// Scan all nodes with id less than `w`'s, skipping blocked/purged
    /// ones, for the first valid blocker (spec.md §4.4, §5 tie-break:
    /// ascending node id).
    pub fn find_anywhere_blocker(
        &self,
        graph: &CompletionGraph,
        dag: &ConceptDag,
        roles: &dyn RoleSystem,
        stats: &mut BlockingStats,
        w: NodeId,
    ) -> Option<NodeId> {
        for candidate_idx in 0..w.0 {
            let candidate = NodeId(candidate_idx);
            if graph.node(candidate).is_blocked() || graph.node(candidate).p_blocked {
                continue;
            }
            if self.is_blocked_by(graph, dag, roles, stats, w, candidate) {
                return Some(candidate);
            }
        }
        None
    }

    /// Recompute and apply `w`'s blocked status using the configured
    /// search strategy, returning the blocker if any was found.
    pub fn detect_blocked_status(
        &self,
        graph: &mut CompletionGraph,
        dag: &ConceptDag,
        roles: &dyn RoleSystem,
        stats: &mut BlockingStats,
        w: NodeId,
    ) -> Option<NodeId> {
        if graph.node(w).is_nominal() {
            return None;
        }
        let blocker = match self.strategy {
            BlockingSearchStrategy::Ancestor => self.find_ancestor_blocker(graph, dag, roles, stats, w),
            BlockingSearchStrategy::Anywhere => self.find_anywhere_blocker(graph, dag, roles, stats, w),
        };
        let node = graph.node_mut(w);
        node.d_blocked = blocker.is_some();
        node.blocker = blocker;
        blocker
    }

    /// Undo a block when a label change on `blocker` invalidates it
    /// (spec.md §4.4 "Maintenance"): the node (and, by the caller's
    /// `setAffected` pass, its subtree) becomes eligible for rule
    /// application again.
    pub fn unblock_node(&self, graph: &mut CompletionGraph, w: NodeId) {
        let node = graph.node_mut(w);
        node.d_blocked = false;
        node.blocker = None;
    }
}

fn label_subset(graph: &CompletionGraph, w: NodeId, candidate: NodeId) -> bool {
    let w_node = graph.node(w);
    let c_node = graph.node(candidate);
    w_node
        .label
        .simple_entries()
        .iter()
        .chain(w_node.label.complex_entries())
        .all(|e| c_node.label.contains(e.concept))
}

fn count_successors_labelled(
    graph: &CompletionGraph,
    node: NodeId,
    roles: &dyn RoleSystem,
    role: crate::reasoning::tableaux::role::RoleId,
    label: crate::reasoning::tableaux::dag::BipolarPointer,
) -> usize {
    graph
        .successors_via(node, |r| r == role || roles.is_sub_role_of(r, role))
        .filter(|&(succ, _arc): &(NodeId, ArcId)| graph.node(succ).label.contains(label))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dep_set::DepSet;
    use crate::reasoning::tableaux::dag::BipolarPointer;
    use crate::reasoning::tableaux::role::SimpleRoleSystem;

    #[test]
    fn sh_blocking_only_needs_label_subset() {
        let mut graph = CompletionGraph::new();
        let dag = ConceptDag::new();
        let roles = SimpleRoleSystem::new();
        let root = graph.create_root(BipolarPointer::TOP, DepSet::empty(), 0);
        let (_, child) = graph.add_edge(root, crate::reasoning::tableaux::role::RoleId(0), DepSet::empty(), 0);
        graph.add_concept(root, BipolarPointer::BOTTOM, DepSet::empty(), false);
        graph.add_concept(child, BipolarPointer::BOTTOM, DepSet::empty(), false);

        let engine = BlockingEngine::new(BlockingRegime::Sh, BlockingSearchStrategy::Ancestor);
        let mut stats = BlockingStats::default();
        assert!(engine.is_blocked_by(&graph, &dag, &roles, &mut stats, child, root));
        assert_eq!(stats.successes(), 1);
    }

    #[test]
    fn cheap_reject_skips_mismatched_init() {
        let mut graph = CompletionGraph::new();
        let dag = ConceptDag::new();
        let roles = SimpleRoleSystem::new();
        let root = graph.create_root(BipolarPointer::TOP, DepSet::empty(), 0);
        let a = BipolarPointer::BOTTOM;
        let (_, child) = graph.add_edge(root, crate::reasoning::tableaux::role::RoleId(0), DepSet::empty(), 0);
        graph.node_mut(child).init = a;
        // root's label doesn't contain `a`, so root can never block child.
        let engine = BlockingEngine::new(BlockingRegime::Sh, BlockingSearchStrategy::Ancestor);
        let mut stats = BlockingStats::default();
        assert!(!engine.is_blocked_by(&graph, &dag, &roles, &mut stats, child, root));
    }
}
