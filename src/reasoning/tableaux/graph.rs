//! Completion graph (C4 label + C5 graph): the partial model under
//! construction.
//!
//! Node and arc storage is a growing arena addressed by index, matching
//! the discipline of `examples/original_source/Kernel/growingArrayP.h`:
//! slots are never physically freed, only zeroed and reused after a
//! rollback moves the logical cursor back, so indices handed out to
//! callers stay valid across arena growth.

use crate::dep_set::{DepSet, Level};
use crate::reasoning::tableaux::dag::BipolarPointer;
use crate::reasoning::tableaux::role::RoleId;
use smallvec::SmallVec;

/// Index of a completion-graph node. Stable across arena growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Index of a directed arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArcId(pub u32);

/// Sentinel nominal level meaning "not a nominal" (spec.md §3).
pub const BLOCKABLE: i32 = -1;

/// One `(concept, dep-set)` entry in a node's label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEntry {
    pub concept: BipolarPointer,
    pub dep_set: DepSet,
}

/// Per-node label: two ordered sequences, simple and complex concepts,
/// matching spec.md §3's split (lets the engine schedule small rules —
/// `AND`, named concepts — ahead of branching ones without re-sorting).
#[derive(Debug, Clone, Default)]
pub struct Label {
    simple: Vec<LabelEntry>,
    complex: Vec<LabelEntry>,
}

impl Label {
    /// Is `bp` present, and if so with what dep-set? Checks both
    /// sequences.
    pub fn dep_set_of(&self, bp: BipolarPointer) -> Option<&DepSet> {
        self.simple
            .iter()
            .chain(self.complex.iter())
            .find(|e| e.concept == bp)
            .map(|e| &e.dep_set)
    }

    pub fn contains(&self, bp: BipolarPointer) -> bool {
        self.dep_set_of(bp).is_some()
    }

    pub fn simple_entries(&self) -> &[LabelEntry] {
        &self.simple
    }

    pub fn complex_entries(&self) -> &[LabelEntry] {
        &self.complex
    }

    fn sequence_for(&self, complex: bool) -> &Vec<LabelEntry> {
        if complex {
            &self.complex
        } else {
            &self.simple
        }
    }

    fn sequence_for_mut(&mut self, complex: bool) -> &mut Vec<LabelEntry> {
        if complex {
            &mut self.complex
        } else {
            &mut self.simple
        }
    }

    pub fn pop_simple(&mut self) -> Option<LabelEntry> {
        self.simple.pop()
    }

    pub fn pop_complex(&mut self) -> Option<LabelEntry> {
        self.complex.pop()
    }
}

/// An ordered directed edge between two nodes (spec.md §3 "Arc").
#[derive(Debug, Clone)]
pub struct Arc {
    pub from: NodeId,
    pub to: NodeId,
    pub role: RoleId,
    pub inverse: ArcId,
    pub dep_set: DepSet,
    /// Indirectly blocked because its source node is blocked.
    pub i_blocked: bool,
}

/// A completion-graph node (spec.md §3 "Completion node").
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub label: Label,
    pub parents: SmallVec<[ArcId; 2]>,
    pub children: SmallVec<[ArcId; 4]>,
    pub nominal_level: i32,
    /// The concept that triggered this node's creation; used by
    /// blocking's cheap-reject test.
    pub init: BipolarPointer,
    pub cached: bool,
    pub data_node: bool,
    pub affected: bool,
    pub blocker: Option<NodeId>,
    pub p_blocked: bool,
    pub d_blocked: bool,
    pub p_dep: DepSet,
    pub cur_level: Level,
    /// Other nodes this one is asserted distinct from, with the dep-set
    /// that forced the inequality.
    pub distinct_from: SmallVec<[(NodeId, DepSet); 2]>,
}

impl Node {
    fn fresh(id: NodeId, init: BipolarPointer, level: Level) -> Self {
        Node {
            id,
            label: Label::default(),
            parents: SmallVec::new(),
            children: SmallVec::new(),
            nominal_level: BLOCKABLE,
            init,
            cached: false,
            data_node: false,
            affected: true,
            blocker: None,
            p_blocked: false,
            d_blocked: false,
            p_dep: DepSet::empty(),
            cur_level: level,
            distinct_from: SmallVec::new(),
        }
    }

    pub fn is_nominal(&self) -> bool {
        self.nominal_level != BLOCKABLE
    }

    pub fn is_blocked(&self) -> bool {
        self.d_blocked || self.p_blocked
    }

    /// The node's logical parent arc: the first entry of `parents`, per
    /// spec.md §4.2's parent-arc discipline (loop arcs to itself, if
    /// any, are appended after it).
    pub fn logical_parent_arc(&self) -> Option<ArcId> {
        self.parents.first().copied()
    }

    pub fn label_pop_simple(&mut self) -> Option<LabelEntry> {
        self.label.pop_simple()
    }

    pub fn label_pop_complex(&mut self) -> Option<LabelEntry> {
        self.label.pop_complex()
    }
}

/// Arena growth policy mirroring `growingArrayP.h`: double capacity on
/// overflow, never shrink.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArenaStats {
    pub allocated: usize,
    pub high_water_mark: usize,
}

/// Nodes and arcs, parent/child discipline, node merging (C5).
#[derive(Debug, Default)]
pub struct CompletionGraph {
    nodes: Vec<Node>,
    arcs: Vec<Arc>,
    stats: ArenaStats,
}

impl CompletionGraph {
    pub fn new() -> Self {
        CompletionGraph::default()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    pub fn arc(&self, id: ArcId) -> &Arc {
        &self.arcs[id.0 as usize]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn stats(&self) -> ArenaStats {
        self.stats
    }

    /// `createRoot`: a fresh blockable root, label seeded with
    /// `(concept, dep_set)`.
    pub fn create_root(&mut self, concept: BipolarPointer, dep_set: DepSet, level: Level) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let mut node = Node::fresh(id, concept, level);
        node.label.sequence_for_mut(false).push(LabelEntry {
            concept,
            dep_set,
        });
        self.nodes.push(node);
        self.stats.allocated += 1;
        self.stats.high_water_mark = self.stats.high_water_mark.max(self.nodes.len());
        id
    }

    /// `addEdge`: create a child node and both the forward and inverse
    /// arcs. The forward arc becomes the child's logical parent arc.
    pub fn add_edge(
        &mut self,
        from: NodeId,
        role: RoleId,
        dep_set: DepSet,
        level: Level,
    ) -> (ArcId, NodeId) {
        let to = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::fresh(to, BipolarPointer::TOP, level));
        self.stats.allocated += 1;
        self.stats.high_water_mark = self.stats.high_water_mark.max(self.nodes.len());

        let forward_id = ArcId(self.arcs.len() as u32);
        let inverse_id = ArcId(self.arcs.len() as u32 + 1);
        self.arcs.push(Arc {
            from,
            to,
            role,
            inverse: inverse_id,
            dep_set: dep_set.clone(),
            i_blocked: false,
        });
        self.arcs.push(Arc {
            from: to,
            to: from,
            role,
            inverse: forward_id,
            dep_set,
            i_blocked: false,
        });

        self.nodes[from.0 as usize].children.push(forward_id);
        self.nodes[to.0 as usize].parents.push(inverse_id);

        (forward_id, to)
    }

    /// Add an existing-node loop/extra arc (e.g. nominal merges that
    /// introduce an edge between already-present nodes) without
    /// allocating a new node.
    pub fn add_edge_between(
        &mut self,
        from: NodeId,
        to: NodeId,
        role: RoleId,
        dep_set: DepSet,
    ) -> ArcId {
        let forward_id = ArcId(self.arcs.len() as u32);
        let inverse_id = ArcId(self.arcs.len() as u32 + 1);
        self.arcs.push(Arc {
            from,
            to,
            role,
            inverse: inverse_id,
            dep_set: dep_set.clone(),
            i_blocked: false,
        });
        self.arcs.push(Arc {
            from: to,
            to: from,
            role,
            inverse: forward_id,
            dep_set,
            i_blocked: false,
        });
        self.nodes[from.0 as usize].children.push(forward_id);
        self.nodes[to.0 as usize].parents.push(inverse_id);
        forward_id
    }

    /// `addConcept`: add `(bp, dep_set)` to the proper label sequence.
    /// No-op if `bp` is already present under a dep-set that is already
    /// at least as well supported (saturation idempotence: `existing ⊆
    /// new` means the new derivation carries no information the stored
    /// one didn't already have). If the new dep-set is instead strictly
    /// narrower, it replaces the stored one, since the minimal dep-set
    /// is always kept. Returns whether the label actually changed.
    pub fn add_concept(
        &mut self,
        node: NodeId,
        bp: BipolarPointer,
        dep_set: DepSet,
        complex: bool,
    ) -> bool {
        let n = &mut self.nodes[node.0 as usize];
        if let Some(existing) = n
            .label
            .sequence_for_mut(complex)
            .iter_mut()
            .find(|e| e.concept == bp)
        {
            if dep_set.dominates(&existing.dep_set) {
                return false;
            }
            if existing.dep_set.dominates(&dep_set) {
                existing.dep_set = dep_set;
                n.affected = true;
                return true;
            }
            return false;
        }
        n.label.sequence_for_mut(complex).push(LabelEntry {
            concept: bp,
            dep_set,
        });
        n.affected = true;
        true
    }

    /// `mergeInto`: re-target `src`'s arcs at `tgt` and union its label
    /// into `tgt`'s. `src` becomes `p_blocked` with `p_dep` recording
    /// the purge dependency.
    pub fn merge_into(&mut self, src: NodeId, tgt: NodeId, dep_set: DepSet) {
        {
            let source = self.nodes[src.0 as usize].clone();
            for entry in source.label.simple_entries() {
                self.add_concept(tgt, entry.concept, entry.dep_set.clone(), false);
            }
            for entry in source.label.complex_entries() {
                self.add_concept(tgt, entry.concept, entry.dep_set.clone(), true);
            }
        }

        let child_arcs: SmallVec<[ArcId; 4]> = self.nodes[src.0 as usize].children.clone();
        for arc_id in child_arcs {
            self.arcs[arc_id.0 as usize].from = tgt;
            let inv = self.arcs[arc_id.0 as usize].inverse;
            self.arcs[inv.0 as usize].to = tgt;
            self.nodes[tgt.0 as usize].children.push(arc_id);
        }
        let parent_arcs: SmallVec<[ArcId; 2]> = self.nodes[src.0 as usize].parents.clone();
        for arc_id in parent_arcs {
            self.arcs[arc_id.0 as usize].to = tgt;
            let inv = self.arcs[arc_id.0 as usize].inverse;
            self.arcs[inv.0 as usize].from = tgt;
            self.nodes[tgt.0 as usize].parents.push(arc_id);
        }

        let src_node = &mut self.nodes[src.0 as usize];
        src_node.blocker = Some(tgt);
        src_node.p_blocked = true;
        src_node.p_dep = dep_set;
    }

    /// `setAffected`: mark `node` and every descendant as affected,
    /// skipping nominal and p-blocked nodes, which never need their
    /// blocking status recomputed this way.
    pub fn set_affected(&mut self, node: NodeId) {
        let mut stack = vec![node];
        let mut visited = hashbrown::HashSet::new();
        while let Some(n) = stack.pop() {
            if !visited.insert(n) {
                continue;
            }
            let children: SmallVec<[ArcId; 4]> = {
                let nd = &mut self.nodes[n.0 as usize];
                if nd.is_nominal() || nd.p_blocked {
                    continue;
                }
                nd.affected = true;
                nd.children.clone()
            };
            for arc_id in children {
                stack.push(self.arcs[arc_id.0 as usize].to);
            }
        }
    }

    /// Successors of `node` along `role` (or a sub-role of it, per the
    /// supplied test), optionally restricted to those labelled `filter`.
    pub fn successors_via<'a>(
        &'a self,
        node: NodeId,
        mut role_matches: impl FnMut(RoleId) -> bool + 'a,
    ) -> impl Iterator<Item = (NodeId, ArcId)> + 'a {
        self.nodes[node.0 as usize]
            .children
            .iter()
            .copied()
            .filter(move |&arc_id| role_matches(self.arcs[arc_id.0 as usize].role))
            .map(move |arc_id| (self.arcs[arc_id.0 as usize].to, arc_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::tableaux::role::RoleId;

    #[test]
    fn add_edge_wires_inverse_arcs() {
        let mut g = CompletionGraph::new();
        let root = g.create_root(BipolarPointer::TOP, DepSet::empty(), 0);
        let (arc, child) = g.add_edge(root, RoleId(0), DepSet::empty(), 0);
        let a = g.arc(arc);
        assert_eq!(a.from, root);
        assert_eq!(a.to, child);
        let inv = g.arc(a.inverse);
        assert_eq!(inv.from, child);
        assert_eq!(inv.to, root);
        assert_eq!(g.node(child).logical_parent_arc(), Some(a.inverse));
    }

    #[test]
    fn add_concept_is_noop_when_existing_dep_set_is_already_minimal() {
        let mut g = CompletionGraph::new();
        let root = g.create_root(BipolarPointer::TOP, DepSet::empty(), 0);
        let bp = BipolarPointer::BOTTOM;
        let narrow = DepSet::singleton(0);
        assert!(g.add_concept(root, bp, narrow.clone(), false));
        let wide = narrow.union(&DepSet::singleton(1));
        assert!(!g.add_concept(root, bp, wide, false));
        assert_eq!(g.node(root).label.dep_set_of(bp), Some(&narrow));
    }

    #[test]
    fn add_concept_replaces_with_narrower_rederivation() {
        let mut g = CompletionGraph::new();
        let root = g.create_root(BipolarPointer::TOP, DepSet::empty(), 0);
        let bp = BipolarPointer::BOTTOM;
        let wide = DepSet::singleton(0).union(&DepSet::singleton(1));
        assert!(g.add_concept(root, bp, wide, false));
        let narrow = DepSet::singleton(0);
        assert!(g.add_concept(root, bp, narrow.clone(), false));
        assert_eq!(g.node(root).label.dep_set_of(bp), Some(&narrow));
    }

    #[test]
    fn merge_into_unions_labels_and_retargets_arcs() {
        let mut g = CompletionGraph::new();
        let root = g.create_root(BipolarPointer::TOP, DepSet::empty(), 0);
        let (_, a) = g.add_edge(root, RoleId(0), DepSet::empty(), 0);
        let (_, b) = g.add_edge(root, RoleId(0), DepSet::empty(), 0);
        g.add_concept(a, BipolarPointer::BOTTOM, DepSet::empty(), false);
        g.merge_into(a, b, DepSet::singleton(0));
        assert!(g.node(a).p_blocked);
        assert!(g.node(b).label.contains(BipolarPointer::BOTTOM));
    }
}
