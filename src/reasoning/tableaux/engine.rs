//! Tableau expansion engine (C7): rule application, branch points,
//! clash propagation, backjump.
//!
//! Grounded in the teacher's `reasoning/tableaux/core.rs` main-loop
//! shape (a todo list drained until empty or clashed) generalised to
//! the full SHIQ rule set and dependency-directed backjumping of
//! spec.md §4.3, instead of the teacher's placeholder rule bodies.

use crate::dep_set::{DepSet, Level};
use crate::iri::IRI;
use crate::reasoning::tableaux::blocking::{BlockingEngine, BlockingRegime, BlockingSearchStrategy, BlockingStats};
use crate::reasoning::tableaux::dag::{BipolarPointer, ConceptDag, DagVertex};
use crate::reasoning::tableaux::datatype::DatatypeOracle;
use crate::reasoning::tableaux::graph::{CompletionGraph, NodeId};
use crate::reasoning::tableaux::restore::{RestoreOp, RestoreStack};
use crate::reasoning::tableaux::role::{AutomatonState, RoleId, RoleSystem};
use hashbrown::HashMap;
use log::{debug, trace};
use std::time::Instant;

/// Schedule priority: `AND` and `FORALL` pieces expand before any
/// branching piece, matching spec.md §5's tie-break order
/// (`AND < FORALL < singleton < ≥ < ≤ < OR`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum RulePriority {
    And,
    Forall,
    Singleton,
    AtLeast,
    AtMost,
    Or,
}

#[derive(Debug, Clone, Copy)]
struct TodoEntry {
    priority: RulePriority,
    node: NodeId,
    bp: BipolarPointer,
    seq: u64,
}

#[derive(Debug, Clone)]
enum BranchAlternative {
    /// Remaining, not-yet-tried disjuncts of a `−AND` (source order).
    Disjunct { node: NodeId, remaining: Vec<BipolarPointer> },
    /// Remaining, not-yet-tried merge candidate pairs of a `+LE`.
    MergePair { remaining: Vec<(NodeId, NodeId)> },
}

#[derive(Debug, Clone)]
struct BranchPoint {
    level: Level,
    save_mark: usize,
    /// The dep-set the branching rule itself fired under — propagated
    /// upward as the clash dep-set when this branch point's
    /// alternatives are exhausted.
    parent_dep: DepSet,
    alternative: BranchAlternative,
}

enum RuleOutcome {
    Continue,
    Clash(DepSet),
}

enum BackjumpOutcome {
    Retried,
    Unsatisfiable,
}

/// Result of one top-level `run` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableauOutcome {
    Satisfiable,
    Unsatisfiable,
}

/// Rule application, branch management and backjumping over a
/// [`CompletionGraph`] built against a [`ConceptDag`] (C7).
pub struct TableauEngine<'a> {
    dag: &'a ConceptDag,
    roles: &'a dyn RoleSystem,
    datatypes: &'a dyn DatatypeOracle,
    graph: CompletionGraph,
    restore: RestoreStack,
    blocking: BlockingEngine,
    blocking_stats: BlockingStats,
    todo: Vec<TodoEntry>,
    branch_points: Vec<BranchPoint>,
    current_level: Level,
    seq: u64,
    nominals: HashMap<IRI, NodeId>,
    nominal_counter: i32,
    deadline: Option<Instant>,
    /// Set once a data-valued vertex is touched: the datatype oracle in
    /// use is a black box the core cannot introspect (C8), so any run
    /// that relies on one is only as sound as that oracle. The kernel
    /// downgrades such a run's answer to `UNKNOWN` rather than reporting
    /// false certainty.
    degraded: bool,
    /// A clash discovered while seeding an ABox, before `main_loop` has
    /// started (so there is no branch point yet to backjump to).
    seed_clash: Option<DepSet>,
}

impl<'a> TableauEngine<'a> {
    pub fn new(
        dag: &'a ConceptDag,
        roles: &'a dyn RoleSystem,
        datatypes: &'a dyn DatatypeOracle,
        regime: BlockingRegime,
        strategy: BlockingSearchStrategy,
        timeout_ms: Option<u64>,
    ) -> Self {
        TableauEngine {
            dag,
            roles,
            datatypes,
            graph: CompletionGraph::new(),
            restore: RestoreStack::new(),
            blocking: BlockingEngine::new(regime, strategy),
            blocking_stats: BlockingStats::default(),
            todo: Vec::new(),
            branch_points: Vec::new(),
            current_level: 0,
            seq: 0,
            nominals: HashMap::new(),
            nominal_counter: 0,
            deadline: timeout_ms.map(|ms| Instant::now() + std::time::Duration::from_millis(ms)),
            degraded: false,
            seed_clash: None,
        }
    }

    /// Create a fresh node seeded with `concept` and, for a nominal,
    /// `nominal_level` (otherwise pass [`crate::reasoning::tableaux::graph::BLOCKABLE`]).
    /// Used by ABox construction (`isInstance`/`isRelated`/`isConsistent`
    /// with individuals) ahead of [`Self::run_seeded`], in place of the
    /// single-root [`Self::run`] entry point.
    pub fn seed_node(&mut self, concept: BipolarPointer, nominal_level: i32) -> NodeId {
        let node = self.graph.create_root(concept, DepSet::empty(), 0);
        if nominal_level != crate::reasoning::tableaux::graph::BLOCKABLE {
            self.graph.node_mut(node).nominal_level = nominal_level;
        }
        self.push_todo(node, concept);
        node
    }

    /// Add an extra concept assertion to an already-seeded node. Any
    /// clash found here (e.g. two directly contradictory assertions)
    /// is recorded for [`Self::run_seeded`] to report, since there is no
    /// branch point yet for `main_loop`'s own clash handling to target.
    pub fn assert_concept(&mut self, node: NodeId, bp: BipolarPointer) {
        if let Some(clash) = self.add_label(node, bp, DepSet::empty()) {
            self.seed_clash.get_or_insert(clash);
        }
    }

    /// Wire an unconditional edge between two already-seeded nodes
    /// (an asserted role assertion in the ABox).
    pub fn connect(&mut self, from: NodeId, role: RoleId, to: NodeId) {
        self.graph.add_edge_between(from, to, role, DepSet::empty());
    }

    /// Record an unconditional inequality between two already-seeded
    /// nodes (an asserted `DifferentIndividuals`).
    pub fn assert_distinct(&mut self, a: NodeId, b: NodeId) {
        self.graph.node_mut(a).distinct_from.push((b, DepSet::empty()));
        self.graph.node_mut(b).distinct_from.push((a, DepSet::empty()));
    }

    /// Run to completion over nodes seeded via [`Self::seed_node`] and
    /// friends, rather than a single fresh root (the ABox counterpart of
    /// [`Self::run`]).
    pub fn run_seeded(&mut self) -> crate::error::KernelResult<TableauOutcome> {
        self.blocking_stats.reset();
        if let Some(dep) = self.seed_clash.take() {
            match self.backjump(dep)? {
                BackjumpOutcome::Unsatisfiable => return Ok(TableauOutcome::Unsatisfiable),
                BackjumpOutcome::Retried => {}
            }
        }
        self.main_loop()
    }

    pub fn blocking_stats(&self) -> &BlockingStats {
        &self.blocking_stats
    }

    /// Did this run touch a data-valued vertex? If so its answer rests
    /// on the (black-box) datatype oracle rather than being fully
    /// decided by the core alone.
    pub fn degraded(&self) -> bool {
        self.degraded
    }

    pub fn graph(&self) -> &CompletionGraph {
        &self.graph
    }

    /// Build a fresh root node labelled with `concept` and run the
    /// tableau to completion. This is the single entry point every
    /// kernel query (`isConsistent`, `isSatisfiable`, ...) funnels
    /// through, per spec.md §6: "each invokes one tableau run with an
    /// appropriately constructed initial node".
    pub fn run(&mut self, concept: BipolarPointer) -> crate::error::KernelResult<TableauOutcome> {
        self.blocking_stats.reset();
        let root = self.graph.create_root(concept, DepSet::empty(), 0);
        self.push_todo(root, concept);
        let gci = self.dag.gci();
        if !gci.is_top() {
            self.push_todo(root, gci);
            self.graph.add_concept(root, gci, DepSet::empty(), self.is_complex(gci));
        }
        self.main_loop()
    }

    fn main_loop(&mut self) -> crate::error::KernelResult<TableauOutcome> {
        loop {
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    return Err(crate::error::KernelError::Timeout {
                        operation: "tableau expansion".to_string(),
                        timeout_ms: 0,
                    });
                }
            }
            let Some(entry) = self.pop_todo() else {
                debug!("tableau saturated with {} nodes, no clash", self.graph.node_count());
                return Ok(TableauOutcome::Satisfiable);
            };
            if self.graph.node(entry.node).p_blocked {
                continue;
            }
            self.refresh_blocking(entry.node);
            if self.graph.node(entry.node).is_blocked() {
                continue;
            }
            trace!("apply rule: node={:?} bp={:?}", entry.node, entry.bp);
            match self.apply_rule(entry.node, entry.bp)? {
                RuleOutcome::Continue => {}
                RuleOutcome::Clash(dep) => {
                    debug!("clash with dep-set {dep}");
                    match self.backjump(dep)? {
                        BackjumpOutcome::Retried => {}
                        BackjumpOutcome::Unsatisfiable => return Ok(TableauOutcome::Unsatisfiable),
                    }
                }
            }
        }
    }

    /// Recompute `node`'s blocked status if it (or a node it depends on,
    /// via the `setAffected` propagation) changed since the last check
    /// (spec.md §4.4 "Maintenance") — this is the only place blocking
    /// detection is invoked from, so every node is checked exactly once
    /// per change before its todo entries are allowed to fire. Re-enqueues
    /// the node's label if a previously valid block no longer holds,
    /// since its todo entries were dropped while it was skipped.
    fn refresh_blocking(&mut self, node: NodeId) {
        if !self.graph.node(node).affected {
            return;
        }
        let was_blocked = self.graph.node(node).d_blocked;
        self.blocking
            .detect_blocked_status(&mut self.graph, self.dag, self.roles, &mut self.blocking_stats, node);
        self.graph.node_mut(node).affected = false;
        if was_blocked && !self.graph.node(node).d_blocked {
            self.reschedule_all(node);
        }
    }

    fn priority_of(&self, bp: BipolarPointer) -> RulePriority {
        match self.dag.vertex(bp) {
            None => RulePriority::And, // TOP/BOTTOM: resolved trivially, schedule early
            Some(DagVertex::And(_)) => {
                if bp.is_positive() {
                    RulePriority::And
                } else {
                    RulePriority::Or
                }
            }
            Some(DagVertex::Forall { .. }) => RulePriority::Forall,
            Some(DagVertex::Le { .. }) => {
                if bp.is_positive() {
                    RulePriority::AtMost
                } else {
                    RulePriority::AtLeast
                }
            }
            Some(DagVertex::PSingleton { .. }) | Some(DagVertex::NSingleton { .. }) => {
                RulePriority::Singleton
            }
            Some(DagVertex::PConcept { .. }) | Some(DagVertex::NConcept { .. }) => RulePriority::And,
            Some(DagVertex::Irr { .. }) => RulePriority::And,
            Some(DagVertex::Datatype { .. })
            | Some(DagVertex::DataValue { .. })
            | Some(DagVertex::DataExpr { .. }) => RulePriority::And,
        }
    }

    fn push_todo(&mut self, node: NodeId, bp: BipolarPointer) {
        let priority = self.priority_of(bp);
        self.seq += 1;
        self.todo.push(TodoEntry {
            priority,
            node,
            bp,
            seq: self.seq,
        });
    }

    /// Pop the entry with the smallest `(priority, node id, insertion
    /// order)` key — spec.md §5's full tie-break chain.
    fn pop_todo(&mut self) -> Option<TodoEntry> {
        if self.todo.is_empty() {
            return None;
        }
        let mut best = 0;
        for i in 1..self.todo.len() {
            let a = &self.todo[i];
            let b = &self.todo[best];
            let key_a = (a.priority, a.node.0, a.seq);
            let key_b = (b.priority, b.node.0, b.seq);
            if key_a < key_b {
                best = i;
            }
        }
        Some(self.todo.swap_remove(best))
    }

    fn is_complex(&self, bp: BipolarPointer) -> bool {
        !matches!(
            self.dag.vertex(bp),
            None | Some(DagVertex::PConcept { .. })
                | Some(DagVertex::NConcept { .. })
                | Some(DagVertex::PSingleton { .. })
                | Some(DagVertex::NSingleton { .. })
        )
    }

    /// Add `(bp, dep)` to `node`'s label, detecting a clash against an
    /// already-present negation and skipping the add entirely when an
    /// existing entry already dominates it (spec.md §8 "Saturation
    /// idempotence"). Returns the clash dep-set, if any.
    fn add_label(&mut self, node: NodeId, bp: BipolarPointer, dep: DepSet) -> Option<DepSet> {
        if bp.is_bottom() {
            return Some(dep);
        }
        if bp.is_top() {
            return None;
        }
        if let Some(existing_neg) = self.graph.node(node).label.dep_set_of(bp.negate()) {
            return Some(dep.union(existing_neg));
        }
        let complex = self.is_complex(bp);
        let level = self.current_level;
        let changed = self.graph.add_concept(node, bp, dep, complex);
        if changed {
            self.restore.push(
                level,
                if complex {
                    RestoreOp::ComplexLabelAdded { node }
                } else {
                    RestoreOp::SimpleLabelAdded { node }
                },
            );
            self.graph.set_affected(node);
            self.push_todo(node, bp);
        }
        None
    }

    fn apply_rule(&mut self, node: NodeId, bp: BipolarPointer) -> crate::error::KernelResult<RuleOutcome> {
        if bp.is_top() {
            return Ok(RuleOutcome::Continue);
        }
        if bp.is_bottom() {
            return Ok(RuleOutcome::Clash(DepSet::empty()));
        }
        let dep = self
            .graph
            .node(node)
            .label
            .dep_set_of(bp)
            .cloned()
            .unwrap_or_default();
        let vertex = match self.dag.vertex(bp) {
            Some(v) => v.clone(),
            None => return Ok(RuleOutcome::Continue),
        };
        let positive = bp.is_positive();

        match (vertex, positive) {
            (DagVertex::And(children), true) => {
                for c in children {
                    if let Some(clash) = self.add_label(node, c, dep.clone()) {
                        return Ok(RuleOutcome::Clash(clash));
                    }
                }
                Ok(RuleOutcome::Continue)
            }
            (DagVertex::And(children), false) => self.apply_or(node, &children, dep),
            (DagVertex::Forall { state, role, child }, true) => {
                self.apply_forall(node, state, role, child, dep)
            }
            (DagVertex::Forall { state, role, child }, false) => {
                self.apply_exists(node, state, role, child, dep)
            }
            (DagVertex::Le { n, role, child }, true) => self.apply_le(node, n, role, child, dep),
            (DagVertex::Le { n, role, child }, false) => {
                self.apply_ge(node, n + 1, role, child, dep)
            }
            (DagVertex::Irr { role }, true) => self.apply_irr(node, role, dep),
            (DagVertex::Irr { .. }, false) => Ok(RuleOutcome::Continue),
            (DagVertex::PConcept { body, .. }, true) | (DagVertex::NConcept { body, .. }, true) => {
                match body {
                    Some(b) => Ok(self.add_label(node, b, dep).map_or(RuleOutcome::Continue, RuleOutcome::Clash)),
                    None => Ok(RuleOutcome::Continue),
                }
            }
            (DagVertex::PConcept { body, .. }, false) | (DagVertex::NConcept { body, .. }, false) => {
                match body {
                    Some(b) => Ok(self
                        .add_label(node, b.negate(), dep)
                        .map_or(RuleOutcome::Continue, RuleOutcome::Clash)),
                    None => Ok(RuleOutcome::Continue),
                }
            }
            (DagVertex::PSingleton { name }, true) | (DagVertex::NSingleton { name }, true) => {
                self.apply_singleton(node, name, dep)
            }
            (DagVertex::PSingleton { .. }, false) | (DagVertex::NSingleton { .. }, false) => {
                Ok(RuleOutcome::Continue)
            }
            (DagVertex::Datatype { .. }, _)
            | (DagVertex::DataValue { .. }, _)
            | (DagVertex::DataExpr { .. }, _) => {
                let _ = self.datatypes; // consulted by a full data-rule pass (out of scope detail)
                self.degraded = true;
                Ok(RuleOutcome::Continue)
            }
        }
    }

    /// `−AND` (disjunction): branch on the first not-yet-tried child.
    fn apply_or(
        &mut self,
        node: NodeId,
        children: &[BipolarPointer],
        dep: DepSet,
    ) -> crate::error::KernelResult<RuleOutcome> {
        if children.is_empty() {
            return Ok(RuleOutcome::Continue);
        }
        self.try_disjunct(node, children.to_vec(), dep)
    }

    fn try_disjunct(
        &mut self,
        node: NodeId,
        mut remaining: Vec<BipolarPointer>,
        parent_dep: DepSet,
    ) -> crate::error::KernelResult<RuleOutcome> {
        if remaining.is_empty() {
            return Ok(RuleOutcome::Clash(parent_dep));
        }
        self.current_level += 1;
        let level = self.current_level;
        let save_mark = self.restore.save_point();
        let chosen = remaining.remove(0);
        if !remaining.is_empty() {
            self.branch_points.push(BranchPoint {
                level,
                save_mark,
                parent_dep: parent_dep.clone(),
                alternative: BranchAlternative::Disjunct { node, remaining },
            });
        }
        let branch_dep = parent_dep.union(&DepSet::singleton(level));
        match self.add_label(node, chosen.negate(), branch_dep) {
            Some(clash) => Ok(RuleOutcome::Clash(clash)),
            None => Ok(RuleOutcome::Continue),
        }
    }

    /// `+FORALL(state, R, C)`: propagate along every `R'`-successor the
    /// automaton admits a transition on.
    fn apply_forall(
        &mut self,
        node: NodeId,
        state: AutomatonState,
        role: RoleId,
        child: BipolarPointer,
        dep: DepSet,
    ) -> crate::error::KernelResult<RuleOutcome> {
        let successors: Vec<(NodeId, RoleId)> = self
            .graph
            .successors_via(node, |_| true)
            .map(|(succ, arc)| (succ, self.graph.arc(arc).role))
            .collect();

        for (succ, edge_role) in successors {
            for next_state in self.roles.transition(role, state, edge_role) {
                if self.roles.is_final_state(role, next_state) {
                    if let Some(clash) = self.add_label(succ, child, dep.clone()) {
                        return Ok(RuleOutcome::Clash(clash));
                    }
                } else if let Some(next_bp) = self.dag.forall_pointer(role, next_state, child) {
                    if let Some(clash) = self.add_label(succ, next_bp, dep.clone()) {
                        return Ok(RuleOutcome::Clash(clash));
                    }
                }
            }
        }
        Ok(RuleOutcome::Continue)
    }

    /// `−FORALL` (`∃R.C`): reuse an existing witness if one's already
    /// labelled `C`; otherwise create a fresh successor.
    fn apply_exists(
        &mut self,
        node: NodeId,
        _state: AutomatonState,
        role: RoleId,
        child: BipolarPointer,
        dep: DepSet,
    ) -> crate::error::KernelResult<RuleOutcome> {
        let has_witness = self
            .graph
            .successors_via(node, |r| r == role || self.roles.is_sub_role_of(r, role))
            .any(|(succ, _)| self.graph.node(succ).label.contains(child));
        if has_witness {
            return Ok(RuleOutcome::Continue);
        }

        let level = self.current_level;
        let (arc, succ) = self.graph.add_edge(node, role, dep.clone(), level);
        self.restore.push(
            level,
            RestoreOp::EdgeCreated {
                parent: node,
                arc,
                child: succ,
            },
        );
        let gci = self.dag.gci();
        if !gci.is_top() {
            if let Some(clash) = self.add_label(succ, gci, DepSet::empty()) {
                return Ok(RuleOutcome::Clash(clash));
            }
        }
        match self.add_label(succ, child, dep) {
            Some(clash) => Ok(RuleOutcome::Clash(clash)),
            None => Ok(RuleOutcome::Continue),
        }
    }

    fn labelled_successors(
        &self,
        node: NodeId,
        role: RoleId,
        label: BipolarPointer,
    ) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self
            .graph
            .successors_via(node, |r| r == role || self.roles.is_sub_role_of(r, role))
            .filter(|&(succ, _)| self.graph.node(succ).label.contains(label))
            .map(|(succ, _)| succ)
            .collect();
        out.sort_by_key(|n| n.0);
        out.dedup();
        out
    }

    /// `+LE(n, R, C)`: merge excess `R`-successors labelled `C` down to
    /// `n`, recording the unmerged pairs as a branch point so a clash
    /// can retry with a different merge choice.
    fn apply_le(
        &mut self,
        node: NodeId,
        n: u32,
        role: RoleId,
        child: BipolarPointer,
        dep: DepSet,
    ) -> crate::error::KernelResult<RuleOutcome> {
        let labelled = self.labelled_successors(node, role, child);
        if labelled.len() as u32 <= n {
            return Ok(RuleOutcome::Continue);
        }
        let mut pairs = Vec::new();
        for i in 0..labelled.len() {
            for j in (i + 1)..labelled.len() {
                pairs.push((labelled[i], labelled[j]));
            }
        }
        self.try_merge(pairs, dep)
    }

    fn try_merge(
        &mut self,
        mut remaining: Vec<(NodeId, NodeId)>,
        parent_dep: DepSet,
    ) -> crate::error::KernelResult<RuleOutcome> {
        if remaining.is_empty() {
            return Ok(RuleOutcome::Clash(parent_dep));
        }
        self.current_level += 1;
        let level = self.current_level;
        let save_mark = self.restore.save_point();
        let (keep, purge) = remaining.remove(0);
        if !remaining.is_empty() {
            self.branch_points.push(BranchPoint {
                level,
                save_mark,
                parent_dep: parent_dep.clone(),
                alternative: BranchAlternative::MergePair { remaining },
            });
        }
        self.merge_and_reschedule(keep, purge, parent_dep.union(&DepSet::singleton(level)), level);
        Ok(RuleOutcome::Continue)
    }

    fn merge_and_reschedule(&mut self, keep: NodeId, purge: NodeId, dep: DepSet, level: Level) {
        self.graph.merge_into(purge, keep, dep);
        self.restore.push(level, RestoreOp::NodeMerged { src: purge });
        self.reschedule_all(keep);
    }

    fn reschedule_all(&mut self, node: NodeId) {
        let entries: Vec<BipolarPointer> = self
            .graph
            .node(node)
            .label
            .simple_entries()
            .iter()
            .chain(self.graph.node(node).label.complex_entries())
            .map(|e| e.concept)
            .collect();
        for bp in entries {
            self.push_todo(node, bp);
        }
    }

    /// `−LE` (`≥ m R.C`): ensure `m` pairwise-distinct `R`-successors
    /// labelled `C` exist, creating fresh ones as needed.
    fn apply_ge(
        &mut self,
        node: NodeId,
        m: u32,
        role: RoleId,
        child: BipolarPointer,
        dep: DepSet,
    ) -> crate::error::KernelResult<RuleOutcome> {
        let mut existing = self.labelled_successors(node, role, child);
        let level = self.current_level;
        while (existing.len() as u32) < m {
            let (arc, succ) = self.graph.add_edge(node, role, dep.clone(), level);
            self.restore.push(
                level,
                RestoreOp::EdgeCreated {
                    parent: node,
                    arc,
                    child: succ,
                },
            );
            if let Some(clash) = self.add_label(succ, child, dep.clone()) {
                return Ok(RuleOutcome::Clash(clash));
            }
            for &other in &existing {
                self.graph.node_mut(succ).distinct_from.push((other, dep.clone()));
                self.graph.node_mut(other).distinct_from.push((succ, dep.clone()));
                self.restore
                    .push(level, RestoreOp::InequalityAdded { a: succ, b: other });
            }
            existing.push(succ);
        }
        Ok(RuleOutcome::Continue)
    }

    fn apply_irr(
        &mut self,
        node: NodeId,
        role: RoleId,
        dep: DepSet,
    ) -> crate::error::KernelResult<RuleOutcome> {
        let has_loop = self
            .graph
            .successors_via(node, |r| r == role || self.roles.is_sub_role_of(r, role))
            .any(|(succ, _)| succ == node);
        if has_loop {
            Ok(RuleOutcome::Clash(dep))
        } else {
            Ok(RuleOutcome::Continue)
        }
    }

    fn apply_singleton(
        &mut self,
        node: NodeId,
        name: IRI,
        dep: DepSet,
    ) -> crate::error::KernelResult<RuleOutcome> {
        if let Some(&existing) = self.nominals.get(&name) {
            if existing != node {
                let level = self.current_level;
                self.merge_and_reschedule(existing, node, dep, level);
            }
        } else {
            let level_id = self.nominal_counter;
            self.nominal_counter += 1;
            self.graph.node_mut(node).nominal_level = level_id;
            self.nominals.insert(name, node);
        }
        Ok(RuleOutcome::Continue)
    }

    /// Restore to the branch point governing `clash_dep`'s maximum
    /// level and retry its next alternative; if none remain, propagate
    /// the clash upward (spec.md §4.3 "Backjumping").
    fn backjump(&mut self, mut clash_dep: DepSet) -> crate::error::KernelResult<BackjumpOutcome> {
        loop {
            let Some(max_level) = clash_dep.max_level() else {
                return Ok(BackjumpOutcome::Unsatisfiable);
            };

            loop {
                let top_level = match self.branch_points.last() {
                    Some(top) => top.level,
                    None => break,
                };
                if top_level <= max_level {
                    break;
                }
                let discarded = self.branch_points.pop().expect("just peeked");
                self.rollback_to(discarded.save_mark);
            }

            let top_level = match self.branch_points.last() {
                Some(top) => top.level,
                None => return Ok(BackjumpOutcome::Unsatisfiable),
            };
            if top_level != max_level {
                if max_level == 0 {
                    return Ok(BackjumpOutcome::Unsatisfiable);
                }
                clash_dep.truncate(max_level);
                continue;
            }

            let bp = self.branch_points.pop().unwrap();
            self.rollback_to(bp.save_mark);
            self.current_level = max_level.saturating_sub(1);

            let outcome = match bp.alternative {
                BranchAlternative::Disjunct { node, remaining } => {
                    self.try_disjunct(node, remaining, bp.parent_dep.clone())?
                }
                BranchAlternative::MergePair { remaining } => {
                    self.try_merge(remaining, bp.parent_dep.clone())?
                }
            };
            match outcome {
                RuleOutcome::Continue => return Ok(BackjumpOutcome::Retried),
                RuleOutcome::Clash(new_dep) => {
                    clash_dep = new_dep;
                    continue;
                }
            }
        }
    }

    fn rollback_to(&mut self, mark: usize) {
        while let Some(op) = self.restore.pop_since(mark) {
            self.apply_restore(op);
        }
    }

    fn apply_restore(&mut self, op: RestoreOp) {
        match op {
            RestoreOp::SimpleLabelAdded { node } => {
                self.graph.node_mut(node).label_pop_simple();
                self.graph.node_mut(node).affected = true;
            }
            RestoreOp::ComplexLabelAdded { node } => {
                self.graph.node_mut(node).label_pop_complex();
                self.graph.node_mut(node).affected = true;
            }
            RestoreOp::EdgeCreated { parent, .. } => {
                self.graph.node_mut(parent).children.pop();
            }
            RestoreOp::InequalityAdded { a, b } => {
                self.graph.node_mut(a).distinct_from.pop();
                self.graph.node_mut(b).distinct_from.pop();
            }
            RestoreOp::NodeMerged { src } => {
                let node = self.graph.node_mut(src);
                node.p_blocked = false;
                node.blocker = None;
                node.p_dep = DepSet::empty();
            }
        }
    }
}
