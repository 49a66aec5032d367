//! Kernel API (§6): knowledge-base lifecycle, axiom stream, preprocessing
//! and the consistency/subsumption/instance query family, each of which
//! funnels through one [`TableauEngine`] run.
//!
//! Grounded in the teacher's top-level `SimpleReasoner` handle shape
//! (a struct wrapping an ontology plus a `ReasoningConfig`, with query
//! methods that build and run a tableau as needed) but reworked around
//! this crate's single-open-KB lifecycle (`newKB`/`releaseKB`/`clearKB`)
//! instead of always-open ontology mutation.

use crate::error::{KernelError, KernelResult};
use crate::frontend::{Axiom, AxiomId, ConceptDefinition, ConceptTree};
use crate::iri::IRI;
use crate::reasoning::tableaux::blocking::{BlockingRegime, BlockingSearchStrategy};
use crate::reasoning::tableaux::dag::{BipolarPointer, ConceptDag};
use crate::reasoning::tableaux::datatype::PermissiveDatatypeOracle;
use crate::reasoning::tableaux::engine::{TableauEngine, TableauOutcome};
use crate::reasoning::tableaux::graph::NodeId;
use crate::reasoning::tableaux::role::{RoleId, SimpleRoleSystem};
use hashbrown::HashMap;
use log::{info, warn};

/// Three-valued query answer (spec.md §6). `TIMEOUT` is not a variant
/// here — it supersedes the return entirely and is surfaced as
/// [`KernelError::Timeout`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    /// The run touched a data-valued vertex, so the answer rests on the
    /// (black-box, stub) datatype oracle rather than being fully decided
    /// by the core.
    Unknown,
}

/// Hook the external classifier can install to observe tableau runs
/// (SPEC_FULL.md §B.3). The core only calls this at the start/end of a
/// single run; it never depends on a particular reporting backend.
pub trait ProgressMonitor {
    fn on_run_start(&mut self) {}
    fn on_run_end(&mut self, _outcome: TableauOutcome) {}
}

/// Kernel configuration (spec.md §6 "Configuration"), mirroring the
/// teacher's `ReasoningConfig`: a plain `Clone`-able struct with
/// `Default`, mutated through setter methods on [`Kernel`].
#[derive(Debug, Clone)]
pub struct KernelOptions {
    pub timeout_ms: Option<u64>,
    pub verbose_output: bool,
    pub use_relevant_only: bool,
    pub top_b_role: String,
    pub bot_b_role: String,
    pub top_d_role: String,
    pub bot_d_role: String,
    pub blocking_strategy: BlockingSearchStrategy,
}

impl Default for KernelOptions {
    fn default() -> Self {
        KernelOptions {
            timeout_ms: None,
            verbose_output: false,
            use_relevant_only: false,
            top_b_role: "http://www.w3.org/2002/07/owl#topObjectProperty".to_string(),
            bot_b_role: "http://www.w3.org/2002/07/owl#bottomObjectProperty".to_string(),
            top_d_role: "http://www.w3.org/2002/07/owl#topDataProperty".to_string(),
            bot_d_role: "http://www.w3.org/2002/07/owl#bottomDataProperty".to_string(),
            blocking_strategy: BlockingSearchStrategy::Ancestor,
        }
    }
}

#[derive(Debug, Clone)]
struct AxiomRecord {
    id: AxiomId,
    axiom: Axiom,
    retracted: bool,
}

/// The open knowledge base: accumulated axioms plus everything
/// `preprocess` derives from them.
struct KnowledgeBase {
    next_axiom_id: u64,
    axioms: Vec<AxiomRecord>,
    dirty: bool,
    preprocessed: bool,
    inconsistent: bool,

    dag: ConceptDag,
    roles: SimpleRoleSystem,
    datatypes: PermissiveDatatypeOracle,
    regime: BlockingRegime,

    individuals: Vec<IRI>,
    nominal_pointers: HashMap<IRI, BipolarPointer>,
    concept_assertions: Vec<(IRI, BipolarPointer)>,
    role_assertions: Vec<(IRI, RoleId, IRI)>,
    same_individuals: Vec<(IRI, IRI)>,
    different_individuals: Vec<(IRI, IRI)>,
}

impl KnowledgeBase {
    fn new() -> Self {
        KnowledgeBase {
            next_axiom_id: 0,
            axioms: Vec::new(),
            dirty: false,
            preprocessed: false,
            inconsistent: false,
            dag: ConceptDag::new(),
            roles: SimpleRoleSystem::new(),
            datatypes: PermissiveDatatypeOracle,
            regime: BlockingRegime::Sh,
            individuals: Vec::new(),
            nominal_pointers: HashMap::new(),
            concept_assertions: Vec::new(),
            role_assertions: Vec::new(),
            same_individuals: Vec::new(),
            different_individuals: Vec::new(),
        }
    }
}

/// A reasoning kernel handle (spec.md §6). At most one knowledge base is
/// open at a time.
pub struct Kernel {
    options: KernelOptions,
    kb: Option<KnowledgeBase>,
    progress_monitor: Option<Box<dyn ProgressMonitor>>,
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel {
    pub fn new() -> Self {
        Kernel {
            options: KernelOptions::default(),
            kb: None,
            progress_monitor: None,
        }
    }

    // ---- Lifecycle -------------------------------------------------

    pub fn new_kb(&mut self) -> KernelResult<()> {
        if self.kb.is_some() {
            return Err(KernelError::KbAlreadyOpen);
        }
        self.kb = Some(KnowledgeBase::new());
        Ok(())
    }

    pub fn release_kb(&mut self) -> KernelResult<()> {
        self.require_kb()?;
        self.kb = None;
        Ok(())
    }

    pub fn clear_kb(&mut self) -> KernelResult<()> {
        self.require_kb()?;
        self.kb = Some(KnowledgeBase::new());
        Ok(())
    }

    fn require_kb(&self) -> KernelResult<()> {
        if self.kb.is_none() {
            return Err(KernelError::NoOpenKb);
        }
        Ok(())
    }

    // ---- Options -----------------------------------------------------

    pub fn set_operation_timeout(&mut self, timeout_ms: u64) {
        self.options.timeout_ms = if timeout_ms == 0 { None } else { Some(timeout_ms) };
    }

    pub fn set_verbose_output(&mut self, verbose: bool) {
        self.options.verbose_output = verbose;
    }

    pub fn set_top_bottom_role_names(&mut self, top_b: &str, bot_b: &str, top_d: &str, bot_d: &str) {
        self.options.top_b_role = top_b.to_string();
        self.options.bot_b_role = bot_b.to_string();
        self.options.top_d_role = top_d.to_string();
        self.options.bot_d_role = bot_d.to_string();
    }

    pub fn set_progress_monitor(&mut self, monitor: Box<dyn ProgressMonitor>) {
        self.progress_monitor = Some(monitor);
    }

    pub fn options(&self) -> &KernelOptions {
        &self.options
    }

    // ---- Axiom stream --------------------------------------------------

    pub fn add_axiom(&mut self, axiom: Axiom) -> KernelResult<AxiomId> {
        let kb = self.kb.as_mut().ok_or(KernelError::NoOpenKb)?;
        let id = AxiomId(kb.next_axiom_id);
        kb.next_axiom_id += 1;
        kb.axioms.push(AxiomRecord {
            id,
            axiom,
            retracted: false,
        });
        kb.dirty = true;
        kb.preprocessed = false;
        Ok(id)
    }

    pub fn retract(&mut self, id: AxiomId) -> KernelResult<()> {
        let kb = self.kb.as_mut().ok_or(KernelError::NoOpenKb)?;
        if let Some(rec) = kb.axioms.iter_mut().find(|r| r.id == id) {
            rec.retracted = true;
            kb.dirty = true;
            kb.preprocessed = false;
        }
        Ok(())
    }

    pub fn is_changed(&self) -> bool {
        self.kb.as_ref().map(|kb| kb.dirty).unwrap_or(false)
    }

    // ---- Preprocessing --------------------------------------------------

    /// Build the DAG, compiled role system and ABox side-tables from the
    /// accumulated axiom stream (spec.md §6 "Preprocessing pipeline").
    /// All-or-nothing: on error the KB keeps its pre-preprocess state and
    /// [`Self::is_changed`] remains true.
    pub fn preprocess(&mut self) -> KernelResult<()> {
        let kb = self.kb.as_mut().ok_or(KernelError::NoOpenKb)?;
        if kb.preprocessed {
            return Ok(());
        }
        info!("preprocessing knowledge base ({} axioms)", kb.axioms.len());

        let mut fresh = KnowledgeBase::new();
        std::mem::swap(&mut fresh.axioms, &mut kb.axioms);
        fresh.next_axiom_id = kb.next_axiom_id;
        let live: Vec<Axiom> = fresh
            .axioms
            .iter()
            .filter(|r| !r.retracted)
            .map(|r| r.axiom.clone())
            .collect();

        // Pass 0: role hierarchy, ahead of anything that lowers a
        // concept tree referencing a role (automaton construction needs
        // transitivity/sub-role facts up front).
        for axiom in &live {
            match axiom {
                Axiom::TransitiveRole(r) => fresh.roles.declare_transitive(*r),
                Axiom::InverseRoles(a, b) => fresh.roles.declare_inverse(*a, *b),
                Axiom::SubRoleOf(sub, sup) => fresh.roles.declare_sub_role(*sub, *sup),
                _ => {}
            }
        }
        let has_inverse = live.iter().any(|a| matches!(a, Axiom::InverseRoles(..)));
        let has_qualified_number_restriction = live.iter().any(axiom_has_qualified_number_restriction);
        fresh.regime = match (has_inverse, has_qualified_number_restriction) {
            (false, _) => BlockingRegime::Sh,
            (true, false) => BlockingRegime::Shi,
            (true, true) => BlockingRegime::Shiq,
        };

        // Pass 1: named concept definitions (`A ⊑ C` / `A ≡ C`), so the
        // cycle-placeholder mechanism in `concept2dag` sees them before
        // anything else references the name.
        for axiom in &live {
            match axiom {
                Axiom::SubClassOf {
                    sub: ConceptTree::Name(name),
                    sup,
                } => fresh.dag.declare_concept(ConceptDefinition {
                    name: name.clone(),
                    primitive: true,
                    body: sup.clone(),
                }),
                Axiom::EquivalentClasses(list) if list.len() == 2 => {
                    if let ConceptTree::Name(name) = &list[0] {
                        fresh.dag.declare_concept(ConceptDefinition {
                            name: name.clone(),
                            primitive: false,
                            body: list[1].clone(),
                        });
                    } else if let ConceptTree::Name(name) = &list[1] {
                        fresh.dag.declare_concept(ConceptDefinition {
                            name: name.clone(),
                            primitive: false,
                            body: list[0].clone(),
                        });
                    }
                }
                _ => {}
            }
        }

        // Pass 2: general GCIs, folded into `T_G`.
        for axiom in &live {
            match axiom {
                Axiom::SubClassOf { sub, sup } if !matches!(sub, ConceptTree::Name(_)) => {
                    let gci_body =
                        ConceptTree::Or(vec![ConceptTree::Not(Box::new(sub.clone())), sup.clone()]);
                    let bp = fresh.dag.add_tree(&gci_body, &fresh.roles)?;
                    fresh.dag.add_gci(bp);
                }
                Axiom::EquivalentClasses(list) => {
                    let named = list.len() == 2
                        && (matches!(list[0], ConceptTree::Name(_)) || matches!(list[1], ConceptTree::Name(_)));
                    if named {
                        continue;
                    }
                    for i in 1..list.len() {
                        let left = &list[0];
                        let right = &list[i];
                        let body = ConceptTree::And(vec![
                            ConceptTree::Or(vec![ConceptTree::Not(Box::new(left.clone())), right.clone()]),
                            ConceptTree::Or(vec![ConceptTree::Not(Box::new(right.clone())), left.clone()]),
                        ]);
                        let bp = fresh.dag.add_tree(&body, &fresh.roles)?;
                        fresh.dag.add_gci(bp);
                    }
                }
                Axiom::DisjointClasses(list) => {
                    for i in 0..list.len() {
                        for j in (i + 1)..list.len() {
                            let body = ConceptTree::Or(vec![
                                ConceptTree::Not(Box::new(list[i].clone())),
                                ConceptTree::Not(Box::new(list[j].clone())),
                            ]);
                            let bp = fresh.dag.add_tree(&body, &fresh.roles)?;
                            fresh.dag.add_gci(bp);
                        }
                    }
                }
                // A role-level irreflexivity characteristic ("R is
                // irreflexive") is universally quantified over every
                // individual, i.e. `⊤ ⊑ Irr(R)`.
                Axiom::IrreflexiveRole(role) => {
                    let bp = fresh.dag.add_tree(&ConceptTree::Irreflexive(*role), &fresh.roles)?;
                    fresh.dag.add_gci(bp);
                }
                _ => {}
            }
        }

        // Pass 3: ABox — individuals, their nominal pointers, concept
        // and role assertions, identity claims.
        let mut seen = hashbrown::HashSet::new();
        for axiom in &live {
            for name in axiom_individuals(axiom) {
                if seen.insert(name.clone()) {
                    fresh.individuals.push(name);
                }
            }
        }
        for name in &fresh.individuals {
            let bp = fresh.dag.add_tree(&ConceptTree::OneOf(name.clone()), &fresh.roles)?;
            fresh.nominal_pointers.insert(name.clone(), bp);
        }
        for axiom in &live {
            match axiom {
                Axiom::ConceptAssertion { individual, concept } => {
                    let bp = fresh.dag.add_tree(concept, &fresh.roles)?;
                    fresh.concept_assertions.push((individual.clone(), bp));
                }
                Axiom::RoleAssertion { subject, role, object } => {
                    fresh
                        .role_assertions
                        .push((subject.clone(), *role, object.clone()));
                }
                Axiom::NegativeRoleAssertion { .. } => {
                    warn!("negative role assertions are recorded but not enforced by the ABox builder");
                }
                Axiom::SameIndividual(list) => {
                    for i in 1..list.len() {
                        fresh.same_individuals.push((list[0].clone(), list[i].clone()));
                    }
                }
                Axiom::DifferentIndividuals(list) => {
                    for i in 0..list.len() {
                        for j in (i + 1)..list.len() {
                            fresh.different_individuals.push((list[i].clone(), list[j].clone()));
                        }
                    }
                }
                _ => {}
            }
        }

        fresh.preprocessed = true;
        fresh.dirty = false;
        *kb = fresh;
        Ok(())
    }

    fn ensure_preprocessed(&mut self) -> KernelResult<()> {
        let needs_it = self
            .kb
            .as_ref()
            .ok_or(KernelError::NoOpenKb)?
            .dirty;
        if needs_it {
            self.preprocess()?;
        }
        Ok(())
    }

    fn trivially_entailed_if_inconsistent(&self) -> bool {
        self.kb.as_ref().map(|kb| kb.inconsistent).unwrap_or(false)
    }

    // ---- Queries --------------------------------------------------------

    pub fn is_consistent(&mut self) -> KernelResult<Answer> {
        self.ensure_preprocessed()?;
        if self.kb.as_ref().ok_or(KernelError::NoOpenKb)?.inconsistent {
            return Ok(Answer::No);
        }
        let has_individuals = !self.kb.as_ref().ok_or(KernelError::NoOpenKb)?.individuals.is_empty();
        let (outcome, degraded) = if has_individuals {
            self.run_abox(None)?
        } else {
            // `run_single` already folds in `T_G` via the engine's own
            // `run()`; TOP as the probe concept just asks "is the GCI
            // conjunction alone satisfiable?".
            self.run_single(BipolarPointer::TOP)?
        };
        if matches!(outcome, TableauOutcome::Unsatisfiable) {
            self.kb.as_mut().ok_or(KernelError::NoOpenKb)?.inconsistent = true;
        }
        Ok(match outcome {
            TableauOutcome::Unsatisfiable => Answer::No,
            TableauOutcome::Satisfiable if degraded => Answer::Unknown,
            TableauOutcome::Satisfiable => Answer::Yes,
        })
    }

    pub fn is_satisfiable(&mut self, concept: &ConceptTree) -> KernelResult<Answer> {
        self.ensure_preprocessed()?;
        if self.trivially_entailed_if_inconsistent() {
            return Ok(Answer::Yes);
        }
        let kb = self.kb.as_mut().ok_or(KernelError::NoOpenKb)?;
        let bp = kb.dag.add_tree(concept, &kb.roles)?;
        let (outcome, degraded) = self.run_single(bp)?;
        Ok(Self::sat_answer(outcome, degraded))
    }

    pub fn is_subsumed(&mut self, sub: &ConceptTree, sup: &ConceptTree) -> KernelResult<Answer> {
        self.ensure_preprocessed()?;
        if self.trivially_entailed_if_inconsistent() {
            return Ok(Answer::Yes);
        }
        let kb = self.kb.as_mut().ok_or(KernelError::NoOpenKb)?;
        let witness = ConceptTree::And(vec![sub.clone(), ConceptTree::Not(Box::new(sup.clone()))]);
        let bp = kb.dag.add_tree(&witness, &kb.roles)?;
        let (outcome, degraded) = self.run_single(bp)?;
        Ok(Self::unsat_answer(outcome, degraded))
    }

    pub fn is_disjoint(&mut self, a: &ConceptTree, b: &ConceptTree) -> KernelResult<Answer> {
        self.ensure_preprocessed()?;
        if self.trivially_entailed_if_inconsistent() {
            return Ok(Answer::Yes);
        }
        let kb = self.kb.as_mut().ok_or(KernelError::NoOpenKb)?;
        let witness = ConceptTree::And(vec![a.clone(), b.clone()]);
        let bp = kb.dag.add_tree(&witness, &kb.roles)?;
        let (outcome, degraded) = self.run_single(bp)?;
        Ok(Self::unsat_answer(outcome, degraded))
    }

    pub fn is_equivalent(&mut self, a: &ConceptTree, b: &ConceptTree) -> KernelResult<Answer> {
        let left = self.is_subsumed(a, b)?;
        let right = self.is_subsumed(b, a)?;
        Ok(Self::conjoin(left, right))
    }

    pub fn is_instance(&mut self, individual: &IRI, concept: &ConceptTree) -> KernelResult<Answer> {
        self.ensure_preprocessed()?;
        if self.trivially_entailed_if_inconsistent() {
            return Ok(Answer::Yes);
        }
        {
            let kb = self.kb.as_ref().ok_or(KernelError::NoOpenKb)?;
            if !kb.individuals.contains(individual) {
                return Err(KernelError::Unsupported(format!(
                    "unknown individual {individual} in isInstance"
                )));
            }
        }
        let kb = self.kb.as_mut().ok_or(KernelError::NoOpenKb)?;
        let not_concept = ConceptTree::Not(Box::new(concept.clone()));
        let bp = kb.dag.add_tree(&not_concept, &kb.roles)?;
        let (outcome, degraded) = self.run_abox(Some((individual.clone(), bp)))?;
        Ok(Self::unsat_answer(outcome, degraded))
    }

    pub fn is_related(&mut self, subject: &IRI, role: RoleId, object: &IRI) -> KernelResult<Answer> {
        self.ensure_preprocessed()?;
        if self.trivially_entailed_if_inconsistent() {
            return Ok(Answer::Yes);
        }
        {
            let kb = self.kb.as_ref().ok_or(KernelError::NoOpenKb)?;
            if !kb.individuals.contains(subject) || !kb.individuals.contains(object) {
                return Err(KernelError::Unsupported(format!(
                    "unknown individual in isRelated({subject}, ..., {object})"
                )));
            }
        }
        let kb = self.kb.as_mut().ok_or(KernelError::NoOpenKb)?;
        let witness = ConceptTree::Forall(
            role,
            Box::new(ConceptTree::Not(Box::new(ConceptTree::OneOf(object.clone())))),
        );
        let bp = kb.dag.add_tree(&witness, &kb.roles)?;
        let (outcome, degraded) = self.run_abox(Some((subject.clone(), bp)))?;
        Ok(Self::unsat_answer(outcome, degraded))
    }

    fn sat_answer(outcome: TableauOutcome, degraded: bool) -> Answer {
        match outcome {
            TableauOutcome::Satisfiable if degraded => Answer::Unknown,
            TableauOutcome::Satisfiable => Answer::Yes,
            TableauOutcome::Unsatisfiable => Answer::No,
        }
    }

    fn unsat_answer(outcome: TableauOutcome, degraded: bool) -> Answer {
        match outcome {
            TableauOutcome::Unsatisfiable if degraded => Answer::Unknown,
            TableauOutcome::Unsatisfiable => Answer::Yes,
            TableauOutcome::Satisfiable => Answer::No,
        }
    }

    fn conjoin(a: Answer, b: Answer) -> Answer {
        match (a, b) {
            (Answer::No, _) | (_, Answer::No) => Answer::No,
            (Answer::Unknown, _) | (_, Answer::Unknown) => Answer::Unknown,
            (Answer::Yes, Answer::Yes) => Answer::Yes,
        }
    }

    /// Run a single fresh root labelled `concept` to completion.
    fn run_single(&mut self, concept: BipolarPointer) -> KernelResult<(TableauOutcome, bool)> {
        let kb = self.kb.as_ref().ok_or(KernelError::NoOpenKb)?;
        let mut engine = TableauEngine::new(
            &kb.dag,
            &kb.roles,
            &kb.datatypes,
            kb.regime,
            self.options.blocking_strategy,
            self.options.timeout_ms,
        );
        if let Some(monitor) = self.progress_monitor.as_deref_mut() {
            monitor.on_run_start();
        }
        let outcome = engine.run(concept)?;
        if let Some(monitor) = self.progress_monitor.as_deref_mut() {
            monitor.on_run_end(outcome);
        }
        Ok((outcome, engine.degraded()))
    }

    /// Seed every known individual as its own node (singleton label,
    /// asserted concepts, GCI, role edges, identity/distinctness facts)
    /// and run to completion. If `extra` names an individual, its
    /// concept is asserted on that individual's node before the run
    /// (the negated-witness trick `isInstance`/`isRelated` use).
    fn run_abox(&mut self, extra: Option<(IRI, BipolarPointer)>) -> KernelResult<(TableauOutcome, bool)> {
        let kb = self.kb.as_ref().ok_or(KernelError::NoOpenKb)?;
        let mut engine = TableauEngine::new(
            &kb.dag,
            &kb.roles,
            &kb.datatypes,
            kb.regime,
            self.options.blocking_strategy,
            self.options.timeout_ms,
        );
        let nodes = seed_abox(kb, &mut engine);
        if let Some((name, bp)) = extra {
            let node = *nodes
                .get(&name)
                .ok_or_else(|| KernelError::Internal(format!("individual {name} missing from ABox")))?;
            engine.assert_concept(node, bp);
        }
        if let Some(monitor) = self.progress_monitor.as_deref_mut() {
            monitor.on_run_start();
        }
        let outcome = engine.run_seeded()?;
        if let Some(monitor) = self.progress_monitor.as_deref_mut() {
            monitor.on_run_end(outcome);
        }
        Ok((outcome, engine.degraded()))
    }
}

fn seed_abox<'k>(kb: &'k KnowledgeBase, engine: &mut TableauEngine<'k>) -> HashMap<IRI, NodeId> {
    let mut nodes = HashMap::new();
    for (i, name) in kb.individuals.iter().enumerate() {
        let Some(&bp) = kb.nominal_pointers.get(name) else {
            continue;
        };
        let node = engine.seed_node(bp, i as i32);
        if !kb.dag.gci().is_top() {
            engine.assert_concept(node, kb.dag.gci());
        }
        nodes.insert(name.clone(), node);
    }
    for (name, bp) in &kb.concept_assertions {
        if let Some(&node) = nodes.get(name) {
            engine.assert_concept(node, *bp);
        }
    }
    for (subject, role, object) in &kb.role_assertions {
        if let (Some(&from), Some(&to)) = (nodes.get(subject), nodes.get(object)) {
            engine.connect(from, *role, to);
        }
    }
    for (a, b) in &kb.same_individuals {
        if let (Some(&na), Some(&nb)) = (nodes.get(a), nodes.get(b)) {
            if let (Some(&bp_a), Some(&bp_b)) = (kb.nominal_pointers.get(a), kb.nominal_pointers.get(b)) {
                engine.assert_concept(na, bp_b);
                engine.assert_concept(nb, bp_a);
            }
        }
    }
    for (a, b) in &kb.different_individuals {
        if let (Some(&na), Some(&nb)) = (nodes.get(a), nodes.get(b)) {
            engine.assert_distinct(na, nb);
        }
    }
    nodes
}

fn axiom_individuals(axiom: &Axiom) -> Vec<IRI> {
    match axiom {
        Axiom::ConceptAssertion { individual, .. } => vec![individual.clone()],
        Axiom::RoleAssertion { subject, object, .. } => vec![subject.clone(), object.clone()],
        Axiom::NegativeRoleAssertion { subject, object, .. } => vec![subject.clone(), object.clone()],
        Axiom::SameIndividual(list) | Axiom::DifferentIndividuals(list) => list.clone(),
        _ => Vec::new(),
    }
}

fn axiom_has_qualified_number_restriction(axiom: &Axiom) -> bool {
    match axiom {
        Axiom::SubClassOf { sub, sup } => tree_has_qnr(sub) || tree_has_qnr(sup),
        Axiom::EquivalentClasses(list) | Axiom::DisjointClasses(list) => list.iter().any(tree_has_qnr),
        Axiom::ConceptAssertion { concept, .. } => tree_has_qnr(concept),
        _ => false,
    }
}

fn tree_has_qnr(tree: &ConceptTree) -> bool {
    match tree {
        ConceptTree::AtMost(..) | ConceptTree::AtLeast(..) => true,
        ConceptTree::Not(inner) => tree_has_qnr(inner),
        ConceptTree::And(list) | ConceptTree::Or(list) => list.iter().any(tree_has_qnr),
        ConceptTree::Forall(_, child) | ConceptTree::Exists(_, child) => tree_has_qnr(child),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iri(s: &str) -> IRI {
        IRI::new(format!("http://example.org/{s}")).unwrap()
    }

    #[test]
    fn new_kb_rejects_double_open() {
        let mut k = Kernel::new();
        k.new_kb().unwrap();
        assert!(matches!(k.new_kb(), Err(KernelError::KbAlreadyOpen)));
    }

    #[test]
    fn top_is_satisfiable_bottom_is_not() {
        let mut k = Kernel::new();
        k.new_kb().unwrap();
        assert_eq!(k.is_satisfiable(&ConceptTree::Top).unwrap(), Answer::Yes);
        assert_eq!(k.is_satisfiable(&ConceptTree::Bottom).unwrap(), Answer::No);
    }

    #[test]
    fn subsumed_by_top_always_holds() {
        let mut k = Kernel::new();
        k.new_kb().unwrap();
        let c = ConceptTree::Name(iri("C"));
        assert_eq!(k.is_subsumed(&c, &ConceptTree::Top).unwrap(), Answer::Yes);
    }

    #[test]
    fn scenario_cyclic_primitive_concept_is_satisfiable() {
        // A ⊑ ∃R.A, query isSatisfiable(A) → YES (blocks via B1/SH).
        let mut k = Kernel::new();
        k.new_kb().unwrap();
        let role = RoleId(0);
        let a = iri("A");
        k.add_axiom(Axiom::SubClassOf {
            sub: ConceptTree::Name(a.clone()),
            sup: ConceptTree::Exists(role, Box::new(ConceptTree::Name(a.clone()))),
        })
        .unwrap();
        assert_eq!(
            k.is_satisfiable(&ConceptTree::Name(a)).unwrap(),
            Answer::Yes
        );
    }

    #[test]
    fn scenario_forall_exists_clash_is_unsatisfiable() {
        // A ⊑ ∃R.B, A ⊑ ∀R.¬B, isSatisfiable(A) → NO.
        let mut k = Kernel::new();
        k.new_kb().unwrap();
        let role = RoleId(0);
        let a = iri("A");
        let b = iri("B");
        k.add_axiom(Axiom::SubClassOf {
            sub: ConceptTree::Name(a.clone()),
            sup: ConceptTree::Exists(role, Box::new(ConceptTree::Name(b.clone()))),
        })
        .unwrap();
        k.add_axiom(Axiom::SubClassOf {
            sub: ConceptTree::Name(a.clone()),
            sup: ConceptTree::Forall(
                role,
                Box::new(ConceptTree::Not(Box::new(ConceptTree::Name(b)))),
            ),
        })
        .unwrap();
        assert_eq!(
            k.is_satisfiable(&ConceptTree::Name(a)).unwrap(),
            Answer::No
        );
    }

    #[test]
    fn scenario_nominal_clash_is_inconsistent() {
        let mut k = Kernel::new();
        k.new_kb().unwrap();
        let o = iri("o");
        let a = iri("A");
        k.add_axiom(Axiom::ConceptAssertion {
            individual: o.clone(),
            concept: ConceptTree::Name(a.clone()),
        })
        .unwrap();
        k.add_axiom(Axiom::ConceptAssertion {
            individual: o,
            concept: ConceptTree::Not(Box::new(ConceptTree::Name(a))),
        })
        .unwrap();
        assert_eq!(k.is_consistent().unwrap(), Answer::No);
    }

    #[test]
    fn at_most_zero_and_at_least_one_clash() {
        let mut k = Kernel::new();
        k.new_kb().unwrap();
        let role = RoleId(0);
        let tree = ConceptTree::And(vec![
            ConceptTree::AtMost(0, role, Box::new(ConceptTree::Top)),
            ConceptTree::AtLeast(1, role, Box::new(ConceptTree::Top)),
        ]);
        assert_eq!(k.is_satisfiable(&tree).unwrap(), Answer::No);
    }
}
