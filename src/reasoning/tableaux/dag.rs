//! Concept DAG (C3): canonical, shared, bipolar store of concept
//! formulas.
//!
//! Grounded in `examples/original_source/Kernel/BuildDAG.cpp`'s
//! `tree2dag`/`addConceptToHeap`/`forall2dag`/`atmost2dag` dispatch, but
//! expressed as an arena of tagged `DagVertex` values addressed by
//! index rather than a garbage-collected heap of C++ objects — there is
//! no equivalent of the source's `DLHeap` node deletion; the DAG is
//! append-only after construction (spec.md §4.1).

use crate::error::{KernelError, KernelResult};
use crate::frontend::{ConceptDefinition, ConceptTree};
use crate::iri::IRI;
use crate::reasoning::tableaux::datatype::Literal;
use crate::reasoning::tableaux::role::{AutomatonState, RoleId, RoleSystem};
use hashbrown::HashMap;

/// A non-negative vertex index paired with a sign, per spec.md §3:
/// `+i` denotes concept `C_i`, `-i` denotes `¬C_i`. Negation is a pure
/// sign flip, never a separate node. Magnitude `1` is reserved for the
/// distinguished `TOP`/`BOTTOM` pair; real vertices start at magnitude
/// `2`, mapped to array index `magnitude - 2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BipolarPointer(i64);

impl BipolarPointer {
    pub const TOP: BipolarPointer = BipolarPointer(1);
    pub const BOTTOM: BipolarPointer = BipolarPointer(-1);

    fn from_index(index: usize) -> Self {
        BipolarPointer(index as i64 + 2)
    }

    /// Array index into [`ConceptDag`]'s vertex store, or `None` for
    /// `TOP`/`BOTTOM`, which have no backing vertex.
    pub fn index(&self) -> Option<usize> {
        let magnitude = self.0.unsigned_abs();
        if magnitude <= 1 {
            None
        } else {
            Some((magnitude - 2) as usize)
        }
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Pure sign flip — double negation is the identity (spec.md §8 Laws).
    pub fn negate(&self) -> BipolarPointer {
        BipolarPointer(-self.0)
    }

    pub fn is_top(&self) -> bool {
        *self == BipolarPointer::TOP
    }

    pub fn is_bottom(&self) -> bool {
        *self == BipolarPointer::BOTTOM
    }
}

/// Tagged DAG vertex. One entry per distinct (up to structural sharing)
/// concept expression; negation is carried by the pointer, not the
/// vertex, so there is no `NOT` tag here.
#[derive(Debug, Clone, PartialEq)]
pub enum DagVertex {
    And(Vec<BipolarPointer>),
    Forall {
        state: AutomatonState,
        role: RoleId,
        child: BipolarPointer,
    },
    Le {
        n: u32,
        role: RoleId,
        child: BipolarPointer,
    },
    Irr {
        role: RoleId,
    },
    /// Named, primitively-defined concept (`A ⊑ body`, or no body at
    /// all). `body` is `None` while the concept is under construction
    /// (the cycle placeholder) or for a concept with no asserted
    /// definition.
    PConcept {
        name: IRI,
        body: Option<BipolarPointer>,
    },
    /// Named, fully-defined concept (`A ≡ body`).
    NConcept {
        name: IRI,
        body: Option<BipolarPointer>,
    },
    PSingleton {
        name: IRI,
    },
    NSingleton {
        name: IRI,
    },
    Datatype {
        datatype: IRI,
    },
    DataValue {
        literal: Literal,
    },
    DataExpr {
        role: RoleId,
        datatype: IRI,
    },
}

/// Structural key used to canonicalise anonymous vertices (spec.md §4.1:
/// "when `addTree` produces a vertex equal to an existing one, return
/// the existing pointer"). Named concepts and nominals are canonicalised
/// by their own name-keyed tables instead, so they have no key here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum VertexKey {
    And(Vec<BipolarPointer>),
    Forall(AutomatonState, RoleId, BipolarPointer),
    Le(u32, RoleId, BipolarPointer),
    Irr(RoleId),
    Datatype(IRI),
    DataValue(IRI, String),
    DataExpr(RoleId, IRI),
}

fn vertex_key(vertex: &DagVertex) -> Option<VertexKey> {
    match vertex {
        DagVertex::And(children) => Some(VertexKey::And(children.clone())),
        DagVertex::Forall { state, role, child } => {
            Some(VertexKey::Forall(*state, *role, *child))
        }
        DagVertex::Le { n, role, child } => Some(VertexKey::Le(*n, *role, *child)),
        DagVertex::Irr { role } => Some(VertexKey::Irr(*role)),
        DagVertex::Datatype { datatype } => Some(VertexKey::Datatype(datatype.clone())),
        DagVertex::DataValue { literal } => Some(VertexKey::DataValue(
            literal.datatype.clone(),
            literal.lexical_form.clone(),
        )),
        DagVertex::DataExpr { role, datatype } => {
            Some(VertexKey::DataExpr(*role, datatype.clone()))
        }
        DagVertex::PConcept { .. }
        | DagVertex::NConcept { .. }
        | DagVertex::PSingleton { .. }
        | DagVertex::NSingleton { .. } => None,
    }
}

/// A named concept's bookkeeping entry (spec.md §3 "Concept entry").
#[derive(Debug, Clone)]
pub struct ConceptEntry {
    pub name: IRI,
    pub primitive: bool,
    pub bp_body: Option<BipolarPointer>,
    pub p_name: BipolarPointer,
    /// Was this concept closed as a cycle placeholder because it
    /// referenced itself during construction? (spec.md §9.)
    pub incomplete: bool,
}

/// Canonical, shared, bipolar store of concept formulas (C3).
#[derive(Debug, Default)]
pub struct ConceptDag {
    vertices: Vec<DagVertex>,
    dedup: HashMap<VertexKey, BipolarPointer>,
    concepts: HashMap<IRI, ConceptEntry>,
    definitions: HashMap<IRI, ConceptDefinition>,
    singletons: HashMap<IRI, BipolarPointer>,
    /// Accumulated GCI conjunction pointer (`T_G`), applied to every
    /// node (spec.md §4.3 step 5). Starts at `TOP` (no GCIs yet).
    gci: BipolarPointer,
    /// Set once an `AND` clash-to-`BOTTOM` reduction fires; disables
    /// sort-based optimisations globally for the KB (spec.md §4.1).
    sort_optimizations_disabled: bool,
}

impl ConceptDag {
    pub fn new() -> Self {
        ConceptDag {
            vertices: Vec::new(),
            dedup: HashMap::new(),
            concepts: HashMap::new(),
            definitions: HashMap::new(),
            singletons: HashMap::new(),
            gci: BipolarPointer::TOP,
            sort_optimizations_disabled: false,
        }
    }

    /// Register a named concept's definition ahead of lowering. Must be
    /// called before any `add_tree` call references the name, i.e.
    /// during preprocessing's axiom-folding pass.
    pub fn declare_concept(&mut self, definition: ConceptDefinition) {
        self.definitions.insert(definition.name.clone(), definition);
    }

    pub fn vertex(&self, bp: BipolarPointer) -> Option<&DagVertex> {
        bp.index().map(|i| &self.vertices[i])
    }

    pub fn concept_entry(&self, name: &IRI) -> Option<&ConceptEntry> {
        self.concepts.get(name)
    }

    /// Look up an already-materialised `FORALL(state, role, child)`
    /// vertex without creating one. Non-simple roles have every
    /// automaton state's vertex eagerly materialised by `add_tree`
    /// (spec.md §4.1), so this only returns `None` for a state the role
    /// system never declared.
    pub fn forall_pointer(
        &self,
        role: RoleId,
        state: AutomatonState,
        child: BipolarPointer,
    ) -> Option<BipolarPointer> {
        self.dedup
            .get(&VertexKey::Forall(state, role, child))
            .copied()
    }

    pub fn gci(&self) -> BipolarPointer {
        self.gci
    }

    /// Fold another GCI body into `T_G` as a conjunct.
    pub fn add_gci(&mut self, body: BipolarPointer) {
        self.gci = self.intern_and(vec![self.gci, body]);
    }

    pub fn sort_optimizations_disabled(&self) -> bool {
        self.sort_optimizations_disabled
    }

    /// Lower a concept expression tree into the DAG (spec.md §4.1).
    pub fn add_tree(
        &mut self,
        tree: &ConceptTree,
        roles: &dyn RoleSystem,
    ) -> KernelResult<BipolarPointer> {
        match tree {
            ConceptTree::Top => Ok(BipolarPointer::TOP),
            ConceptTree::Bottom => Ok(BipolarPointer::BOTTOM),
            ConceptTree::Name(name) => self.concept2dag(name, roles),
            ConceptTree::Not(inner) => Ok(self.add_tree(inner, roles)?.negate()),
            ConceptTree::And(children) => self.build_and(children, roles),
            ConceptTree::Or(children) => {
                // De Morgan: ⋁ cᵢ = ¬⋀ ¬cᵢ, reusing the AND clash check.
                let negated: Vec<ConceptTree> = children
                    .iter()
                    .map(|c| ConceptTree::Not(Box::new(c.clone())))
                    .collect();
                Ok(self.build_and(&negated, roles)?.negate())
            }
            ConceptTree::Forall(role, child) => self.build_forall(*role, child, roles),
            ConceptTree::Exists(role, child) => {
                // ∃R.C = ¬∀R.¬C
                let negated = ConceptTree::Not(child.clone());
                Ok(self.build_forall(*role, &negated, roles)?.negate())
            }
            ConceptTree::AtMost(n, role, child) => self.build_le(*n, *role, child, roles),
            ConceptTree::AtLeast(n, role, child) => {
                // ≥n R.C = ¬(≤(n-1) R.C); ≥0 is vacuously TOP.
                if *n == 0 {
                    return Ok(BipolarPointer::TOP);
                }
                Ok(self.build_le(n - 1, *role, child, roles)?.negate())
            }
            ConceptTree::Irreflexive(role) => Ok(self.intern(DagVertex::Irr { role: *role })),
            ConceptTree::OneOf(name) => self.singleton2dag(name),
            ConceptTree::DataSomeValuesFrom(role, datatype)
            | ConceptTree::DataAllValuesFrom(role, datatype) => {
                Ok(self.intern(DagVertex::DataExpr {
                    role: *role,
                    datatype: datatype.clone(),
                }))
            }
        }
    }

    fn intern(&mut self, vertex: DagVertex) -> BipolarPointer {
        if let Some(key) = vertex_key(&vertex) {
            if let Some(&bp) = self.dedup.get(&key) {
                return bp;
            }
            let bp = BipolarPointer::from_index(self.vertices.len());
            self.vertices.push(vertex);
            self.dedup.insert(key, bp);
            bp
        } else {
            let bp = BipolarPointer::from_index(self.vertices.len());
            self.vertices.push(vertex);
            bp
        }
    }

    fn intern_and(&mut self, mut children: Vec<BipolarPointer>) -> BipolarPointer {
        children.retain(|&bp| !bp.is_top());
        if children.iter().any(|&bp| bp.is_bottom()) {
            return BipolarPointer::BOTTOM;
        }
        if children.is_empty() {
            return BipolarPointer::TOP;
        }
        if children.len() == 1 {
            return children[0];
        }
        self.intern(DagVertex::And(children))
    }

    fn flatten_and_into(&self, bp: BipolarPointer, out: &mut Vec<BipolarPointer>) {
        if bp.is_positive() {
            if let Some(DagVertex::And(children)) = self.vertex(bp) {
                out.extend(children.iter().copied());
                return;
            }
        }
        out.push(bp);
    }

    /// Build an `AND` vertex: flatten nested `AND`s, reduce a trivial
    /// `C ∧ ¬C` clash to `BOTTOM` (disabling sort-based optimisations
    /// for the rest of this KB), simplify to the single child if unary.
    fn build_and(
        &mut self,
        children: &[ConceptTree],
        roles: &dyn RoleSystem,
    ) -> KernelResult<BipolarPointer> {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            let bp = self.add_tree(child, roles)?;
            self.flatten_and_into(bp, &mut flat);
        }

        let mut unique = Vec::with_capacity(flat.len());
        let mut seen: hashbrown::HashSet<BipolarPointer> = hashbrown::HashSet::new();
        for bp in flat {
            if seen.contains(&bp.negate()) {
                self.sort_optimizations_disabled = true;
                return Ok(BipolarPointer::BOTTOM);
            }
            if seen.insert(bp) {
                unique.push(bp);
            }
        }

        Ok(self.intern_and(unique))
    }

    fn build_forall(
        &mut self,
        role: RoleId,
        child: &ConceptTree,
        roles: &dyn RoleSystem,
    ) -> KernelResult<BipolarPointer> {
        let child_bp = self.add_tree(child, roles)?;
        if roles.is_simple(role) {
            return Ok(self.intern(DagVertex::Forall {
                state: 0,
                role,
                child: child_bp,
            }));
        }
        let mut initial = None;
        for state in roles.automaton_states(role) {
            let bp = self.intern(DagVertex::Forall {
                state,
                role,
                child: child_bp,
            });
            if state == 0 {
                initial = Some(bp);
            }
        }
        initial.ok_or_else(|| {
            KernelError::Internal(format!(
                "role automaton for {role:?} has no initial state 0"
            ))
        })
    }

    /// Build an `LE(n, R, C)` vertex, pre-materialising `LE(m, R, C)`
    /// for `m = n-1 .. 1` as spec.md §4.1 mandates (used by transitive
    /// closure of sub-roles during blocking/expansion).
    fn build_le(
        &mut self,
        n: u32,
        role: RoleId,
        child: &ConceptTree,
        roles: &dyn RoleSystem,
    ) -> KernelResult<BipolarPointer> {
        let child_bp = self.add_tree(child, roles)?;
        let mut result = None;
        let mut m = n;
        loop {
            let bp = self.intern(DagVertex::Le {
                n: m,
                role,
                child: child_bp,
            });
            if m == n {
                result = Some(bp);
            }
            if m == 0 {
                break;
            }
            m -= 1;
        }
        Ok(result.expect("loop always visits m == n"))
    }

    /// Resolve (and, if needed, lower) a named concept, implementing
    /// the two-phase cycle-placeholder construction of spec.md §9: a
    /// placeholder vertex is inserted and memoised before its body is
    /// lowered, so a self-reference encountered while lowering the body
    /// resolves to the placeholder pointer rather than recursing
    /// forever; when the recursion unwinds the body is patched in.
    fn concept2dag(&mut self, name: &IRI, roles: &dyn RoleSystem) -> KernelResult<BipolarPointer> {
        if let Some(entry) = self.concepts.get(name) {
            return Ok(entry.p_name);
        }

        let definition = self.definitions.get(name).cloned();
        let primitive = definition.as_ref().map(|d| d.primitive).unwrap_or(true);

        let placeholder_index = self.vertices.len();
        self.vertices.push(if primitive {
            DagVertex::PConcept {
                name: name.clone(),
                body: None,
            }
        } else {
            DagVertex::NConcept {
                name: name.clone(),
                body: None,
            }
        });
        let p_name = BipolarPointer::from_index(placeholder_index);

        self.concepts.insert(
            name.clone(),
            ConceptEntry {
                name: name.clone(),
                primitive,
                bp_body: None,
                p_name,
                // True for the duration of lowering the body below: a
                // self-reference reached during that call sees the
                // placeholder through this entry while it is still a
                // cycle stub with no body attached.
                incomplete: definition.is_some(),
            },
        );

        let body_bp = match definition {
            Some(def) => Some(self.add_tree(&def.body, roles)?),
            None => None,
        };

        // A self-reference during the call above would already have
        // returned `p_name` from the early-out at the top of this
        // function, observing `incomplete == true`; the placeholder is
        // exactly what made that recursive reference well-defined. Now
        // that the body has fully resolved, attach it and clear the flag.
        if let Some(entry) = self.concepts.get_mut(name) {
            entry.bp_body = body_bp;
            entry.incomplete = false;
        }
        match &mut self.vertices[placeholder_index] {
            DagVertex::PConcept { body, .. } | DagVertex::NConcept { body, .. } => {
                *body = body_bp;
            }
            _ => unreachable!("placeholder index always holds a P/NConcept vertex"),
        }

        Ok(p_name)
    }

    fn singleton2dag(&mut self, name: &IRI) -> KernelResult<BipolarPointer> {
        if let Some(&bp) = self.singletons.get(name) {
            return Ok(bp);
        }
        let bp = BipolarPointer::from_index(self.vertices.len());
        self.vertices.push(DagVertex::PSingleton { name: name.clone() });
        self.singletons.insert(name.clone(), bp);
        Ok(bp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::tableaux::role::SimpleRoleSystem;

    fn iri(s: &str) -> IRI {
        IRI::new(format!("http://example.org/{s}")).unwrap()
    }

    #[test]
    fn double_negation_is_identity() {
        let bp = BipolarPointer::from_index(0);
        assert_eq!(bp.negate().negate(), bp);
    }

    #[test]
    fn sharing_returns_same_pointer() {
        let roles = SimpleRoleSystem::new();
        let mut dag = ConceptDag::new();
        let tree = ConceptTree::And(vec![ConceptTree::Top, ConceptTree::Bottom]);
        let a = dag.add_tree(&tree, &roles).unwrap();
        let b = dag.add_tree(&tree, &roles).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn and_with_clashing_children_reduces_to_bottom() {
        let roles = SimpleRoleSystem::new();
        let mut dag = ConceptDag::new();
        let name = ConceptTree::Name(iri("A"));
        let not_name = ConceptTree::Not(Box::new(name.clone()));
        let tree = ConceptTree::And(vec![name, not_name]);
        let bp = dag.add_tree(&tree, &roles).unwrap();
        assert!(bp.is_bottom());
        assert!(dag.sort_optimizations_disabled());
    }

    #[test]
    fn cyclic_concept_gets_placeholder_not_infinite_recursion() {
        let roles = SimpleRoleSystem::new();
        let mut dag = ConceptDag::new();
        let role = RoleId(0);
        let a_name = iri("A");
        // A ⊑ ∃R.A
        dag.declare_concept(ConceptDefinition {
            name: a_name.clone(),
            primitive: true,
            body: ConceptTree::Exists(role, Box::new(ConceptTree::Name(a_name.clone()))),
        });
        let bp = dag.add_tree(&ConceptTree::Name(a_name.clone()), &roles).unwrap();
        let entry = dag.concept_entry(&a_name).unwrap();
        assert_eq!(entry.p_name, bp);
        assert!(!entry.incomplete, "resolved: body was lowered and attached");
        assert!(entry.bp_body.is_some());
        match dag.vertex(bp) {
            Some(DagVertex::PConcept { body: Some(_), .. }) => {}
            other => panic!("expected resolved placeholder with attached body, got {other:?}"),
        }
    }

    #[test]
    fn at_least_lowers_via_negated_at_most() {
        let roles = SimpleRoleSystem::new();
        let mut dag = ConceptDag::new();
        let role = RoleId(0);
        let tree = ConceptTree::AtLeast(2, role, Box::new(ConceptTree::Top));
        let bp = dag.add_tree(&tree, &roles).unwrap();
        assert!(!bp.is_positive());
        match dag.vertex(bp) {
            Some(DagVertex::Le { n: 1, .. }) => {}
            other => panic!("expected LE(1, ...) backing ≥2, got {other:?}"),
        }
    }
}
