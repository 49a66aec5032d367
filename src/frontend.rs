//! Axiom / concept-tree front end surface (§6).
//!
//! spec.md §1 keeps the actual axiom/ontology front end external: this
//! module only defines the shape of what it hands to the core —
//! concept expression trees that [`dag::ConceptDag::add_tree`] lowers,
//! and the axiom kinds the kernel accumulates before `preprocess`.
//! Grounded in the shape of the teacher's `axioms/class_expressions.rs`
//! (the same constructor vocabulary: `And`/`Or`/`Not`/`ObjectSomeValuesFrom`/
//! `ObjectAllValuesFrom`/`ObjectMinCardinality`/`ObjectMaxCardinality`),
//! but self-contained: the teacher's version pulled in a
//! `property_expressions` module that is not part of this retrieval and
//! is not needed for the tableau core itself.

use crate::iri::IRI;
use crate::reasoning::tableaux::role::RoleId;

/// A concept expression tree, as handed to [`dag::ConceptDag::add_tree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConceptTree {
    Top,
    Bottom,
    /// A named (possibly primitive or defined) concept.
    Name(IRI),
    Not(Box<ConceptTree>),
    And(Vec<ConceptTree>),
    Or(Vec<ConceptTree>),
    /// `∀R.C`
    Forall(RoleId, Box<ConceptTree>),
    /// `∃R.C`
    Exists(RoleId, Box<ConceptTree>),
    /// `≤ n R.C`
    AtMost(u32, RoleId, Box<ConceptTree>),
    /// `≥ n R.C`
    AtLeast(u32, RoleId, Box<ConceptTree>),
    /// Local reflexivity denial on `R`.
    Irreflexive(RoleId),
    /// A nominal: the singleton concept denoting exactly individual `o`.
    OneOf(IRI),
    /// A data-valued restriction; opaque to the DAG beyond registering
    /// it with the datatype oracle (C8).
    DataSomeValuesFrom(RoleId, IRI),
    DataAllValuesFrom(RoleId, IRI),
}

/// A named concept's definition, as asserted by `A ⊑ C` (primitive) or
/// `A ≡ C` (defined) axioms, accumulated before `preprocess` folds them
/// into the DAG via [`dag::ConceptDag`].
#[derive(Debug, Clone)]
pub struct ConceptDefinition {
    pub name: IRI,
    pub primitive: bool,
    pub body: ConceptTree,
}

/// One opaque, retractable axiom as produced by the (external) axiom
/// stream. The kernel assigns each a monotonically increasing
/// [`AxiomId`] and keeps them until `retract` marks one dead.
#[derive(Debug, Clone)]
pub enum Axiom {
    /// General concept inclusion `C ⊑ D`, folded into the single GCI
    /// conjunction `T_G` at preprocess time.
    SubClassOf { sub: ConceptTree, sup: ConceptTree },
    EquivalentClasses(Vec<ConceptTree>),
    DisjointClasses(Vec<ConceptTree>),
    ConceptAssertion { individual: IRI, concept: ConceptTree },
    RoleAssertion { subject: IRI, role: RoleId, object: IRI },
    NegativeRoleAssertion { subject: IRI, role: RoleId, object: IRI },
    DifferentIndividuals(Vec<IRI>),
    SameIndividual(Vec<IRI>),
    TransitiveRole(RoleId),
    InverseRoles(RoleId, RoleId),
    SubRoleOf(RoleId, RoleId),
    IrreflexiveRole(RoleId),
}

/// Handle to a previously asserted axiom, returned by the kernel's
/// axiom-building calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AxiomId(pub u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concept_tree_is_structurally_comparable() {
        let a = ConceptTree::And(vec![ConceptTree::Top, ConceptTree::Bottom]);
        let b = ConceptTree::And(vec![ConceptTree::Top, ConceptTree::Bottom]);
        assert_eq!(a, b);
    }
}
