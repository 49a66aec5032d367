//! End-to-end tests for the concrete scenarios of spec.md §8, driven
//! entirely through the public [`Kernel`] API (the teacher's own
//! integration-test placement convention: a top-level `tests/`
//! directory for behaviour that crosses several modules).

use shiq_tableau::frontend::{Axiom, ConceptTree};
use shiq_tableau::iri::IRI;
use shiq_tableau::kernel::{Answer, Kernel};
use shiq_tableau::reasoning::tableaux::role::RoleId;

fn iri(local: &str) -> IRI {
    IRI::new(format!("http://example.org/{local}")).unwrap()
}

/// Scenario 1: `A ⊑ ∃R.A`, query `isSatisfiable(A)` → YES, blocking
/// after finitely many expansions.
#[test]
fn scenario_1_cyclic_existential_blocks_and_is_satisfiable() {
    let mut k = Kernel::new();
    k.new_kb().unwrap();
    let r = RoleId(0);
    let a = iri("A");
    k.add_axiom(Axiom::SubClassOf {
        sub: ConceptTree::Name(a.clone()),
        sup: ConceptTree::Exists(r, Box::new(ConceptTree::Name(a.clone()))),
    })
    .unwrap();
    assert_eq!(k.is_satisfiable(&ConceptTree::Name(a)).unwrap(), Answer::Yes);
}

/// Scenario 2: `A ⊑ ∃R.B`, `A ⊑ ∀R.¬B`, query `isSatisfiable(A)` → NO.
#[test]
fn scenario_2_exists_and_forall_negation_clash() {
    let mut k = Kernel::new();
    k.new_kb().unwrap();
    let r = RoleId(0);
    let a = iri("A");
    let b = iri("B");
    k.add_axiom(Axiom::SubClassOf {
        sub: ConceptTree::Name(a.clone()),
        sup: ConceptTree::Exists(r, Box::new(ConceptTree::Name(b.clone()))),
    })
    .unwrap();
    k.add_axiom(Axiom::SubClassOf {
        sub: ConceptTree::Name(a.clone()),
        sup: ConceptTree::Forall(r, Box::new(ConceptTree::Not(Box::new(ConceptTree::Name(b))))),
    })
    .unwrap();
    assert_eq!(k.is_satisfiable(&ConceptTree::Name(a)).unwrap(), Answer::No);
}

/// Scenario 3: with an inverse role declared and `≤1 R.⊤`, `A ⊑ ∃R.B`,
/// `A ⊑ ∃R.C`, `B ⊓ C` satisfiable — `isSatisfiable(A)` → YES via a
/// forced `+LE` merge of the two successors.
#[test]
fn scenario_3_le_forces_merge_of_two_successors() {
    let mut k = Kernel::new();
    k.new_kb().unwrap();
    let r = RoleId(0);
    let s = RoleId(1);
    let a = iri("A");
    let b = iri("B");
    let c = iri("C");
    k.add_axiom(Axiom::InverseRoles(r, s)).unwrap();
    k.add_axiom(Axiom::SubClassOf {
        sub: ConceptTree::Name(a.clone()),
        sup: ConceptTree::And(vec![
            ConceptTree::Exists(r, Box::new(ConceptTree::Name(b))),
            ConceptTree::Exists(r, Box::new(ConceptTree::Name(c))),
            ConceptTree::AtMost(1, r, Box::new(ConceptTree::Top)),
        ]),
    })
    .unwrap();
    assert_eq!(k.is_satisfiable(&ConceptTree::Name(a)).unwrap(), Answer::Yes);
}

/// Scenario 4: nominals `o : A`, `o : ¬A` → `isConsistent` NO.
#[test]
fn scenario_4_nominal_concept_and_its_negation_is_inconsistent() {
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

/// Scenario 5: `R` transitive, `A ⊑ ∀R.A`, `a : A`, `a R b`, `b R c`;
/// `isInstance(c, A)` → YES via automaton-based FORALL propagation.
#[test]
fn scenario_5_transitive_role_forall_propagates_to_instance() {
    let mut k = Kernel::new();
    k.new_kb().unwrap();
    let r = RoleId(0);
    let a_ind = iri("a");
    let b_ind = iri("b");
    let c_ind = iri("c");
    let a_concept = iri("A");

    k.add_axiom(Axiom::TransitiveRole(r)).unwrap();
    k.add_axiom(Axiom::SubClassOf {
        sub: ConceptTree::Name(a_concept.clone()),
        sup: ConceptTree::Forall(r, Box::new(ConceptTree::Name(a_concept.clone()))),
    })
    .unwrap();
    k.add_axiom(Axiom::ConceptAssertion {
        individual: a_ind.clone(),
        concept: ConceptTree::Name(a_concept.clone()),
    })
    .unwrap();
    k.add_axiom(Axiom::RoleAssertion {
        subject: a_ind,
        role: r,
        object: b_ind.clone(),
    })
    .unwrap();
    k.add_axiom(Axiom::RoleAssertion {
        subject: b_ind,
        role: r,
        object: c_ind.clone(),
    })
    .unwrap();

    assert_eq!(
        k.is_instance(&c_ind, &ConceptTree::Name(a_concept)).unwrap(),
        Answer::Yes
    );
}

/// Scenario 6: `R` irreflexive, assert `a R a` → inconsistent.
#[test]
fn scenario_6_irreflexive_role_self_loop_is_inconsistent() {
    let mut k = Kernel::new();
    k.new_kb().unwrap();
    let r = RoleId(0);
    let a = iri("a");
    k.add_axiom(Axiom::IrreflexiveRole(r)).unwrap();
    k.add_axiom(Axiom::RoleAssertion {
        subject: a.clone(),
        role: r,
        object: a.clone(),
    })
    .unwrap();
    // An irreflexivity characteristic alone has no individual to seed
    // the ABox with; a harmless self-contained assertion does.
    k.add_axiom(Axiom::ConceptAssertion {
        individual: a,
        concept: ConceptTree::Top,
    })
    .unwrap();
    assert_eq!(k.is_consistent().unwrap(), Answer::No);
}

/// Boundary behaviours (spec.md §8).
#[test]
fn boundary_behaviours() {
    let mut k = Kernel::new();
    k.new_kb().unwrap();
    assert_eq!(k.is_satisfiable(&ConceptTree::Top).unwrap(), Answer::Yes);
    assert_eq!(k.is_satisfiable(&ConceptTree::Bottom).unwrap(), Answer::No);

    let c = ConceptTree::Name(iri("C"));
    assert_eq!(k.is_subsumed(&c, &ConceptTree::Top).unwrap(), Answer::Yes);

    let r = RoleId(0);
    let cardinality_clash = ConceptTree::And(vec![
        ConceptTree::AtMost(0, r, Box::new(ConceptTree::Top)),
        ConceptTree::AtLeast(1, r, Box::new(ConceptTree::Top)),
    ]);
    assert_eq!(k.is_satisfiable(&cardinality_clash).unwrap(), Answer::No);
}

/// A cyclic *defined* concept (`A ≡ ∃R.A`) must not be spuriously
/// unsatisfiable — the placeholder mechanism exists precisely to avoid
/// this (spec.md §8 boundary behaviours, §9).
#[test]
fn cyclic_defined_concept_is_satisfiable() {
    let mut k = Kernel::new();
    k.new_kb().unwrap();
    let r = RoleId(0);
    let a = iri("A");
    k.add_axiom(Axiom::EquivalentClasses(vec![
        ConceptTree::Name(a.clone()),
        ConceptTree::Exists(r, Box::new(ConceptTree::Name(a.clone()))),
    ]))
    .unwrap();
    assert_eq!(k.is_satisfiable(&ConceptTree::Name(a)).unwrap(), Answer::Yes);
}

/// Lifecycle: `releaseKB`/`clearKB` discipline and re-opening.
#[test]
fn kb_lifecycle_reopen_after_release() {
    let mut k = Kernel::new();
    k.new_kb().unwrap();
    k.release_kb().unwrap();
    assert!(matches!(k.is_satisfiable(&ConceptTree::Top), Err(_)));
    k.new_kb().unwrap();
    assert_eq!(k.is_satisfiable(&ConceptTree::Top).unwrap(), Answer::Yes);
}

/// Once a KB is found inconsistent, every subsequent query trivially
/// answers YES except `isConsistent` itself (spec.md §7).
#[test]
fn inconsistent_kb_shortcuts_subsequent_queries() {
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
        concept: ConceptTree::Not(Box::new(ConceptTree::Name(a.clone()))),
    })
    .unwrap();
    assert_eq!(k.is_consistent().unwrap(), Answer::No);
    assert_eq!(k.is_satisfiable(&ConceptTree::Bottom).unwrap(), Answer::Yes);
    assert_eq!(k.is_consistent().unwrap(), Answer::No);
}
