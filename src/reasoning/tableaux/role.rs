//! Role system (C9, external collaborator).
//!
//! spec.md §1 keeps role-hierarchy preprocessing and automaton
//! construction external: the core only consumes a compiled role
//! system. This module defines the minimal trait the DAG, tableau
//! engine and blocking engine need (simple-role test, inverse lookup,
//! sub-role test, automaton transitions) plus a reference
//! implementation, [`SimpleRoleSystem`], covering simple and
//! transitive roles — enough to realise the transitive-role scenario
//! of spec.md §8 without attempting a general regular-role-expression
//! compiler (that stays external, per SPEC_FULL.md §B.5).

use crate::iri::IRI;
use hashbrown::HashMap;

/// Identity of a role (object property), interned by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoleId(pub u32);

/// A state in a role's automaton. State `0` is the initial state;
/// simple roles have the single state `0`, which is also final.
pub type AutomatonState = u32;

/// Interface the tableau/blocking engine need from the (externally
/// constructed) role hierarchy and automaton compiler.
pub trait RoleSystem {
    /// Is `role` simple (no transitive sub-role contributes to it)?
    /// Simple roles never need more than automaton state `0`.
    fn is_simple(&self, role: RoleId) -> bool;

    /// The inverse of `role`, if declared.
    fn inverse(&self, role: RoleId) -> Option<RoleId>;

    /// Is `sub` a sub-role of `sup` (reflexive: every role is its own
    /// sub-role)?
    fn is_sub_role_of(&self, sub: RoleId, sup: RoleId) -> bool;

    /// All automaton states reachable for `role`'s complex automaton.
    /// For a simple role this is always `[0]`.
    fn automaton_states(&self, role: RoleId) -> Vec<AutomatonState>;

    /// Is `state` a final (accepting) state of `role`'s automaton —
    /// i.e. does reaching it mean the universal restriction's filler
    /// applies directly to the successor?
    fn is_final_state(&self, role: RoleId, state: AutomatonState) -> bool;

    /// Transition function: from `state`, consuming an edge labelled
    /// `via` (a role that is `via` or a sub-role of it), which state(s)
    /// does the automaton move to? Empty if the edge does not
    /// contribute to `role`'s automaton at all.
    fn transition(
        &self,
        role: RoleId,
        state: AutomatonState,
        via: RoleId,
    ) -> Vec<AutomatonState>;
}

/// Reference [`RoleSystem`] for simple and transitive roles: every role
/// is simple unless explicitly marked transitive, in which case its
/// automaton is the familiar two-state "self-loop then accept" machine
/// (state 0 --role--> state 0, and state 0 is already final so a
/// direct consumption also satisfies the restriction immediately).
#[derive(Debug, Clone, Default)]
pub struct SimpleRoleSystem {
    transitive: hashbrown::HashSet<RoleId>,
    inverses: HashMap<RoleId, RoleId>,
    sub_roles: HashMap<RoleId, Vec<RoleId>>,
    names: HashMap<RoleId, IRI>,
}

impl SimpleRoleSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_role(&mut self, role: RoleId, name: IRI) {
        self.names.entry(role).or_insert(name);
        self.sub_roles.entry(role).or_default();
    }

    pub fn declare_transitive(&mut self, role: RoleId) {
        self.transitive.insert(role);
    }

    pub fn declare_inverse(&mut self, role: RoleId, inverse: RoleId) {
        self.inverses.insert(role, inverse);
        self.inverses.insert(inverse, role);
    }

    /// Record `sub` as a (direct or transitive) sub-role of `sup`.
    pub fn declare_sub_role(&mut self, sub: RoleId, sup: RoleId) {
        self.sub_roles.entry(sup).or_default().push(sub);
    }

    pub fn name(&self, role: RoleId) -> Option<&IRI> {
        self.names.get(&role)
    }
}

impl RoleSystem for SimpleRoleSystem {
    fn is_simple(&self, role: RoleId) -> bool {
        !self.transitive.contains(&role)
    }

    fn inverse(&self, role: RoleId) -> Option<RoleId> {
        self.inverses.get(&role).copied()
    }

    fn is_sub_role_of(&self, sub: RoleId, sup: RoleId) -> bool {
        if sub == sup {
            return true;
        }
        self.sub_roles
            .get(&sup)
            .map(|subs| subs.contains(&sub))
            .unwrap_or(false)
    }

    fn automaton_states(&self, _role: RoleId) -> Vec<AutomatonState> {
        vec![0]
    }

    fn is_final_state(&self, _role: RoleId, _state: AutomatonState) -> bool {
        true
    }

    fn transition(
        &self,
        role: RoleId,
        state: AutomatonState,
        via: RoleId,
    ) -> Vec<AutomatonState> {
        if !self.is_sub_role_of(via, role) {
            return Vec::new();
        }
        // Both the direct edge and (for transitive roles) the self-loop
        // keep the automaton at state 0; there is nothing else to reach
        // since this reference implementation only models simple and
        // transitive roles.
        let _ = state;
        vec![0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitive_role_self_loops() {
        let mut rs = SimpleRoleSystem::new();
        let r = RoleId(0);
        rs.declare_role(r, IRI::new("http://example.org/R").unwrap());
        rs.declare_transitive(r);
        assert!(!rs.is_simple(r));
        let states = rs.automaton_states(r);
        assert_eq!(states, vec![0]);
        let next = rs.transition(r, 0, r);
        assert_eq!(next, vec![0]);
        assert!(rs.is_final_state(r, 0));
    }

    #[test]
    fn simple_role_is_simple() {
        let mut rs = SimpleRoleSystem::new();
        let r = RoleId(1);
        rs.declare_role(r, IRI::new("http://example.org/S").unwrap());
        assert!(rs.is_simple(r));
    }

    #[test]
    fn sub_role_transition_rejected_for_unrelated_role() {
        let mut rs = SimpleRoleSystem::new();
        let r = RoleId(0);
        let s = RoleId(1);
        rs.declare_role(r, IRI::new("http://example.org/R").unwrap());
        rs.declare_role(s, IRI::new("http://example.org/S").unwrap());
        assert!(rs.transition(r, 0, s).is_empty());
    }
}
