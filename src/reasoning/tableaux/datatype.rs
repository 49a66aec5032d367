//! Datatype oracle (C8, external collaborator).
//!
//! spec.md §1 keeps datatype/facet reasoning external: the core only
//! needs a black box that decides consistency of a set of literal-valued
//! constraints it is handed. This module defines that trait plus a stub
//! that accepts every constraint set — enough to let `DATATYPE`,
//! `DATAVALUE` and `DATAEXPR` DAG vertices round-trip through the core
//! without committing to any numeric/string facet semantics.

use crate::iri::IRI;

/// A literal value paired with its datatype IRI, as registered by the
/// front end when lowering a data expression into the DAG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    pub datatype: IRI,
    pub lexical_form: String,
}

/// A single concrete-domain constraint on a data value, as accumulated
/// on a completion-node's data-label during tableau expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataConstraint {
    /// The value must equal this literal.
    Equals(Literal),
    /// The value must differ from this literal.
    NotEquals(Literal),
    /// An opaque facet restriction (range, pattern, length, ...); the
    /// oracle interprets `facet` and `bound` however its datatype maps
    /// require. The core never inspects these beyond passing them on.
    Facet { facet: String, bound: Literal },
}

/// External decision procedure for concrete-domain consistency.
pub trait DatatypeOracle {
    /// Is `constraints` jointly satisfiable by some value of `datatype`?
    fn is_consistent(&self, datatype: &IRI, constraints: &[DataConstraint]) -> bool;

    /// Register a datatype name the front end referenced, so later
    /// `is_consistent` calls can assume it is known. A no-op is a valid
    /// implementation for oracles that accept any IRI.
    fn register_datatype(&mut self, datatype: &IRI);
}

/// Oracle that treats every constraint set as satisfiable. Sufficient to
/// exercise the DAG's data-vertex plumbing and the tableau's `+CONCEPT`
/// rule on data expressions; no facet arithmetic is performed.
#[derive(Debug, Clone, Default)]
pub struct PermissiveDatatypeOracle;

impl DatatypeOracle for PermissiveDatatypeOracle {
    fn is_consistent(&self, _datatype: &IRI, _constraints: &[DataConstraint]) -> bool {
        true
    }

    fn register_datatype(&mut self, _datatype: &IRI) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permissive_oracle_accepts_everything() {
        let oracle = PermissiveDatatypeOracle;
        let dt = IRI::new("http://www.w3.org/2001/XMLSchema#integer").unwrap();
        let constraints = vec![DataConstraint::Equals(Literal {
            datatype: dt.clone(),
            lexical_form: "3".to_string(),
        })];
        assert!(oracle.is_consistent(&dt, &constraints));
    }
}
