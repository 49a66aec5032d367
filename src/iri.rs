//! IRI handling for named concepts, roles and individuals.
//!
//! The core only needs to identify entities by IRI and recognise the few
//! well-known `owl:`/`rdf:` names it treats specially (`owl:Thing`,
//! `owl:Nothing`); namespace-prefix resolution belongs to the external
//! axiom/ontology front end (out of scope, see spec.md §1) and is not
//! reproduced here.

use crate::error::{KernelError, KernelResult};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Internationalized Resource Identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct IRI {
    iri: Arc<str>,
    hash: u64,
}

impl IRI {
    /// Create a new IRI from a string.
    pub fn new<S: Into<String>>(iri: S) -> KernelResult<Self> {
        let iri_str = iri.into();

        if iri_str.is_empty() {
            return Err(KernelError::InvalidIri("empty IRI".to_string()));
        }

        let hash = {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            iri_str.hash(&mut hasher);
            hasher.finish()
        };

        Ok(IRI {
            iri: Arc::from(iri_str),
            hash,
        })
    }

    /// Get the IRI as a string slice.
    pub fn as_str(&self) -> &str {
        &self.iri
    }

    /// Local name part (after the last `#` or `/`).
    pub fn local_name(&self) -> &str {
        let iri = self.as_str();
        if let Some(hash_pos) = iri.rfind('#') {
            &iri[hash_pos + 1..]
        } else if let Some(slash_pos) = iri.rfind('/') {
            &iri[slash_pos + 1..]
        } else {
            iri
        }
    }

    /// Namespace part (up to and including the last `#` or `/`).
    pub fn namespace(&self) -> &str {
        let iri = self.as_str();
        if let Some(hash_pos) = iri.rfind('#') {
            &iri[..hash_pos + 1]
        } else if let Some(slash_pos) = iri.rfind('/') {
            &iri[..slash_pos + 1]
        } else {
            ""
        }
    }

    pub fn is_owl(&self) -> bool {
        self.as_str().starts_with("http://www.w3.org/2002/07/owl#")
    }

    pub fn is_rdf(&self) -> bool {
        self.as_str()
            .starts_with("http://www.w3.org/1999/02/22-rdf-syntax-ns#")
    }

    /// `owl:Thing`, the universal class name.
    pub fn is_owl_thing(&self) -> bool {
        self.is_owl() && self.local_name() == "Thing"
    }

    /// `owl:Nothing`, the empty class name.
    pub fn is_owl_nothing(&self) -> bool {
        self.is_owl() && self.local_name() == "Nothing"
    }
}

impl fmt::Display for IRI {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.iri)
    }
}

impl Hash for IRI {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl From<&str> for IRI {
    fn from(s: &str) -> Self {
        Self::new(s).expect("invalid IRI")
    }
}

impl From<String> for IRI {
    fn from(s: String) -> Self {
        Self::new(s).expect("invalid IRI")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iri_creation() {
        let iri = IRI::new("http://example.org/Person").unwrap();
        assert_eq!(iri.as_str(), "http://example.org/Person");
        assert_eq!(iri.local_name(), "Person");
        assert_eq!(iri.namespace(), "http://example.org/");
    }

    #[test]
    fn test_iri_namespaces() {
        let owl_iri = IRI::new("http://www.w3.org/2002/07/owl#Class").unwrap();
        assert!(owl_iri.is_owl());
        assert!(!owl_iri.is_rdf());

        let rdf_iri = IRI::new("http://www.w3.org/1999/02/22-rdf-syntax-ns#type").unwrap();
        assert!(rdf_iri.is_rdf());
        assert!(!rdf_iri.is_owl());
    }

    #[test]
    fn test_empty_iri_rejected() {
        assert!(IRI::new("").is_err());
    }

    #[test]
    fn test_thing_and_nothing() {
        let thing = IRI::new("http://www.w3.org/2002/07/owl#Thing").unwrap();
        let nothing = IRI::new("http://www.w3.org/2002/07/owl#Nothing").unwrap();
        assert!(thing.is_owl_thing());
        assert!(nothing.is_owl_nothing());
        assert!(!thing.is_owl_nothing());
    }
}
