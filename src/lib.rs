//! # SHIQ Tableau Core
//!
//! The decision-procedure core of a description-logic reasoner: a
//! bipolar-pointer concept DAG, a completion graph, dependency-directed
//! backjumping and SH/SHI/SHIQ blocking, wired together by a [`Kernel`]
//! that exposes the consistency/subsumption/instance query family.
//!
//! ## Scope
//!
//! Axiom/ontology parsing, IRI namespace resolution and role-hierarchy
//! compilation live outside this crate; [`frontend`] defines the minimal
//! shapes (`Axiom`, `ConceptTree`) the kernel consumes from them.
//!
//! ## Quick start
//!
//! ```rust
//! use shiq_tableau::frontend::{Axiom, ConceptTree};
//! use shiq_tableau::iri::IRI;
//! use shiq_tableau::kernel::{Answer, Kernel};
//! use shiq_tableau::reasoning::tableaux::role::RoleId;
//!
//! let mut kernel = Kernel::new();
//! kernel.new_kb()?;
//!
//! let role = RoleId(0);
//! let a = IRI::new("http://example.org/A")?;
//! kernel.add_axiom(Axiom::SubClassOf {
//!     sub: ConceptTree::Name(a.clone()),
//!     sup: ConceptTree::Exists(role, Box::new(ConceptTree::Name(a.clone()))),
//! })?;
//!
//! assert_eq!(kernel.is_satisfiable(&ConceptTree::Name(a))?, Answer::Yes);
//! # Ok::<(), shiq_tableau::error::KernelError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`error`] - the kernel's error taxonomy
//! - [`iri`] - minimal IRI handling
//! - [`dep_set`] - dependency sets for backjumping
//! - [`frontend`] - axiom stream / concept-tree shapes handed in from outside
//! - [`reasoning::tableaux`] - concept DAG, completion graph, blocking, expansion engine
//! - [`kernel`] - knowledge-base lifecycle and the query API

/// Kernel-level error taxonomy.
pub mod error;

/// IRI handling for named concepts, roles and individuals.
pub mod iri;

/// Dependency sets used for clash tracking and backjumping.
pub mod dep_set;

/// Axiom stream and concept-tree shapes handed in from the (external)
/// ontology front end.
pub mod frontend;

/// The tableau decision procedure: concept DAG, completion graph,
/// blocking and the expansion engine.
pub mod reasoning;

/// Knowledge-base lifecycle, axiom stream and the query API.
pub mod kernel;

pub use error::{KernelError, KernelResult};
pub use frontend::{Axiom, AxiomId, ConceptDefinition, ConceptTree};
pub use iri::IRI;
pub use kernel::{Answer, Kernel, KernelOptions, ProgressMonitor};

/// Library version, as set in `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name, as set in `Cargo.toml`.
pub const NAME: &str = env!("CARGO_PKG_NAME");
