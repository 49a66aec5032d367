//! Reasoning algorithms: the tableau decision procedure (spec.md §4).

pub mod tableaux;
