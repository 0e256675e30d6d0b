//! Crate-level integration and BDD tests.
