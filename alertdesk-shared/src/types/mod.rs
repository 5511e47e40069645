//! This module defines the core data structures shared by the alert desk crates.
//! Records (`alert`, `rule`, `change`) mirror what the document store holds;
//! `topology` mirrors what the graph store returns; `views` are response payloads.

pub mod alert;
pub mod change;
pub mod rule;
pub mod topology;
pub mod views;
