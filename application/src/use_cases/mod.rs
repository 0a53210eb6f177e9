//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod negotiate;
pub mod orchestrate;
pub(crate) mod shared;
