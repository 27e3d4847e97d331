//! Quiz domain model.
//!
//! # Responsibility
//! - Define canonical test/question records and submitted answers.
//! - Keep per-type question rules next to the types they protect.
//!
//! # Invariants
//! - A test is the aggregate root; every question belongs to exactly one.
//! - Question type-conditional fields are unrepresentable for other types.
//!
//! # See also
//! - `crate::repo` for how these records are persisted.

pub mod answer;
pub mod question;
pub mod test;
