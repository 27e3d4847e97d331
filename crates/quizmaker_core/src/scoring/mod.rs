//! Answer scoring entry points.
//!
//! # Responsibility
//! - Grade submitted answer sheets against question answer keys.
//! - Keep scoring a pure function of `(questions, answers)`.
//!
//! # See also
//! - `crate::model::answer` for submitted answer coercion.

pub mod scorer;
