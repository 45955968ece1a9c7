// logmask-core/src/rules/mod.rs
//! Rule-set compilation.
//!
//! Turns the ordered `RuleSetConfig` into compiled, phase-split rule lists that
//! the masker evaluates top to bottom.

pub mod compiler;
