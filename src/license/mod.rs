//! License identifiers and license expressions.
//!
//! - [`spdx`] — resolves free-text license names to canonical SPDX identifiers.
//! - [`expression`] — evaluates SPDX expressions (`AND`, `OR`, `WITH`, parentheses)
//!   against the permitted and restricted licenses of a
//!   [`DecisionState`](crate::decisions::DecisionState).

pub mod expression;
pub mod spdx;
