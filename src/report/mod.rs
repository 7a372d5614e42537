//! Report renderers.
//!
//! - [`terminal`] — colored, tabular output for `check` results and the
//!   `show` decision overview; respects `--verbose` / `--quiet`.

pub mod terminal;
