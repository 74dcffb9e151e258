//! hwtopo Manager Library
//!
//! Rendering and command glue behind the `hwtopo` binary.

pub mod cli_output;
pub mod commands;
