//! Seqflow CLI — command modules, reusable from the binary and from tests.

pub mod commands;
