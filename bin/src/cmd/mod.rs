//! CLI subcommand modules.
//!
//! This module contains the implementations for all ampere CLI subcommands.

pub(crate) mod fetch;
pub(crate) mod predict;
pub(crate) mod register;
pub(crate) mod series;
pub(crate) mod train;
