//! Engine Care CLI library.
//!
//! This crate provides the `care` command-line front end: argument
//! parsing, state directory resolution and the command handlers that
//! drive the work order and phone directory services.

pub mod cli;
pub mod commands;
pub mod config;
