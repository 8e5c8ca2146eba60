//! geminiweb is a terminal-first chat client for Gemini web sessions.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns application state, the Update function over
//!   [`core::app::AppAction`], history, export, personas and configuration.
//! - [`ui`] renders the terminal interface and runs the loop driver that
//!   executes the commands Update returns.
//! - [`commands`] parses and dispatches slash commands.
//! - [`tools`] holds the tool registry, executor and tool-call block parser.
//! - [`api`] defines the remote client and session traits plus the HTTP
//!   implementation.
//!
//! The binary (`src/main.rs`) routes through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod commands;
pub mod core;
pub mod tools;
pub mod ui;
pub mod utils;
