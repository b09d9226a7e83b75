//! Declarative environment resolution engine.
//!
//! Merges a root configuration fragment with its transitive imports for one
//! platform, then derives three independent outputs from the result: a
//! developer shell, an ordered quality-gate hook plan, and composed build
//! targets. Fragments are TOML files (`envresolve.toml` plus
//! `fragments/*.toml`) with platform-conditional entries.
//!
//! The public API is organised into layers:
//!
//! - **[`config`]**: load, filter and validate fragments
//! - **[`resolve`]**: import graph, merge policy and memoized resolution
//! - **[`environment`]**, **[`hooks`]**, **[`targets`]**: the outputs
//! - **[`pipeline`]**: one request from fragments to every output
//! - **[`commands`]**: top-level subcommand orchestration (`build`, `check`, `shell`, `show`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod environment;
pub mod error;
pub mod exec;
pub mod hooks;
pub mod logging;
pub mod pipeline;
pub mod platform;
pub mod resolve;
pub mod targets;
pub mod toolchain;
pub mod tools;

/// Engine version: `ENVRESOLVE_VERSION` at build time, else the package version.
pub const VERSION: &str = match option_env!("ENVRESOLVE_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};
