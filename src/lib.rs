//! `ccbuild` is a parallel, declarative build tool for compiled native
//! (C/C++) projects. A configuration file lists build targets; this crate
//! discovers their sources, tracks modification-time freshness through the
//! `#include` graph, dispatches compilation in parallel through a bounded
//! task queue, and links the results into executables and libraries.
//!
//! The engine lives here as a library so `src/bin/ccbuild.rs` (the CLI) and
//! the integration tests under `tests/` can drive it without a subprocess.
#![warn(rustdoc::all)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]

#[macro_use]
extern crate tracing;

pub mod error;

pub mod options;

pub mod expand;

pub mod config;
pub use config::Config;

pub mod deps;

pub mod compile;

pub mod pool;
pub use pool::ThreadPool;

pub mod link;

pub mod paths;

pub mod shell;

pub mod driver;
pub use driver::{Driver, Mode};

pub use error::{BuildError, Result};
