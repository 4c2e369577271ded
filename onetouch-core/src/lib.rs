//! Embeddable core library for onetouch.
//!
//! Provides clap-free entry points for the four build operations, with every external
//! toolchain call routed through a port so hosts and tests decide how processes run.
//!
//! # Port traits
//!
//! - [`ProcessPort`](ports::ProcessPort) runs bundler, scaffold, Gradle, apksigner and
//!   xcodebuild invocations
//!
//! The [`adapters`] module provides the shell-backed implementation and a recording fake.
//!
//! # Entry points
//!
//! - [`run_init`](pipeline::run_init) wipes the platform, bundles and scaffolds it
//! - [`run_sync`](pipeline::run_sync) and [`run_run`](pipeline::run_run) bundle, configure
//!   and hand over to the scaffold
//! - [`run_build`](pipeline::run_build) additionally packages a native artifact
//! - [`run_configure`](pipeline::run_configure) runs only the configurator, optionally dry
//! - [`hooks::before_sync`] is the scaffold's pre-sync hook

pub mod adapters;
pub mod bundler;
pub mod hooks;
pub mod package;
pub mod pipeline;
pub mod platform;
pub mod ports;
pub mod settings;

// Re-exported so hosts don't need onetouch-domain directly.
pub use onetouch_domain::{CommitSummary, FsOp, PassReport};
