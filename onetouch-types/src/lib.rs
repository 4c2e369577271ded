//! Shared types for the onetouch workspace.
//!
//! # Design constraints
//! - A [`BuildDescriptor`](descriptor::BuildDescriptor) is read once per invocation and never
//!   mutated afterwards. Every stage borrows it.
//! - [`CommandOptions`](options::CommandOptions) is built once at the CLI boundary.
//! - Field names on the descriptor follow the camelCase layout of `build.json`.

pub mod descriptor;
pub mod ops;
pub mod options;
pub mod version;

pub use descriptor::{AndroidBuildOptions, AndroidProfile, BuildDescriptor, IosProfile};
pub use ops::{
    AttrMatch, AttrPredicate, Mutation, MutationOutcome, Segment, Selector, SelectorError,
};
pub use options::{CommandOptions, Platform, StdioMode};
pub use version::{BuildVersion, VersionError};
