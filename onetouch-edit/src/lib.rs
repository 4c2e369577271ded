//! Edit engine for generated native project documents.
//!
//! Responsibilities:
//! - Parse and render Android XML resources, property lists, Gradle scripts, Xcode project
//!   graphs and Podfiles without disturbing the parts that are not edited.
//! - Apply declarative [`Mutation`](onetouch_types::Mutation)s idempotently.
//! - Render a unified diff preview of pending edits.

pub mod error;
pub mod gradle;
pub mod mutation;
pub mod patch;
pub mod pbx;
pub mod plist_file;
pub mod podfile;
pub mod xml;

pub use error::{EditError, EditResult};
pub use gradle::GradleFile;
pub use mutation::{TreeDocument, apply_mutation};
pub use patch::render_patch;
pub use pbx::{PbxObject, PbxProject, PbxValue};
pub use plist_file::PlistDocument;
pub use podfile::{Podfile, compare_versions, raise_platform_floor};
pub use xml::{Element, XmlDocument, XmlNode};
