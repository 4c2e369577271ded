//! Build-profile loading.
//!
//! `build.json` is a JSON object whose first entry is the base profile. Every further entry is a
//! named configuration that is deep-merged over the base before it is turned into a
//! [`BuildDescriptor`](onetouch_types::BuildDescriptor).

mod load;

pub use load::{load_profiles, merge_json, ProfileError, ProfileSet, PROFILES_FILE_NAME};
