//! Library half of the `onetouch` binary: configuration loading shared with the
//! acceptance suite.

pub mod config;
