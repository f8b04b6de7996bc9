//! Geoset - command line surface over `geoset_core`
//!
//! - `geoset run`: produce imagery for every configured modality
//! - `geoset queue ...`: inspect and repair the output queue
//! - `geoset bbox-size`: bbox size for a target pixel resolution

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]
#![forbid(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod json;
