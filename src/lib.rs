#![forbid(unsafe_code)]

//! Shared library behind the `collect_catalog` and `download_audio` binaries.
//!
//! The two pipelines only talk to each other through the JSON record set on
//! disk (see [`records`]).

pub mod catalog;
pub mod collector;
pub mod config;
pub mod error;
pub mod extractor;
pub mod logging;
pub mod orchestrator;
pub mod records;
