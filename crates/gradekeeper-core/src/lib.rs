//! Grading engine, manifest resolution, and reports.
//!
//! This crate defines the grading manifest and results feed model, resolves
//! manifests into projects with known maxima, and scores each project from
//! its test outcomes, coverage counters and warning signals.

pub mod config;
pub mod coverage;
pub mod engine;
pub mod error;
pub mod model;
pub mod parser;
pub mod report;
pub mod resolve;
pub mod results;
pub mod scope;
pub mod topics;
pub mod warnings;
