// Quizmatch: near-duplicate detection for exam question banks
//
// This is the library root. Each module corresponds to a stage of the
// matching and prediction pipeline, plus the adapters around it.

pub mod analyzer;
pub mod config;
pub mod context;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod intake;
pub mod matcher;
pub mod output;
pub mod predict;
pub mod status;

#[cfg(feature = "web")]
pub mod web;
