//! Embedder-facing facade over the solver

pub mod analyzer;

pub use analyzer::{AnalysisConfig, AnalysisResult, PointerAnalysis};
