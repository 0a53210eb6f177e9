//! Request analysis adapters.

mod pattern_analyzer;

pub use pattern_analyzer::PatternTaskAnalyzer;
