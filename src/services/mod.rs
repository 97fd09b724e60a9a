// src/services/mod.rs
pub mod analyzer;
pub mod calculations;
pub mod insights;
pub mod keyword_ai;
pub mod openrouter;
pub mod prompt;
pub mod trends;
