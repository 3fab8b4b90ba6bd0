//! SwasthyaScan: guided medical self-assessment core.

pub mod assessment;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
