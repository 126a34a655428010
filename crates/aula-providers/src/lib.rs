//! aula-providers: question banks and result reporters.
//!
//! Implements the `QuestionBank` and `ResultReporter` traits from
//! `aula-core`: an in-memory bank seeded from TOML, plus simulated,
//! JSON-file, and HTTP reporters.

pub mod config;
pub mod http;
pub mod json;
pub mod memory;
pub mod simulated;

pub use config::{
    create_bank, create_reporter, load_config, load_config_from, AulaConfig, ReporterConfig,
};
pub use http::HttpReporter;
pub use json::JsonFileReporter;
pub use memory::InMemoryBank;
pub use simulated::SimulatedReporter;
