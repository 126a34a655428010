//! aula-core: evaluation session engine, data model and scoring.
//!
//! This crate defines the question/evaluation model, the timed session
//! state machine and its async driver, the practice engine, and the
//! traits that question banks and result reporters implement.

pub mod driver;
pub mod error;
pub mod model;
pub mod parser;
pub mod practice;
pub mod report;
pub mod scoring;
pub mod session;
pub mod traits;
