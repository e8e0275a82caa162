//! Reproduce reported web vulnerabilities against a live target.
//!
//! Each report from a feed is classified, then attempted up to a bounded number
//! of times in an isolated browser session, either by a built-in runner or by an
//! action plan obtained from a generative backend. Every attempt is recorded and
//! one verdict per vulnerability is written to the results directory.

pub mod browser;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod container;
pub mod errors;
pub mod feed;
pub mod generator;
pub mod knowledge;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod probe;
pub mod runners;
pub mod sandbox;
pub mod store;
