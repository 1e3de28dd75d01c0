//! gator: a command-line RSS aggregator.
//!
//! Users register, add and follow feeds, and browse the posts a long-running
//! `agg` loop collects from them.

pub mod commands;
pub mod config;
pub mod feed;
pub mod storage;
pub mod util;
