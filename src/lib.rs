//! Command line time tracker. Work is recorded as frames attached to a tree of projects, and can
//! be pushed to a remote server.
//!

pub mod cli;
pub mod config;
pub mod error;
pub mod sync;
pub mod tracking;
pub mod utils;
