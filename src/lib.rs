#![recursion_limit = "256"]

//! Lifecycle harness for burn models (training loop, checkpoints,
//! summaries, logging) with a variational autoencoder built on it.

pub mod cli;
pub mod application;
pub mod domain;
pub mod data;
pub mod ml;
pub mod infra;
