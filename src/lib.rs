//! Interactive indexer for a numbered remote catalog
//!
//! A command shell (`shell`) drives the indexing pipeline (`indexer`), which
//! pulls metadata through a `fetch::Fetch` implementation and persists it in
//! a single-table `SQLite` store (`store`).

pub mod app;
pub mod cli;
pub mod config;
pub mod fetch;
pub mod indexer;
pub mod metrics;
pub mod render;
pub mod shell;
pub mod store;
