// Library root: re-exports all modules so integration tests and external
// consumers can access the crate's public API.

pub mod appraise;
pub mod clean;
pub mod combine;
pub mod config;
pub mod export;
pub mod keymap;
pub mod model;
pub mod sources;
pub mod standardize;
