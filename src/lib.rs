pub mod config;
pub mod derivation;
pub mod diagnostics;
pub mod document;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod kind;
pub mod repair;
pub mod service;
pub mod trade;
pub mod utils;
