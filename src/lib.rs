//! # eyecare
//!
//! Keeps the light surfaces of a live page in a low-contrast palette while
//! the page keeps changing underneath.
//!
//! ```text
//! mutation / load ──▶ runtime ──▶ scheduler ──▶ engine ──▶ classifier
//!                                                  │
//!                                                  └────▶ marker ──▶ attributes
//! style rules (per theme) ──▶ StyleInjector
//! ```
//!
//! The engine only ever writes two attributes. Colors are applied by one
//! static rule set keyed on them, rendered from the active theme.

use std::error::Error;

pub mod bootstrap;
pub mod classifier;
pub mod color;
pub mod commands;
pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod marker;
pub mod page;
pub mod palette;
pub mod replay;
pub mod runtime;
pub mod scheduler;
pub mod store;
pub mod style;

pub fn unpack_error(err: &(dyn Error)) -> String {
    let mut parts = Vec::new();
    parts.push(err.to_string());
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ")
}
