//! Core types and traits for the response-action console.
//!
//! Field names on [`Action`] match the columns of the hosted `antigena_actions` table so rows
//! round-trip through JSON without renaming.

mod dto;
mod traits;

pub use dto::*;
pub use traits::*;
