//! Prompt workshop - builds teaching prompts for AI chat tools
//!
//! Each scenario in the built-in catalog pairs a form schema with a text
//! template. Filled-in forms are rendered into a finished prompt, which can be
//! saved to a local history and exported as files.

pub mod app;
pub mod catalog;
pub mod error;
pub mod export;
pub mod form;
pub mod history;
pub mod models;
pub mod prompts;
pub mod storage;

pub use error::{Error, Result};
