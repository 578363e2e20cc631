//! Proxy between a rich-text editor and generative AI providers
//!
//! Forwards image prompts to Stability.ai and text prompts to an
//! OpenAI-compatible Assistants API, watermarks and stores generated images,
//! and hands the editor ready-to-insert HTML.

pub mod ai;
pub mod app;
pub mod auth;
pub mod dialog;
pub mod error;
pub mod forwarder;
pub mod image;
pub mod models;
pub mod prompts;
pub mod server;
pub mod storage;
pub mod usage;

pub use error::{Error, Result};
