//! mmchat is a terminal chat client for multimodal chat-completions
//! endpoints: each turn carries text plus staged image/audio attachments,
//! inlined as data URIs, and the full reply is awaited before display.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns session state, the turn state machine, attachment
//!   ingestion, and request assembly.
//! - [`api`] defines the wire payloads and the non-streaming client that
//!   talks to the endpoint.
//! - [`auth`] resolves the endpoint credential (keyring, then environment).
//! - [`ui`] runs the line-based interactive loop that drives turns and
//!   attachment staging.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod auth;
pub mod cli;
pub mod core;
pub mod ui;
