//! Core types, the store gateway trait, and the comment threading and
//! engagement logic for Folio.
//!
//! No HTTP or database code lives here. Storage backends implement
//! [`store::DiscussionStore`]; callers drive everything through
//! [`service::Discussions`].

// Trait methods spell out `Send` futures; impls may use plain `async fn`.
#![allow(async_fn_in_trait)]

pub mod catalog;
pub mod comment;
pub mod engagement;
pub mod error;
pub mod service;
pub mod store;
pub mod thread;

pub use error::{Entity, Error, Result};
