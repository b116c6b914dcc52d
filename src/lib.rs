//! The library code for the `folio` static site generator. A build can be
//! broken down into three steps:
//!
//! 1. Parsing pages from source files on disk ([`crate::parser`])
//! 2. Rendering the pages through their layouts and writing them to disk
//!    ([`crate::write`])
//! 3. Copying passthrough files verbatim into the output directory
//!    ([`crate::build`])
//!
//! Templates are given a fixed set of named functions (see
//! [`crate::filters`]). The most involved of those is the excerpt filter,
//! which shortens text for previews by cutting at a sentence boundary where
//! possible ([`crate::text::truncate_sentences`]).

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod filters;
pub mod markdown;
pub mod page;
pub mod parser;
pub mod tag;
pub mod text;
pub mod transform;
pub mod write;
