//! Pipeline stages for paycheck analysis.
//!
//! Each submodule implements exactly one step.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ normalize ──▶ llm ──▶ parse
//! (disk)    (enhance)    (1 call) (gate)
//! ```
//!
//! 1. [`input`]     read the file and infer its media type
//! 2. [`normalize`] PDF passthrough or image enhancement via [`enhance`];
//!    the pixel work runs in `spawn_blocking`
//! 3. [`llm`]       build the request and make the only network call
//! 4. [`parse`]     strip fences, decode JSON, enforce required fields

pub mod enhance;
pub mod input;
pub mod llm;
pub mod normalize;
pub mod parse;
