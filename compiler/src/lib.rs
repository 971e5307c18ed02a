// iseqlc — ISEQL event-model compiler
//
// Library root. Passes run schema → adapt → validate → resolve → serialize;
// `pipeline::compile` drives them end to end.

pub mod adapt;
pub mod catalog;
pub mod derive;
pub mod diag;
pub mod model;
pub mod pass;
pub mod pipeline;
pub mod resolve;
pub mod schema;
pub mod serialize;
pub mod timeline;
pub mod validate;

pub use pipeline::{compile, compile_with, CompileOutput, Outcome};
