//! Core definitions shared by all picklebench-* crates: the error taxonomy,
//! the `Result` alias and argument/data verification helpers.

pub mod error;
pub mod result;

pub use error::{Error, ErrorKind};
pub use result::Result;
