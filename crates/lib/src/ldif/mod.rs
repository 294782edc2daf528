//! LDIF dump codec.
//!
//! The dump format is the textual directory-exchange format: records
//! separated by blank lines, one attribute per logical line as
//! `type: value` or `type:: base64-value`, with long lines wrapped at a
//! configurable column and continuation lines beginning with a single
//! space. The reader accepts any wrap column; wrapping is a writer-only
//! concern.

mod errors;
mod reader;
mod writer;

pub use errors::LdifError;
pub use reader::LdifReader;
pub use writer::LdifWriter;
