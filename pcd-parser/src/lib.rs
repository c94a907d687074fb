pub mod error;
pub mod extra_bytes;
pub mod reader;
pub mod writer;

pub use error::ParseError;
