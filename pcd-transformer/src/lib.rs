pub mod arguments;
pub mod builder;
pub mod chain;
pub mod decompress;
pub mod error;
pub mod filter;
pub mod offset;
pub mod registers;
pub mod runner;
pub mod transform;

pub use builder::{parse_arguments, ArgumentTransformBuilder, TransformBuilder, TransformOptions};
pub use chain::{OperationChain, OverflowReport};
pub use error::ParseError;
pub use runner::{PointCloudTransformer, Transformer};
