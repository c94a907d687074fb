pub mod header;
pub mod point;
pub mod quantize;
