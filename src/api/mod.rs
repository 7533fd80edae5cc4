pub mod decode;

pub use decode::{DecodeError, DecodeLimits, StrictJson};
