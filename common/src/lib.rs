//! Common Utilities and Types Library
//! 
//! This crate provides the numerology types, SLIV/RIV codecs and timing
//! helpers shared by the MAC control-channel implementation.

pub mod sliv;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use sliv::{decode_sliv, encode_sliv};
pub use types::*;
pub use utils::*;
