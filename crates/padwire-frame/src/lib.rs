//! Newline-delimited JSON framing for controller state streams.
//!
//! Every state snapshot travels as one UTF-8 JSON value followed by `\n`.
//! [`FrameDecoder`] accepts byte chunks of any size and yields decoded state
//! objects, carrying partial frames over between chunks and isolating frames
//! that fail to decode.

pub mod codec;
pub mod decoder;
pub mod error;

pub use codec::{
    decode_line, encode_line, FrameConfig, StateObject, DEFAULT_MAX_BUFFER, DELIMITER,
};
pub use decoder::{Decoded, FrameDecoder};
pub use error::{FrameError, Result};
