//! Byte-oriented framing and adaptive models built on top of
//! `codec-entropy`'s symbol-level arithmetic coder.

pub mod byte_stream;
pub mod predictive;

pub use byte_stream::{
    uniform_byte_context, ByteStreamDecoder, ByteStreamEncoder, ALPHABET_SIZE, END_OF_STREAM,
};
pub use predictive::PredictiveByteModel;
