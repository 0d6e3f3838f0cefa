//! Carryless arithmetic coding over an externally supplied probability
//! model.
//!
//! This crate is exact, overflow-free, and reversible by construction; it
//! does not model compression on its own and does not mark where a symbol
//! stream ends — callers either know the symbol count out of band or
//! reserve an explicit end-of-stream symbol (see `codec-model` for that
//! wrapper).

pub mod context;
pub mod decoder;
pub mod encoder;
pub mod state;

pub use context::{ArrayContext, SymbolContext, MAX_TOTAL};
pub use decoder::Decoder;
pub use encoder::{Encoder, SYNCHRONIZATION_TRAILER};
pub use state::CodecState;
