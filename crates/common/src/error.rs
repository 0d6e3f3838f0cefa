use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Attempted to encode a symbol whose frequency is zero under the
    /// current context.
    #[error("symbol {0} has zero frequency under the current context")]
    ZeroFrequencySymbol(i64),

    /// The context's `symbol_pos`/`symbol_freq`/`total` queries disagreed:
    /// `pos + freq` exceeded `total`.
    #[error(
        "inconsistent context for symbol {symbol}: pos ({pos}) + freq ({freq}) > total ({total})"
    )]
    InconsistentContext {
        symbol: i64,
        pos: u64,
        freq: u64,
        total: u64,
    },

    /// A mutation targeted a symbol index outside `[0, len)`.
    #[error("symbol index {index} out of range [0, {len})")]
    OutOfRange { index: i64, len: usize },

    /// A frequency update would push `total` past `ArrayContext::MAX_TOTAL`.
    #[error("total frequency {new_total} would exceed the maximum of {max}")]
    Overflow { new_total: u64, max: u64 },

    /// A frequency decrement (or other caller-supplied update) would drive a
    /// frequency negative.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `write_symbol`/`set_context` (or their decoder equivalents) called
    /// after `finalize()`.
    #[error("operation attempted after finalize()")]
    AlreadyFinalized,

    /// `finalize()` did not find the `0x51 0x51 0x51 0x50` synchronization
    /// trailer where expected.
    #[error("stream ended improperly: synchronization trailer not found")]
    StreamEndedImproperly,
}

pub type Result<T> = std::result::Result<T, CodecError>;
