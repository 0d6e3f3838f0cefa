//! Carryless arithmetic encoder: 32-bit interval, MSB-first bit output,
//! underflow (E3) mapping, and the `0x51 0x51 0x51 0x50` synchronization
//! trailer.
//!
//! The bit-assembly mechanics (`output_bit`, an accumulating byte + bit
//! count) follow the classic shift-in accumulator shape used throughout
//! this codebase's other bit-oriented coders.

use std::io::Write;

use codec_common::{CodecError, Result};

use crate::context::SymbolContext;
use crate::state::CodecState;

const TOP_BIT: u32 = 0x8000_0000;
const SECOND_BIT: u32 = 0x4000_0000;

/// The four-byte trailer appended after the last data byte so that a
/// decoder reading four bytes of lookahead consumes exactly as many bytes
/// as the encoder wrote. Not a delimiter: it carries no information about
/// where the symbol stream ends.
pub const SYNCHRONIZATION_TRAILER: [u8; 4] = [0x51, 0x51, 0x51, 0x50];

pub struct Encoder<'ctx, W: Write> {
    writer: W,
    low: u32,
    high: u32,
    underflow: u32,
    bit_buffer: u8,
    bit_count: u8,
    context: &'ctx dyn SymbolContext,
    state: CodecState,
}

impl<'ctx, W: Write> Encoder<'ctx, W> {
    pub fn new(writer: W, context: &'ctx dyn SymbolContext) -> Self {
        Self {
            writer,
            low: 0,
            high: 0xFFFF_FFFF,
            underflow: 0,
            bit_buffer: 0,
            bit_count: 0,
            context,
            state: CodecState::Fresh,
        }
    }

    /// Swap the context consulted by the next `write_symbol` call.
    pub fn set_context(&mut self, context: &'ctx dyn SymbolContext) -> Result<()> {
        if self.state.is_finalized() {
            return Err(CodecError::AlreadyFinalized);
        }
        self.context = context;
        Ok(())
    }

    /// Recover the underlying writer. Typically called after `finalize`.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Encode `symbol` under the current context.
    pub fn write_symbol(&mut self, symbol: i64) -> Result<()> {
        if self.state.is_finalized() {
            return Err(CodecError::AlreadyFinalized);
        }

        let total = self.context.total();
        let pos = self.context.symbol_pos(symbol);
        let freq = self.context.symbol_freq(symbol);

        if freq == 0 {
            return Err(CodecError::ZeroFrequencySymbol(symbol));
        }
        if pos + freq > total {
            return Err(CodecError::InconsistentContext {
                symbol,
                pos,
                freq,
                total,
            });
        }

        let range = (self.high - self.low) as u64 + 1;
        let new_low = self.low as u64 + range * pos / total;
        let new_high = self.low as u64 + range * (pos + freq) / total - 1;
        self.low = new_low as u32;
        self.high = new_high as u32;

        self.renormalize()?;
        self.state = CodecState::Active;
        Ok(())
    }

    /// Write trailing bits and the synchronization trailer, then mark the
    /// encoder terminated. A no-op (writes nothing) if no symbol was ever
    /// written.
    pub fn finalize(&mut self, close_sink: bool) -> Result<()> {
        if self.state.is_finalized() {
            return Err(CodecError::AlreadyFinalized);
        }

        if self.state == CodecState::Active {
            let decided_bit = ((self.low >> 30) & 1) as u8;
            self.output_bit(decided_bit)?;

            let complement = 1 - decided_bit;
            self.output_bit(complement)?;
            while self.underflow > 0 {
                self.output_bit(complement)?;
                self.underflow -= 1;
            }

            if self.bit_count > 0 {
                self.bit_buffer <<= 8 - self.bit_count;
                self.writer.write_all(&[self.bit_buffer])?;
                self.bit_buffer = 0;
                self.bit_count = 0;
            }

            self.writer.write_all(&SYNCHRONIZATION_TRAILER)?;
        }

        self.state = CodecState::Finalized;
        if close_sink {
            self.writer.flush()?;
        }
        Ok(())
    }

    /// While the top bits of `high`/`low` agree, a bit is decided and can be
    /// emitted; while the interval straddles the midpoint without a decided
    /// top bit, defer a pending underflow bit. Written as a single loop
    /// rather than two sequential ones because after an underflow step the
    /// top bits are guaranteed to disagree, so the two conditions never both
    /// need draining in the same pass; this is the standard merged form of
    /// the algorithm.
    fn renormalize(&mut self) -> Result<()> {
        loop {
            if (self.low ^ self.high) & TOP_BIT == 0 {
                let bit = ((self.low & TOP_BIT) != 0) as u8;
                self.output_bit(bit)?;
                let complement = 1 - bit;
                while self.underflow > 0 {
                    self.output_bit(complement)?;
                    self.underflow -= 1;
                }
                self.high = ((self.high << 1) & 0xFFFF_FFFF) | 1;
                self.low = (self.low << 1) & 0xFFFF_FFFF;
            } else if (self.low & SECOND_BIT) != 0 && (self.high & SECOND_BIT) == 0 {
                self.underflow += 1;
                self.high = ((self.high & 0x7FFF_FFFF) << 1) | 0x8000_0001;
                self.low = (self.low << 1) & 0x7FFF_FFFF;
            } else {
                break;
            }
        }
        Ok(())
    }

    fn output_bit(&mut self, bit: u8) -> Result<()> {
        self.bit_buffer = (self.bit_buffer << 1) | bit;
        self.bit_count += 1;
        if self.bit_count == 8 {
            self.writer.write_all(&[self.bit_buffer])?;
            self.bit_buffer = 0;
            self.bit_count = 0;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ArrayContext;
    use crate::decoder::Decoder;

    #[test]
    fn single_symbol_alphabet_produces_five_bytes() {
        let ctx = ArrayContext::new(1);
        let mut out = Vec::new();
        {
            let mut enc = Encoder::new(&mut out, &ctx as &dyn SymbolContext);
            for _ in 0..100 {
                enc.write_symbol(0).unwrap();
            }
            enc.finalize(true).unwrap();
        }
        assert_eq!(out.len(), 5);

        let mut dec = Decoder::new(&out[..], &ctx as &dyn SymbolContext);
        for _ in 0..100 {
            assert_eq!(dec.read_symbol().unwrap(), 0);
        }
        dec.finalize(true).unwrap();
        assert_eq!(dec.bytes_consumed(), 5);
    }

    #[test]
    fn fresh_finalize_writes_nothing() {
        let ctx = ArrayContext::new(2);
        let mut out = Vec::new();
        let mut enc = Encoder::new(&mut out, &ctx as &dyn SymbolContext);
        enc.finalize(true).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn zero_frequency_symbol_is_rejected_without_emitting_bytes() {
        let ctx = ArrayContext::from_frequencies(vec![0, 1, 1]).unwrap();
        let mut out = Vec::new();
        let mut enc = Encoder::new(&mut out, &ctx as &dyn SymbolContext);
        let err = enc.write_symbol(0).unwrap_err();
        assert!(matches!(err, CodecError::ZeroFrequencySymbol(0)));
        assert!(out.is_empty());
    }

    #[test]
    fn operations_after_finalize_fail() {
        let ctx = ArrayContext::new(2);
        let mut out = Vec::new();
        let mut enc = Encoder::new(&mut out, &ctx as &dyn SymbolContext);
        enc.write_symbol(0).unwrap();
        enc.finalize(true).unwrap();
        assert!(matches!(
            enc.write_symbol(0),
            Err(CodecError::AlreadyFinalized)
        ));
        assert!(matches!(
            enc.set_context(&ctx as &dyn SymbolContext),
            Err(CodecError::AlreadyFinalized)
        ));
    }
}
