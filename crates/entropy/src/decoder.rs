//! The decoder mirror of `Encoder`: primes a 32-bit `code` window from the
//! first four bytes, then renormalizes in lockstep with the encoder's
//! narrowing, locating each symbol via `SymbolContext::symbol_pos` with an
//! exponential-then-binary search.

use std::io::{ErrorKind, Read};

use codec_common::{CodecError, Result};

use crate::context::SymbolContext;
use crate::encoder::SYNCHRONIZATION_TRAILER;
use crate::state::CodecState;

const TOP_BIT: u32 = 0x8000_0000;
const SECOND_BIT: u32 = 0x4000_0000;

pub struct Decoder<'ctx, R: Read> {
    reader: R,
    low: u32,
    high: u32,
    code: u32,
    context: &'ctx dyn SymbolContext,
    state: CodecState,
    input_buffer: u8,
    input_bit_count: u8,
    bytes_consumed: u64,
}

impl<'ctx, R: Read> Decoder<'ctx, R> {
    pub fn new(reader: R, context: &'ctx dyn SymbolContext) -> Self {
        Self {
            reader,
            low: 0,
            high: 0xFFFF_FFFF,
            code: 0,
            context,
            state: CodecState::Fresh,
            input_buffer: 0,
            input_bit_count: 0,
            bytes_consumed: 0,
        }
    }

    /// Swap the context consulted by the next `read_symbol` call.
    pub fn set_context(&mut self, context: &'ctx dyn SymbolContext) -> Result<()> {
        if self.state.is_finalized() {
            return Err(CodecError::AlreadyFinalized);
        }
        self.context = context;
        Ok(())
    }

    /// Total bytes pulled from the underlying source so far, including the
    /// synchronization trailer once `finalize` has consumed it. Lets a
    /// caller verify the end-offset law against the encoder's byte count.
    pub fn bytes_consumed(&self) -> u64 {
        self.bytes_consumed
    }

    /// Decode the next symbol under the current context.
    pub fn read_symbol(&mut self) -> Result<i64> {
        if self.state.is_finalized() {
            return Err(CodecError::AlreadyFinalized);
        }

        if self.state == CodecState::Fresh {
            let mut buf = [0u8; 4];
            for b in buf.iter_mut() {
                *b = self.read_byte_or_zero()?;
            }
            self.code = u32::from_be_bytes(buf);
            self.state = CodecState::Active;
        } else {
            self.renormalize()?;
        }

        let total = self.context.total();
        let range = (self.high - self.low) as u64 + 1;
        let numerator = (self.code - self.low) as u128 + 1;
        let pos = ((numerator * total as u128 - 1) / range as u128) as u64;

        let symbol = self.locate_symbol(pos);
        let p = self.context.symbol_pos(symbol);
        let f = self.context.symbol_freq(symbol);

        let new_low = self.low as u64 + range * p / total;
        let new_high = self.low as u64 + range * (p + f) / total - 1;
        self.low = new_low as u32;
        self.high = new_high as u32;

        Ok(symbol)
    }

    /// Consume the synchronization trailer so the source is left positioned
    /// exactly after the codec's last byte. A no-op if no symbol was ever
    /// read.
    pub fn finalize(&mut self, close_source: bool) -> Result<()> {
        if self.state.is_finalized() {
            return Err(CodecError::AlreadyFinalized);
        }

        if self.state == CodecState::Active {
            while self.input_bit_count > 0 {
                let bit = self.read_bit()?;
                self.code = (self.code << 1) | bit as u32;
            }

            if self.code != u32::from_be_bytes(SYNCHRONIZATION_TRAILER) {
                let mut found = false;
                for _ in 0..5 {
                    let byte = self.read_byte()?;
                    if byte != 0x51 {
                        found = true;
                        break;
                    }
                }
                if !found {
                    return Err(CodecError::StreamEndedImproperly);
                }
            }
        }

        self.state = CodecState::Finalized;
        let _ = close_source; // std::io::Read has no generic close to invoke
        Ok(())
    }

    fn locate_symbol(&self, pos: u64) -> i64 {
        let mut symbol: i64 = 0;
        let mut inc: i64 = 1;
        while pos >= self.context.symbol_pos(symbol + inc) {
            symbol += inc;
            inc *= 2;
        }
        inc /= 2;
        while inc > 0 {
            if pos >= self.context.symbol_pos(symbol + inc) {
                symbol += inc;
            }
            inc /= 2;
        }
        symbol
    }

    fn renormalize(&mut self) -> Result<()> {
        loop {
            if (self.low ^ self.high) & TOP_BIT == 0 {
                self.high = ((self.high << 1) & 0xFFFF_FFFF) | 1;
                self.low = (self.low << 1) & 0xFFFF_FFFF;
                let bit = self.read_bit()?;
                self.code = (self.code << 1) | bit as u32;
            } else if (self.low & SECOND_BIT) != 0 && (self.high & SECOND_BIT) == 0 {
                self.high = ((self.high & 0x7FFF_FFFF) << 1) | 0x8000_0001;
                self.low = (self.low << 1) & 0x7FFF_FFFF;
                let bit = self.read_bit()?;
                self.code = (((self.code & 0x7FFF_FFFF) ^ 0x4000_0000) << 1) | bit as u32;
            } else {
                break;
            }
        }
        Ok(())
    }

    fn read_bit(&mut self) -> Result<u8> {
        if self.input_bit_count == 0 {
            self.input_buffer = self.read_byte()?;
            self.input_bit_count = 8;
        }
        self.input_bit_count -= 1;
        Ok((self.input_buffer >> self.input_bit_count) & 1)
    }

    fn read_byte(&mut self) -> Result<u8> {
        self.read_byte_or_zero()
    }

    fn read_byte_or_zero(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        match self.reader.read_exact(&mut buf) {
            Ok(()) => {
                self.bytes_consumed += 1;
                Ok(buf[0])
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}
