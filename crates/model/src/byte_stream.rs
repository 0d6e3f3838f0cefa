//! A 257-symbol byte alphabet (0..=255 plus an end-of-stream marker) over
//! `codec_entropy`, so a caller can encode/decode an arbitrary byte stream
//! without knowing its length up front.

use std::io::{Read, Write};

use codec_common::Result;
use codec_entropy::{ArrayContext, Decoder, Encoder, SymbolContext};

/// Symbol value of the end-of-stream marker. One past the last data byte.
pub const END_OF_STREAM: i64 = 256;

/// Alphabet size: 256 data bytes plus `END_OF_STREAM`.
pub const ALPHABET_SIZE: usize = 257;

/// Build the starting context for a byte stream. `adaptive` controls
/// whether the caller is expected to keep nudging frequencies after each
/// byte (see `ByteStreamEncoder::write_byte`/`ByteStreamDecoder::read_byte`).
pub fn uniform_byte_context() -> ArrayContext {
    ArrayContext::new(ALPHABET_SIZE)
}

/// Wraps a `codec_entropy::Encoder` with a 257-symbol byte alphabet.
pub struct ByteStreamEncoder<'ctx, W: Write> {
    inner: Encoder<'ctx, W>,
    context: &'ctx ArrayContext,
    adaptive: bool,
}

impl<'ctx, W: Write> ByteStreamEncoder<'ctx, W> {
    pub fn new(writer: W, context: &'ctx ArrayContext, adaptive: bool) -> Self {
        Self {
            inner: Encoder::new(writer, context as &dyn SymbolContext),
            context,
            adaptive,
        }
    }

    /// Encode one data byte.
    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.inner.write_symbol(byte as i64)?;
        if self.adaptive {
            self.context.increment_symbol_frequency(byte as usize, 1)?;
        }
        Ok(())
    }

    /// Encode a full slice, one byte at a time.
    pub fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        for &b in bytes {
            self.write_byte(b)?;
        }
        Ok(())
    }

    /// Encode `END_OF_STREAM`, finalize the inner encoder, and hand back
    /// the underlying writer.
    pub fn finish(mut self, close_sink: bool) -> Result<W> {
        self.inner.write_symbol(END_OF_STREAM)?;
        self.inner.finalize(close_sink)?;
        Ok(self.inner.into_inner())
    }
}

/// Wraps a `codec_entropy::Decoder` with a 257-symbol byte alphabet.
pub struct ByteStreamDecoder<'ctx, R: Read> {
    inner: Decoder<'ctx, R>,
    context: &'ctx ArrayContext,
    adaptive: bool,
    ended: bool,
}

impl<'ctx, R: Read> ByteStreamDecoder<'ctx, R> {
    pub fn new(reader: R, context: &'ctx ArrayContext, adaptive: bool) -> Self {
        Self {
            inner: Decoder::new(reader, context as &dyn SymbolContext),
            context,
            adaptive,
            ended: false,
        }
    }

    /// Decode the next byte, or `None` once `END_OF_STREAM` has been seen.
    ///
    /// `ended` is set *before* this returns the sentinel result, and every
    /// later call checks it first and short-circuits without touching the
    /// inner decoder. A prior implementation this one replaces called
    /// `read_symbol` again after the stream had already ended, risking
    /// state corruption on an interleaved read path; this flag closes that
    /// hole rather than reproducing it.
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        if self.ended {
            return Ok(None);
        }
        let symbol = self.inner.read_symbol()?;
        if symbol == END_OF_STREAM {
            self.ended = true;
            return Ok(None);
        }
        if self.adaptive {
            self.context
                .increment_symbol_frequency(symbol as usize, 1)?;
        }
        Ok(Some(symbol as u8))
    }

    /// Decode until `END_OF_STREAM`, collecting every byte read.
    pub fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(b) = self.read_byte()? {
            out.push(b);
        }
        Ok(out)
    }

    /// Finalize the inner decoder, consuming the synchronization trailer.
    pub fn finish(mut self, close_source: bool) -> Result<()> {
        self.inner.finalize(close_source)
    }
}
