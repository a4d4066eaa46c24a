//! Single-bit reads and writes over byte streams, most significant bit first.

use std::io::{self, Read, Write};

use bitvec::prelude::*;

pub trait BitWrite {
    fn write_bit(&mut self, bit: bool) -> io::Result<()>;
}

pub trait BitRead {
    /// Next bit, or `None` once the stream is exhausted.
    fn read_bit(&mut self) -> io::Result<Option<bool>>;
}

impl<B: BitWrite + ?Sized> BitWrite for &mut B {
    fn write_bit(&mut self, bit: bool) -> io::Result<()> {
        (**self).write_bit(bit)
    }
}

/// Writes every bit to both halves, first then second.
impl<A: BitWrite, B: BitWrite> BitWrite for (A, B) {
    fn write_bit(&mut self, bit: bool) -> io::Result<()> {
        self.0.write_bit(bit)?;
        self.1.write_bit(bit)
    }
}

impl<B: BitRead + ?Sized> BitRead for &mut B {
    fn read_bit(&mut self) -> io::Result<Option<bool>> {
        (**self).read_bit()
    }
}

/// Packs bits into bytes on the way to `W`.
///
/// The last partial byte is only written by [`BitWriter::finish`], padded
/// with zero bits.
pub struct BitWriter<W: Write> {
    inner: W,
    byte: u8,
    filled: u8,
    bits_written: usize,
}

impl<W: Write> BitWriter<W> {
    pub fn new(inner: W) -> Self {
        BitWriter {
            inner,
            byte: 0,
            filled: 0,
            bits_written: 0,
        }
    }

    pub fn bits_written(&self) -> usize {
        self.bits_written
    }

    /// Flushes the pending partial byte and hands back the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        if self.filled > 0 {
            let padded = self.byte << (8 - self.filled);
            self.inner.write_all(&[padded])?;
        }
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> BitWrite for BitWriter<W> {
    fn write_bit(&mut self, bit: bool) -> io::Result<()> {
        self.byte = (self.byte << 1) | u8::from(bit);
        self.filled += 1;
        self.bits_written += 1;
        if self.filled == 8 {
            self.inner.write_all(&[self.byte])?;
            self.byte = 0;
            self.filled = 0;
        }
        Ok(())
    }
}

/// Unpacks bytes from `R` one bit at a time.
pub struct BitReader<R: Read> {
    bytes: io::Bytes<R>,
    byte: u8,
    remaining: u8,
}

impl<R: Read> BitReader<R> {
    pub fn new(inner: R) -> Self {
        BitReader {
            bytes: inner.bytes(),
            byte: 0,
            remaining: 0,
        }
    }
}

impl<R: Read> BitRead for BitReader<R> {
    fn read_bit(&mut self) -> io::Result<Option<bool>> {
        if self.remaining == 0 {
            match self.bytes.next() {
                Some(byte) => {
                    self.byte = byte?;
                    self.remaining = 8;
                }
                None => return Ok(None),
            }
        }
        self.remaining -= 1;
        Ok(Some((self.byte >> self.remaining) & 1 == 1))
    }
}

impl BitWrite for BitVec<u8, Msb0> {
    fn write_bit(&mut self, bit: bool) -> io::Result<()> {
        self.push(bit);
        Ok(())
    }
}

/// Reads bits back out of an in-memory bit slice.
pub struct BitCursor<'a> {
    bits: &'a BitSlice<u8, Msb0>,
    pos: usize,
}

impl<'a> BitCursor<'a> {
    pub fn new(bits: &'a BitSlice<u8, Msb0>) -> Self {
        BitCursor { bits, pos: 0 }
    }

    /// Bits consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl BitRead for BitCursor<'_> {
    fn read_bit(&mut self) -> io::Result<Option<bool>> {
        if self.pos >= self.bits.len() {
            return Ok(None);
        }
        let bit = self.bits[self.pos];
        self.pos += 1;
        Ok(Some(bit))
    }
}
