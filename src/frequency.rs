//! Symbol counts and the text header they are stored as in compressed files.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{BufRead, Read, Write};
use std::str::FromStr;

use log::debug;

use crate::error::{Error, Result};

/// A unit of input: one byte, or the end-of-stream marker appended after the
/// last byte.
///
/// Every byte orders before `EndOfStream`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Symbol {
    Byte(u8),
    EndOfStream,
}

impl Symbol {
    /// Wire code of [`Symbol::EndOfStream`] in the header.
    pub const END_OF_STREAM_CODE: u16 = 256;

    pub fn code(self) -> u16 {
        match self {
            Symbol::Byte(byte) => u16::from(byte),
            Symbol::EndOfStream => Self::END_OF_STREAM_CODE,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            Self::END_OF_STREAM_CODE => Some(Symbol::EndOfStream),
            _ => u8::try_from(code).ok().map(Symbol::Byte),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Byte(byte) => write!(f, "{byte:#04x} ('{}')", (*byte as char).escape_default()),
            Symbol::EndOfStream => f.write_str("EOF"),
        }
    }
}

/// Symbol counts, kept in ascending symbol order.
///
/// That order is also the order symbols enter the coding tree builder, so
/// it settles ties between equal counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: BTreeMap<Symbol, u64>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts every byte of `data` and adds [`Symbol::EndOfStream`] once.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut table = FrequencyTable::new();
        for &byte in data {
            table.increment(Symbol::Byte(byte));
        }
        table.put(Symbol::EndOfStream, 1);
        debug!(
            "Tabulated {} bytes into {} distinct symbols",
            data.len(),
            table.len()
        );
        table
    }

    /// Same as [`FrequencyTable::from_bytes`], pulling bytes from `reader`.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut table = FrequencyTable::new();
        for byte in reader.bytes() {
            table.increment(Symbol::Byte(byte?));
        }
        table.put(Symbol::EndOfStream, 1);
        Ok(table)
    }

    pub fn put(&mut self, symbol: Symbol, count: u64) {
        self.counts.insert(symbol, count);
    }

    /// Count for `symbol`, zero if absent.
    pub fn get(&self, symbol: Symbol) -> u64 {
        self.counts.get(&symbol).copied().unwrap_or(0)
    }

    pub fn contains(&self, symbol: Symbol) -> bool {
        self.counts.contains_key(&symbol)
    }

    pub fn increment(&mut self, symbol: Symbol) {
        *self.counts.entry(symbol).or_insert(0) += 1;
    }

    pub fn keys(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.counts.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Symbol, u64)> + '_ {
        self.counts.iter().map(|(&symbol, &count)| (symbol, count))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        self.counts
            .values()
            .fold(0u64, |total, &count| total.saturating_add(count))
    }

    /// Shannon entropy of the distribution, in bits per symbol.
    pub fn entropy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let total_f = total as f64;

        let entropy: f64 = self
            .counts
            .values()
            .filter(|&&count| count > 0)
            .map(|&count| {
                let p = count as f64 / total_f;
                -p * p.log2()
            })
            .sum();

        debug!(
            "Calculated entropy: {:.4} bits/symbol (Total samples: {})",
            entropy, total
        );
        entropy
    }

    /// Writes the header form of the table and returns its length in bytes.
    pub fn write_header<W: Write + ?Sized>(&self, output: &mut W) -> Result<usize> {
        let header = self.to_string();
        output.write_all(header.as_bytes())?;
        debug!("Header generated. Total header size: {} bytes", header.len());
        Ok(header.len())
    }

    /// Reads a header written by [`FrequencyTable::write_header`], consuming
    /// input up to and including its closing `}` and nothing more.
    pub fn read_header<R: BufRead + ?Sized>(input: &mut R) -> Result<Self> {
        let mut raw = Vec::new();
        input.read_until(b'}', &mut raw)?;
        if raw.last() != Some(&b'}') {
            return Err(Error::Header("missing closing '}'".into()));
        }

        let text = std::str::from_utf8(&raw).map_err(|e| Error::Header(e.to_string()))?;
        let table: FrequencyTable = text.parse()?;
        debug!(
            "Reconstructed frequency table with {} symbols from a {} byte header",
            table.len(),
            raw.len()
        );
        Ok(table)
    }
}

/// `{code:count, code:count, ...}` in key order.
impl fmt::Display for FrequencyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (symbol, count)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}:{}", symbol.code(), count)?;
        }
        f.write_str("}")
    }
}

impl FromStr for FrequencyTable {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let body = s
            .trim()
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .ok_or_else(|| Error::Header(format!("expected {{...}}, got {s:?}")))?;

        let mut table = FrequencyTable::new();
        if body.trim().is_empty() {
            return Ok(table);
        }

        // Every merged tree weight is bounded by the total, so it must fit.
        let mut total: u64 = 0;
        for entry in body.split(',') {
            let (code, count) = entry
                .trim()
                .split_once(':')
                .ok_or_else(|| Error::Header(format!("entry {entry:?} is not code:count")))?;
            let code: u16 = code
                .trim()
                .parse()
                .map_err(|e| Error::Header(format!("bad symbol code {code:?}: {e}")))?;
            let symbol = Symbol::from_code(code)
                .ok_or_else(|| Error::Header(format!("symbol code {code} out of range")))?;
            let count: u64 = count
                .trim()
                .parse()
                .map_err(|e| Error::Header(format!("bad count {count:?}: {e}")))?;
            if count == 0 {
                return Err(Error::Header(format!("symbol code {code} has a zero count")));
            }
            total = total
                .checked_add(count)
                .ok_or_else(|| Error::Header("counts overflow a 64-bit total".to_string()))?;

            if table.contains(symbol) {
                return Err(Error::Header(format!("symbol code {code} listed twice")));
            }
            table.put(symbol, count);
        }
        Ok(table)
    }
}
