//! Compressed file layout and whole-file compress/decompress.
//!
//! A compressed file is the frequency table header followed by the
//! bit-packed payload, zero-padded to a byte boundary. The decoder needs no
//! length field: it stops at the end-of-stream code.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::bitstream::{BitReader, BitWriter};
use crate::error::{Error, Result};
use crate::frequency::{FrequencyTable, Symbol};
use crate::huffman::{self, Code};

/// Suffix appended to compressed file names.
pub const COMPRESSED_EXTENSION: &str = ".huf";

/// Marker inserted before the first extension of decompressed file names.
const DECOMPRESSED_MARKER: &str = "_unc";

#[derive(Debug, Clone, PartialEq)]
pub struct CompressReport {
    pub original_bytes: usize,
    pub header_bytes: usize,
    /// Payload length in bits, before padding.
    pub bit_count: usize,
    /// The payload as a string of `0` and `1`, filled in by [`compress_traced`].
    pub bits: Option<String>,
    pub frequencies: FrequencyTable,
}

impl CompressReport {
    /// Size of the compressed output in bytes.
    pub fn compressed_size(&self) -> usize {
        self.header_bytes + self.bit_count.div_ceil(8)
    }
}

/// Writes `data` to `output` in compressed form.
pub fn compress<W: Write>(data: &[u8], output: W) -> Result<CompressReport> {
    compress_with(data, output, false)
}

/// Like [`compress`], and also records the payload bits in the report.
pub fn compress_traced<W: Write>(data: &[u8], output: W) -> Result<CompressReport> {
    compress_with(data, output, true)
}

fn compress_with<W: Write>(data: &[u8], mut output: W, trace: bool) -> Result<CompressReport> {
    let frequencies = FrequencyTable::from_bytes(data);
    let encoding_map = huffman::build_coding_tree(&frequencies)
        .map(|tree| huffman::build_encoding_map(&tree))
        .unwrap_or_default();

    let header_bytes = frequencies.write_header(&mut output)?;

    let mut writer = BitWriter::new(output);
    let bits = if trace {
        let mut recorded = Code::new();
        huffman::encode(data, &encoding_map, &mut (&mut writer, &mut recorded))?;
        Some(huffman::code_string(&recorded))
    } else {
        huffman::encode(data, &encoding_map, &mut writer)?;
        None
    };
    let bit_count = writer.bits_written();
    writer.finish()?;

    Ok(CompressReport {
        original_bytes: data.len(),
        header_bytes,
        bit_count,
        bits,
        frequencies,
    })
}

/// Reads compressed data written by [`compress`] and returns the original bytes.
///
/// A non-empty table must list the end-of-stream symbol, since [`compress`]
/// always writes it.
pub fn decompress<R: BufRead>(mut input: R) -> Result<Vec<u8>> {
    let frequencies = FrequencyTable::read_header(&mut input)?;
    if !frequencies.is_empty() && !frequencies.contains(Symbol::EndOfStream) {
        return Err(Error::Header(format!(
            "table {frequencies} has no end-of-stream entry"
        )));
    }
    let Some(tree) = huffman::build_coding_tree(&frequencies) else {
        warn!("Frequency table is empty; nothing to decode");
        return Ok(Vec::new());
    };
    huffman::decode(&mut BitReader::new(input), &tree)
}

/// Compresses `input` into `<input>.huf`.
pub fn compress_file(input: &Path) -> Result<CompressReport> {
    compress_file_to(input, &compressed_path(input))
}

pub fn compress_file_to(input: &Path, output: &Path) -> Result<CompressReport> {
    info!("Reading input file: {}", input.display());
    let data = fs::read(input).map_err(|e| source_error(input, e))?;

    let file = File::create(output)?;
    let report = compress(&data, BufWriter::new(file))?;
    info!(
        "Wrote {} ({} bytes)",
        output.display(),
        report.compressed_size()
    );
    Ok(report)
}

/// Decompresses `input` into the file named by [`decompressed_path`].
/// Returns the decoded bytes.
pub fn decompress_file(input: &Path) -> Result<Vec<u8>> {
    decompress_file_to(input, &decompressed_path(input))
}

pub fn decompress_file_to(input: &Path, output: &Path) -> Result<Vec<u8>> {
    info!("Reading encoded file: {}", input.display());
    let file = File::open(input).map_err(|e| source_error(input, e))?;
    let data = decompress(BufReader::new(file))?;

    let mut out = BufWriter::new(File::create(output)?);
    out.write_all(&data)?;
    out.flush()?;
    info!("Wrote {} ({} bytes)", output.display(), data.len());
    Ok(data)
}

/// `notes.txt` becomes `notes.txt.huf`.
pub fn compressed_path(input: &Path) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(COMPRESSED_EXTENSION);
    PathBuf::from(name)
}

/// Drops a trailing `.huf` and marks the name before its first extension:
/// `example.txt.huf` becomes `example_unc.txt`, `notes.huf` becomes `notes_unc`.
pub fn decompressed_path(input: &Path) -> PathBuf {
    let file_name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = file_name
        .strip_suffix(COMPRESSED_EXTENSION)
        .unwrap_or(&file_name);

    let renamed = match stem.find('.') {
        Some(pos) => format!("{}{}{}", &stem[..pos], DECOMPRESSED_MARKER, &stem[pos..]),
        None => format!("{stem}{DECOMPRESSED_MARKER}"),
    };
    debug!("Decompressed name for {}: {}", input.display(), renamed);
    input.with_file_name(renamed)
}

fn source_error(path: &Path, err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::NotFound {
        Error::MissingSource {
            path: path.to_path_buf(),
        }
    } else {
        Error::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::process;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("huffman-codec-{}-{}", name, process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn compress_then_decompress_in_memory() {
        let data = b"It was the best of times, it was the worst of times.";
        let mut compressed = Vec::new();
        let report = compress(data, &mut compressed).unwrap();

        assert_eq!(report.original_bytes, data.len());
        assert_eq!(report.compressed_size(), compressed.len());
        assert_eq!(report.bits, None);
        assert!(compressed.starts_with(report.frequencies.to_string().as_bytes()));
        assert_eq!(decompress(&compressed[..]).unwrap(), data);
    }

    #[test]
    fn compressed_layout_for_repeated_symbol() {
        let mut compressed = Vec::new();
        let report = compress_traced(b"aaa", &mut compressed).unwrap();
        assert_eq!(report.bits.as_deref(), Some("1110"));
        assert_eq!(report.bit_count, 4);
        assert_eq!(report.header_bytes, 13);
        assert_eq!(report.compressed_size(), 14);

        let mut expected = b"{97:3, 256:1}".to_vec();
        expected.push(0b1110_0000);
        assert_eq!(compressed, expected);
    }

    #[test]
    fn traced_compression_writes_the_same_bytes() {
        let data = b"mississippi river";
        let mut plain = Vec::new();
        let mut traced = Vec::new();
        let untraced = compress(data, &mut plain).unwrap();
        let report = compress_traced(data, &mut traced).unwrap();

        assert_eq!(plain, traced);
        assert_eq!(report.bit_count, untraced.bit_count);
        let bits = report.bits.unwrap();
        assert_eq!(bits.len(), report.bit_count);
        assert!(bits.chars().all(|c| c == '0' || c == '1'));
    }

    #[test]
    fn empty_input_still_produces_a_header() {
        let mut compressed = Vec::new();
        let report = compress(b"", &mut compressed).unwrap();
        assert_eq!(report.bit_count, 0);
        assert_eq!(compressed, b"{256:1}");
        assert!(decompress(&compressed[..]).unwrap().is_empty());
    }

    #[test]
    fn empty_header_decodes_to_nothing() {
        assert!(decompress(&b"{}\xff"[..]).unwrap().is_empty());
    }

    #[test]
    fn corrupt_header_is_an_error() {
        assert!(matches!(
            decompress(&b"{97:3, 999:1}\x00"[..]),
            Err(Error::Header(_))
        ));
    }

    #[test]
    fn output_names() {
        assert_eq!(
            compressed_path(Path::new("dir/example.txt")),
            Path::new("dir/example.txt.huf")
        );
        assert_eq!(
            decompressed_path(Path::new("dir/example.txt.huf")),
            Path::new("dir/example_unc.txt")
        );
        assert_eq!(
            decompressed_path(Path::new("notes.huf")),
            Path::new("notes_unc")
        );
        assert_eq!(
            decompressed_path(Path::new("archive.tar.gz.huf")),
            Path::new("archive_unc.tar.gz")
        );
    }

    #[test]
    fn missing_source_is_reported() {
        let dir = scratch_dir("missing");
        let path = dir.join("does-not-exist.txt");
        assert!(matches!(
            compress_file(&path),
            Err(Error::MissingSource { path: p }) if p == path
        ));
        assert!(matches!(
            decompress_file(&dir.join("nope.txt.huf")),
            Err(Error::MissingSource { .. })
        ));
    }

    #[test]
    fn overflowing_counts_are_a_header_error() {
        let crafted = b"{97:18446744073709551615, 98:1, 256:1}\x00";
        assert!(matches!(decompress(&crafted[..]), Err(Error::Header(_))));
    }

    #[test]
    fn huge_count_without_end_of_stream_is_a_header_error() {
        assert!(matches!(
            decompress(&b"{120:18446744073709551615}"[..]),
            Err(Error::Header(_))
        ));
        assert!(matches!(
            decompress(&b"{120:3}\xff\x00"[..]),
            Err(Error::Header(_))
        ));
    }

    #[test]
    fn zero_count_is_a_header_error() {
        assert!(matches!(
            decompress(&b"{97:0, 256:1}\x00"[..]),
            Err(Error::Header(_))
        ));
    }

    #[test]
    fn huge_but_summable_counts_still_decode() {
        let mut crafted = b"{97:9223372036854775807, 98:1, 256:1}".to_vec();
        // a:1, b:00, end-of-stream:01
        crafted.push(0b1000_1000);
        assert_eq!(decompress(&crafted[..]).unwrap(), b"ab");
    }

    #[test]
    fn file_round_trip() {
        let dir = scratch_dir("files");
        let input = dir.join("sample.txt");
        let data = b"she sells sea shells by the sea shore\n".repeat(20);
        fs::write(&input, &data).unwrap();

        let report = compress_file(&input).unwrap();
        let compressed = compressed_path(&input);
        assert_eq!(
            fs::metadata(&compressed).unwrap().len() as usize,
            report.compressed_size()
        );
        assert!(report.compressed_size() < data.len());

        let decoded = decompress_file(&compressed).unwrap();
        assert_eq!(decoded, data);
        assert_eq!(fs::read(dir.join("sample_unc.txt")).unwrap(), data);

        fs::remove_dir_all(&dir).unwrap();
    }
}
