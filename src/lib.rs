//! # huffman-codec
//!
//! Lossless compression with Huffman codes.
//!
//! Symbol counts go into a [`PriorityQueue`] that hands equal counts back in
//! arrival order. Repeatedly merging the two cheapest entries yields the
//! coding tree; a walk of that tree yields the bit code of every symbol.
//!
//! ```
//! use huffman_codec::archive::{compress, decompress};
//!
//! let mut packed = Vec::new();
//! let report = compress(b"abracadabra", &mut packed)?;
//! assert_eq!(report.compressed_size(), packed.len());
//! assert_eq!(decompress(&packed[..])?, b"abracadabra");
//! # Ok::<(), huffman_codec::Error>(())
//! ```

pub mod archive;
pub mod bitstream;
pub mod error;
pub mod frequency;
pub mod huffman;
pub mod priority_queue;

pub use error::{Error, Result};
pub use frequency::{FrequencyTable, Symbol};
pub use huffman::{CodingNode, EncodingMap};
pub use priority_queue::PriorityQueue;
