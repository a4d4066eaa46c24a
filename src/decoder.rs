use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use log::{debug, error, info};

use huffman_codec::FrequencyTable;
use huffman_codec::archive::{decompress_file_to, decompressed_path};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        error!("Usage: {} <input_file> [output_file]", args[0]);
        eprintln!("  📂 <input_file>:  path to the encoded file.");
        eprintln!("  💾 [output_file]: path to write the decoded output.");
        std::process::exit(1);
    }

    let input_filepath = PathBuf::from(&args[1]);
    let output_filepath = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| decompressed_path(&input_filepath));

    info!("--- Start Decoding ---");
    let start_time = Instant::now();

    let decoded_data = match decompress_file_to(&input_filepath, &output_filepath) {
        Ok(data) => data,
        Err(e) => {
            error!("Failed to decode {}: {}", input_filepath.display(), e);
            std::process::exit(1);
        }
    };

    debug!("Bitstream decoding finished in {:.2?}.", start_time.elapsed());

    let input_size = fs::metadata(&input_filepath).map(|m| m.len()).unwrap_or(0);
    let output_size = decoded_data.len() as u64;
    // Entropy of the decoded bytes, end-of-stream marker included.
    let file_entropy = FrequencyTable::from_bytes(&decoded_data).entropy();

    let ratio = if output_size > 0 {
        100.0 * (1.0 - (input_size as f64) / (output_size as f64))
    } else {
        0.0
    };

    println!(
        "\r\n✅ decoding successful.\n\
         📂 input file:        {} ({} bytes)\n\
         💾 output file:       {} ({} bytes)\n\
         ℹ️ entropy:           {:.2} bits/symbol\n\
         🗜️ compression ratio: {:.2}% (relative to decoded output)",
        input_filepath.display(),
        input_size,
        output_filepath.display(),
        output_size,
        file_entropy,
        ratio
    );

    info!("--- End ---");
}
