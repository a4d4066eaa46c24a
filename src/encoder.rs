use std::env;
use std::path::PathBuf;
use std::time::Instant;

use log::{debug, error, info};

use huffman_codec::archive::{compress_file_to, compressed_path};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        error!("Usage: {} <input_file> [output_file]", args[0]);
        eprintln!("  📂 <input_file>:  path to the file to encode.");
        eprintln!("  💾 [output_file]: where to write it, defaults to <input_file>.huf");
        std::process::exit(1);
    }

    let input_filepath = PathBuf::from(&args[1]);
    let output_filepath = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| compressed_path(&input_filepath));

    info!("--- Start Encoding ---");
    let start_time = Instant::now();

    let report = match compress_file_to(&input_filepath, &output_filepath) {
        Ok(report) => report,
        Err(e) => {
            error!("Failed to encode {}: {}", input_filepath.display(), e);
            std::process::exit(1);
        }
    };

    debug!("Encoding finished in {:.2?}.", start_time.elapsed());

    let original_len = report.original_bytes;
    let total_output_size = report.compressed_size();
    let file_entropy = report.frequencies.entropy();
    let compression_ratio = if original_len > 0 {
        100.0 * (1.0 - (total_output_size as f64) / (original_len as f64))
    } else {
        0.0
    };

    println!(
        "\r\n✅ Encoding successful.\n\
         📂  Input:       {} ({} bytes)\n\
         💾  Output:      {} ({} bytes)\n\
         🔢  Payload:     {} bits + {} byte header\n\
         ℹ️  Entropy:     {:.4} bits/symbol\n\
         🗜️  Ratio:       {:.4}%",
        input_filepath.display(),
        original_len,
        output_filepath.display(),
        total_output_size,
        report.bit_count,
        report.header_bytes,
        file_entropy,
        compression_ratio
    );

    info!("--- End ---");
}
