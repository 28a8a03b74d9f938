use std::io::Write;

use tcgen_core::ingest::chunk_document;

use crate::cli::args::ChunkArgs;
use crate::exit_codes;

pub fn run(args: ChunkArgs) -> anyhow::Result<i32> {
    let chunks = match chunk_document(&args.document, args.max_chars) {
        Ok(chunks) => chunks,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(exit_codes::INPUT_ERROR);
        }
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for chunk in &chunks {
        writeln!(out, "{}", serde_json::to_string(chunk)?)?;
    }
    out.flush()?;
    tracing::info!(chunks = chunks.len(), "chunking done");
    Ok(exit_codes::SUCCESS)
}
