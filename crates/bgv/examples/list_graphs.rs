//! Lists the graphs in a BGV dump with their node counts.
//!
//! Usage: cargo run --example list_graphs -- <dump.bgv[.zst]> [--skip]
//!
//! With `--skip` graph bodies are skipped instead of decoded, so node
//! counts are not shown.

use std::env;
use std::process;

use bgv::{read_source, BgvDecoder, UnpackReader};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: list_graphs <dump.bgv[.zst]> [--skip]");
        process::exit(2);
    };
    let skip = args.any(|arg| arg == "--skip");

    let data = read_source(&path)?;
    println!("Reading: {} ({} bytes)", path, data.len());

    let mut decoder = BgvDecoder::new(UnpackReader::new(data));
    let (major, minor) = decoder.read_file_header(false)?;
    println!("BGV version {}.{}", major, minor);

    if let Some(props) = decoder.read_document_props()? {
        for (key, value) in &props {
            println!("  {}: {}", key, value);
        }
    }

    let mut count = 0;
    while let Some((index, id)) = decoder.read_graph_preheader()? {
        let header = decoder.read_graph_header()?;
        if skip {
            decoder.skip_graph()?;
            println!("{:>4}  id={:<6} {}", index, id, header.name());
        } else {
            let graph = decoder.read_graph()?;
            println!(
                "{:>4}  id={:<6} {:>6} nodes {:>6} edges  {}",
                index,
                id,
                graph.node_count(),
                graph.edge_count(),
                header.name()
            );
        }
        count += 1;
    }

    println!("\n{} graphs", count);
    Ok(())
}
