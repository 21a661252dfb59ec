//! Searches graph names and properties in a BGV dump.
//!
//! Usage: cargo run --example search -- <dump.bgv[.zst]>[:<index>] <term>...

use std::env;
use std::process;

use bgv::{read_source, BgvDecoder, Search, UnpackReader};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 2 {
        eprintln!("usage: search <dump.bgv[.zst]>[:<index>] <term>...");
        process::exit(2);
    }
    let (file, only) = match args[0].rsplit_once(':') {
        Some((file, index)) if index.parse::<usize>().is_ok() => (file, Some(index.parse::<usize>()?)),
        _ => (args[0].as_str(), None),
    };

    let mut decoder = BgvDecoder::new(UnpackReader::new(read_source(file)?));
    decoder.read_file_header(false)?;
    decoder.skip_document_props()?;
    for hit in Search::new(&args[1..]).decoder(&mut decoder, only)? {
        println!("{file}:{hit}");
    }
    Ok(())
}
