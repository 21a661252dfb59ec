//! Writes one DOT file per phase that changed the graph.
//!
//! Usage: cargo run --example diff_phases -- <dump.bgv[.zst]> <out dir> [--spotlight]
//!
//! Files are named `<n>_<phase>.dot`, numbered over the changed phases
//! only. With `--spotlight` the nodes each phase modified are lit and the
//! rest of the graph shaded.

use std::env;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::process;

use bgv::{annotate, read_source, AnnotatorOptions, BgvDecoder, GraphvizWriter, PhaseChanges, UnpackReader};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().skip(1).collect();
    let spotlight = args.iter().any(|arg| arg == "--spotlight");
    let paths: Vec<&String> = args.iter().filter(|arg| !arg.starts_with("--")).collect();
    if paths.len() != 2 {
        eprintln!("usage: diff_phases <dump.bgv[.zst]> <out dir> [--spotlight]");
        process::exit(2);
    }
    let out_dir = Path::new(paths[1]);
    if !out_dir.is_dir() {
        eprintln!("{} is not a directory", out_dir.display());
        process::exit(2);
    }

    let mut decoder = BgvDecoder::new(UnpackReader::new(read_source(paths[0])?));
    decoder.read_file_header(false)?;
    decoder.skip_document_props()?;

    for change in PhaseChanges::new(&mut decoder) {
        let mut change = change?;
        println!("Phase: {}:{}", change.index, change.header.name());

        let seeds = change.seeds();
        let mut options = AnnotatorOptions::new();
        if spotlight && !seeds.is_empty() {
            options = options.spotlight(seeds);
        }
        annotate::apply(&mut change.graph, &options)?;

        let path = out_dir.join(format!("{}.dot", change.file_stem()));
        let mut writer = GraphvizWriter::new(BufWriter::new(File::create(&path)?));
        writer.write_graph(&change.graph, false)?;
        writer.into_inner().flush()?;
    }
    Ok(())
}
