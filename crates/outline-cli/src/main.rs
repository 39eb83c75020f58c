//! Command-line driver: reads a distance matrix, runs the outline pipeline,
//! and writes Nexus splits (and, unless `--no-draw`, a TGF outline).

mod data;
mod error;
mod fasta;
mod nexus;
mod tgf;

use std::io::BufReader;
use std::path::{Path, PathBuf};

use clap::Parser;
use error::InputError;
use ftlog::{appender::FileAppender, LevelFilter, LoggerGuard};
use tgf::CanvasOptions;

/// Computes a phylogenetic outline from a distance matrix.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the distance-matrix input, or `-` for standard input.
    infile: String,

    /// Base path for output files (`<prefix>.nex`, `<prefix>.tgf`). Defaults
    /// to the input file's stem, or `outline` for stdin.
    #[arg(short('o'), long)]
    out_prefix: Option<PathBuf>,

    /// Skip the outline sweep; only write the Nexus splits file.
    #[arg(long)]
    no_draw: bool,

    /// Root the network at the midpoint of its most distant taxa, or at
    /// `--out-group` if given.
    #[arg(long)]
    rooted: bool,

    /// Use the alternate root-insertion point on the cycle.
    #[arg(long)]
    alt: bool,

    /// Comma-separated taxon labels forming the out-group for rooting.
    #[arg(long, value_delimiter = ',')]
    out_group: Vec<String>,

    /// Also write a FASTA-style 0/1 split matrix to `<prefix>.fasta`.
    #[arg(long)]
    export_fasta: bool,

    /// Canvas width in pixels, stashed for a downstream renderer.
    #[arg(long, default_value = "800")]
    width: u32,

    /// Canvas height in pixels, stashed for a downstream renderer.
    #[arg(long, default_value = "600")]
    height: u32,

    /// Canvas margin in pixels, stashed for a downstream renderer.
    #[arg(long, default_value = "20")]
    margin: u32,

    /// Font size in points, stashed for a downstream renderer.
    #[arg(long, default_value = "12")]
    font_size: u32,

    /// Emit debug-level logs in addition to info-level.
    #[arg(short('v'), long)]
    verbose: bool,
}

fn configure_logger(verbose: bool) -> Result<LoggerGuard, String> {
    let logs_dir = PathBuf::from("logs");
    if !logs_dir.exists() {
        std::fs::create_dir(&logs_dir).map_err(|e| e.to_string())?;
    }
    let log_path = logs_dir.join("outline.log");
    let writer = FileAppender::builder().path(&log_path).build();
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    ftlog::Builder::new().max_log_level(level).root(writer).try_init().map_err(|e| e.to_string())
}

fn prefix_for(infile: &str, out_prefix: Option<&Path>) -> PathBuf {
    if let Some(p) = out_prefix {
        return p.to_path_buf();
    }
    if infile == "-" {
        PathBuf::from("outline")
    } else {
        Path::new(infile).with_extension("")
    }
}

fn resolve_out_group(labels: &[String], names: &[String]) -> Result<Vec<usize>, InputError> {
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        let taxon = labels
            .iter()
            .position(|l| l == name)
            .map(|pos| pos + 1)
            .ok_or_else(|| InputError::Format { line: 0, detail: format!("out-group label '{name}' is not a known taxon") })?;
        ids.push(taxon);
    }
    Ok(ids)
}

fn run(args: &Args) -> Result<(), InputError> {
    let (labels, matrix) = if args.infile == "-" {
        data::read_distances(BufReader::new(std::io::stdin().lock()))?
    } else {
        let file = std::fs::File::open(&args.infile)?;
        data::read_distances(BufReader::new(file))?
    };

    let out_group = resolve_out_group(&labels, &args.out_group)?;

    ftlog::info!("running pipeline for {} taxa", matrix.n_tax());
    let outline = outline_core::run(labels, &matrix, true, args.rooted, args.alt, &out_group, true)?;

    let prefix = prefix_for(&args.infile, args.out_prefix.as_deref());

    let nex_path = prefix.with_extension("nex");
    let mut nex_file = std::fs::File::create(&nex_path)?;
    nexus::write_nexus(&mut nex_file, outline.n_tax, &outline.labels, &outline.cycle, &outline.splits, &matrix)?;
    ftlog::info!("wrote splits to {}", nex_path.display());

    if args.export_fasta {
        let fasta_path = prefix.with_extension("fasta");
        let mut fasta_file = std::fs::File::create(&fasta_path)?;
        fasta::write_fasta(&mut fasta_file, &outline.labels, &outline.splits)?;
        ftlog::info!("wrote split matrix to {}", fasta_path.display());
    }

    if !args.no_draw {
        let tgf_path = prefix.with_extension("tgf");
        let mut tgf_file = std::fs::File::create(&tgf_path)?;
        let canvas = CanvasOptions { width: args.width, height: args.height, margin: args.margin, font_size: args.font_size };
        tgf::write_tgf(&mut tgf_file, &outline.graph, Some(canvas))?;
        ftlog::info!("wrote outline to {}", tgf_path.display());
    }

    Ok(())
}

fn main() {
    let args = Args::parse();

    if let Err(e) = configure_logger(args.verbose) {
        eprintln!("warning: could not configure logger: {e}");
    }

    if let Err(e) = run(&args) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
