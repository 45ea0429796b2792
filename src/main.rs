use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use dense::{CodecError, HuffmanCodec};

#[derive(ClapParser, Debug)]
#[command(version, about = "Huffman compress or decompress a byte stream", long_about = None)]
struct Args {
    /// Input file, stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file, stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Decompress instead of compress
    #[arg(short, long)]
    decode: bool,

    /// Overwrite the output file if it already exists
    #[arg(short, long)]
    force: bool,

    /// Log per-block byte counts after compressing
    #[arg(long)]
    stats: bool,

    /// Log the Huffman tree built for the input
    #[arg(long)]
    print_tree: bool,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logger(&args);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("dense: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

fn init_logger(args: &Args) {
    let default = match args.verbose {
        0 if args.stats || args.print_tree => "info",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn run(args: &Args) -> Result<()> {
    let source: Box<dyn Read> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("cannot open input {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };

    let sink: Box<dyn Write> = match &args.output {
        Some(path) => {
            let mut options = OpenOptions::new();
            options.write(true);
            if args.force {
                options.create(true).truncate(true);
            } else {
                // refuse to clobber an existing file
                options.create_new(true);
            }
            let file = options.open(path).with_context(|| {
                format!("cannot create output {} (use --force to overwrite)", path.display())
            })?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(io::stdout().lock()),
    };

    if args.decode {
        HuffmanCodec::decode(source, sink).context("decoding failed")?;
    } else {
        encode(args, source, sink)?;
    }
    Ok(())
}

/// Buffers the whole input. Read failures surface as `CodecError::Io`, like any codec I/O.
fn read_input<R: Read>(mut source: R) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    source.read_to_end(&mut data).map_err(CodecError::from).context("cannot read input")?;
    Ok(data)
}

fn encode(args: &Args, source: Box<dyn Read>, mut sink: Box<dyn Write>) -> Result<()> {
    let data = read_input(source)?;

    let codec = HuffmanCodec::from_data(&data).context("encoding failed")?;
    if args.print_tree {
        log::info!("{}", codec.tree());
        for (byte, code) in codec.encode_table() {
            log::info!("{:#04x}\t{}", byte, code);
        }
    }

    let stats = codec.write_container(&data, &mut sink).context("encoding failed")?;
    sink.flush().map_err(CodecError::from).context("cannot flush output")?;

    if args.stats {
        log::info!("tree shape bytes:\t{}", stats.shape_bytes);
        log::info!("tree values bytes:\t{}", stats.leaves_bytes);
        log::info!("encoded data bytes:\t{}", stats.data_bytes);
        log::info!(
            "total bytes:\t\t{} ({} with block headers, input {})",
            stats.total(),
            stats.container_bytes(),
            stats.input_bytes
        );
    }
    Ok(())
}

/// Distinct exit status per failure kind.
fn exit_code(e: &anyhow::Error) -> u8 {
    match e.downcast_ref::<CodecError>() {
        Some(CodecError::Io(_)) => 3,
        Some(CodecError::Truncated) => 4,
        Some(CodecError::UnexpectedBlockId { .. }) => 5,
        Some(CodecError::MalformedShape(_))
        | Some(CodecError::LeafCountMismatch { .. })
        | Some(CodecError::UnexpectedLeafRoot) => 6,
        Some(CodecError::InvalidPadding { .. }) => 7,
        Some(CodecError::CodewordTooLong { .. }) | Some(CodecError::SymbolNotInTable(_)) => 8,
        // file handling outside the codec
        None => 2,
    }
}
