use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use codec_model::{uniform_byte_context, ByteStreamDecoder, ByteStreamEncoder, PredictiveByteModel};

#[derive(Parser)]
#[command(name = "acc")]
#[command(about = "Arithmetic-coding codec: encode/decode arbitrary byte streams")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a file (or stdin) to the codec's bitstream format
    Encode {
        /// Input file, or "-" for stdin
        #[arg(short, long, default_value = "-")]
        input: String,

        /// Output file, or "-" for stdout
        #[arg(short, long, default_value = "-")]
        output: String,

        /// Sliding-window context order for adaptive prediction. 0 disables
        /// prediction and uses a uniform static byte context.
        #[arg(long, default_value_t = 0)]
        order: usize,

        /// Print byte counts and timing to stderr at debug level
        #[arg(short, long)]
        verbose: bool,
    },

    /// Decode a file (or stdin) produced by `acc encode`
    Decode {
        #[arg(short, long, default_value = "-")]
        input: String,

        #[arg(short, long, default_value = "-")]
        output: String,

        /// Must match the --order the file was encoded with.
        #[arg(long, default_value_t = 0)]
        order: usize,

        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Encode {
            input,
            output,
            order,
            verbose,
        } => {
            init_logging(*verbose);
            encode(input, output, *order)
        }
        Commands::Decode {
            input,
            output,
            order,
            verbose,
        } => {
            init_logging(*verbose);
            decode(input, output, *order)
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn open_input(path: &str) -> Result<Box<dyn Read>> {
    if path == "-" {
        Ok(Box::new(io::stdin()))
    } else {
        let file = File::open(path).with_context(|| format!("opening {path}"))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

fn open_output(path: &str) -> Result<Box<dyn Write>> {
    if path == "-" {
        Ok(Box::new(io::stdout()))
    } else {
        let file = File::create(path).with_context(|| format!("creating {path}"))?;
        Ok(Box::new(BufWriter::new(file)))
    }
}

fn encode(input: &str, output: &str, order: usize) -> Result<()> {
    let mut src = open_input(input)?;
    let mut data = Vec::new();
    src.read_to_end(&mut data)?;
    log::debug!("read {} bytes from {}", data.len(), input);

    let mut sink = open_output(output)?;
    if order == 0 {
        let ctx = uniform_byte_context();
        let mut enc = ByteStreamEncoder::new(&mut sink, &ctx, true);
        enc.write_all(&data)?;
        enc.finish(true)?;
    } else {
        let model = PredictiveByteModel::new(order);
        let mut enc = codec_entropy::Encoder::new(
            &mut sink,
            model.current_context() as &dyn codec_entropy::SymbolContext,
        );
        for &b in &data {
            enc.write_symbol(b as i64)?;
            model.observe(b)?;
        }
        enc.write_symbol(codec_model::END_OF_STREAM)?;
        enc.finalize(true)?;
    }

    log::info!("encoded {} input bytes ({})", data.len(), path_label(input));
    Ok(())
}

fn decode(input: &str, output: &str, order: usize) -> Result<()> {
    let src = open_input(input)?;
    let mut sink = open_output(output)?;

    let decoded = if order == 0 {
        let ctx = uniform_byte_context();
        let mut dec = ByteStreamDecoder::new(src, &ctx, true);
        let bytes = dec.read_to_end()?;
        dec.finish(true)?;
        bytes
    } else {
        let model = PredictiveByteModel::new(order);
        let mut dec = codec_entropy::Decoder::new(
            src,
            model.current_context() as &dyn codec_entropy::SymbolContext,
        );
        let mut bytes = Vec::new();
        loop {
            let symbol = dec.read_symbol()?;
            if symbol == codec_model::END_OF_STREAM {
                break;
            }
            let b = symbol as u8;
            bytes.push(b);
            model.observe(b)?;
        }
        dec.finalize(true)?;
        bytes
    };

    log::info!("decoded {} output bytes ({})", decoded.len(), path_label(output));
    sink.write_all(&decoded)?;
    Ok(())
}

fn path_label(path: &str) -> String {
    if path == "-" {
        "stdin/stdout".to_string()
    } else {
        PathBuf::from(path).display().to_string()
    }
}

