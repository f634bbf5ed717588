use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use rasterqr::render::{print_matrix, to_svg_string};
use rasterqr::{
    generate, generator::encode_matrix, Decode, EncodeOptions, FrameSampler, OverflowPolicy,
    PayloadDecoder, QrDecoder, RasterDecoder, ScanResult, StillSource,
};

#[derive(Parser, Debug)]
#[command(name = "rasterqr", version, about = "Bit-raster code generator and reader")]
struct Cli {
    #[arg(long, short, global = true, help = "Log at debug level")]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render text into a raster image.
    Encode {
        text: String,
        #[arg(long, default_value_t = 200)]
        width: u32,
        #[arg(long, default_value_t = 200)]
        height: u32,
        #[arg(long, help = "Drop text that does not fit instead of failing")]
        truncate: bool,
        #[arg(long, short, default_value = "rasterqr.png")]
        output: PathBuf,
        #[arg(long, help = "Write SVG to stdout instead of a PNG file")]
        svg: bool,
        #[arg(long, help = "Also print the grid to the console")]
        print: bool,
    },
    /// Read text back out of an image.
    Decode {
        image: PathBuf,
        #[arg(long, default_value_t = 200)]
        width: u32,
        #[arg(long, default_value_t = 200)]
        height: u32,
        #[arg(long, help = "Read a standard QR symbol instead of a bit raster")]
        qr: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    if let Err(e) = rasterqr::logger::init_with_level(level) {
        eprintln!("failed to install logger: {e}");
    }

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}

fn run(command: Commands) -> rasterqr::Result<ExitCode> {
    match command {
        Commands::Encode {
            text,
            width,
            height,
            truncate,
            output,
            svg,
            print,
        } => {
            let mut options = EncodeOptions::new(width, height);
            if truncate {
                options = options.with_overflow(OverflowPolicy::Truncate);
            }
            let text = text.trim();
            if text.is_empty() {
                eprintln!("Please enter some text to encode");
                return Ok(ExitCode::from(1));
            }

            if svg || print {
                let matrix = encode_matrix(text, &options)?;
                if print {
                    print_matrix(&matrix);
                }
                if svg {
                    print!("{}", to_svg_string(&matrix, 4));
                    return Ok(ExitCode::SUCCESS);
                }
            }

            let image = generate(text, &options)?;
            image.save(&output)?;
            log::info!("wrote {}x{} raster to {}", width, height, output.display());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Decode {
            image,
            width,
            height,
            qr,
        } => {
            let result = if qr {
                decode_still(&image, QrDecoder)?
            } else {
                decode_still(&image, RasterDecoder::new(width, height))?
            };
            match result {
                ScanResult::Text(text) => {
                    println!("{text}");
                    Ok(ExitCode::SUCCESS)
                }
                ScanResult::NoResult => {
                    println!("no result");
                    Ok(ExitCode::from(1))
                }
            }
        }
    }
}

fn decode_still<D: Decode>(path: &Path, decoder: D) -> rasterqr::Result<ScanResult> {
    let mut source = StillSource::open(path)?;
    let mut decoder = PayloadDecoder::new(decoder);
    Ok(FrameSampler::new()
        .sample(&mut source)
        .map_or(ScanResult::NoResult, |frame| decoder.decode(&frame)))
}
