//! Command line front door: translate a program document into a C++ source file.
//!
//! Usage:
//!   onnx-secure-codegen --path lenet.json --mode u64 --scale 12 --backend LLAMA

use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::error;

use onnx_secure_codegen::{Backend, NumericMode, ProgramLoader, TranslationOptions, Translator};

/// Translate a shape-annotated program into source for a secure inference runtime.
#[derive(Debug, Parser)]
#[command(name = "onnx-secure-codegen", version)]
struct Cli {
    /// The program document (JSON) produced by the front-end.
    #[arg(long)]
    path: PathBuf,
    /// Numeric mode of the generated program: u64, i64 or float.
    #[arg(long, default_value = "u64")]
    mode: String,
    /// Fractional bits of the fixed-point encoding.
    #[arg(long)]
    scale: Option<u32>,
    /// Target runtime: CLEARTEXT, LLAMA or SECFLOAT.
    #[arg(long, default_value = "LLAMA")]
    backend: String,
    /// Directory the artifact is written to (defaults to the program's directory).
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// Never emit lifetime-scheduled deallocations.
    #[arg(long)]
    no_dealloc: bool,
}

fn run(cli: Cli) -> onnx_secure_codegen::Result<PathBuf> {
    let mut options = TranslationOptions::new()
        .set_mode(NumericMode::parse(&cli.mode)?)
        .set_backend(Backend::parse(&cli.backend)?);
    options.scale = cli.scale;
    if cli.no_dealloc {
        options = options.enable_deallocation(false);
    }
    let translator = Translator::new(options)?;

    let loaded = ProgramLoader::load_program(&cli.path)?;
    let out_dir = match cli.out_dir {
        Some(dir) => dir,
        None => cli
            .path
            .parent()
            .map(|parent| parent.to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    translator.export(&loaded.program, &loaded.value_info, loaded.bindings, &out_dir)
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(path) => println!("{}", path.display()),
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
