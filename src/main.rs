use std::fs;
use std::io;
use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};

use lolkek::bytecode::disasm::disassemble_annotated;
use lolkek::frontend::token_dumper::TokenDumper;
use lolkek::lang::tree_dump::dump_tree;
use lolkek::pipeline;
use lolkek::utils::log::{self, Level};
use lolkek::{VmConfig, error, info, warn};

const SOURCE_EXTENSION: &str = "lk";

#[derive(Parser)]
#[command(name = "lolkek")]
#[command(about = "Compiler, assembler and virtual machine for .lk programs", long_about = None)]
struct Cli {
    /// Print progress information
    #[arg(long, global = true)]
    verbose: bool,
    /// Print errors only
    #[arg(long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile and execute a source file
    Run {
        path: String,
        #[command(flatten)]
        vm: VmArgs,
    },
    /// Compile a source file to assembly text
    Compile {
        path: String,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Assemble assembly text to a binary
    Assemble {
        path: String,
        /// Output file (defaults to the input with a .bin extension)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Execute a binary
    Exec {
        path: String,
        #[command(flatten)]
        vm: VmArgs,
    },
    /// Print an annotated listing of a binary
    Disasm { path: String },
    /// Show the token stream of a source file
    Tokens {
        path: String,
        /// Also show each token's debug representation
        #[arg(long)]
        pretty: bool,
    },
    /// Show the syntax tree of a source file
    Ast { path: String },
    /// Print the tree interchange dump of a source file
    Tree { path: String },
}

#[derive(Args)]
struct VmArgs {
    /// Number of memory cells
    #[arg(long)]
    memory_size: Option<usize>,
    /// Stop after this many instructions
    #[arg(long)]
    max_steps: Option<usize>,
    /// Maximum nesting of calls
    #[arg(long)]
    max_call_depth: Option<usize>,
}

impl VmArgs {
    fn config(&self) -> VmConfig {
        let mut config = VmConfig::default().max_steps(self.max_steps);
        if let Some(size) = self.memory_size {
            config = config.memory_size(size);
        }
        if let Some(depth) = self.max_call_depth {
            config = config.max_call_depth(depth);
        }
        config
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    configure_logging(&cli);

    match dispatch(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn configure_logging(cli: &Cli) {
    let level = if cli.verbose {
        Level::Info
    } else if cli.quiet {
        Level::Error
    } else {
        Level::Warn
    };
    log::set_level(level);
    log::USE_COLOR.store(!cli.no_color, Ordering::Relaxed);
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<lolkek::Error>() {
        Some(e) => eprintln!("{}: {}", e.category(), e),
        None => error!("{:#}", err),
    }
}

fn dispatch(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Run { path, vm } => {
            let source = read_source(path)?;
            let stdin = io::stdin().lock();
            pipeline::run_source(&source, vm.config(), stdin, io::stdout().lock())?;
        }
        Commands::Compile { path, output } => {
            let asm = pipeline::compile_to_asm(&read_source(path)?)?;
            match output {
                Some(out) => write_output(out, asm.as_bytes())?,
                None => print!("{}", asm),
            }
        }
        Commands::Assemble { path, output } => {
            let asm = fs::read_to_string(path).with_context(|| format!("failed to read '{}'", path))?;
            let bytes = pipeline::assemble_to_binary(&asm)?;
            let out = output
                .clone()
                .unwrap_or_else(|| Path::new(path).with_extension("bin").display().to_string());
            write_output(&out, &bytes)?;
        }
        Commands::Exec { path, vm } => {
            let program = pipeline::load(&read_binary(path)?)?;
            let stdin = io::stdin().lock();
            pipeline::execute(&program, vm.config(), stdin, io::stdout().lock())?;
        }
        Commands::Disasm { path } => {
            let program = pipeline::load(&read_binary(path)?)?;
            print!("{}", disassemble_annotated(&program));
        }
        Commands::Tokens { path, pretty } => {
            let tokens = pipeline::tokenize(&read_source(path)?)?;
            let mut dumper = TokenDumper::new();
            if cli.no_color {
                dumper = dumper.no_color();
            }
            if *pretty {
                dumper = dumper.pretty();
            }
            dumper.dump(&tokens);
        }
        Commands::Ast { path } => {
            let root = pipeline::parse_source(&read_source(path)?)?;
            println!("{:#?}", root);
        }
        Commands::Tree { path } => {
            let root = pipeline::parse_source(&read_source(path)?)?;
            print!("{}", dump_tree(&root));
        }
    }
    Ok(())
}

fn ensure_extension(path: &str) -> Result<()> {
    if Path::new(path).extension().and_then(|e| e.to_str()) != Some(SOURCE_EXTENSION) {
        bail!("expected a .{} file, got {}", SOURCE_EXTENSION, path);
    }
    Ok(())
}

fn read_source(path: &str) -> Result<String> {
    ensure_extension(path)?;
    info!("reading {}", path);
    fs::read_to_string(path).with_context(|| format!("failed to read '{}'", path))
}

fn read_binary(path: &str) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("failed to read '{}'", path))
}

/// Writes only after the producing stage succeeded.
fn write_output(path: &str, bytes: &[u8]) -> Result<()> {
    if Path::new(path).exists() {
        warn!("overwriting {}", path);
    }
    fs::write(path, bytes).with_context(|| format!("failed to write '{}'", path))?;
    info!("wrote {} bytes to {}", bytes.len(), path);
    Ok(())
}
