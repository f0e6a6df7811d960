use clap::Parser as ClapParser;
use loxcore::Vm;
use std::fs;
use std::io;
use std::process::ExitCode;

#[derive(ClapParser)]
#[command(name = "loxcore", about = "A bytecode compiler and VM for a small Lox-family language")]
struct Cli {
  /// Script to run.
  path: String,

  /// Print the compiled bytecode before running it.
  #[arg(long)]
  disassemble: bool,

  /// Trace every instruction (and the value stack) as it executes.
  #[arg(long)]
  trace: bool,
}

fn main() -> ExitCode {
  env_logger::init();
  let cli = Cli::parse();

  if cli.disassemble && !cfg!(feature = "debug-print-code") {
    log::warn!("--disassemble was passed, but this build was compiled without the debug-print-code feature");
  }
  if cli.trace && !cfg!(feature = "debug-trace-execution") {
    log::warn!("--trace was passed, but this build was compiled without the debug-trace-execution feature");
  }

  let source = match fs::read_to_string(&cli.path) {
    Ok(source) => source,
    Err(err) => {
      eprintln!("Could not read file '{}': {}", cli.path, err);
      return ExitCode::from(74);
    }
  };

  let mut vm = Vm::new(io::stdout());
  vm.set_debug_flags(cli.disassemble, cli.trace);
  let result = vm.interpret(&source);

  for error in result.compile_errors() {
    eprintln!("{}", error);
  }
  if let Some(error) = result.runtime_error() {
    eprintln!("{}", error);
  }

  ExitCode::from(result.exit_code() as u8)
}
