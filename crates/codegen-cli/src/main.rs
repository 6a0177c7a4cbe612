use std::process::ExitCode;

use anyhow::Result;

fn main() -> Result<ExitCode> {
    codegen_core::init_tracing();

    let matches = codegen_cli::build_cli().get_matches();
    codegen_cli::run(&matches)
}
