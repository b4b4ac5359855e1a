//! Database fingerprinting and enumeration tool.
//!
//! Identifies which supported engine answers on a host and port, then prints
//! its version and catalog as JSON on stdout.
//!
//! # Security Guarantees
//! - Read-only database operations only
//! - No credentials logged or printed
//!
//! # Exit status
//! `0` with JSON on stdout on success; `1` with one error line on stderr on
//! any failure (no match, unreachable target, timeout, enumeration error).

use dbenum::{parse_from, run};
use dbenum_core::{AdapterRegistry, DiagnosticLogger};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let registry = AdapterRegistry::builtin();

    let parsed = match parse_from(&registry, std::env::args_os()) {
        Ok(parsed) => parsed,
        Err(e) => e.exit(),
    };
    let logger = DiagnosticLogger::new(parsed.verbose);

    match run(&registry, parsed.invocation, &logger).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
