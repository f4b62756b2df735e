//! sigbridge CLI - detached signatures through an external signing program
//!
//! This is the CLI binary that uses the sigbridge library to drive gpg/gpgsm.

mod cli;
mod config;
mod error;
mod output;

use clap::Parser;
use cli::{Cli, Commands, SignArgs, SplitArgs, VerifyArgs};
use error::{CliError, Result};
use sigbridge::{OutputFlags, SigningBackend};
use std::io::{Read, Write};
use std::path::Path;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{}", e);
            eprintln!("sigbridge: {}", e);
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let backend = build_backend(&cli)?;

    match cli.command {
        Commands::Sign(args) => run_sign(&backend, args),
        Commands::Verify(args) => run_verify(&backend, args, cli.silent),
        Commands::Split(args) => run_split(&backend, args),
        Commands::Formats => {
            output::print_formats(backend.registry());
            Ok(0)
        }
    }
}

/// Apply the config file, then the global CLI overrides.
fn build_backend(cli: &Cli) -> Result<SigningBackend> {
    let file_config = config::load_config(cli.config.as_deref())?;
    let mut backend = SigningBackend::from_config(&file_config)?;

    if let Some(format) = &cli.format {
        backend.apply_config(sigbridge::config::FORMAT, Some(format.as_str()))?;
    }
    if let Some(program) = &cli.program {
        let active = backend.registry().active().name().to_string();
        backend.registry_mut().set_program(&active, program)?;
    }
    Ok(backend)
}

fn run_sign(backend: &SigningBackend, args: SignArgs) -> Result<i32> {
    let key = match args.local_user {
        Some(key) => key,
        None => backend.signing_key(&config::identity::EnvIdentity)?,
    };
    let payload = read_input(&args.file)?;
    let signature = backend.sign_buffer(&payload, &key)?;

    match &args.output {
        Some(path) => std::fs::write(path, &signature).map_err(|source| CliError::Write {
            path: path.display().to_string(),
            source,
        })?,
        None => std::io::stdout()
            .write_all(&signature)
            .map_err(|source| CliError::Write {
                path: "stdout".to_string(),
                source,
            })?,
    }
    Ok(0)
}

fn run_verify(backend: &SigningBackend, args: VerifyArgs, silent: bool) -> Result<i32> {
    let data = read_input(&args.file)?;
    let (payload, signature) = match &args.signature {
        Some(sig_path) => (data, read_input(sig_path)?),
        None => {
            let offset = backend.find_signature_offset(&data);
            let mut payload = data;
            let signature = payload.split_off(offset);
            (payload, signature)
        }
    };

    let source = args
        .signature
        .as_deref()
        .unwrap_or(args.file.as_path())
        .display()
        .to_string();
    if signature.is_empty() || backend.registry().by_signature(&signature).is_none() {
        return Err(CliError::NoSignature(source));
    }

    let (verified, check) = backend.check_signature(&payload, &signature)?;

    let flags = OutputFlags {
        raw: args.raw,
        verbose: args.verbose,
    };
    check
        .print(flags, &mut std::io::stdout().lock(), &mut std::io::stderr().lock())
        .map_err(|source| CliError::Write {
            path: "stdout".to_string(),
            source,
        })?;

    if args.json {
        println!("{}", output::VerdictReport::new(&check, verified).to_json());
    } else {
        output::print_verdict(&check, verified, silent);
    }

    Ok(if verified { 0 } else { 1 })
}

fn run_split(backend: &SigningBackend, args: SplitArgs) -> Result<i32> {
    let data = read_input(&args.file)?;
    println!("{}", backend.find_signature_offset(&data));
    Ok(0)
}

/// Read a file, or stdin when the path is "-"
fn read_input(path: &Path) -> Result<Vec<u8>> {
    let read_err = |source| CliError::Read {
        path: path.display().to_string(),
        source,
    };

    if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf).map_err(read_err)?;
        return Ok(buf);
    }
    std::fs::read(path).map_err(read_err)
}
