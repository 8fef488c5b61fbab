//! CLI entrypoint: `getent services` over a NIS+ table dump.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use frankenlibc_nisplus_core::errno::strerror_message;
use frankenlibc_nisplus_core::{MemoryTable, PortPolicy};
use frankenlibc_nisplus_harness::{Getent, GetentError, Query, render_json, render_line};

/// Query a NIS+ services table the way the NSS backend does.
#[derive(Debug, Parser)]
#[command(name = "nisplus-getent")]
#[command(about = "getent-style services queries against a NIS+ table dump")]
struct Cli {
    /// JSON dump of the services table.
    #[arg(long)]
    table: PathBuf,
    /// Local NIS+ directory; defaults to the table named in the dump.
    #[arg(long)]
    domain: Option<String>,
    /// Initial record buffer size in bytes (doubled on demand).
    #[arg(long, default_value_t = 64)]
    buffer_size: usize,
    /// Print records as JSON.
    #[arg(long)]
    json: bool,
    /// Reject port columns that are not plain 16-bit decimals.
    #[arg(long)]
    strict_port: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Enumerate every record.
    List,
    /// Look up a service by name or alias.
    Name { name: String, proto: String },
    /// Look up a service by port number.
    Port { port: u16, proto: String },
}

impl From<Command> for Query {
    fn from(command: Command) -> Self {
        match command {
            Command::List => Query::List,
            Command::Name { name, proto } => Query::Name {
                name,
                protocol: proto,
            },
            Command::Port { port, proto } => Query::Port {
                port,
                protocol: proto,
            },
        }
    }
}

fn run(cli: Cli) -> Result<(), GetentError> {
    let policy = if cli.strict_port {
        PortPolicy::Strict
    } else {
        PortPolicy::AtoiCompatible
    };
    let store = MemoryTable::from_dump_file(&cli.table)?;
    tracing::debug!(table = store.name(), rows = store.len(), "loaded table dump");
    let getent = Getent::new(store, cli.domain.as_deref(), cli.buffer_size, policy)?;

    let records = getent.run(&cli.command.into())?;
    if cli.json {
        println!("{}", render_json(&records)?);
    } else {
        for record in &records {
            println!("{}", render_line(record));
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let reason = match &err {
                GetentError::Lookup(lookup) => lookup.errno().map(strerror_message),
                _ => None,
            };
            match reason {
                Some(reason) => eprintln!("nisplus-getent: {err} ({reason})"),
                None => eprintln!("nisplus-getent: {err}"),
            }
            ExitCode::from(err.exit_code())
        }
    }
}
