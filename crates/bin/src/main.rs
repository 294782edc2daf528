use std::fs::File;
use std::io::{BufWriter, Write};
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::Cli;
use ldifdb::ldif::LdifWriter;
use ldifdb::makeldif::{EntryGenerator, GeneratorOptions};

fn main() -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    // The usual clap exit code for a usage error is 2; this tool promises
    // 0 on success (including help) and 1 on every failure path.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    match run(cli) {
        Ok(count) => {
            eprintln!("{count} entries written");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("makeldif: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<u64, Box<dyn std::error::Error>> {
    let mut constants = Vec::with_capacity(cli.constants.len());
    for raw in &cli.constants {
        let Some((name, value)) = raw.split_once('=') else {
            return Err(format!("constant must be NAME=VALUE: {raw}").into());
        };
        constants.push((name.to_string(), value.to_string()));
    }

    let options = GeneratorOptions {
        resource_path: cli.resource_path.clone(),
        random_seed: cli.random_seed,
        constants,
        generate_branch_entries: true,
    };
    let generator = EntryGenerator::new(&cli.template_file, options)?;
    for warning in generator.warnings() {
        eprintln!("warning: {warning}");
    }

    let sink: Box<dyn Write> = match &cli.output_ldif {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(std::io::stdout().lock()),
    };
    let mut writer = LdifWriter::with_wrap_column(BufWriter::new(sink), cli.wrap_column);

    let mut count = 0u64;
    for entry in generator {
        writer.write_entry(&entry)?;
        count += 1;
        if count.is_multiple_of(1000) {
            eprintln!("{count} entries processed");
        }
    }
    writer.flush()?;
    debug!(count, "generation complete");
    Ok(count)
}
