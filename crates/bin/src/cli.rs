//! CLI argument definitions for the makeldif binary.

use std::path::PathBuf;

use clap::Parser;

/// Generate sample LDIF data from a template
#[derive(Parser, Debug)]
#[command(name = "makeldif")]
#[command(about = "Generate an LDIF dump file from a MakeLDIF template")]
#[command(disable_help_flag = true)]
pub struct Cli {
    /// Template file describing the entries to generate
    #[arg(value_name = "TEMPLATE-FILE")]
    pub template_file: PathBuf,

    /// Directory containing template resources such as the name files
    #[arg(short = 'r', long = "resourcePath", value_name = "PATH")]
    pub resource_path: Option<PathBuf>,

    /// Write the generated LDIF to this file instead of standard output
    #[arg(short = 'o', long = "outputLdif", value_name = "FILE")]
    pub output_ldif: Option<PathBuf>,

    /// Seed for the random number generator
    #[arg(short = 's', long = "randomSeed", value_name = "INT", default_value_t = 0)]
    pub random_seed: u64,

    /// Override a template constant as NAME=VALUE (repeatable)
    #[arg(short = 'c', long = "constant", value_name = "NAME=VALUE")]
    pub constants: Vec<String>,

    /// Column at which long lines are wrapped; 0 disables wrapping
    #[arg(short = 'w', long = "wrapColumn", value_name = "INT", default_value_t = 76)]
    pub wrap_column: usize,

    /// Print this help text
    #[arg(short = 'H', long = "help", action = clap::ArgAction::Help)]
    pub help: Option<bool>,
}
