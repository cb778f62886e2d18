//! rpmsite-render
//!
//! Renders one `{{KEY}}` template. `KEY_FILE=path` binds `KEY` to the
//! contents of `path`.

use std::path::PathBuf;

use clap::Parser;
use rpmsite::{cli, logging::setup_logging};
use rpmsite_meta::{template::render_to_file, Bindings};

#[derive(Parser)]
#[command(name = "rpmsite-render")]
#[command(about = "Render a template file with KEY=VALUE bindings", long_about = None)]
#[command(version)]
struct Cli {
    /// Template file
    template: PathBuf,

    /// Output file
    output: PathBuf,

    /// Bindings as KEY=VALUE or KEY_FILE=path
    bindings: Vec<String>,
}

fn run(args: &Cli) -> rpmsite::Result<String> {
    let mut bindings = Bindings::new();
    for arg in &args.bindings {
        bindings.parse_assignment(arg)?;
    }
    render_to_file(&args.template, &args.output, &bindings)?;
    Ok(format!("Rendered {}", args.output.display()))
}

fn main() {
    let args = Cli::parse();
    setup_logging();

    cli::finish(run(&args));
}
