//! rpmsite-merge
//!
//! Platform names are split into nested directories (`fedora-39-x86_64` -> `site/fedora/39/x86_64`) alongside packages from earlier runs.

use std::path::PathBuf;

use clap::Parser;
use rpmsite::{cli, logging::setup_logging, LayoutMode};

#[derive(Parser)]
#[command(name = "rpmsite-merge")]
#[command(about = "Merge per-platform RPM directories into a nested repository tree", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory holding one subdirectory per platform
    #[arg(default_value = "artifacts", env = "RPMSITE_SOURCE")]
    source: PathBuf,

    /// Site root to populate
    #[arg(default_value = "site", env = "RPMSITE_DEST")]
    dest: PathBuf,

    /// Repository name (defaults to the configured name)
    #[arg(env = "RPMSITE_NAME")]
    name: Option<String>,
}

fn main() {
    let args = Cli::parse();
    setup_logging();

    cli::finish(cli::build_site(
        LayoutMode::Merge,
        &args.source,
        &args.dest,
        args.name,
    ));
}
