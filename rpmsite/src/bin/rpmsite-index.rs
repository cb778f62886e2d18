//! rpmsite-index
//!
//! Rewrites the `.repo` files and index pages of an existing site without
//! copying packages or regenerating metadata.

use std::path::PathBuf;

use clap::Parser;
use rpmsite::{cli, logging::setup_logging};

#[derive(Parser)]
#[command(name = "rpmsite-index")]
#[command(about = "Regenerate index pages for an existing RPM repository site", long_about = None)]
#[command(version)]
struct Cli {
    /// Site root to index
    #[arg(default_value = "site", env = "RPMSITE_DEST")]
    dest: PathBuf,

    /// Repository name (defaults to the configured name)
    #[arg(env = "RPMSITE_NAME")]
    name: Option<String>,
}

fn main() {
    let args = Cli::parse();
    setup_logging();

    cli::finish(cli::reindex_site(&args.dest, args.name));
}
