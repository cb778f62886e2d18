//! rpmsite: static RPM repository site builder
//!
//! This crate provides:
//! - Per-platform package tree synchronization with metadata regeneration
//! - `.repo` files for dnf/yum and zypper clients
//! - Static HTML index pages for every repository directory
//! - Shared plumbing for the `rpmsite-*` binaries

pub mod cli;
pub mod config;
pub mod createrepo;
pub mod error;
pub mod index;
pub mod logging;
pub mod site;
pub mod state;
pub mod templates;
pub mod tree;
pub mod utils;

pub use config::SiteConfig;
pub use createrepo::{CreateRepo, MetadataGenerator};
pub use error::{Error, Result};
pub use site::{Site, SiteReport};
pub use state::RepoState;
pub use tree::{LayoutMode, TreeBuilder};
