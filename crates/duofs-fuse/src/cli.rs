//! Command line.
//!
//! Precedence, lowest first: built-in defaults, the RON options file given
//! with `--config`, then flags.

use std::path::PathBuf;

use clap::Parser;
use duofs_kernel::{ConfigError, MountConfig, MountOptions, SelectionPolicy, SizeCachePolicy};

/// Mount two directory trees as one filesystem: metadata mirrored on both,
/// file content striped across them.
#[derive(Debug, Parser)]
#[command(name = "duofs", version, about)]
pub struct Cli {
    /// Where to mount the combined filesystem
    pub mount_point: PathBuf,

    /// Root directory of backend A
    pub backend_a: PathBuf,

    /// Root directory of backend B
    pub backend_b: PathBuf,

    /// Bytes per stripe chunk
    #[arg(long)]
    pub stripe_unit: Option<usize>,

    /// Backend answering single-backend queries: random, a or b
    #[arg(long)]
    pub selection: Option<SelectionPolicy>,

    /// Size cache layout: single_slot or per_inode
    #[arg(long)]
    pub size_cache: Option<SizeCachePolicy>,

    /// Longest physical path accepted
    #[arg(long)]
    pub max_path_len: Option<usize>,

    /// RON file with mount options
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Let other users access the mount
    #[arg(long)]
    pub allow_other: bool,

    /// Unmount automatically when the process exits
    #[arg(long)]
    pub auto_unmount: bool,
}

impl Cli {
    /// Build the mount configuration. Does not validate it.
    pub fn into_config(self) -> Result<MountConfig, ConfigError> {
        let mut config = MountConfig::new(self.mount_point, self.backend_a, self.backend_b);
        if let Some(path) = &self.config {
            config = config.apply(&MountOptions::load(path)?);
        }
        let flags = MountOptions {
            stripe_unit: self.stripe_unit,
            selection: self.selection,
            size_cache: self.size_cache,
            max_path_len: self.max_path_len,
            allow_other: self.allow_other.then_some(true),
            auto_unmount: self.auto_unmount.then_some(true),
        };
        Ok(config.apply(&flags))
    }
}
