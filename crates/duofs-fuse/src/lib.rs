//! FUSE front end for duofs.
//!
//! Mounts two backend directory trees as one filesystem: namespace and
//! metadata operations are mirrored onto both trees, file content is striped
//! across them. The heavy lifting lives in [`duofs_kernel::DualFs`]; this
//! crate maps kernel FUSE requests onto it.

pub mod cli;
pub mod filesystem;
pub mod inode;

use std::sync::Arc;

use duofs_kernel::constants::FS_NAME;
use duofs_kernel::{DualFs, MountConfig};
use fuser::MountOption;
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::info;

pub use cli::Cli;
pub use filesystem::{DuoFuse, FuseErrorContext};
pub use inode::{InodeTable, ROOT_INO};

#[derive(Debug, Error)]
pub enum FuseError {
    #[error("invalid mountpoint: {0}")]
    InvalidMountpoint(String),
    #[error("mount I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// FUSE mount options for `config`.
pub fn build_mount_options(config: &MountConfig) -> Vec<MountOption> {
    let mut opts = vec![
        MountOption::FSName(FS_NAME.to_owned()),
        MountOption::Subtype(FS_NAME.to_owned()),
        MountOption::DefaultPermissions,
    ];
    if config.allow_other {
        opts.push(MountOption::AllowOther);
    }
    if config.auto_unmount {
        opts.push(MountOption::AutoUnmount);
    }
    opts
}

/// Mount `config` and serve requests until the filesystem is unmounted.
///
/// Must be called outside the runtime `runtime` belongs to; every request is
/// driven with `block_on` on the FUSE thread.
pub fn mount(config: Arc<MountConfig>, runtime: Handle) -> Result<(), FuseError> {
    if config.mount_point.as_os_str().is_empty() {
        return Err(FuseError::InvalidMountpoint(
            "mountpoint cannot be empty".to_owned(),
        ));
    }
    let options = build_mount_options(&config);
    let mount_point = config.mount_point.clone();
    let fs = DuoFuse::new(Arc::new(DualFs::new(config)), runtime);

    info!(mount_point = %mount_point.display(), "mounting");
    fuser::mount2(fs, &mount_point, &options)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mount_options() {
        let config = MountConfig::new("/mnt/duo", "/a", "/b");
        let opts = build_mount_options(&config);
        assert!(opts.contains(&MountOption::FSName("duofs".to_owned())));
        assert!(opts.contains(&MountOption::DefaultPermissions));
        assert!(!opts.contains(&MountOption::AllowOther));
        assert!(!opts.contains(&MountOption::AutoUnmount));
    }

    #[test]
    fn test_optional_mount_options() {
        let mut config = MountConfig::new("/mnt/duo", "/a", "/b");
        config.allow_other = true;
        config.auto_unmount = true;
        let opts = build_mount_options(&config);
        assert!(opts.contains(&MountOption::AllowOther));
        assert!(opts.contains(&MountOption::AutoUnmount));
    }

    #[test]
    fn test_empty_mountpoint_rejected() {
        let config = Arc::new(MountConfig::new("", "/a", "/b"));
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let err = mount(config, rt.handle().clone()).unwrap_err();
        assert!(matches!(err, FuseError::InvalidMountpoint(_)));
    }
}
