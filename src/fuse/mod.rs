use std::io;
use std::path::Path;

use fuser::MountOption;
use log::info;

use crate::driver::DeviceDriver;
use crate::ops::FileSystem;

pub mod filesystem;

pub use filesystem::FuseDriver;

/// Mounts `fs` read-only at `mountpoint` and serves requests until unmounted.
pub fn mount<A: DeviceDriver + 'static, P: AsRef<Path>>(fs: FileSystem<A>, mountpoint: P) -> io::Result<()> {
    let options = [MountOption::RO, MountOption::FSName("vsfs".to_string()), MountOption::DefaultPermissions];
    info!("mounting at {}", mountpoint.as_ref().display());
    fuser::mount2(FuseDriver::new(fs), mountpoint, &options)
}
