//! Boot volume file access
//!
//! Files are opened on the simple file system of the device the loader
//! image itself was read from.

use ::uefi::CStr16;
use ::uefi::boot;
use ::uefi::proto::media::file::{File, FileAttribute, FileInfo, FileMode, RegularFile};

use crate::config::MAX_PATH_LEN;
use crate::error::{BootError, Result};
use crate::utils::boot_traits::BootFile;

/// An open regular file on the boot volume
pub struct UefiFile {
    inner: RegularFile,
}

impl core::fmt::Debug for UefiFile {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UefiFile").finish_non_exhaustive()
    }
}

/// Open `path` relative to the root directory of the boot volume
pub fn open_on_boot_volume(path: &str) -> Result<UefiFile> {
    let mut path_buf = [0u16; MAX_PATH_LEN];
    let path = CStr16::from_str_with_buf(path, &mut path_buf)
        .map_err(|_| BootError::FileNotFound)?;

    let mut fs = boot::get_image_file_system(boot::image_handle())?;
    let mut root = fs.open_volume()?;
    let handle = root
        .open(path, FileMode::Read, FileAttribute::empty())
        .map_err(|err| {
            log::debug!("Open {} failed: {:?}", path, err.status());
            BootError::FileNotFound
        })?;

    let inner = handle.into_regular_file().ok_or(BootError::FileNotFound)?;
    Ok(UefiFile { inner })
}

impl BootFile for UefiFile {
    fn read_exact(&mut self, buffer: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buffer.len() {
            let count = self
                .inner
                .read(&mut buffer[filled..])
                .map_err(|_| BootError::ReadFailed)?;
            if count == 0 {
                return Err(BootError::ReadFailed);
            }
            filled += count;
        }
        Ok(())
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        self.inner.set_position(offset)?;
        Ok(())
    }

    fn size(&mut self) -> Result<u64> {
        let info = self.inner.get_boxed_info::<FileInfo>()?;
        Ok(info.file_size())
    }
}
