//! File operations of `/dev/barometerN`

use super::record::DeviceRecord;
use crate::error::{Error, Result};
use crate::host::{File, FileMode, FileOperations, Inode};

/// File operations shared by every barometer node
#[derive(Debug, Clone, Copy, Default)]
pub struct BarometerFile;

/// The single `file_operations` instance handed to the host
pub static BAROMETER_FOPS: BarometerFile = BarometerFile;

impl FileOperations for BarometerFile {
    fn open(&self, inode: &Inode, file: &mut File) -> Result<()> {
        // read only
        if file.mode().contains(FileMode::WRITE) {
            return Err(Error::PermissionDenied);
        }

        let record = inode
            .container::<DeviceRecord>()
            .ok_or(Error::NoDeviceOrAddress)?;
        file.set_private_data(record);
        Ok(())
    }

    fn read(&self, file: &File, _buf: &mut [u8], _pos: &mut u64) -> Result<usize> {
        let record = file.private_data::<DeviceRecord>().ok_or(Error::BadFile)?;
        log::info!("lps25hb read called, value: {}", record.last_reading());
        Ok(0)
    }
}
