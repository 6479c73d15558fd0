pub mod cpu;
pub mod meta;

use crate::{
    device::Device,
    dtype::DType,
    error::{Error, Result},
};
use cpu::CpuBuffer;
use meta::MetaBuffer;
use std::{ffi::c_void, sync::Arc};

pub struct BufferManager {}

impl BufferManager {
    pub fn create(size: usize, device: Device, dtype: DType) -> Result<Arc<dyn Buffer>> {
        let buffer: Arc<dyn Buffer> = match device {
            Device::CPU => Arc::new(CpuBuffer::new(size, dtype)?),
            Device::Meta => Arc::new(MetaBuffer::new(size, dtype)),
        };

        Ok(buffer)
    }
}

pub trait Buffer: Send + Sync {
    fn as_ptr(&self) -> *const c_void;
    fn as_mut_ptr(&mut self) -> *mut c_void;
    /// Length in elements, not bytes.
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn dtype(&self) -> DType;
    fn device(&self) -> Device;

    /// # Safety
    /// Requires a valid source pointer and `size_in_bytes` within both the
    /// source and the buffer past `dst_offset` elements, with no overlap
    unsafe fn copy_from_host(&mut self, src: *const c_void, size_in_bytes: usize, src_offset: usize, dst_offset: usize) -> Result<()>;

    /// # Safety
    /// Requires a valid destination pointer and `size_in_bytes` within both the
    /// buffer past `src_offset` elements and the destination, with no overlap
    unsafe fn copy_to_host(&self, dest: *mut c_void, size_in_bytes: usize, src_offset: usize, dst_offset: usize) -> Result<()>;
}

pub(crate) fn check_range(len: usize, dtype: DType, offset: usize, size_in_bytes: usize, what: &str) -> Result<()> {
    let elem = dtype.size_in_bytes();
    let avail = len.saturating_sub(offset) * elem;
    if size_in_bytes > avail {
        return Err(Error::InvalidArgument(format!(
            "Size mismatch in {}: requested {} bytes, available {}",
            what, size_in_bytes, avail
        )));
    }
    Ok(())
}
