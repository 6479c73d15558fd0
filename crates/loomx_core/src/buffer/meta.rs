use crate::{
    buffer::Buffer,
    device::Device,
    dtype::DType,
    error::{Error, Result},
};
use std::{ffi::c_void, ptr};

/// Length-only buffer for the storage-free meta device.
///
/// Tracks element count and dtype so layouts stay checkable; any attempt
/// to move data through it is rejected.
pub struct MetaBuffer {
    len: usize,
    dtype: DType,
}

impl MetaBuffer {
    pub fn new(size: usize, dtype: DType) -> Self {
        Self { len: size, dtype }
    }
}

impl Buffer for MetaBuffer {
    fn as_ptr(&self) -> *const c_void {
        ptr::null()
    }

    fn as_mut_ptr(&mut self) -> *mut c_void {
        ptr::null_mut()
    }

    fn len(&self) -> usize {
        self.len
    }

    fn dtype(&self) -> DType {
        self.dtype
    }

    fn device(&self) -> Device {
        Device::Meta
    }

    unsafe fn copy_from_host(&mut self, _src: *const c_void, _size_in_bytes: usize, _src_offset: usize, _dst_offset: usize) -> Result<()> {
        Err(Error::InvalidDevice("meta buffers hold no data".into()))
    }

    unsafe fn copy_to_host(&self, _dest: *mut c_void, _size_in_bytes: usize, _src_offset: usize, _dst_offset: usize) -> Result<()> {
        Err(Error::InvalidDevice("meta buffers hold no data".into()))
    }
}
