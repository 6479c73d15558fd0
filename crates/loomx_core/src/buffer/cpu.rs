use crate::{
    buffer::{check_range, Buffer},
    device::Device,
    dtype::DType,
    error::{Error, Result},
};
use std::{ffi::c_void, ptr};

pub struct CpuBuffer {
    data: Vec<u8>,
    dtype: DType,
}

impl CpuBuffer {
    pub fn new(size: usize, dtype: DType) -> Result<Self> {
        let total_size = size
            .checked_mul(dtype.size_in_bytes())
            .ok_or_else(|| Error::InvalidArgument("Overflow in allocation".into()))?;
        Ok(Self {
            data: vec![0; total_size],
            dtype,
        })
    }
}

impl Buffer for CpuBuffer {
    fn as_ptr(&self) -> *const c_void {
        self.data.as_ptr() as *const _
    }

    fn as_mut_ptr(&mut self) -> *mut c_void {
        self.data.as_mut_ptr() as *mut _
    }

    fn len(&self) -> usize {
        self.data.len() / self.dtype.size_in_bytes()
    }

    fn dtype(&self) -> DType {
        self.dtype
    }

    fn device(&self) -> Device {
        Device::CPU
    }

    unsafe fn copy_from_host(&mut self, src: *const c_void, size_in_bytes: usize, src_offset: usize, dst_offset: usize) -> Result<()> {
        check_range(self.len(), self.dtype, dst_offset, size_in_bytes, "copy_from_host")?;
        let src = (src as *const u8).add(src_offset * self.dtype.size_in_bytes());
        let dst = self.data.as_mut_ptr().add(dst_offset * self.dtype.size_in_bytes());
        ptr::copy_nonoverlapping(src, dst, size_in_bytes);
        Ok(())
    }

    unsafe fn copy_to_host(&self, dest: *mut c_void, size_in_bytes: usize, src_offset: usize, dst_offset: usize) -> Result<()> {
        check_range(self.len(), self.dtype, src_offset, size_in_bytes, "copy_to_host")?;
        let src = self.data.as_ptr().add(src_offset * self.dtype.size_in_bytes());
        let dst = (dest as *mut u8).add(dst_offset * self.dtype.size_in_bytes());
        ptr::copy_nonoverlapping(src, dst, size_in_bytes);
        Ok(())
    }
}
