//! A SYCL queue that records what it is asked to do.

use std::ffi::c_void;

use sgl_compute_interop::handle::RawExternalHandle;
use sgl_compute_interop::level_zero::LevelZeroNativeHandles;
use sgl_compute_interop::sycl::{
    SyclEvent, SyclExternalMemory, SyclExternalSemaphore, SyclImageDescriptor, SyclImageMemory, SyclQueue,
};
use sgl_compute_interop::{Error, Result};

use super::{consume_fd, record};

pub const EXTERNAL_MEMORY: usize = 0xE0;
pub const MAPPED_BASE: usize = 0xB000_0000;
pub const SEMAPHORE: usize = 0x5E;

#[derive(Debug)]
pub struct MockSyclEvent;

impl SyclEvent for MockSyclEvent {
    fn wait_and_throw(&self) -> Result<()> {
        record("event::wait_and_throw", &[]);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MockSyclQueue;

fn fd_of(handle: RawExternalHandle) -> i32 {
    match handle {
        RawExternalHandle::Fd(fd) => fd,
        RawExternalHandle::Win32(_) => -1,
    }
}

fn event() -> Result<Box<dyn SyclEvent>> {
    Ok(Box::new(MockSyclEvent))
}

impl SyclQueue for MockSyclQueue {
    fn level_zero_handles(&self) -> Option<LevelZeroNativeHandles> {
        None
    }

    fn import_external_memory(&self, handle: RawExternalHandle, size: u64) -> Result<SyclExternalMemory> {
        let fd = fd_of(handle);
        record("import_external_memory", &[fd as u64, size]);
        consume_fd(fd);
        Ok(SyclExternalMemory(EXTERNAL_MEMORY as *mut c_void))
    }

    fn map_external_linear_memory(&self, memory: SyclExternalMemory, offset: u64, size: u64) -> Result<*mut c_void> {
        record("map_external_linear_memory", &[memory.0 as u64, offset, size]);
        Ok((MAPPED_BASE + offset as usize) as *mut c_void)
    }

    fn map_external_image_memory(
        &self,
        _memory: SyclExternalMemory,
        _descriptor: &SyclImageDescriptor,
    ) -> Result<SyclImageMemory> {
        Err(Error::Sycl("images are not mocked".to_string()))
    }

    fn unmap_external_linear_memory(&self, ptr: *mut c_void) -> Result<()> {
        record("unmap_external_linear_memory", &[ptr as u64]);
        Ok(())
    }

    fn unmap_external_image_memory(&self, _image: SyclImageMemory, _descriptor: &SyclImageDescriptor) -> Result<()> {
        Err(Error::Sycl("images are not mocked".to_string()))
    }

    fn release_external_memory(&self, memory: SyclExternalMemory) -> Result<()> {
        record("release_external_memory", &[memory.0 as u64]);
        Ok(())
    }

    fn import_external_semaphore(&self, handle: RawExternalHandle, timeline: bool) -> Result<SyclExternalSemaphore> {
        let fd = fd_of(handle);
        record("import_external_semaphore", &[fd as u64, timeline as u64]);
        consume_fd(fd);
        Ok(SyclExternalSemaphore(SEMAPHORE as *mut c_void))
    }

    fn release_external_semaphore(&self, semaphore: SyclExternalSemaphore) -> Result<()> {
        record("release_external_semaphore", &[semaphore.0 as u64]);
        Ok(())
    }

    fn signal_external_semaphore(
        &self,
        semaphore: SyclExternalSemaphore,
        value: Option<u64>,
    ) -> Result<Box<dyn SyclEvent>> {
        record(
            "signal_external_semaphore",
            &[semaphore.0 as u64, value.is_some() as u64, value.unwrap_or(0)],
        );
        event()
    }

    fn wait_external_semaphore(&self, semaphore: SyclExternalSemaphore, value: Option<u64>) -> Result<Box<dyn SyclEvent>> {
        record(
            "wait_external_semaphore",
            &[semaphore.0 as u64, value.is_some() as u64, value.unwrap_or(0)],
        );
        event()
    }

    fn memcpy(&self, dst: *mut c_void, src: *const c_void, size: usize) -> Result<Box<dyn SyclEvent>> {
        record("memcpy", &[dst as u64, src as u64, size as u64]);
        event()
    }

    fn copy_to_image(
        &self,
        _src: *const c_void,
        _image: SyclImageMemory,
        _descriptor: &SyclImageDescriptor,
    ) -> Result<Box<dyn SyclEvent>> {
        Err(Error::Sycl("images are not mocked".to_string()))
    }

    fn copy_from_image(
        &self,
        _image: SyclImageMemory,
        _dst: *mut c_void,
        _descriptor: &SyclImageDescriptor,
    ) -> Result<Box<dyn SyclEvent>> {
        Err(Error::Sycl("images are not mocked".to_string()))
    }

    fn wait_and_throw(&self) -> Result<()> {
        record("queue::wait_and_throw", &[]);
        Ok(())
    }
}
