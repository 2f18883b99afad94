//! Streams and completion events, one variant per backend.
//!
//! A [`StreamWrapper`] names the queue an interop operation is enqueued on.  It carries exactly
//! one backend's handle, so a stream can never claim to be two things at once.  Operations check
//! that the variant matches the backend of the resource they act on and fail with
//! [`Error::StreamMismatch`] otherwise, before anything is enqueued.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::imp::cuda::ffi::{CUevent, CUstream};
use crate::imp::hip::ffi::{hipEvent_t, hipStream_t};
use crate::imp::level_zero::ffi::{ze_command_list_handle_t, ze_event_handle_t};
use crate::imp::opencl::OpenClEvent;
use crate::imp::opencl::ffi::cl_command_queue;
use crate::imp::sycl::{SyclEvent, SyclQueue};
use crate::interop::ComputeApi;

/// The queue an operation is enqueued on.
#[derive(Debug, Clone)]
pub enum StreamWrapper {
    Cuda(CUstream),
    Hip(hipStream_t),
    /// A command list; whether it is immediate is a property of the
    /// [`LevelZeroInteropContext`](crate::level_zero::LevelZeroInteropContext).
    LevelZero(ze_command_list_handle_t),
    OpenCl(cl_command_queue),
    Sycl(Arc<dyn SyclQueue>),
}

impl StreamWrapper {
    pub fn compute_api(&self) -> ComputeApi {
        match self {
            StreamWrapper::Cuda(_) => ComputeApi::Cuda,
            StreamWrapper::Hip(_) => ComputeApi::Hip,
            StreamWrapper::LevelZero(_) => ComputeApi::LevelZero,
            StreamWrapper::OpenCl(_) => ComputeApi::OpenCl,
            StreamWrapper::Sycl(_) => ComputeApi::Sycl,
        }
    }

    pub(crate) fn cuda(&self) -> Result<CUstream> {
        match self {
            StreamWrapper::Cuda(s) => Ok(*s),
            _ => Err(self.mismatch(ComputeApi::Cuda)),
        }
    }

    pub(crate) fn hip(&self) -> Result<hipStream_t> {
        match self {
            StreamWrapper::Hip(s) => Ok(*s),
            _ => Err(self.mismatch(ComputeApi::Hip)),
        }
    }

    pub(crate) fn level_zero(&self) -> Result<ze_command_list_handle_t> {
        match self {
            StreamWrapper::LevelZero(l) => Ok(*l),
            _ => Err(self.mismatch(ComputeApi::LevelZero)),
        }
    }

    pub(crate) fn opencl(&self) -> Result<cl_command_queue> {
        match self {
            StreamWrapper::OpenCl(q) => Ok(*q),
            _ => Err(self.mismatch(ComputeApi::OpenCl)),
        }
    }

    pub(crate) fn sycl(&self) -> Result<&Arc<dyn SyclQueue>> {
        match self {
            StreamWrapper::Sycl(q) => Ok(q),
            _ => Err(self.mismatch(ComputeApi::Sycl)),
        }
    }

    fn mismatch(&self, expected: ComputeApi) -> Error {
        logwise::warn_sync!(
            "stream of {found} passed to a {expected} operation",
            found = logwise::privacy::LogIt(&self.compute_api()),
            expected = logwise::privacy::LogIt(&expected)
        );
        Error::StreamMismatch { expected }
    }
}

/// An event recorded when an enqueued operation completes.
///
/// CUDA, HIP and Level Zero events are created by the caller and only signaled here.  OpenCL
/// and SYCL hand back a new event from every enqueue; start from [`CompletionEvent::opencl`] or
/// [`CompletionEvent::sycl`] and the slot is filled by the operation.
#[derive(Debug)]
pub enum CompletionEvent {
    Cuda(CUevent),
    Hip(hipEvent_t),
    LevelZero(ze_event_handle_t),
    OpenCl(Option<OpenClEvent>),
    Sycl(Option<Box<dyn SyclEvent>>),
}

impl CompletionEvent {
    /// An empty OpenCL event slot.
    pub fn opencl() -> Self {
        CompletionEvent::OpenCl(None)
    }

    /// An empty SYCL event slot.
    pub fn sycl() -> Self {
        CompletionEvent::Sycl(None)
    }

    pub fn compute_api(&self) -> ComputeApi {
        match self {
            CompletionEvent::Cuda(_) => ComputeApi::Cuda,
            CompletionEvent::Hip(_) => ComputeApi::Hip,
            CompletionEvent::LevelZero(_) => ComputeApi::LevelZero,
            CompletionEvent::OpenCl(_) => ComputeApi::OpenCl,
            CompletionEvent::Sycl(_) => ComputeApi::Sycl,
        }
    }

    /// Whether an OpenCL or SYCL slot has been filled.  Caller-created events always are.
    pub fn is_recorded(&self) -> bool {
        match self {
            CompletionEvent::OpenCl(e) => e.is_some(),
            CompletionEvent::Sycl(e) => e.is_some(),
            _ => true,
        }
    }
}

pub(crate) fn cuda_event(event: Option<&CompletionEvent>) -> Result<Option<CUevent>> {
    match event {
        None => Ok(None),
        Some(CompletionEvent::Cuda(e)) => Ok(Some(*e)),
        Some(_) => Err(Error::StreamMismatch {
            expected: ComputeApi::Cuda,
        }),
    }
}

pub(crate) fn hip_event(event: Option<&CompletionEvent>) -> Result<Option<hipEvent_t>> {
    match event {
        None => Ok(None),
        Some(CompletionEvent::Hip(e)) => Ok(Some(*e)),
        Some(_) => Err(Error::StreamMismatch {
            expected: ComputeApi::Hip,
        }),
    }
}

pub(crate) fn level_zero_event(event: Option<&CompletionEvent>) -> Result<Option<ze_event_handle_t>> {
    match event {
        None => Ok(None),
        Some(CompletionEvent::LevelZero(e)) => Ok(Some(*e)),
        Some(_) => Err(Error::StreamMismatch {
            expected: ComputeApi::LevelZero,
        }),
    }
}

pub(crate) fn opencl_event_slot(event: Option<&mut CompletionEvent>) -> Result<Option<&mut Option<OpenClEvent>>> {
    match event {
        None => Ok(None),
        Some(CompletionEvent::OpenCl(slot)) => Ok(Some(slot)),
        Some(_) => Err(Error::StreamMismatch {
            expected: ComputeApi::OpenCl,
        }),
    }
}

pub(crate) fn sycl_event_slot(event: Option<&mut CompletionEvent>) -> Result<Option<&mut Option<Box<dyn SyclEvent>>>> {
    match event {
        None => Ok(None),
        Some(CompletionEvent::Sycl(slot)) => Ok(Some(slot)),
        Some(_) => Err(Error::StreamMismatch {
            expected: ComputeApi::Sycl,
        }),
    }
}

/// The event to wait on; an empty slot means "wait for the whole queue".
pub(crate) fn recorded_opencl_event(event: Option<&CompletionEvent>) -> Result<Option<&OpenClEvent>> {
    match event {
        None => Ok(None),
        Some(CompletionEvent::OpenCl(slot)) => Ok(slot.as_ref()),
        Some(_) => Err(Error::StreamMismatch {
            expected: ComputeApi::OpenCl,
        }),
    }
}

pub(crate) fn recorded_sycl_event(event: Option<&CompletionEvent>) -> Result<Option<&dyn SyclEvent>> {
    match event {
        None => Ok(None),
        Some(CompletionEvent::Sycl(slot)) => Ok(slot.as_deref()),
        Some(_) => Err(Error::StreamMismatch {
            expected: ComputeApi::Sycl,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_variant_is_checked() {
        let stream = StreamWrapper::Cuda(std::ptr::null_mut());
        assert_eq!(stream.compute_api(), ComputeApi::Cuda);
        assert!(stream.cuda().is_ok());
        match stream.hip() {
            Err(Error::StreamMismatch { expected }) => assert_eq!(expected, ComputeApi::Hip),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn event_variant_is_checked() {
        let event = CompletionEvent::LevelZero(std::ptr::null_mut());
        assert!(level_zero_event(Some(&event)).unwrap().is_some());
        assert!(cuda_event(Some(&event)).is_err());
        assert!(cuda_event(None).unwrap().is_none());
        let mut event = CompletionEvent::opencl();
        assert!(!event.is_recorded());
        assert!(opencl_event_slot(Some(&mut event)).unwrap().is_some());
        assert!(sycl_event_slot(Some(&mut event)).is_err());
    }
}
