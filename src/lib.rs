/*! sgl_compute_interop shares Vulkan memory and semaphores with GPU compute APIs.

A Vulkan buffer, image or semaphore created with an exportable handle type can be imported into
CUDA, HIP, Level Zero, OpenCL or SYCL.  Both APIs then see the same physical memory, and the
semaphore orders work between them without a round trip through the host.

| Backend    | Library                          | Device matching                     | Timeline semaphores |
|------------|----------------------------------|-------------------------------------|---------------------|
| CUDA       | `libcuda.so` / `nvcuda.dll`      | 16-byte UUID                        | driver 11.2+        |
| HIP        | `libamdhip64.so` / `amdhip64.dll`| 16-byte UUID                        | runtime 6.0+        |
| Level Zero | `libze_loader.so.1` / `ze_loader.dll` | handles taken from the caller  | yes                 |
| OpenCL     | `libOpenCL.so` / `OpenCL.dll`    | UUID, then name heuristics          | no                  |
| SYCL       | supplied by the caller           | the queue's own device              | yes                 |

# Use

1. Load the backends you want.  [`cuda::initialize_cuda_function_table`] and friends return
   `Ok(false)` when the library is not installed, which is not an error.
2. Build an [`InteropSession`] from the loaded tables and any contexts you own
   ([`level_zero::LevelZeroInteropContext`], [`opencl::OpenClInteropContext`], a SYCL queue).
3. Hand your Vulkan objects to the session's factories.  The backend is chosen from the Vulkan
   driver ID by [`InteropSession::decide_interop_compute_api`]; SYCL wins whenever a queue is
   registered.
4. Enqueue copies, signals and waits on a [`StreamWrapper`].  Nothing blocks except
   [`InteropSession::wait_for_completion`].

# Handles

Exported handles follow the platform rule: on POSIX a successful import consumes the file
descriptor, on Windows the `HANDLE` stays ours and is closed with the wrapper.  See
[`handle`].

# Errors

Every fallible call returns [`Result`].  [`Error::kind`] separates conditions a caller can fall
back from (device not found, unsupported format or image type, unsupported semaphore kind)
from native failures that end the interop path.
*/

pub mod error;
pub mod format;
pub mod handle;
mod imp;
pub mod interop;
pub mod loader;
pub mod stream;
pub mod vulkan;

pub use error::{Error, ErrorKind, Result};
pub use imp::{cuda, hip, level_zero, opencl, sycl};
pub use interop::{
    BufferVkComputeApiExternalMemory, ComputeApi, ImageVkComputeApiExternalMemory, ImageVkComputeApiInfo, InteropSession,
    SampledImageVkComputeApiExternalMemory, SemaphoreVkComputeApiInterop, TextureSettings,
    UnsampledImageVkComputeApiExternalMemory,
};
pub use stream::{CompletionEvent, StreamWrapper};
