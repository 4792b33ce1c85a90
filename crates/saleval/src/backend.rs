//! Compile-time backend selection.
//!
//! Exactly one backend is picked from the enabled features, GPU backends
//! taking precedence over the CPU default.

use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(feature = "cuda")] {
        use burn::backend::cuda::{Cuda, CudaDevice};

        /// Backend the evaluation runs on.
        pub type EvalBackend = Cuda;
        pub type EvalDevice = CudaDevice;

        /// Backend name for logging.
        pub const NAME: &str = "CUDA (NVIDIA GPU)";
    } else if #[cfg(feature = "wgpu")] {
        use burn::backend::wgpu::{Wgpu, WgpuDevice};

        /// Backend the evaluation runs on.
        pub type EvalBackend = Wgpu;
        pub type EvalDevice = WgpuDevice;

        /// Backend name for logging.
        pub const NAME: &str = "WGPU (GPU)";
    } else {
        use burn::backend::ndarray::{NdArray, NdArrayDevice};

        /// Backend the evaluation runs on.
        pub type EvalBackend = NdArray;
        pub type EvalDevice = NdArrayDevice;

        /// Backend name for logging.
        pub const NAME: &str = "NdArray (CPU)";
    }
}

/// Creates the default device of [`EvalBackend`].
pub fn create_device() -> EvalDevice {
    EvalDevice::default()
}
