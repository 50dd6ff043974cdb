mod buffer;
mod device;
mod kernel;
mod matmul;

pub use buffer::CudaBuffer;
pub use cudarc;
pub use device::{CudaDevice, CudaError};
