use std::sync::Arc;

use sparseconv_core::device::Device;
use sparseconv_cuda_backend::CudaDevice;

fn main() {
    let device = Arc::new(CudaDevice::new(0).unwrap());
    device.sanity_check();
}
