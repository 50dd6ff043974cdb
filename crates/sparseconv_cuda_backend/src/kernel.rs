use cudarc::driver::{LaunchConfig, PushKernelArg};
use sparseconv_core::device::{DeviceBuffer, OperationResult};

use crate::{CudaBuffer, CudaError};

/// Column gather and column scatter-add over site-major matrices. Compiled
/// with NVRTC when the device is created. Scatter-add accumulates with
/// `atomicAdd` so its contract holds under duplicate destination indices.
pub const KERNELS: &str = r#"
extern "C" __global__ void gather_kernel(
    const int single_size,
    const int count,
    const float* input,
    const int* indices,
    float* output)
{
    const int tid = blockIdx.x * blockDim.x + threadIdx.x;

    if (tid >= single_size * count)
        return;

    const int col = tid / single_size;
    const int row = tid - single_size * col;

    output[single_size * col + row] = input[single_size * indices[col] + row];
}

extern "C" __global__ void scatter_add_kernel(
    const int single_size,
    const int count,
    const float* input,
    const int* indices,
    float* output)
{
    const int tid = blockIdx.x * blockDim.x + threadIdx.x;

    if (tid >= single_size * count)
        return;

    const int col = tid / single_size;
    const int row = tid - single_size * col;

    atomicAdd(&output[single_size * indices[col] + row], input[single_size * col + row]);
}
"#;

const THREADS: u32 = 512;

fn launch_params(size: usize) -> LaunchConfig {
    let blocks = (size as u32).div_ceil(THREADS);
    LaunchConfig { grid_dim: (blocks, 1, 1), block_dim: (THREADS, 1, 1), shared_mem_bytes: 0 }
}

pub fn gather(
    single_size: usize,
    count: usize,
    input: &CudaBuffer<f32>,
    indices: &CudaBuffer<i32>,
    index_offset: usize,
    output: &mut CudaBuffer<f32>,
) -> OperationResult<CudaError> {
    let device = input.device();
    let idx = indices.buf.slice(index_offset..index_offset + count);

    let single_size_arg = single_size as i32;
    let count_arg = count as i32;

    let stream = device.stream();
    let mut builder = stream.launch_builder(device.gather_kernel());
    builder.arg(&single_size_arg);
    builder.arg(&count_arg);
    builder.arg(&input.buf);
    builder.arg(&idx);
    builder.arg(&mut output.buf);

    unsafe {
        builder.launch(launch_params(single_size * count)).map_err(CudaError::Driver)?;
    }

    Ok(())
}

pub fn scatter_add(
    single_size: usize,
    count: usize,
    input: &CudaBuffer<f32>,
    indices: &CudaBuffer<i32>,
    index_offset: usize,
    output: &mut CudaBuffer<f32>,
) -> OperationResult<CudaError> {
    let device = input.device();
    let idx = indices.buf.slice(index_offset..index_offset + count);

    let single_size_arg = single_size as i32;
    let count_arg = count as i32;

    let stream = device.stream();
    let mut builder = stream.launch_builder(device.scatter_add_kernel());
    builder.arg(&single_size_arg);
    builder.arg(&count_arg);
    builder.arg(&input.buf);
    builder.arg(&idx);
    builder.arg(&mut output.buf);

    unsafe {
        builder.launch(launch_params(single_size * count)).map_err(CudaError::Driver)?;
    }

    Ok(())
}
