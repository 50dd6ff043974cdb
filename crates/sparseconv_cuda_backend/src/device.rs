use std::sync::Arc;

use cudarc::{
    cublas::{result::CublasError, CudaBlas},
    driver::{CudaContext, CudaFunction, CudaStream, DriverError},
    nvrtc,
};
use sparseconv_core::{
    device::{Device, OperationResult},
    shape::Shape,
};

use crate::{buffer::CudaBuffer, kernel, matmul};

#[derive(Debug)]
pub enum CudaError {
    Driver(DriverError),
    Blas(CublasError),
    RuntimeCompile(nvrtc::CompileError),
}

#[derive(Debug)]
pub struct CudaDevice {
    stream: Arc<CudaStream>,
    blas: CudaBlas,
    gather: CudaFunction,
    scatter_add: CudaFunction,
}

impl CudaDevice {
    pub(crate) fn stream(&self) -> Arc<CudaStream> {
        self.stream.clone()
    }

    pub(crate) fn blas(&self) -> &CudaBlas {
        &self.blas
    }

    pub(crate) fn gather_kernel(&self) -> &CudaFunction {
        &self.gather
    }

    pub(crate) fn scatter_add_kernel(&self) -> &CudaFunction {
        &self.scatter_add
    }
}

impl Device for CudaDevice {
    type IdType = usize;
    type DeviceError = CudaError;
    type BufferI32 = CudaBuffer<i32>;
    type BufferF32 = CudaBuffer<f32>;

    fn new(id: Self::IdType) -> Result<Self, Self::DeviceError> {
        let ctx = CudaContext::new(id).map_err(CudaError::Driver)?;
        ctx.set_blocking_synchronize().map_err(CudaError::Driver)?;
        let stream = ctx.default_stream();
        let blas = CudaBlas::new(stream.clone()).map_err(CudaError::Blas)?;

        let ptx = nvrtc::compile_ptx(kernel::KERNELS).map_err(CudaError::RuntimeCompile)?;
        let module = ctx.load_module(ptx).map_err(CudaError::Driver)?;
        let gather = module.load_function("gather_kernel").map_err(CudaError::Driver)?;
        let scatter_add = module.load_function("scatter_add_kernel").map_err(CudaError::Driver)?;

        Ok(Self { stream, blas, gather, scatter_add })
    }

    fn synchronise(&self) -> Result<(), Self::DeviceError> {
        self.stream.synchronize().map_err(CudaError::Driver)
    }

    fn get_last_device_error(&self) -> Result<(), Self::DeviceError> {
        self.synchronise()
    }

    fn sgemm(
        alpha: f32,
        input_a: &Self::BufferF32,
        shape_a: Shape,
        trans_a: bool,
        input_b: &Self::BufferF32,
        shape_b: Shape,
        trans_b: bool,
        beta: f32,
        output: &mut Self::BufferF32,
    ) -> OperationResult<Self::DeviceError> {
        matmul::sgemm(alpha, input_a, shape_a, trans_a, input_b, shape_b, trans_b, beta, output)
    }

    fn gather(
        single_size: usize,
        count: usize,
        input: &Self::BufferF32,
        indices: &Self::BufferI32,
        index_offset: usize,
        output: &mut Self::BufferF32,
    ) -> OperationResult<Self::DeviceError> {
        kernel::gather(single_size, count, input, indices, index_offset, output)
    }

    fn scatter_add(
        single_size: usize,
        count: usize,
        input: &Self::BufferF32,
        indices: &Self::BufferI32,
        index_offset: usize,
        output: &mut Self::BufferF32,
    ) -> OperationResult<Self::DeviceError> {
        kernel::scatter_add(single_size, count, input, indices, index_offset, output)
    }
}
