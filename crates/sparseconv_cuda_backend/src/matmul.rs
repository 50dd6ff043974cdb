use cudarc::cublas::{sys::cublasOperation_t::*, Gemm, GemmConfig};
use sparseconv_core::{
    device::{DeviceBuffer, OperationResult},
    shape::Shape,
};

use crate::{CudaBuffer, CudaError};

#[allow(clippy::too_many_arguments)]
pub fn sgemm(
    alpha: f32,
    input_a: &CudaBuffer<f32>,
    shape_a: Shape,
    trans_a: bool,
    input_b: &CudaBuffer<f32>,
    shape_b: Shape,
    trans_b: bool,
    beta: f32,
    output: &mut CudaBuffer<f32>,
) -> OperationResult<CudaError> {
    let shape_o = shape_a.maybe_transpose(trans_a) * shape_b.maybe_transpose(trans_b);

    let transa = if trans_a { CUBLAS_OP_T } else { CUBLAS_OP_N };
    let transb = if trans_b { CUBLAS_OP_T } else { CUBLAS_OP_N };

    let m = shape_o.rows() as i32;
    let n = shape_o.cols() as i32;
    let k = shape_a.maybe_transpose(trans_a).cols() as i32;

    let lda = shape_a.rows() as i32;
    let ldb = shape_b.rows() as i32;
    let ldc = shape_o.rows() as i32;

    let cfg = GemmConfig { alpha, beta, transa, transb, m, n, k, lda, ldb, ldc };

    let ctx = input_a.device();
    let a = input_a.buf.slice(0..shape_a.size());
    let b = input_b.buf.slice(0..shape_b.size());
    let mut c = output.buf.slice_mut(0..shape_o.size());

    unsafe {
        ctx.blas().gemm(cfg, &a, &b, &mut c).map_err(CudaError::Blas)?;
    }

    Ok(())
}
