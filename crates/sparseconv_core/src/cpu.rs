use std::sync::Arc;

use crate::{
    conv::tests,
    device::{Device, DeviceBuffer, OperationError, OperationResult},
    shape::Shape,
};

tests::make_tests! {
    Arc::new(CpuThread),
    bias_only_on_empty_kernel,
    single_offset_accumulates,
    submanifold_matches_generic_path,
    submanifold_ignores_unused_filters,
    offset_order_is_additive,
    inverse_swaps_roles,
    rejects_empty_pair_table,
}

#[derive(Debug)]
pub struct CpuError;

pub struct CpuThread;

pub struct CpuBuffer<T> {
    buf: Vec<T>,
    device: Arc<CpuThread>,
}

impl<T: Copy + Default> DeviceBuffer<CpuThread, T> for CpuBuffer<T> {
    type BufferError = CpuError;

    fn new(device: Arc<CpuThread>, size: usize) -> Result<Self, CpuError> {
        Ok(Self { buf: vec![T::default(); size], device })
    }

    fn size(&self) -> usize {
        self.buf.len()
    }

    fn device(&self) -> Arc<CpuThread> {
        self.device.clone()
    }

    fn set_zero(&mut self) -> Result<(), CpuError> {
        for elem in &mut self.buf {
            *elem = T::default();
        }

        Ok(())
    }

    fn load_from_device(&mut self, buf: &Self, num: usize) -> Result<(), CpuError> {
        self.buf[..num].copy_from_slice(&buf.buf[..num]);
        Ok(())
    }

    fn load_from_slice(&mut self, buf: &[T]) -> Result<(), CpuError> {
        self.buf[..buf.len()].copy_from_slice(buf);
        Ok(())
    }

    fn write_into_slice(&self, buf: &mut [T], num: usize) -> Result<(), CpuError> {
        buf[..num].copy_from_slice(&self.buf[..num]);
        Ok(())
    }
}

impl Device for CpuThread {
    type IdType = ();
    type DeviceError = CpuError;
    type BufferI32 = CpuBuffer<i32>;
    type BufferF32 = CpuBuffer<f32>;

    fn new(_id: Self::IdType) -> Result<Self, Self::DeviceError> {
        Ok(Self)
    }

    fn synchronise(&self) -> Result<(), Self::DeviceError> {
        Ok(())
    }

    fn get_last_device_error(&self) -> Result<(), Self::DeviceError> {
        Ok(())
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
        let shape_o = shape_a.maybe_transpose(trans_a) * shape_b.maybe_transpose(trans_b);
        sgemm(
            alpha,
            &input_a.buf[..shape_a.size()],
            shape_a,
            trans_a,
            &input_b.buf[..shape_b.size()],
            shape_b,
            trans_b,
            beta,
            &mut output.buf[..shape_o.size()],
        )
    }

    fn gather(
        single_size: usize,
        count: usize,
        input: &Self::BufferF32,
        indices: &Self::BufferI32,
        index_offset: usize,
        output: &mut Self::BufferF32,
    ) -> OperationResult<Self::DeviceError> {
        if indices.buf.len() < index_offset + count || output.buf.len() < single_size * count {
            return Err(OperationError::IndexOutOfBounds);
        }

        for (col, &src) in indices.buf[index_offset..index_offset + count].iter().enumerate() {
            let src = src as usize;
            output.buf[single_size * col..single_size * (col + 1)]
                .copy_from_slice(&input.buf[single_size * src..single_size * (src + 1)]);
        }

        Ok(())
    }

    fn scatter_add(
        single_size: usize,
        count: usize,
        input: &Self::BufferF32,
        indices: &Self::BufferI32,
        index_offset: usize,
        output: &mut Self::BufferF32,
    ) -> OperationResult<Self::DeviceError> {
        if indices.buf.len() < index_offset + count || input.buf.len() < single_size * count {
            return Err(OperationError::IndexOutOfBounds);
        }

        for (col, &dst) in indices.buf[index_offset..index_offset + count].iter().enumerate() {
            let dst = dst as usize;
            for (o, &val) in output.buf[single_size * dst..single_size * (dst + 1)]
                .iter_mut()
                .zip(input.buf[single_size * col..single_size * (col + 1)].iter())
            {
                *o += val;
            }
        }

        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn sgemm(
    alpha: f32,
    input_a: &[f32],
    shape_a: Shape,
    trans_a: bool,
    input_b: &[f32],
    shape_b: Shape,
    trans_b: bool,
    beta: f32,
    output: &mut [f32],
) -> OperationResult<CpuError> {
    let shape_o = shape_a.maybe_transpose(trans_a) * shape_b.maybe_transpose(trans_b);

    if input_a.len() != shape_a.size() || input_b.len() != shape_b.size() || output.len() != shape_o.size() {
        return Err(OperationError::IndexOutOfBounds);
    }

    match (trans_a, trans_b) {
        (false, false) => {
            mm::<false, false>(shape_a.rows(), shape_a.cols(), shape_b.cols(), alpha, input_a, input_b, beta, output)
        }
        (false, true) => {
            mm::<false, true>(shape_a.rows(), shape_a.cols(), shape_b.rows(), alpha, input_a, input_b, beta, output)
        }
        (true, false) => {
            mm::<true, false>(shape_a.cols(), shape_a.rows(), shape_b.cols(), alpha, input_a, input_b, beta, output)
        }
        (true, true) => {
            mm::<true, true>(shape_a.cols(), shape_a.rows(), shape_b.rows(), alpha, input_a, input_b, beta, output)
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn mm<const TA: bool, const TB: bool>(
    m: usize,
    n: usize,
    k: usize,
    alpha: f32,
    input_a: &[f32],
    input_b: &[f32],
    beta: f32,
    output: &mut [f32],
) {
    for ki in 0..k {
        for mi in 0..m {
            let mut sum = 0.0;
            for ni in 0..n {
                let aidx = if TA { n * mi + ni } else { m * ni + mi };
                let bidx = if TB { k * ni + ki } else { n * ki + ni };
                sum += input_a[aidx] * input_b[bidx];
            }
            output[m * ki + mi] = alpha * sum + beta * output[m * ki + mi];
        }
    }
}
