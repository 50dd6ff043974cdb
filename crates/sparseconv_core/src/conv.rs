pub mod tests;

use std::time::{Duration, Instant};

use crate::{
    device::{Device, OperationError},
    shape::Shape,
    tensor::{DenseMatrix, Filters, IndicePairs},
};

/// Wall-clock time spent in each phase of the offset loop, accumulated only
/// when the caller opts in via [`fused_sparse_conv_timed`]. On asynchronous
/// backends these are enqueue-side times; synchronise the device first if
/// device-complete numbers are needed.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConvTimings {
    pub gather: Duration,
    pub gemm: Duration,
    pub scatter_add: Duration,
}

impl ConvTimings {
    pub fn report(&self) {
        println!("\x1b[34;1mConv Timings\x1b[0m");
        println!("> gather      {:.3} ms", self.gather.as_secs_f64() * 1000.0);
        println!("> gemm        {:.3} ms", self.gemm.as_secs_f64() * 1000.0);
        println!("> scatter add {:.3} ms", self.scatter_add.as_secs_f64() * 1000.0);
    }
}

struct ConvPlan {
    kernel_volume: usize,
    num_in_planes: usize,
    num_out_planes: usize,
    max_pairs: usize,
    max_offset: usize,
}

impl ConvPlan {
    fn derive<D: Device>(
        filters: &Filters<D>,
        pairs: &IndicePairs<D>,
    ) -> Result<Self, OperationError<D::DeviceError>> {
        let counts = pairs.counts();

        if counts.is_empty() {
            return Err(OperationError::InvalidTensorFormat);
        }

        assert_eq!(
            filters.kernel_volume(),
            counts.len(),
            "filter slices and pair table disagree on kernel volume!"
        );

        // first offset achieving the maximum, so ties resolve to the lowest index
        let mut max_offset = 0;
        let mut max_pairs = 0;
        for (i, &count) in counts.iter().enumerate() {
            if count > max_pairs {
                max_pairs = count;
                max_offset = i;
            }
        }

        Ok(Self {
            kernel_volume: counts.len(),
            num_in_planes: filters.num_in_planes(),
            num_out_planes: filters.num_out_planes(),
            max_pairs: max_pairs.max(0) as usize,
            max_offset,
        })
    }
}

/// Forward pass of a fused sparse convolution.
///
/// `features` holds one column per active input site, `bias` is the fused
/// affine term broadcast into every output column, and `pairs` maps input
/// columns to output columns per kernel offset. `inverse` swaps the two
/// role arrays of the table, turning the same table into its transposed
/// convolution. With `submanifold` set, the offset with the most pairs is
/// taken to be the kernel center with an identity mapping (a caller
/// obligation, not re-verified) and is folded into one whole-matrix matmul.
pub fn fused_sparse_conv<D: Device>(
    features: &DenseMatrix<D>,
    filters: &Filters<D>,
    bias: &DenseMatrix<D>,
    pairs: &IndicePairs<D>,
    num_act_out: usize,
    inverse: bool,
    submanifold: bool,
) -> Result<DenseMatrix<D>, OperationError<D::DeviceError>> {
    conv_with(features, filters, bias, pairs, num_act_out, inverse, submanifold, None)
}

/// Same as [`fused_sparse_conv`], additionally accumulating per-phase
/// timings into `timings`.
#[allow(clippy::too_many_arguments)]
pub fn fused_sparse_conv_timed<D: Device>(
    features: &DenseMatrix<D>,
    filters: &Filters<D>,
    bias: &DenseMatrix<D>,
    pairs: &IndicePairs<D>,
    num_act_out: usize,
    inverse: bool,
    submanifold: bool,
    timings: &mut ConvTimings,
) -> Result<DenseMatrix<D>, OperationError<D::DeviceError>> {
    conv_with(features, filters, bias, pairs, num_act_out, inverse, submanifold, Some(timings))
}

#[allow(clippy::too_many_arguments)]
fn conv_with<D: Device>(
    features: &DenseMatrix<D>,
    filters: &Filters<D>,
    bias: &DenseMatrix<D>,
    pairs: &IndicePairs<D>,
    num_act_out: usize,
    inverse: bool,
    submanifold: bool,
    mut timings: Option<&mut ConvTimings>,
) -> Result<DenseMatrix<D>, OperationError<D::DeviceError>> {
    let plan = ConvPlan::derive(filters, pairs)?;
    let device = features.device();

    debug_assert_eq!(features.shape().rows(), plan.num_in_planes);
    debug_assert_eq!(bias.shape(), Shape::new(plan.num_out_planes, 1));

    let mut output = DenseMatrix::zeroed(device.clone(), Shape::new(plan.num_out_planes, num_act_out))?;

    // bias broadcast, as a rank-1 product against a row of ones
    let ones = DenseMatrix::ones(device.clone(), Shape::new(1, num_act_out))?;
    D::sgemm(1.0, &bias.buf, bias.shape, false, &ones.buf, ones.shape, false, 0.0, &mut output.buf)?;

    if submanifold {
        // the center offset maps every site to itself, so it needs no
        // gather or scatter-add
        let center = filters.slice(plan.max_offset);
        D::sgemm(1.0, &center.buf, center.shape, false, &features.buf, features.shape, false, 1.0, &mut output.buf)?;
    }

    if plan.max_pairs == 0 {
        return Ok(output);
    }

    let mut gathered = DenseMatrix::zeroed(device.clone(), Shape::new(plan.num_in_planes, plan.max_pairs))?;
    let mut multiplied = DenseMatrix::zeroed(device, Shape::new(plan.num_out_planes, plan.max_pairs))?;

    for i in 0..plan.kernel_volume {
        let n_hot = pairs.count(i);
        if n_hot <= 0 || (submanifold && i == plan.max_offset) {
            continue;
        }
        let n_hot = n_hot as usize;

        // only the first n_hot columns of the two scratch arenas are live
        // in this iteration
        let start = Instant::now();
        D::gather(
            plan.num_in_planes,
            n_hot,
            &features.buf,
            pairs.buf(),
            pairs.role_offset(i, inverse),
            &mut gathered.buf,
        )?;

        let gathered_at = Instant::now();
        let weights = filters.slice(i);
        D::sgemm(
            1.0,
            &weights.buf,
            weights.shape,
            false,
            &gathered.buf,
            Shape::new(plan.num_in_planes, n_hot),
            false,
            0.0,
            &mut multiplied.buf,
        )?;

        let multiplied_at = Instant::now();
        D::scatter_add(
            plan.num_out_planes,
            n_hot,
            &multiplied.buf,
            pairs.buf(),
            pairs.role_offset(i, !inverse),
            &mut output.buf,
        )?;

        if let Some(t) = timings.as_deref_mut() {
            t.gather += gathered_at - start;
            t.gemm += multiplied_at - gathered_at;
            t.scatter_add += multiplied_at.elapsed();
        }
    }

    Ok(output)
}
