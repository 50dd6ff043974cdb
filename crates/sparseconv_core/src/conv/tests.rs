use std::sync::Arc;

use crate::{
    device::{Device, OperationError},
    shape::Shape,
    tensor::{rng, DenseMatrix, Filters, IndicePairs},
};

use super::{fused_sparse_conv, fused_sparse_conv_timed, ConvTimings};

#[macro_export]
macro_rules! make_tests {
    ($dev:expr $(, $id:ident)+ $(,)?) => {
        $(
            #[test]
            fn $id() {
                tests::$id($dev);
            }
        )+
    };
}

pub use make_tests;

fn dense<D: Device>(device: Arc<D>, rows: usize, cols: usize, vals: &[f32]) -> DenseMatrix<D> {
    let mut mat = DenseMatrix::zeroed(device, Shape::new(rows, cols)).unwrap();
    mat.load_from_slice(vals).unwrap();
    mat
}

fn filters<D: Device>(device: Arc<D>, num_in: usize, num_out: usize, slab: &[f32]) -> Filters<D> {
    let kernel_volume = slab.len() / (num_in * num_out);
    let mut res = Filters::zeroed(device, kernel_volume, num_in, num_out).unwrap();
    res.load_from_slice(slab).unwrap();
    res
}

/// Builds a pair table from per-offset `(count, role0, role1)` triples,
/// padding both role arrays to `max_len`.
fn pair_table<D: Device>(device: Arc<D>, max_len: usize, offsets: &[(i32, &[i32], &[i32])]) -> IndicePairs<D> {
    let kernel_volume = offsets.len();
    let mut table = IndicePairs::zeroed(device, kernel_volume, max_len).unwrap();

    let mut counts = vec![0; kernel_volume];
    let mut flat = vec![0; 2 * kernel_volume * max_len];
    for (i, (count, role0, role1)) in offsets.iter().enumerate() {
        counts[i] = *count;
        flat[2 * i * max_len..][..role0.len()].copy_from_slice(role0);
        flat[(2 * i + 1) * max_len..][..role1.len()].copy_from_slice(role1);
    }

    unsafe {
        table.load_from_slice(&counts, &flat).unwrap();
    }

    table
}

fn read<D: Device>(mat: &DenseMatrix<D>) -> Vec<f32> {
    let mut buf = vec![0.0; mat.size()];
    mat.write_to_slice(&mut buf).unwrap();
    buf
}

fn assert_approx_eq(a: &[f32], b: &[f32], tol: f32) {
    assert_eq!(a.len(), b.len());
    for (&x, &y) in a.iter().zip(b.iter()) {
        assert!((x - y).abs() <= tol, "{x} != {y} within {tol}!");
    }
}

pub fn bias_only_on_empty_kernel<D: Device>(device: Arc<D>) {
    let features = dense(device.clone(), 2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let filters = filters(device.clone(), 2, 2, &[7.0; 8]);
    let bias = dense(device.clone(), 2, 1, &[1.5, -0.5]);
    let pairs = pair_table(device, 3, &[(0, &[], &[]), (0, &[], &[])]);

    let output = fused_sparse_conv(&features, &filters, &bias, &pairs, 4, false, false).unwrap();

    assert_eq!(output.shape(), Shape::new(2, 4));
    assert_eq!(read(&output), [1.5, -0.5, 1.5, -0.5, 1.5, -0.5, 1.5, -0.5]);
}

pub fn single_offset_accumulates<D: Device>(device: Arc<D>) {
    let features = dense(device.clone(), 1, 4, &[1.0, 2.0, 3.0, 4.0]);
    let filters = filters(device.clone(), 1, 1, &[2.0]);
    let bias = dense(device.clone(), 1, 1, &[0.0]);
    let pairs = pair_table(device, 4, &[(4, &[0, 1, 2, 3], &[0, 0, 0, 0])]);

    let output = fused_sparse_conv(&features, &filters, &bias, &pairs, 1, false, false).unwrap();

    // every input contributes exactly once: 2 + 4 + 6 + 8
    assert_eq!(read(&output), [20.0]);
}

pub fn submanifold_matches_generic_path<D: Device>(device: Arc<D>) {
    let features = dense(device.clone(), 2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let filters = filters(
        device.clone(),
        2,
        2,
        &[1.0, 0.0, 0.0, 1.0, 2.0, 1.0, 1.0, 2.0, 1.0, 2.0, 3.0, 4.0],
    );
    let bias = dense(device.clone(), 2, 1, &[10.0, 20.0]);

    // the center offset carries the most pairs, with an identity mapping
    let pairs = pair_table(
        device,
        3,
        &[(1, &[1], &[0]), (3, &[0, 1, 2], &[0, 1, 2]), (2, &[0, 2], &[1, 2])],
    );

    let fast = fused_sparse_conv(&features, &filters, &bias, &pairs, 3, false, true).unwrap();
    let generic = fused_sparse_conv(&features, &filters, &bias, &pairs, 3, false, false).unwrap();

    assert_eq!(read(&fast), [17.0, 29.0, 27.0, 41.0, 49.0, 71.0]);
    assert_eq!(read(&fast), read(&generic));
}

pub fn submanifold_ignores_unused_filters<D: Device>(device: Arc<D>) {
    let features = dense(device.clone(), 2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

    // the side offsets have no pairs, so their (junk) weights must not leak
    // into the output
    let filters = filters(
        device.clone(),
        2,
        2,
        &[1000.0, 1000.0, 1000.0, 1000.0, 2.0, 1.0, 1.0, 2.0, 1000.0, 1000.0, 1000.0, 1000.0],
    );
    let bias = dense(device.clone(), 2, 1, &[10.0, 20.0]);
    let pairs = pair_table(device, 3, &[(0, &[], &[]), (3, &[0, 1, 2], &[0, 1, 2]), (0, &[], &[])]);

    let output = fused_sparse_conv(&features, &filters, &bias, &pairs, 3, false, true).unwrap();

    assert_eq!(read(&output), [14.0, 25.0, 20.0, 31.0, 26.0, 37.0]);
}

pub fn offset_order_is_additive<D: Device>(device: Arc<D>) {
    let num_in = 3;
    let num_out = 2;

    let feature_vals = rng::vec_f32(num_in * 5, 0.0, 1.0, true);
    let filter_slab = rng::vec_f32(3 * num_in * num_out, 0.0, 1.0, true);
    let bias_vals = rng::vec_f32(num_out, 0.0, 1.0, true);

    let features = dense(device.clone(), num_in, 5, &feature_vals);
    let bias = dense(device.clone(), num_out, 1, &bias_vals);

    let forward_filters = filters(device.clone(), num_in, num_out, &filter_slab);
    let reversed_slab =
        filter_slab.chunks_exact(num_in * num_out).rev().flatten().copied().collect::<Vec<_>>();
    let reversed_filters = filters(device.clone(), num_in, num_out, &reversed_slab);

    let offsets: [(i32, &[i32], &[i32]); 3] =
        [(3, &[0, 2, 4], &[1, 2, 0]), (4, &[0, 1, 2, 3], &[3, 2, 1, 0]), (2, &[1, 3], &[0, 3])];
    let forward_pairs = pair_table(device.clone(), 5, &offsets);

    let mut reversed_offsets = offsets;
    reversed_offsets.reverse();
    let reversed_pairs = pair_table(device.clone(), 5, &reversed_offsets);

    let mut timings = ConvTimings::default();
    let forward =
        fused_sparse_conv_timed(&features, &forward_filters, &bias, &forward_pairs, 4, false, false, &mut timings)
            .unwrap();
    let untimed = fused_sparse_conv(&features, &forward_filters, &bias, &forward_pairs, 4, false, false).unwrap();
    let reversed = fused_sparse_conv(&features, &reversed_filters, &bias, &reversed_pairs, 4, false, false).unwrap();

    // timing must never change the numbers
    assert_eq!(read(&forward), read(&untimed));

    // accumulation across offsets commutes up to rounding
    assert_approx_eq(&read(&forward), &read(&reversed), 1e-5);
}

pub fn inverse_swaps_roles<D: Device>(device: Arc<D>) {
    let filters = filters(device.clone(), 1, 1, &[3.0, 5.0]);
    let bias = dense(device.clone(), 1, 1, &[0.0]);
    let pairs = pair_table(device.clone(), 2, &[(2, &[0, 1], &[1, 2]), (1, &[2], &[0])]);

    let features = dense(device.clone(), 1, 3, &[1.0, 2.0, 4.0]);
    let forward = fused_sparse_conv(&features, &filters, &bias, &pairs, 3, false, false).unwrap();
    assert_eq!(read(&forward), [20.0, 3.0, 6.0]);

    // the same table drives the transposed convolution with the roles swapped
    let cotangent = dense(device, 1, 3, &[1.0, 1.0, 1.0]);
    let transposed = fused_sparse_conv(&cotangent, &filters, &bias, &pairs, 3, true, false).unwrap();
    assert_eq!(read(&transposed), [3.0, 3.0, 5.0]);
}

pub fn rejects_empty_pair_table<D: Device>(device: Arc<D>) {
    let features = dense(device.clone(), 1, 1, &[0.0]);
    let filters = Filters::zeroed(device.clone(), 0, 1, 1).unwrap();
    let bias = dense(device.clone(), 1, 1, &[0.0]);
    let pairs = IndicePairs::zeroed(device, 0, 1).unwrap();

    let result = fused_sparse_conv(&features, &filters, &bias, &pairs, 1, false, false);
    assert!(matches!(result, Err(OperationError::InvalidTensorFormat)));
}
