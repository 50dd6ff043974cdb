use std::sync::Arc;

use crate::{device::Device, shape::Shape, tensor::DenseMatrix};

/// The weight tensor of a sparse convolution: one dense
/// `num_out_planes x num_in_planes` matrix per kernel offset.
pub struct Filters<D: Device> {
    slices: Vec<DenseMatrix<D>>,
    num_in_planes: usize,
    num_out_planes: usize,
}

impl<D: Device> Filters<D> {
    pub fn zeroed(
        device: Arc<D>,
        kernel_volume: usize,
        num_in_planes: usize,
        num_out_planes: usize,
    ) -> Result<Self, D::DeviceError> {
        let slices = (0..kernel_volume)
            .map(|_| DenseMatrix::zeroed(device.clone(), Shape::new(num_out_planes, num_in_planes)))
            .collect::<Result<_, _>>()?;

        Ok(Self { slices, num_in_planes, num_out_planes })
    }

    /// Loads every slice from one flat slab of `kernel_volume` blocks of
    /// `num_in_planes * num_out_planes` values. Each block is column-major
    /// `out x in`, which is the same byte order as row-major `in x out`.
    pub fn load_from_slice(&mut self, buf: &[f32]) -> Result<(), D::DeviceError> {
        let slice_size = self.num_in_planes * self.num_out_planes;
        assert_eq!(buf.len(), self.slices.len() * slice_size);

        for (slice, chunk) in self.slices.iter_mut().zip(buf.chunks_exact(slice_size)) {
            slice.load_from_slice(chunk)?;
        }

        Ok(())
    }

    pub fn kernel_volume(&self) -> usize {
        self.slices.len()
    }

    pub fn num_in_planes(&self) -> usize {
        self.num_in_planes
    }

    pub fn num_out_planes(&self) -> usize {
        self.num_out_planes
    }

    pub fn slice(&self, offset: usize) -> &DenseMatrix<D> {
        &self.slices[offset]
    }

    pub fn seed_random(&mut self, mean: f32, stdev: f32, use_gaussian: bool) -> Result<(), D::DeviceError> {
        for slice in &mut self.slices {
            slice.seed_random(mean, stdev, use_gaussian)?;
        }

        Ok(())
    }
}
