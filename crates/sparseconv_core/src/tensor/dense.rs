use std::{fmt::Debug, sync::Arc};

use crate::{
    device::{Device, DeviceBuffer},
    shape::Shape,
    tensor::rng,
};

pub struct DenseMatrix<D: Device> {
    pub(crate) buf: D::BufferF32,
    pub(crate) shape: Shape,
}

impl<D: Device> Debug for DenseMatrix<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.shape)
    }
}

impl<D: Device> DenseMatrix<D> {
    pub fn zeroed(device: Arc<D>, shape: Shape) -> Result<Self, D::DeviceError> {
        let buf = D::BufferF32::new(device, shape.size())?;
        Ok(Self { buf, shape })
    }

    pub fn ones(device: Arc<D>, shape: Shape) -> Result<Self, D::DeviceError> {
        let mut res = Self::zeroed(device, shape)?;
        res.load_from_slice(&vec![1.0; shape.size()])?;
        Ok(res)
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn size(&self) -> usize {
        self.shape.size()
    }

    pub fn allocated_size(&self) -> usize {
        self.buf.size()
    }

    pub fn device(&self) -> Arc<D> {
        self.buf.device()
    }

    pub fn copy_from(&mut self, other: &Self) -> Result<(), D::DeviceError> {
        assert_eq!(self.shape, other.shape);
        self.buf.load_from_device(&other.buf, other.size())
    }

    pub fn set_zero(&mut self) -> Result<(), D::DeviceError> {
        self.buf.set_zero()
    }

    pub fn load_from_slice(&mut self, buf: &[f32]) -> Result<(), D::DeviceError> {
        assert_eq!(buf.len(), self.size());
        self.buf.load_from_slice(buf)
    }

    /// Writes the contents of this matrix into a buffer.
    pub fn write_to_slice(&self, buf: &mut [f32]) -> Result<(), D::DeviceError> {
        assert!(self.size() <= buf.len());
        self.buf.write_into_slice(buf, self.size())
    }

    pub fn seed_random(&mut self, mean: f32, stdev: f32, use_gaussian: bool) -> Result<(), D::DeviceError> {
        let values = rng::vec_f32(self.size(), mean, stdev, use_gaussian);
        self.load_from_slice(&values)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cpu::CpuThread;

    #[test]
    fn load_copy_and_zero() {
        let device = Arc::new(CpuThread);

        let mut a = DenseMatrix::zeroed(device.clone(), Shape::new(2, 2)).unwrap();
        a.load_from_slice(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(a.allocated_size(), 4);

        let mut b = DenseMatrix::zeroed(device, Shape::new(2, 2)).unwrap();
        b.copy_from(&a).unwrap();

        let mut buf = [0.0; 4];
        b.write_to_slice(&mut buf).unwrap();
        assert_eq!(buf, [1.0, 2.0, 3.0, 4.0]);

        b.set_zero().unwrap();
        b.write_to_slice(&mut buf).unwrap();
        assert_eq!(buf, [0.0; 4]);
    }
}
