pub mod error;

use std::{fmt::Debug, sync::Arc};

use crate::{conv::tests, shape::Shape};

pub use error::OperationError;

pub type OperationResult<T> = Result<(), OperationError<T>>;

pub trait DeviceBuffer<D, T>: Sized {
    type BufferError;

    fn new(device: Arc<D>, size: usize) -> Result<Self, Self::BufferError>;

    fn size(&self) -> usize;

    fn device(&self) -> Arc<D>;

    fn set_zero(&mut self) -> Result<(), Self::BufferError>;

    fn load_from_device(&mut self, buf: &Self, num: usize) -> Result<(), Self::BufferError>;

    fn load_from_slice(&mut self, buf: &[T]) -> Result<(), Self::BufferError>;

    fn write_into_slice(&self, buf: &mut [T], num: usize) -> Result<(), Self::BufferError>;
}

#[allow(clippy::too_many_arguments)]
pub trait Device: Sized + 'static {
    type IdType;
    type DeviceError: Debug;
    type BufferI32: DeviceBuffer<Self, i32, BufferError = Self::DeviceError>;
    type BufferF32: DeviceBuffer<Self, f32, BufferError = Self::DeviceError>;

    fn new(id: Self::IdType) -> Result<Self, Self::DeviceError>;

    fn synchronise(&self) -> Result<(), Self::DeviceError>;

    fn get_last_device_error(&self) -> Result<(), Self::DeviceError>;

    fn sanity_check(self: Arc<Self>) {
        println!("\x1b[34;1mRunning Sanity Checks\x1b[0m");
        tests::bias_only_on_empty_kernel(self.clone());
        tests::single_offset_accumulates(self.clone());
        tests::submanifold_matches_generic_path(self.clone());
        tests::submanifold_ignores_unused_filters(self.clone());
        tests::offset_order_is_additive(self.clone());
        tests::inverse_swaps_roles(self.clone());
        tests::rejects_empty_pair_table(self.clone());
        self.get_last_device_error().unwrap();
        println!("\x1b[32;1mAll Checks Passed\x1b[0m");
    }

    /// Computes `output = alpha * op(A) * op(B) + beta * output`, where `op`
    /// transposes its operand when the corresponding flag is set.
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
    ) -> OperationResult<Self::DeviceError>;

    /// Copies `count` columns of height `single_size` out of `input`, column
    /// `j` of the output coming from column `indices[index_offset + j]` of
    /// the input.
    fn gather(
        single_size: usize,
        count: usize,
        input: &Self::BufferF32,
        indices: &Self::BufferI32,
        index_offset: usize,
        output: &mut Self::BufferF32,
    ) -> OperationResult<Self::DeviceError>;

    /// Accumulates `count` columns of height `single_size` from `input` into
    /// `output`, column `j` adding into column `indices[index_offset + j]`.
    /// Must add on top of whatever the destination already holds, including
    /// under duplicate destination indices.
    fn scatter_add(
        single_size: usize,
        count: usize,
        input: &Self::BufferF32,
        indices: &Self::BufferI32,
        index_offset: usize,
        output: &mut Self::BufferF32,
    ) -> OperationResult<Self::DeviceError>;
}
