use std::sync::Arc;

use crate::device::{Device, DeviceBuffer};

/// The neighbour-mapping table of a sparse convolution: for every kernel
/// offset, two parallel index arrays of capacity `max_len` (the source and
/// destination roles) and a host-resident count of valid pairs.
///
/// The index buffer may live on an accelerator, but the counts always stay
/// on the host so the offset loop can be planned without device readbacks.
pub struct IndicePairs<D: Device> {
    buf: D::BufferI32,
    counts: Vec<i32>,
    max_len: usize,
}

impl<D: Device> IndicePairs<D> {
    pub fn zeroed(device: Arc<D>, kernel_volume: usize, max_len: usize) -> Result<Self, D::DeviceError> {
        let buf = D::BufferI32::new(device, (2 * kernel_volume * max_len).max(1))?;
        Ok(Self { buf, counts: vec![0; kernel_volume], max_len })
    }

    /// Loads the whole table at once: one count per offset, and the flat
    /// index data laid out as `[offset][role][pair]` with both role arrays
    /// padded to `max_len`.
    ///
    /// #### Safety
    /// It is the responsibility of the user to ensure that the first
    /// `counts[i]` entries of each role array are valid column indices into
    /// the matrices the table will be used against.
    pub unsafe fn load_from_slice(&mut self, counts: &[i32], pairs: &[i32]) -> Result<(), D::DeviceError> {
        assert_eq!(counts.len(), self.counts.len());
        assert_eq!(pairs.len(), 2 * self.counts.len() * self.max_len);

        for &count in counts {
            assert!(count <= self.max_len as i32, "pair count {count} exceeds table capacity {}!", self.max_len);
        }

        self.counts.copy_from_slice(counts);
        self.buf.load_from_slice(pairs)
    }

    pub fn kernel_volume(&self) -> usize {
        self.counts.len()
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn count(&self, offset: usize) -> i32 {
        self.counts[offset]
    }

    pub fn counts(&self) -> &[i32] {
        &self.counts
    }

    /// Start of the given role array within the index buffer. `role` is
    /// flipped by the caller to swap the gather and scatter sides.
    pub fn role_offset(&self, offset: usize, role: bool) -> usize {
        (2 * offset + usize::from(role)) * self.max_len
    }

    pub(crate) fn buf(&self) -> &D::BufferI32 {
        &self.buf
    }
}
