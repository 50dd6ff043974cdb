/// Contains the fused sparse-convolution forward operator.
pub mod conv;
/// Contains the `CpuThread` host backend.
pub mod cpu;
/// Contains the backend seam, mainly the `Device` and `DeviceBuffer` APIs.
pub mod device;
pub mod shape;
/// Contains the matrix, filter and indice-pair table types.
pub mod tensor;
