mod dense;
mod filters;
mod pairs;
pub(crate) mod rng;

pub use dense::DenseMatrix;
pub use filters::Filters;
pub use pairs::IndicePairs;
