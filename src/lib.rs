// Re-export main structures
pub use crate::codecs::NumpressCodec;
pub use crate::models::generator::{ChromatogramGenerator, GenerationSummary, GeneratorState};
pub use crate::models::request::ChromatogramRequest;
pub use crate::models::spectrum::Spectrum;

// Re-export traits
pub use crate::traits::aggregator::Aggregator;
pub use crate::traits::chromatogram_sink::ChromatogramSink;

pub use crate::errors::{ChromextractError, Result};

// Declare modules
pub mod codecs;
pub mod errors;
pub mod io;
pub mod models;
pub mod traits;
pub mod utils;
