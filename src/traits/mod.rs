pub mod aggregator;
pub mod chromatogram_sink;
