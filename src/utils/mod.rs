pub mod sorting;
pub mod streaming_calculators;
pub mod tolerance_ranges;
