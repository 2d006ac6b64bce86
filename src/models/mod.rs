pub mod aggregators;
pub mod extraction;
pub mod filter_matcher;
pub mod generator;
pub mod isolation;
pub mod request;
pub mod spectrum;
