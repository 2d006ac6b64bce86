pub mod chromatogram_writer;
pub mod spectrum_reader;
