//! Historical data: sources, alignment onto a common timeline, and the
//! causality-preserving bar stream.

pub mod align;
pub mod csv_source;
pub mod source;
pub mod stream;

pub use align::{align_symbols, load_aligned, prepare_series, AlignedSeries, GapPolicy};
pub use csv_source::CsvDirSource;
pub use source::{BarSource, MemorySource};
pub use stream::BarStream;
