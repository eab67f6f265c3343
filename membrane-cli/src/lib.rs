//! File formats and helpers shared by the `dm-response` and `dm-synth`
//! binaries. The solver itself lives in `membrane-core` and never touches
//! the filesystem.

pub mod output;
pub mod pgm;
pub mod preview;
pub mod synth;
pub mod voltages;

pub use pgm::{Pgm, PgmError, read_raster, write_raster_u8};
