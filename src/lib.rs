//! Codecs for Pump It Up PSP data: STX step charts and RESPACK resource archives, plus a
//! StepMania `.ssc` reader to build new charts from.

pub mod binary;
pub mod compression;
pub mod convert;
pub mod keystream;
mod output;
pub mod respack;
pub mod ssc;
pub mod stx;

pub use compression::CompressionError;
pub use convert::{build_step, ConvertError, ConvertOptions};
pub use respack::{Entry, PackEntry, RespackError};
pub use ssc::{SscError, Song};
pub use stx::{Block, Chart, DivisionSet, Note, Step, StxError};
