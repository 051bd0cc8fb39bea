//! lattice-services: File formats and offline processing built on lattice-core

pub mod breakpoint_file;
mod error;
pub mod processing;
pub mod wav;

pub use breakpoint_file::{BreakpointFile, BreakpointOutput};
pub use error::{Result, ServiceError};
pub use processing::{apply_gain_curve, apply_pan_curve, isolate_transients, split_by_beats};
pub use wav::{read_wav, write_wav};
