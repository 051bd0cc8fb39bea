//! lattice-core: Time-grid engine for sample-accurate audio editing

pub mod breakpoint;
mod buffer;
mod error;
pub mod lattice;
mod marker;
mod tempo;
mod time;

pub use breakpoint::{Breakpoint, BreakpointCurve};
pub use buffer::AudioBuffer;
pub use error::{LatticeError, Result};
pub use lattice::{
    QuantizeMode, TimeLattice, TransientShift, ValueResolution, DEFAULT_PPQN,
    DEFAULT_SAMPLE_RATE, MIN_PPQN,
};
pub use marker::{AudioMarker, MarkerColor};
pub use tempo::{TempoEvent, TempoMap};
pub use time::{MusicalTime, TimeDomain};
