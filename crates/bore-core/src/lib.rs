//! Frequency-domain acoustics of a tube-with-side-holes resonator: a
//! wind-instrument bore with mouthpiece, toneholes, and an open or
//! closed far end.
//!
//! Each physical feature (bore section, tonehole, mouthpiece,
//! termination) becomes a 2×2 complex transfer matrix or a boundary
//! state vector; the instrument calculator cascades them strictly
//! termination → mouthpiece and reports input impedance, reflection
//! coefficient, and loop gain at any frequency and fingering. The
//! playing-range solver then hunts the reactance zeros of that
//! impedance with a bracket search, Brent's method, and golden-section
//! refinement.

pub mod geometry;
pub mod instrument;
pub mod mouthpiece;
pub mod physics;
pub mod playing_range;
pub mod spectrum;
pub mod state_vector;
pub mod termination;
pub mod tonehole;
pub mod transfer_matrix;
pub mod tube;

pub use geometry::{Fingering, InstrumentGeometry, LengthUnit};
pub use instrument::InstrumentCalculator;
pub use physics::PhysicalParameters;
pub use playing_range::PlayingRange;
pub use spectrum::ImpedanceSpectrum;
pub use state_vector::StateVector;
pub use transfer_matrix::TransferMatrix;

use thiserror::Error as ThisError;

/// Engine errors. Configuration problems are fatal and surface
/// immediately; a missing playing range is a normal, recoverable
/// outcome that callers are expected to handle during fingering search.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("bore profile needs at least two points, found {0}")]
    InsufficientBore(usize),

    #[error("mouthpiece at {mouthpiece} m lies at or past the termination at {termination} m")]
    MouthpieceBeyondTermination { mouthpiece: f64, termination: f64 },

    #[error("hole at {position} m lies outside the bore between mouthpiece and termination")]
    HoleOutsideBore { position: f64 },

    #[error("mouthpiece specifies both fipple and embouchure geometry")]
    ConflictingMouthpiece,

    #[error("fingering has {got} hole states, instrument has {expected} holes")]
    FingeringMismatch { expected: usize, got: usize },

    #[error("no playing range near {near:.1} Hz")]
    NoPlayingRange { near: f64 },

    #[error("root search failed: {what}")]
    Convergence { what: &'static str },

    #[error("invalid spectrum scan range [{f_low}, {f_high}] with {n} points")]
    InvalidScanRange { f_low: f64, f_high: f64, n: usize },
}

/// Predicted playing frequency of one fingering near a target: the
/// refined reactance zero, or a typed "no playing range" failure.
pub fn predict_playing_frequency(
    calculator: &InstrumentCalculator,
    fingering: &Fingering,
    near: f64,
) -> Result<f64, Error> {
    PlayingRange::new(calculator, fingering)?.find_fmax(near)
}
