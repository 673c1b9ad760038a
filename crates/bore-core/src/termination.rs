use num_complex::Complex64;

use crate::physics::PhysicalParameters;
use crate::state_vector::StateVector;
use crate::Error;

/// Flange/bore diameter ratio below which the end behaves as unflanged
/// and above which the flange is effectively infinite.
const UNFLANGED_RATIO: f64 = 1.1;
const INFINITE_FLANGE_RATIO: f64 = 4.0;

/// Termination geometry resolved against the bore profile.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedTermination {
    pub bore_radius: f64,
    pub flange_radius: f64,
}

/// Radiation model of the open far end.
///
/// `Auto` picks a variant from the flange/bore ratio: within 10 % of
/// the bore it is unflanged, past `INFINITE_FLANGE_RATIO` it is fully
/// flanged, in between the thick-flanged interpolation applies. This
/// margin-based selection is a documented heuristic, not a physical
/// threshold.
#[derive(Debug, Clone, Copy, Default)]
pub enum TerminationCalculator {
    Unflanged,
    Flanged,
    ThickFlanged,
    #[default]
    Auto,
}

impl TerminationCalculator {
    /// Boundary state vector at the far end. A closed end is the ideal
    /// `(1, 0)`; an open end carries the radiation impedance.
    pub fn calc_state_vector(
        &self,
        term: &ResolvedTermination,
        is_open: bool,
        wave_number: f64,
        params: &PhysicalParameters,
    ) -> StateVector {
        if !is_open {
            return StateVector::closed_end();
        }
        let z = self.radiation_impedance(term, wave_number, params);
        StateVector::from_impedance(z)
    }

    /// Complex radiation impedance of the open end,
    /// `Zr = Z0·(1+R)/(1−R)` with `R = −|R|·exp(−2j·k·δ)`.
    pub fn radiation_impedance(
        &self,
        term: &ResolvedTermination,
        wave_number: f64,
        params: &PhysicalParameters,
    ) -> Complex64 {
        let a = term.bore_radius;
        let ka = wave_number * a;
        let (magnitude, delta) = match self.select(term) {
            TerminationCalculator::Unflanged => unflanged_reflection(ka, a),
            TerminationCalculator::Flanged => flanged_reflection(ka, a),
            _ => thick_flanged_reflection(ka, a, term.flange_radius),
        };
        let r = -magnitude * (Complex64::new(0.0, -2.0 * wave_number * delta)).exp();
        let one = Complex64::new(1.0, 0.0);
        params.z0(a) * (one + r) / (one - r)
    }

    fn select(&self, term: &ResolvedTermination) -> TerminationCalculator {
        match self {
            TerminationCalculator::Auto => {
                let ratio = term.flange_radius / term.bore_radius;
                if ratio <= UNFLANGED_RATIO {
                    TerminationCalculator::Unflanged
                } else if ratio >= INFINITE_FLANGE_RATIO {
                    TerminationCalculator::Flanged
                } else {
                    TerminationCalculator::ThickFlanged
                }
            }
            other => *other,
        }
    }
}

/// Silva et al. fit for an unflanged pipe: reflection magnitude and end
/// correction δ (low-ka limit δ = 0.6133·a).
fn unflanged_reflection(ka: f64, a: f64) -> (f64, f64) {
    let ka2 = ka * ka;
    let magnitude = (1.0 + 0.2 * ka - 0.084 * ka2) / (1.0 + 0.2 * ka + 0.416 * ka2);
    let delta = 0.6133 * a * (1.0 + 0.044 * ka2) / (1.0 + 0.19 * ka2);
    (magnitude.clamp(0.0, 1.0), delta)
}

/// Silva et al. fit for an infinite flange (low-ka limit δ = 0.8216·a).
fn flanged_reflection(ka: f64, a: f64) -> (f64, f64) {
    let ka2 = ka * ka;
    let magnitude = (1.0 + 0.323 * ka - 0.077 * ka2) / (1.0 + 0.323 * ka + 0.923 * ka2);
    let delta = 0.8216 * a * (1.0 + 0.057 * ka) / (1.0 + 0.057 * ka + 0.63 * ka2);
    (magnitude.clamp(0.0, 1.0), delta)
}

/// Thick flange: interpolate between the zero-flange and infinite-
/// flange limits as a function of the bore/flange radius ratio
/// (Dalmont-style correction on the end correction).
fn thick_flanged_reflection(ka: f64, a: f64, flange_radius: f64) -> (f64, f64) {
    // q → 1 is no flange at all, q → 0 an infinite flange.
    let q = (a / flange_radius).clamp(0.0, 1.0);
    let (m_unf, d_unf) = unflanged_reflection(ka, a);
    let (m_inf, d_inf) = flanged_reflection(ka, a);
    let magnitude = m_inf + q * (m_unf - m_inf);
    let delta = d_inf + q * (d_unf - d_inf) + 0.057 * q * (1.0 - q.powi(5)) * a;
    (magnitude, delta)
}
