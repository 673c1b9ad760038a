use num_complex::Complex64;

use crate::physics::PhysicalParameters;
use crate::transfer_matrix::TransferMatrix;

/// Floor on the effective chimney height of a closed hole, metres.
/// Keeps the cot(k·te) shunt term well-defined when a finger intrudes
/// almost the whole chimney.
const MINIMUM_CHIMNEY_HEIGHT: f64 = 1.0e-5;

/// Leading constant of the series length correction for a finger-closed
/// hole; the keyed value differs because a pad sits above the hole
/// instead of flesh inside it.
const FINGER_TA_COEFF: f64 = -0.12;
const KEY_TA_COEFF: f64 = -0.15;

/// A tonehole with its geometry resolved against the bore: radii in
/// metres, `bore_radius` interpolated from the bore profile (or taken
/// from the hole's override) at the hole position.
#[derive(Debug, Clone)]
pub struct Tonehole {
    pub radius: f64,
    /// Chimney length (hole wall height).
    pub height: f64,
    pub bore_radius: f64,
    /// Closed by a mechanical key rather than a finger.
    pub keyed: bool,
}

/// Lefebvre–Scavone lumped-element tonehole model.
///
/// The hole is a reciprocal two-port built from a series inertance `Za`
/// and a shunt impedance `Zs`:
///
/// ```text
/// A = D = 1 + Za/(2·Zs)
/// B = Za·(1 + Za/(4·Zs))
/// C = 1/Zs
/// ```
///
/// Configuration is fixed at construction; the `with_*` builders return
/// a new instance, so a calculator can be shared across concurrent
/// evaluations.
#[derive(Debug, Clone)]
pub struct HoleCalculator {
    /// Scales the effective hole radius; per-instrument-family
    /// calibration knob.
    hole_size_multiplier: f64,
    /// Fraction of the hole radius by which a closing finger intrudes
    /// into the chimney.
    finger_adjustment: f64,
    /// A plugged hole is ignored entirely.
    plugged: bool,
}

impl Default for HoleCalculator {
    fn default() -> Self {
        Self {
            hole_size_multiplier: 1.0,
            finger_adjustment: 0.15,
            plugged: false,
        }
    }
}

impl HoleCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hole_size_multiplier(mut self, multiplier: f64) -> Self {
        self.hole_size_multiplier = multiplier;
        self
    }

    pub fn with_finger_adjustment(mut self, adjustment: f64) -> Self {
        self.finger_adjustment = adjustment;
        self
    }

    pub fn with_plugged(mut self, plugged: bool) -> Self {
        self.plugged = plugged;
        self
    }

    pub fn hole_size_multiplier(&self) -> f64 {
        self.hole_size_multiplier
    }

    /// Transfer matrix of the hole at wave number `k`. The open/closed
    /// state comes from the fingering, not the hole.
    pub fn calc_transfer_matrix(
        &self,
        hole: &Tonehole,
        is_open: bool,
        wave_number: f64,
        params: &PhysicalParameters,
    ) -> TransferMatrix {
        if self.plugged {
            // Plugged: no shunt admittance, no series correction.
            return TransferMatrix::identity();
        }

        let r = self.hole_size_multiplier * hole.radius;
        let rb = hole.bore_radius;
        let delta = r / rb;
        // Characteristic impedance of the hole chimney, ρc/(πr²).
        let z0h = params.z0(r);

        // Matching-volume length correction at the bore junction.
        let t_m = (r * delta / 8.0) * (1.0 + 0.207 * delta.powi(3));

        let (z_shunt, t_a) = if is_open {
            self.open_shunt(hole, r, delta, t_m, wave_number, params)
        } else {
            self.closed_shunt(hole, r, delta, t_m, z0h, wave_number)
        };

        let z_series = Complex64::new(0.0, params.z0(rb) * wave_number * t_a);
        let za_zs = z_series / z_shunt;
        let a = za_zs / 2.0 + 1.0;
        let b = z_series * (za_zs / 4.0 + 1.0);
        let c = 1.0 / z_shunt;
        TransferMatrix::new(a, b, c, a)
    }

    /// Shunt impedance of an open hole: frequency-dependent radiation
    /// impedance at the outer opening, seen through the chimney
    /// transmission line, plus the inner length correction.
    fn open_shunt(
        &self,
        hole: &Tonehole,
        r: f64,
        delta: f64,
        t_m: f64,
        k: f64,
        params: &PhysicalParameters,
    ) -> (Complex64, f64) {
        let kr = k * r;
        let krb = k * hole.bore_radius;
        let t_e = hole.height + t_m;

        // Outer length correction (series), open hole.
        let t_a = (-0.35 + 0.06 * (2.7 * hole.height / r).tanh()) * r * delta * delta;

        // Normalized radiation impedance of the unflanged outer opening.
        let z_r = Complex64::new(0.25 * kr * kr, 0.61 * kr);

        // Radiation impedance transformed through the chimney line.
        let kte = k * t_e;
        let j = Complex64::new(0.0, 1.0);
        let z_o = (z_r * kte.cos() + j * kte.sin()) / (j * z_r * kte.sin() + kte.cos());

        // Inner length correction (Lefebvre–Scavone polynomial fit).
        let t_i = r
            * (0.822 - 0.095 * delta - 1.566 * delta.powi(2) + 2.138 * delta.powi(3)
                - 1.640 * delta.powi(4)
                + 0.502 * delta.powi(5))
            * (1.0
                + (1.0 - 4.56 * delta + 6.55 * delta * delta)
                    * (0.17 * krb + 0.92 * krb * krb + 0.16 * krb.powi(3)
                        - 0.29 * krb.powi(4)));

        let z_shunt = (Complex64::new(0.0, k * t_i) + z_o) * params.z0(r);
        (z_shunt, t_a)
    }

    /// Shunt impedance of a hole closed by a finger or a key: the
    /// chimney cavity acts as a stub, `Zs = −j·Z0h·cot(k·te)`. A finger
    /// intrudes into the chimney and shortens the stub; a key does not,
    /// but its pad changes the series correction constant.
    fn closed_shunt(
        &self,
        hole: &Tonehole,
        r: f64,
        delta: f64,
        t_m: f64,
        z0h: f64,
        k: f64,
    ) -> (Complex64, f64) {
        let (ta_coeff, intrusion) = if hole.keyed {
            (KEY_TA_COEFF, 0.0)
        } else {
            (FINGER_TA_COEFF, self.finger_adjustment * r)
        };
        let t_e = (hole.height + t_m - intrusion).max(MINIMUM_CHIMNEY_HEIGHT);
        let t_a = (ta_coeff - 0.17 * (2.4 * hole.height / r).tanh()) * r * delta * delta;
        let z_shunt = Complex64::new(0.0, -z0h / (k * t_e).tan());
        (z_shunt, t_a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hole() -> Tonehole {
        Tonehole {
            radius: 3.5e-3,
            height: 3.0e-3,
            bore_radius: 7.0e-3,
            keyed: false,
        }
    }

    #[test]
    fn test_matrix_is_reciprocal_two_port() {
        let params = PhysicalParameters::default();
        let calc = HoleCalculator::default();
        let k = params.wave_number(440.0);
        for is_open in [true, false] {
            let m = calc.calc_transfer_matrix(&hole(), is_open, k, &params);
            assert!(
                (m.pp - m.uu).norm() < 1e-15,
                "A == D for the lumped hole model (open = {is_open})"
            );
            let det = m.determinant();
            assert!(
                (det - Complex64::new(1.0, 0.0)).norm() < 1e-6,
                "det = {det} (open = {is_open})"
            );
        }
    }

    #[test]
    fn test_plugged_hole_has_zero_shunt_admittance() {
        let params = PhysicalParameters::default();
        let calc = HoleCalculator::default().with_plugged(true);
        let k = params.wave_number(880.0);
        for is_open in [true, false] {
            let m = calc.calc_transfer_matrix(&hole(), is_open, k, &params);
            assert_eq!(m.up, Complex64::new(0.0, 0.0), "plugged ⇒ C = 0");
            assert_eq!(m.pp, Complex64::new(1.0, 0.0));
            assert_eq!(m.pu, Complex64::new(0.0, 0.0));
        }
    }

    #[test]
    fn test_open_shunt_admittance_continuous_at_low_wave_number() {
        // As k → 0 the open-hole shunt admittance grows like 1/k; it
        // must do so smoothly, without jumps or NaN.
        let params = PhysicalParameters::default();
        let calc = HoleCalculator::default();
        let mut prev: Option<f64> = None;
        let mut k = 1.0;
        while k > 1e-4 {
            let m = calc.calc_transfer_matrix(&hole(), true, k, &params);
            let y = m.up.norm();
            assert!(y.is_finite(), "admittance must stay finite at k = {k}");
            if let Some(p) = prev {
                let growth = y / p;
                assert!(
                    growth > 1.0 && growth < 3.0,
                    "admittance should grow smoothly as k halves: ratio {growth} at k = {k}"
                );
            }
            prev = Some(y);
            k *= 0.5;
        }
    }

    #[test]
    fn test_open_and_closed_differ() {
        let params = PhysicalParameters::default();
        let calc = HoleCalculator::default();
        let k = params.wave_number(440.0);
        let open = calc.calc_transfer_matrix(&hole(), true, k, &params);
        let closed = calc.calc_transfer_matrix(&hole(), false, k, &params);
        assert!(
            (open.up - closed.up).norm() > 1e-12,
            "open and closed holes must have different shunts"
        );
    }

    #[test]
    fn test_keyed_and_fingered_closures_differ() {
        let params = PhysicalParameters::default();
        let calc = HoleCalculator::default();
        let k = params.wave_number(440.0);
        let fingered = calc.calc_transfer_matrix(&hole(), false, k, &params);
        let keyed_hole = Tonehole { keyed: true, ..hole() };
        let keyed = calc.calc_transfer_matrix(&keyed_hole, false, k, &params);
        assert!(
            (fingered.up - keyed.up).norm() > 0.0 || (fingered.pu - keyed.pu).norm() > 0.0,
            "key and finger closures use different corrections"
        );
    }

    #[test]
    fn test_hole_size_multiplier_scales_shunt() {
        let params = PhysicalParameters::default();
        let k = params.wave_number(440.0);
        let full = HoleCalculator::default();
        let shrunk = HoleCalculator::default().with_hole_size_multiplier(0.9);
        let y_full = full.calc_transfer_matrix(&hole(), true, k, &params).up.norm();
        let y_shrunk = shrunk.calc_transfer_matrix(&hole(), true, k, &params).up.norm();
        assert!(
            y_shrunk < y_full,
            "a smaller effective hole has less shunt admittance: {y_shrunk} vs {y_full}"
        );
    }

    #[test]
    fn test_deep_finger_intrusion_is_clamped() {
        let params = PhysicalParameters::default();
        // Adjustment large enough to swallow the whole chimney.
        let calc = HoleCalculator::default().with_finger_adjustment(2.0);
        let k = params.wave_number(440.0);
        let m = calc.calc_transfer_matrix(&hole(), false, k, &params);
        assert!(m.up.norm().is_finite());
        assert!(m.pu.norm().is_finite());
    }
}
