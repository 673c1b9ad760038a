use num_complex::Complex64;
use std::f64::consts::PI;

use crate::geometry::Mouthpiece;
use crate::physics::PhysicalParameters;
use crate::transfer_matrix::TransferMatrix;
use crate::Error;

/// Driver model at the top of the bore.
///
/// Flow-node drivers (fipple window, embouchure hole) blow across an
/// opening; the bore state is combined in parallel with any headspace
/// and then seen through the window's series impedance. The generic
/// pressure-node driver (reed-like) couples to the bore directly.
///
/// Which variant applies is a pure function of the populated geometry
/// field: `fipple` ⇒ `Fipple`, `embouchure` ⇒ `Embouchure`, neither ⇒
/// `PressureNode`. Both populated is a configuration error.
#[derive(Debug, Clone)]
pub enum MouthpieceCalculator {
    Fipple {
        window_length: f64,
        window_width: f64,
        window_height: f64,
        fipple_factor: f64,
    },
    Embouchure {
        hole_length: f64,
        hole_width: f64,
        hole_height: f64,
    },
    PressureNode,
}

impl MouthpieceCalculator {
    /// Select the variant for a mouthpiece description.
    pub fn for_mouthpiece(mouthpiece: &Mouthpiece) -> Result<Self, Error> {
        match (&mouthpiece.fipple, &mouthpiece.embouchure) {
            (Some(_), Some(_)) => Err(Error::ConflictingMouthpiece),
            (Some(fipple), None) => Ok(Self::Fipple {
                window_length: fipple.window_length,
                window_width: fipple.window_width,
                window_height: fipple.window_height,
                fipple_factor: fipple.fipple_factor.unwrap_or(1.0),
            }),
            (None, Some(emb)) => Ok(Self::Embouchure {
                hole_length: emb.hole_length,
                hole_width: emb.hole_width,
                hole_height: emb.hole_height,
            }),
            (None, None) => Ok(Self::PressureNode),
        }
    }

    /// Flow-node drivers see the bore as an admittance; the pressure-
    /// node driver sees it as an impedance.
    pub fn is_flow_node(&self) -> bool {
        !matches!(self, Self::PressureNode)
    }

    /// Opening area and effective duct length of the window, if any.
    fn window(&self) -> Option<(f64, f64)> {
        match *self {
            Self::Fipple {
                window_length,
                window_width,
                window_height,
                fipple_factor,
            } => {
                let area = window_length * window_width;
                let r_eq = (area / PI).sqrt();
                // End corrections on both faces of the window duct.
                Some((area, (window_height + 1.4 * r_eq) * fipple_factor))
            }
            Self::Embouchure {
                hole_length,
                hole_width,
                hole_height,
            } => {
                let area = hole_length * hole_width;
                let r_eq = (area / PI).sqrt();
                Some((area, hole_height + 1.4 * r_eq))
            }
            Self::PressureNode => None,
        }
    }

    /// Transfer matrix applied after the bore and headspace states are
    /// combined. The window is a lumped series impedance: duct mass
    /// reactance plus an empirical radiation-like resistance.
    ///
    /// ```text
    /// Zw = Z0w·(j·k·h_eff + (k·r_eq)²/4)
    /// M  = [1  Zw]
    ///      [0   1]
    /// ```
    pub fn calc_transfer_matrix(
        &self,
        wave_number: f64,
        params: &PhysicalParameters,
    ) -> TransferMatrix {
        match self.window() {
            None => TransferMatrix::identity(),
            Some((area, h_eff)) => {
                let r_eq = (area / PI).sqrt();
                let z0w = params.rho() * params.speed_of_sound() / area;
                let kr = wave_number * r_eq;
                let z_window =
                    z0w * Complex64::new(0.25 * kr * kr, wave_number * h_eff);
                TransferMatrix::new(
                    Complex64::new(1.0, 0.0),
                    z_window,
                    Complex64::new(0.0, 0.0),
                    Complex64::new(1.0, 0.0),
                )
            }
        }
    }

    /// Loop-gain normalization constant G0, derived from the window
    /// geometry (gain = G0·f·ρ/|Z|). The pressure-node driver has no
    /// gain model and returns `None`, which callers report as gain 1.0.
    pub fn gain_factor(&self, bore_diameter: f64) -> Option<f64> {
        let (area, h_eff) = self.window()?;
        // Empirical normalization: larger windows on narrower bores
        // sustain oscillation over a wider impedance range. Units 1/m.
        Some(2.0 * PI * area / (h_eff * bore_diameter * bore_diameter))
    }
}
