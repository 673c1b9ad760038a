use log::debug;
use num_complex::Complex64;

use crate::geometry::{BorePoint, Fingering, InstrumentGeometry};
use crate::mouthpiece::MouthpieceCalculator;
use crate::physics::PhysicalParameters;
use crate::state_vector::StateVector;
use crate::termination::{ResolvedTermination, TerminationCalculator};
use crate::tonehole::{HoleCalculator, Tonehole};
use crate::transfer_matrix::TransferMatrix;
use crate::tube::cone_matrix;
use crate::Error;

/// A bore section of the component chain, oriented so its transfer
/// matrix maps the load-side (termination-side) state to the
/// source-side (mouthpiece-side) state.
#[derive(Debug, Clone, Copy)]
struct BoreSegment {
    length: f64,
    source_radius: f64,
    load_radius: f64,
}

impl BoreSegment {
    fn transfer_matrix(&self, wave_number: f64, params: &PhysicalParameters) -> TransferMatrix {
        cone_matrix(
            wave_number,
            self.length,
            self.source_radius,
            self.load_radius,
            params,
        )
    }
}

/// One component of the chain between mouthpiece and termination.
#[derive(Debug, Clone)]
enum Component {
    Bore(BoreSegment),
    /// Tonehole plus its index into the fingering's open/closed flags.
    Hole(Tonehole, usize),
}

/// Frequency-domain calculator for one instrument under one set of air
/// conditions.
///
/// The component chain is built once at construction from an immutable
/// geometry snapshot and never mutated; reconfiguring (different hole
/// calculator, different air) means constructing a new instance.
pub struct InstrumentCalculator {
    params: PhysicalParameters,
    chain: Vec<Component>,
    /// Bore sections between the first bore point and the mouthpiece,
    /// ordered top → mouthpiece. Modeled as a closed-end duct combined
    /// in parallel with the bore (bore-section-based headspace
    /// convention).
    headspace: Vec<BoreSegment>,
    mouthpiece_calc: MouthpieceCalculator,
    termination_calc: TerminationCalculator,
    hole_calc: HoleCalculator,
    termination: ResolvedTermination,
    /// Bore radius at the mouthpiece, reference for reflectance.
    mouthpiece_radius: f64,
    gain_factor: Option<f64>,
    num_holes: usize,
}

impl InstrumentCalculator {
    /// Build a calculator with default component calculators chosen by
    /// [`hole_calculator_for`].
    pub fn new(
        geometry: &InstrumentGeometry,
        params: PhysicalParameters,
    ) -> Result<Self, Error> {
        let hole_calc = hole_calculator_for(&geometry.name);
        Self::with_calculators(geometry, params, hole_calc, TerminationCalculator::Auto)
    }

    /// Build a calculator with explicit hole and termination
    /// calculators.
    pub fn with_calculators(
        geometry: &InstrumentGeometry,
        params: PhysicalParameters,
        hole_calc: HoleCalculator,
        termination_calc: TerminationCalculator,
    ) -> Result<Self, Error> {
        if geometry.bore_points.len() < 2 {
            return Err(Error::InsufficientBore(geometry.bore_points.len()));
        }
        let mut bore_points = geometry.bore_points.clone();
        bore_points.sort_by(|a, b| a.position.total_cmp(&b.position));

        let top = bore_points[0].position;
        let bottom = bore_points[bore_points.len() - 1].position;
        let mouthpiece_pos = geometry.mouthpiece.position;
        if mouthpiece_pos >= bottom {
            return Err(Error::MouthpieceBeyondTermination {
                mouthpiece: mouthpiece_pos,
                termination: bottom,
            });
        }

        let mut holes = geometry.holes.clone();
        holes.sort_by(|a, b| a.position.total_cmp(&b.position));
        for hole in &holes {
            if hole.position < mouthpiece_pos || hole.position > bottom {
                return Err(Error::HoleOutsideBore { position: hole.position });
            }
        }

        let mouthpiece_calc = MouthpieceCalculator::for_mouthpiece(&geometry.mouthpiece)?;

        let mouthpiece_radius = geometry
            .mouthpiece
            .bore_diameter
            .unwrap_or_else(|| interpolate_diameter(&bore_points, mouthpiece_pos))
            / 2.0;
        let termination = ResolvedTermination {
            bore_radius: geometry
                .termination
                .bore_diameter
                .unwrap_or(bore_points[bore_points.len() - 1].diameter)
                / 2.0,
            flange_radius: geometry.termination.flange_diameter / 2.0,
        };
        let gain_factor = mouthpiece_calc.gain_factor(2.0 * mouthpiece_radius);

        // Material above the mouthpiece becomes headspace, not a chain
        // component. Headspace segments run top → mouthpiece, so the
        // closed top end is their load side.
        let mut headspace = Vec::new();
        if mouthpiece_pos > top {
            let mut cut_points = vec![top];
            cut_points.extend(
                bore_points
                    .iter()
                    .map(|bp| bp.position)
                    .filter(|&p| p > top && p < mouthpiece_pos),
            );
            cut_points.push(mouthpiece_pos);
            for pair in cut_points.windows(2) {
                let (lo, hi) = (pair[0], pair[1]);
                if hi - lo > 0.0 {
                    headspace.push(BoreSegment {
                        length: hi - lo,
                        source_radius: interpolate_diameter(&bore_points, hi) / 2.0,
                        load_radius: interpolate_diameter(&bore_points, lo) / 2.0,
                    });
                }
            }
        }

        // Main chain: alternating bore sections and holes, mouthpiece →
        // termination, subdividing sections at bore profile points.
        let mut chain = Vec::new();
        let mut cursor = mouthpiece_pos;
        for (index, hole) in holes.iter().enumerate() {
            push_bore_segments(&mut chain, &bore_points, cursor, hole.position);
            let bore_diameter = hole
                .bore_diameter
                .unwrap_or_else(|| interpolate_diameter(&bore_points, hole.position));
            chain.push(Component::Hole(
                Tonehole {
                    radius: hole.diameter / 2.0,
                    height: hole.height,
                    bore_radius: bore_diameter / 2.0,
                    keyed: hole.key,
                },
                index,
            ));
            cursor = hole.position;
        }
        push_bore_segments(&mut chain, &bore_points, cursor, bottom);

        debug!(
            "built component chain for '{}': {} components, {} headspace segments",
            geometry.name,
            chain.len(),
            headspace.len()
        );

        Ok(Self {
            params,
            chain,
            headspace,
            mouthpiece_calc,
            termination_calc,
            hole_calc,
            termination,
            mouthpiece_radius,
            gain_factor,
            num_holes: holes.len(),
        })
    }

    pub fn params(&self) -> &PhysicalParameters {
        &self.params
    }

    pub fn num_holes(&self) -> usize {
        self.num_holes
    }

    /// (Pressure, flow) state seen by the driver at frequency `f` under
    /// the given fingering. Cascades strictly termination → mouthpiece.
    pub fn calc_state(&self, frequency: f64, fingering: &Fingering) -> Result<StateVector, Error> {
        if fingering.open_holes.len() != self.num_holes {
            return Err(Error::FingeringMismatch {
                expected: self.num_holes,
                got: fingering.open_holes.len(),
            });
        }
        let k = self.params.wave_number(frequency);

        let mut sv = self.termination_calc.calc_state_vector(
            &self.termination,
            fingering.is_end_open(),
            k,
            &self.params,
        );

        for component in self.chain.iter().rev() {
            let tm = match component {
                Component::Bore(segment) => segment.transfer_matrix(k, &self.params),
                Component::Hole(tonehole, index) => self.hole_calc.calc_transfer_matrix(
                    tonehole,
                    fingering.open_holes[*index],
                    k,
                    &self.params,
                ),
            };
            sv = sv.apply(&tm);
        }

        if self.mouthpiece_calc.is_flow_node() {
            if let Some(hs) = self.headspace_state(k) {
                sv = sv.parallel(&hs);
            }
            let tm = self.mouthpiece_calc.calc_transfer_matrix(k, &self.params);
            sv = sv.apply(&tm);
        }
        Ok(sv)
    }

    /// Headspace seen from the mouthpiece: the sections above it,
    /// cascaded from a closed top end.
    fn headspace_state(&self, wave_number: f64) -> Option<StateVector> {
        if self.headspace.is_empty() {
            return None;
        }
        let mut sv = StateVector::closed_end();
        for segment in &self.headspace {
            sv = sv.apply(&segment.transfer_matrix(wave_number, &self.params));
        }
        Some(sv)
    }

    /// Acoustic input impedance at the driver.
    pub fn impedance(&self, frequency: f64, fingering: &Fingering) -> Result<Complex64, Error> {
        Ok(self.calc_state(frequency, fingering)?.impedance())
    }

    /// Reflection coefficient relative to the bore's characteristic
    /// impedance at the mouthpiece.
    pub fn reflectance(&self, frequency: f64, fingering: &Fingering) -> Result<Complex64, Error> {
        let z0 = self.params.z0(self.mouthpiece_radius);
        Ok(self.calc_state(frequency, fingering)?.reflectance(z0))
    }

    /// Whether the mouthpiece carries a gain model. Without one,
    /// [`gain`](Self::gain) is the constant 1.0.
    pub fn has_gain_model(&self) -> bool {
        self.gain_factor.is_some()
    }

    /// Loop gain `G0·f·ρ/|Z|`; 1.0 when the mouthpiece has no gain
    /// model.
    pub fn gain(&self, frequency: f64, fingering: &Fingering) -> Result<f64, Error> {
        match self.gain_factor {
            None => Ok(1.0),
            Some(g0) => {
                let z = self.impedance(frequency, fingering)?;
                Ok(g0 * frequency * self.params.rho() / z.norm())
            }
        }
    }
}

/// Default hole calculator for an instrument, keyed by name substring.
/// Pragmatic per-family calibration, not a rigorous dispatch rule:
/// flutes and whistles take holes at face value, other families shrink
/// the effective hole slightly.
pub fn hole_calculator_for(name: &str) -> HoleCalculator {
    let lowered = name.to_lowercase();
    if lowered.contains("flute") || lowered.contains("whistle") {
        HoleCalculator::default()
    } else {
        HoleCalculator::default().with_hole_size_multiplier(0.95)
    }
}

/// Linear interpolation of the bore diameter at a position, from the
/// sorted bore-point list. Positions outside the profile clamp to the
/// nearest end.
fn interpolate_diameter(bore_points: &[BorePoint], position: f64) -> f64 {
    let first = &bore_points[0];
    if position <= first.position {
        return first.diameter;
    }
    for pair in bore_points.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if position <= b.position {
            let span = b.position - a.position;
            if span <= 0.0 {
                return b.diameter;
            }
            let t = (position - a.position) / span;
            return a.diameter + t * (b.diameter - a.diameter);
        }
    }
    bore_points[bore_points.len() - 1].diameter
}

/// Append the bore sections covering `[from, to]`, split at any bore
/// profile points inside the interval.
fn push_bore_segments(
    chain: &mut Vec<Component>,
    bore_points: &[BorePoint],
    from: f64,
    to: f64,
) {
    if to - from <= 0.0 {
        return;
    }
    let mut cuts = vec![from];
    cuts.extend(
        bore_points
            .iter()
            .map(|bp| bp.position)
            .filter(|&p| p > from && p < to),
    );
    cuts.push(to);
    for pair in cuts.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if hi - lo > 0.0 {
            chain.push(Component::Bore(BoreSegment {
                length: hi - lo,
                source_radius: interpolate_diameter(bore_points, lo) / 2.0,
                load_radius: interpolate_diameter(bore_points, hi) / 2.0,
            }));
        }
    }
}
