use log::debug;

use crate::geometry::Fingering;
use crate::instrument::InstrumentCalculator;
use crate::Error;

/// Fractional step of the bracket search (≈1.2 % in frequency).
pub const GRANULARITY: f64 = 1.012;
/// A bracket within this ratio of the start frequency is taken without
/// looking further.
pub const PREFERRED_BOUND_RATIO: f64 = 1.12;
/// Widest search range, about an octave in each direction.
pub const SEARCH_BOUND_RATIO: f64 = 2.0;
/// Loop gain below which oscillation cannot be sustained.
pub const MINIMUM_GAIN: f64 = 1.0;
/// Relative frequency tolerance of the root and minimum refiners.
pub const FREQUENCY_PRECISION: f64 = 1.0e-4;
/// Iteration cap of Brent's method and the golden-section search.
const MAX_ITERATIONS: usize = 100;

/// Golden ratio complement, (3 − √5)/2.
const GOLDEN: f64 = 0.381_966_011_250_105;

/// Brent's method: find a root of `f` inside the bracket `[a, b]`,
/// which must straddle a sign change. Inverse quadratic interpolation
/// with secant and bisection fallbacks, bounded iteration count.
pub fn brent_root<F>(f: &mut F, a: f64, b: f64, tolerance: f64) -> Result<f64, Error>
where
    F: FnMut(f64) -> Result<f64, Error>,
{
    let (mut a, mut b) = (a, b);
    let mut fa = f(a)?;
    let mut fb = f(b)?;
    if fa == 0.0 {
        return Ok(a);
    }
    if fb == 0.0 {
        return Ok(b);
    }
    if fa * fb > 0.0 {
        return Err(Error::Convergence {
            what: "bracket does not straddle a sign change",
        });
    }

    let mut c = a;
    let mut fc = fa;
    let mut d = b - a;
    let mut e = d;

    for _ in 0..MAX_ITERATIONS {
        if fb.abs() > fc.abs() {
            // b is the best estimate; keep it that way.
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }
        let tol = 2.0 * f64::EPSILON * b.abs() + 0.5 * tolerance;
        let m = 0.5 * (c - b);
        if m.abs() <= tol || fb == 0.0 {
            return Ok(b);
        }
        if e.abs() < tol || fa.abs() <= fb.abs() {
            // Bisection.
            d = m;
            e = m;
        } else {
            let s = fb / fa;
            let (mut p, mut q) = if a == c {
                // Secant.
                (2.0 * m * s, 1.0 - s)
            } else {
                // Inverse quadratic interpolation.
                let q = fa / fc;
                let r = fb / fc;
                (
                    s * (2.0 * m * q * (q - r) - (b - a) * (r - 1.0)),
                    (q - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };
            if p > 0.0 {
                q = -q;
            }
            p = p.abs();
            if 2.0 * p < (3.0 * m * q - (tol * q).abs()).min((e * q).abs()) {
                e = d;
                d = p / q;
            } else {
                d = m;
                e = m;
            }
        }
        a = b;
        fa = fb;
        b += if d.abs() > tol { d } else { tol.copysign(m) };
        fb = f(b)?;
        if (fb > 0.0) == (fc > 0.0) {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
    }
    Err(Error::Convergence {
        what: "Brent iteration cap exceeded",
    })
}

/// Golden-section search: location of a local minimum of `f` inside
/// `[a, b]`.
pub fn golden_minimum<F>(f: &mut F, a: f64, b: f64, tolerance: f64) -> Result<f64, Error>
where
    F: FnMut(f64) -> Result<f64, Error>,
{
    let (mut lo, mut hi) = if a < b { (a, b) } else { (b, a) };
    let mut x1 = lo + GOLDEN * (hi - lo);
    let mut x2 = hi - GOLDEN * (hi - lo);
    let mut f1 = f(x1)?;
    let mut f2 = f(x2)?;
    for _ in 0..MAX_ITERATIONS {
        if (hi - lo).abs() <= tolerance {
            break;
        }
        if f1 < f2 {
            hi = x2;
            x2 = x1;
            f2 = f1;
            x1 = lo + GOLDEN * (hi - lo);
            f1 = f(x1)?;
        } else {
            lo = x1;
            x1 = x2;
            f1 = f2;
            x2 = hi - GOLDEN * (hi - lo);
            f2 = f(x2)?;
        }
    }
    Ok(0.5 * (lo + hi))
}

/// Locates playing frequencies of one fingering by treating the
/// instrument calculator as a frequency → impedance oracle.
///
/// Target functions are not assumed monotonic; every search starts with
/// an outward bracket hunt and reports a typed
/// [`Error::NoPlayingRange`] when no sign change exists within the
/// search bound.
pub struct PlayingRange<'a> {
    calculator: &'a InstrumentCalculator,
    fingering: &'a Fingering,
}

impl<'a> PlayingRange<'a> {
    pub fn new(
        calculator: &'a InstrumentCalculator,
        fingering: &'a Fingering,
    ) -> Result<Self, Error> {
        if fingering.open_holes.len() != calculator.num_holes() {
            return Err(Error::FingeringMismatch {
                expected: calculator.num_holes(),
                got: fingering.open_holes.len(),
            });
        }
        Ok(Self {
            calculator,
            fingering,
        })
    }

    /// Reactance Im(Z) at `f`; a playing frequency is one of its zeros.
    pub fn reactance(&self, frequency: f64) -> Result<f64, Error> {
        Ok(self.calculator.impedance(frequency, self.fingering)?.im)
    }

    /// Loop gain minus the sustain threshold.
    pub fn gain_margin(&self, frequency: f64) -> Result<f64, Error> {
        Ok(self.calculator.gain(frequency, self.fingering)? - MINIMUM_GAIN)
    }

    /// Im(Z)/Re(Z); its local minima bound playable ranges from below.
    pub fn impedance_ratio(&self, frequency: f64) -> Result<f64, Error> {
        let z = self.calculator.impedance(frequency, self.fingering)?;
        Ok(z.im / z.re)
    }

    /// Highest usable frequency of the range nearest `near`: the
    /// reactance zero found by bracketing and Brent refinement.
    pub fn find_fmax(&self, near: f64) -> Result<f64, Error> {
        self.find_zero_near(near, |f| self.reactance(f))
    }

    /// Frequency near `near` where Im(Z)/Re(Z) equals `target`.
    pub fn find_ratio(&self, near: f64, target: f64) -> Result<f64, Error> {
        self.find_zero_near(near, |f| Ok(self.impedance_ratio(f)? - target))
    }

    /// Frequency near `near` where the loop gain crosses the sustain
    /// threshold.
    pub fn find_gain_threshold(&self, near: f64) -> Result<f64, Error> {
        self.find_zero_near(near, |f| self.gain_margin(f))
    }

    /// Lowest usable frequency of the range topped by `fmax`.
    ///
    /// Steps downward while the gain stays above threshold and
    /// Im(Z)/Re(Z) keeps decreasing. The floor is the greater of the
    /// gain-threshold crossing (Brent) and the local minimum of the
    /// impedance ratio (golden-section): losing sustaining gain or
    /// bottoming out the ratio both end the playable range.
    pub fn find_fmin(&self, fmax: f64) -> Result<f64, Error> {
        let floor = fmax / SEARCH_BOUND_RATIO;
        let has_gain_model = self.calculator.has_gain_model();

        let mut f_prev = fmax;
        let mut f_prev2 = fmax;
        let mut ratio_prev = self.impedance_ratio(fmax)?;
        let mut gain_fell = false;
        let mut ratio_rose = false;
        let mut f = fmax;
        while f > floor {
            f /= GRANULARITY;
            if has_gain_model && self.gain_margin(f)? < 0.0 {
                gain_fell = true;
                break;
            }
            let ratio = self.impedance_ratio(f)?;
            if ratio >= ratio_prev {
                ratio_rose = true;
                break;
            }
            ratio_prev = ratio;
            f_prev2 = f_prev;
            f_prev = f;
        }

        let tolerance = FREQUENCY_PRECISION * fmax;
        let mut fmin: Option<f64> = None;
        if gain_fell {
            let root = brent_root(&mut |x| self.gain_margin(x), f, f_prev, tolerance)
                .map_err(|_| Error::NoPlayingRange { near: fmax })?;
            fmin = Some(root);
        }
        if ratio_rose {
            let minimum =
                golden_minimum(&mut |x| self.impedance_ratio(x), f, f_prev2, tolerance)?;
            fmin = Some(match fmin {
                Some(g) => g.max(minimum),
                None => minimum,
            });
        }
        // Neither criterion fired before the octave bound: the range
        // floor is the bound itself.
        Ok(fmin.unwrap_or(floor).min(fmax))
    }

    /// Full playing range around `near`: `(fmin, fmax)`.
    pub fn find_playing_range(&self, near: f64) -> Result<(f64, f64), Error> {
        let fmax = self.find_fmax(near)?;
        let fmin = self.find_fmin(fmax)?;
        Ok((fmin, fmax))
    }

    fn find_zero_near<F>(&self, near: f64, mut f: F) -> Result<f64, Error>
    where
        F: FnMut(f64) -> Result<f64, Error>,
    {
        let (lo, hi) = self.find_bracket(near, &mut f)?;
        debug!("bracket near {near:.2} Hz: [{lo:.2}, {hi:.2}]");
        brent_root(&mut f, lo, hi, FREQUENCY_PRECISION * near)
            .map_err(|_| Error::NoPlayingRange { near })
    }

    /// Step outward from `near` in `GRANULARITY` increments until the
    /// target changes sign. A bracket within `PREFERRED_BOUND_RATIO` of
    /// the start wins immediately; otherwise both directions are
    /// searched out to `SEARCH_BOUND_RATIO` and the bracket closest to
    /// the start is taken.
    fn find_bracket<F>(&self, near: f64, f: &mut F) -> Result<(f64, f64), Error>
    where
        F: FnMut(f64) -> Result<f64, Error>,
    {
        let f_near = f(near)?;
        if f_near == 0.0 {
            return Ok((near / GRANULARITY, near * GRANULARITY));
        }

        let preferred_up = search_direction(f, near, f_near, true, PREFERRED_BOUND_RATIO)?;
        let preferred_down = search_direction(f, near, f_near, false, PREFERRED_BOUND_RATIO)?;
        if let Some(bracket) = closest_bracket(near, preferred_up, preferred_down) {
            return Ok(bracket);
        }

        let full_up = search_direction(f, near, f_near, true, SEARCH_BOUND_RATIO)?;
        let full_down = search_direction(f, near, f_near, false, SEARCH_BOUND_RATIO)?;
        closest_bracket(near, full_up, full_down).ok_or(Error::NoPlayingRange { near })
    }
}

/// Walk in one direction until a sign change or the bound; returns the
/// bracketing pair ordered low → high.
fn search_direction<F>(
    f: &mut F,
    near: f64,
    f_near: f64,
    upward: bool,
    bound_ratio: f64,
) -> Result<Option<(f64, f64)>, Error>
where
    F: FnMut(f64) -> Result<f64, Error>,
{
    let bound = if upward {
        near * bound_ratio
    } else {
        near / bound_ratio
    };
    let mut prev = near;
    let mut f_prev = f_near;
    loop {
        let x = if upward {
            prev * GRANULARITY
        } else {
            prev / GRANULARITY
        };
        if (upward && x > bound) || (!upward && x < bound) {
            return Ok(None);
        }
        let fx = f(x)?;
        if fx == 0.0 || (fx > 0.0) != (f_prev > 0.0) {
            return Ok(Some(if upward { (prev, x) } else { (x, prev) }));
        }
        prev = x;
        f_prev = fx;
    }
}

/// Of two candidate brackets, the one whose far edge is closest to the
/// start frequency (ratio-wise).
fn closest_bracket(
    near: f64,
    up: Option<(f64, f64)>,
    down: Option<(f64, f64)>,
) -> Option<(f64, f64)> {
    match (up, down) {
        (Some(u), Some(d)) => {
            let up_ratio = u.1 / near;
            let down_ratio = near / d.0;
            Some(if up_ratio <= down_ratio { u } else { d })
        }
        (Some(u), None) => Some(u),
        (None, Some(d)) => Some(d),
        (None, None) => None,
    }
}
