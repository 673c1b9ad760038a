use num_complex::Complex64;

use crate::geometry::Fingering;
use crate::instrument::InstrumentCalculator;
use crate::Error;

/// Impedance and reflectance of one fingering over a scanned frequency
/// grid, with the local extrema of |Z| picked out for diagnostics.
#[derive(Debug, Clone)]
pub struct ImpedanceSpectrum {
    /// Frequency grid in Hz (length `n`).
    pub frequencies: Vec<f64>,
    /// Complex input impedance at each grid point.
    pub impedance: Vec<Complex64>,
    /// Complex reflection coefficient at each grid point.
    pub reflectance: Vec<Complex64>,
    /// Frequencies of local minima of |Z|, by three-point comparison.
    pub minima: Vec<f64>,
    /// Frequencies of local maxima of |Z|.
    pub maxima: Vec<f64>,
}

impl ImpedanceSpectrum {
    /// Scan `n` evenly spaced frequencies across `[f_low, f_high]`.
    pub fn scan(
        calculator: &InstrumentCalculator,
        fingering: &Fingering,
        f_low: f64,
        f_high: f64,
        n: usize,
    ) -> Result<Self, Error> {
        if n < 2 || f_high <= f_low {
            return Err(Error::InvalidScanRange { f_low, f_high, n });
        }
        let step = (f_high - f_low) / (n - 1) as f64;

        let mut frequencies = Vec::with_capacity(n);
        let mut impedance = Vec::with_capacity(n);
        let mut reflectance = Vec::with_capacity(n);
        for i in 0..n {
            let f = f_low + i as f64 * step;
            frequencies.push(f);
            impedance.push(calculator.impedance(f, fingering)?);
            reflectance.push(calculator.reflectance(f, fingering)?);
        }

        let magnitude: Vec<f64> = impedance.iter().map(|z| z.norm()).collect();
        let mut minima = Vec::new();
        let mut maxima = Vec::new();
        for i in 1..n - 1 {
            if magnitude[i] < magnitude[i - 1] && magnitude[i] < magnitude[i + 1] {
                minima.push(frequencies[i]);
            } else if magnitude[i] > magnitude[i - 1] && magnitude[i] > magnitude[i + 1] {
                maxima.push(frequencies[i]);
            }
        }

        Ok(Self {
            frequencies,
            impedance,
            reflectance,
            minima,
            maxima,
        })
    }
}
