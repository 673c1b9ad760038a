use num_complex::Complex64;

use crate::transfer_matrix::TransferMatrix;

/// A (pressure, volume-flow) pair at one point in the bore.
///
/// The impedance at that point is `P/U`; an ideal open end is `(0, 1)`
/// and an ideal closed end is `(1, 0)`.
#[derive(Debug, Clone, Copy)]
pub struct StateVector {
    pub p: Complex64,
    pub u: Complex64,
}

impl StateVector {
    pub fn new(p: Complex64, u: Complex64) -> Self {
        Self { p, u }
    }

    /// Ideal open end: zero pressure, unit flow.
    pub fn open_end() -> Self {
        Self {
            p: Complex64::new(0.0, 0.0),
            u: Complex64::new(1.0, 0.0),
        }
    }

    /// Ideal closed end: unit pressure, zero flow.
    pub fn closed_end() -> Self {
        Self {
            p: Complex64::new(1.0, 0.0),
            u: Complex64::new(0.0, 0.0),
        }
    }

    /// State with a given impedance, using the form `P = Z/(1+Z)`,
    /// `U = 1/(1+Z)`, which stays finite as `Z → ±∞` (both limits map
    /// to the closed-end state).
    pub fn from_impedance(z: Complex64) -> Self {
        if z.re.is_infinite() || z.im.is_infinite() {
            return Self::closed_end();
        }
        let denom = Complex64::new(1.0, 0.0) + z;
        Self {
            p: z / denom,
            u: Complex64::new(1.0, 0.0) / denom,
        }
    }

    /// Impedance `Z = P/U`.
    pub fn impedance(&self) -> Complex64 {
        self.p / self.u
    }

    /// Admittance `Y = U/P`.
    pub fn admittance(&self) -> Complex64 {
        self.u / self.p
    }

    /// Reflection coefficient relative to a characteristic impedance:
    /// `(P − U·Z0)/(P + U·Z0)`.
    pub fn reflectance(&self, z0: f64) -> Complex64 {
        let uz = self.u * z0;
        (self.p - uz) / (self.p + uz)
    }

    /// Series combination: impedances add, `Z = Z_a + Z_b`, computed
    /// without forming either impedance:
    /// `P' = P_a·U_b + P_b·U_a`, `U' = U_a·U_b`.
    pub fn series(&self, other: &StateVector) -> StateVector {
        StateVector {
            p: self.p * other.u + other.p * self.u,
            u: self.u * other.u,
        }
    }

    /// Parallel combination: admittances add (the dual of `series`):
    /// `U' = P_a·U_b + P_b·U_a`, `P' = P_a·P_b`.
    pub fn parallel(&self, other: &StateVector) -> StateVector {
        StateVector {
            p: self.p * other.p,
            u: self.p * other.u + other.p * self.u,
        }
    }

    /// Apply a transfer matrix: `[P;U] ← M·[P;U]`.
    pub fn apply(&self, m: &TransferMatrix) -> StateVector {
        m.apply(self)
    }
}
