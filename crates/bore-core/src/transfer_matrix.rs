use num_complex::Complex64;

use crate::state_vector::StateVector;

/// A 2×2 complex transfer matrix representing an acoustic component.
///
/// ```text
/// [P_src]   [pp  pu] [P_load]
/// [U_src] = [up  uu] [U_load]
/// ```
///
/// The matrix maps the (pressure, volume-flow) state on the termination
/// side of a component to the state on the mouthpiece side, so a chain is
/// cascaded by walking components termination → mouthpiece and multiplying
/// on the left. Composition is non-commutative.
#[derive(Debug, Clone, Copy)]
pub struct TransferMatrix {
    pub pp: Complex64,
    pub pu: Complex64,
    pub up: Complex64,
    pub uu: Complex64,
}

/// Matrix product `a · b`. `a.multiply(&b)` delegates here, so the
/// method and the free function agree bit-for-bit.
pub fn multiply(a: &TransferMatrix, b: &TransferMatrix) -> TransferMatrix {
    TransferMatrix {
        pp: a.pp * b.pp + a.pu * b.up,
        pu: a.pp * b.pu + a.pu * b.uu,
        up: a.up * b.pp + a.uu * b.up,
        uu: a.up * b.pu + a.uu * b.uu,
    }
}

impl TransferMatrix {
    pub fn new(pp: Complex64, pu: Complex64, up: Complex64, uu: Complex64) -> Self {
        Self { pp, pu, up, uu }
    }

    /// Identity matrix (no-op component).
    pub fn identity() -> Self {
        Self {
            pp: Complex64::new(1.0, 0.0),
            pu: Complex64::new(0.0, 0.0),
            up: Complex64::new(0.0, 0.0),
            uu: Complex64::new(1.0, 0.0),
        }
    }

    /// Matrix product `self · other`.
    pub fn multiply(&self, other: &TransferMatrix) -> TransferMatrix {
        multiply(self, other)
    }

    /// Determinant `pp·uu − pu·up`. For a lossless or viscothermally
    /// damped passive segment this is 1 (reciprocity).
    pub fn determinant(&self) -> Complex64 {
        self.pp * self.uu - self.pu * self.up
    }

    /// Inverse via adjugate over determinant. A near-singular matrix
    /// yields large-magnitude coefficients rather than a panic.
    pub fn inverse(&self) -> TransferMatrix {
        let det = self.determinant();
        TransferMatrix {
            pp: self.uu / det,
            pu: -self.pu / det,
            up: -self.up / det,
            uu: self.pp / det,
        }
    }

    /// Apply this matrix to a state vector: `[P;U] ← M·[P;U]`.
    pub fn apply(&self, sv: &StateVector) -> StateVector {
        StateVector::new(
            self.pp * sv.p + self.pu * sv.u,
            self.up * sv.p + self.uu * sv.u,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TransferMatrix {
        TransferMatrix::new(
            Complex64::new(1.0, 0.5),
            Complex64::new(0.0, 1.0),
            Complex64::new(0.0, -1.0),
            Complex64::new(1.0, 0.5),
        )
    }

    fn other() -> TransferMatrix {
        TransferMatrix::new(
            Complex64::new(0.3, -0.2),
            Complex64::new(2.0, 0.0),
            Complex64::new(0.1, 0.1),
            Complex64::new(-0.5, 1.0),
        )
    }

    fn assert_matrix_eq(a: &TransferMatrix, b: &TransferMatrix, tol: f64) {
        assert!((a.pp - b.pp).norm() < tol, "pp: {} vs {}", a.pp, b.pp);
        assert!((a.pu - b.pu).norm() < tol, "pu: {} vs {}", a.pu, b.pu);
        assert!((a.up - b.up).norm() < tol, "up: {} vs {}", a.up, b.up);
        assert!((a.uu - b.uu).norm() < tol, "uu: {} vs {}", a.uu, b.uu);
    }

    #[test]
    fn test_identity_multiply() {
        let id = TransferMatrix::identity();
        let m = sample();
        assert_matrix_eq(&id.multiply(&m), &m, 1e-15);
        assert_matrix_eq(&m.multiply(&id), &m, 1e-15);
    }

    #[test]
    fn test_method_and_free_function_agree() {
        let (a, b) = (sample(), other());
        let m = a.multiply(&b);
        let f = multiply(&a, &b);
        assert_eq!(m.pp, f.pp);
        assert_eq!(m.pu, f.pu);
        assert_eq!(m.up, f.up);
        assert_eq!(m.uu, f.uu);
    }

    #[test]
    fn test_composition_associative_not_commutative() {
        let (a, b) = (sample(), other());
        let c = TransferMatrix::new(
            Complex64::new(0.0, 2.0),
            Complex64::new(1.0, 1.0),
            Complex64::new(-1.0, 0.0),
            Complex64::new(0.5, 0.0),
        );
        let left = a.multiply(&b).multiply(&c);
        let right = a.multiply(&b.multiply(&c));
        assert_matrix_eq(&left, &right, 1e-12);

        let ab = a.multiply(&b);
        let ba = b.multiply(&a);
        assert!(
            (ab.pp - ba.pp).norm() > 1e-6 || (ab.pu - ba.pu).norm() > 1e-6,
            "A·B should differ from B·A for generic matrices"
        );
    }

    #[test]
    fn test_inverse_roundtrip() {
        let m = other();
        let prod = m.multiply(&m.inverse());
        assert_matrix_eq(&prod, &TransferMatrix::identity(), 1e-12);
    }

    #[test]
    fn test_chained_apply_equals_product_apply() {
        let (a, b) = (sample(), other());
        let sv = StateVector::new(Complex64::new(0.7, -0.3), Complex64::new(1.1, 0.4));
        let sequential = a.apply(&b.apply(&sv));
        let combined = a.multiply(&b).apply(&sv);
        assert!((sequential.p - combined.p).norm() < 1e-12);
        assert!((sequential.u - combined.u).norm() < 1e-12);
    }
}
