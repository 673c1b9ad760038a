use num_complex::Complex64;
use std::f64::consts::PI;

use crate::physics::PhysicalParameters;
use crate::transfer_matrix::TransferMatrix;

/// Shortest cone the cone formula will accept, in metres. The series
/// term of the cone matrix carries a 1/L factor, so a vanishingly short
/// cone is clamped to this floor instead of dividing by zero.
pub const MINIMUM_CONE_LENGTH: f64 = 1.0e-7;

/// Relative radius difference below which a cone is treated as a
/// cylinder.
const CYLINDER_RADIUS_TOLERANCE: f64 = 1.0e-9;

/// Transfer matrix of a cylindrical bore section with viscothermal
/// losses:
///
/// ```text
/// M = [ cosh(γL)      Zc·sinh(γL) ]      γ = k·(ε + j(1+ε))
///     [ sinh(γL)/Zc   cosh(γL)    ]      ε = α/(r·√k)
/// ```
///
/// where α is the air's boundary-layer loss coefficient. det(M) is
/// identically 1 (cosh² − sinh²), losses included.
pub fn cylinder_matrix(
    wave_number: f64,
    length: f64,
    radius: f64,
    params: &PhysicalParameters,
) -> TransferMatrix {
    let z_c = params.z0(radius);
    let epsilon = params.alpha_constant() / (radius * wave_number.sqrt());
    let gamma_l = Complex64::new(epsilon, 1.0 + epsilon) * (wave_number * length);
    let cosh = gamma_l.cosh();
    let sinh = gamma_l.sinh();
    TransferMatrix::new(cosh, sinh * z_c, sinh / z_c, cosh)
}

/// Transfer matrix of a conical bore section (Lefebvre–Kergomard),
/// mapping the state at the load (termination-side) plane to the source
/// (mouthpiece-side) plane.
///
/// Spherical-wave solution with a mean complex wavenumber: the loss
/// term uses the average of 1/r along the taper,
/// `ln(r_load/r_source)/(r_load − r_source)`, so the formula
/// degenerates exactly to the cylinder one when the radii are equal.
pub fn cone_matrix(
    wave_number: f64,
    length: f64,
    source_radius: f64,
    load_radius: f64,
    params: &PhysicalParameters,
) -> TransferMatrix {
    let delta_r = load_radius - source_radius;
    if delta_r.abs() <= CYLINDER_RADIUS_TOLERANCE * source_radius {
        return cylinder_matrix(wave_number, length, source_radius, params);
    }
    let length = length.max(MINIMUM_CONE_LENGTH);

    // Mean loss term along the cone and the resulting complex wavenumber.
    let mean_inv_radius = (load_radius / source_radius).ln() / delta_r;
    let epsilon = params.alpha_constant() * mean_inv_radius / wave_number.sqrt();
    let k_mean = Complex64::new(1.0 + epsilon, -epsilon) * wave_number;

    // Distances from the cone apex to the source and load planes
    // (signed; both negative for a converging cone).
    let x_source = length * source_radius / delta_r;
    let x_load = length * load_radius / delta_r;

    let kl = k_mean * length;
    let cos_kl = kl.cos();
    let sin_kl = kl.sin();
    let kx_source = k_mean * x_source;
    let kx_load = k_mean * x_load;

    let rho_c = params.rho() * params.speed_of_sound();
    let j = Complex64::new(0.0, 1.0);

    let pp = (x_load / x_source) * cos_kl - sin_kl / kx_source;
    let pu = j * (rho_c / (PI * source_radius * load_radius)) * sin_kl;
    let up = j / rho_c
        * (PI * source_radius * load_radius
            * (Complex64::new(1.0, 0.0) + (kx_source * kx_load).inv())
            * sin_kl
            - (PI * delta_r * delta_r) * cos_kl / kl);
    let uu = (x_source / x_load) * cos_kl + sin_kl / kx_load;

    TransferMatrix::new(pp, pu, up, uu)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cylinder_determinant_is_unity() {
        let params = PhysicalParameters::default();
        for freq in [100.0, 440.0, 2000.0] {
            let k = params.wave_number(freq);
            let m = cylinder_matrix(k, 0.3, 0.01, &params);
            let det = m.determinant();
            assert!(
                (det - Complex64::new(1.0, 0.0)).norm() < 1e-12,
                "det = {det} at {freq} Hz"
            );
        }
    }

    #[test]
    fn test_cone_determinant_is_unity() {
        let params = PhysicalParameters::default();
        for freq in [100.0, 440.0, 2000.0] {
            let k = params.wave_number(freq);
            let m = cone_matrix(k, 0.2, 0.008, 0.012, &params);
            let det = m.determinant();
            assert!(
                (det - Complex64::new(1.0, 0.0)).norm() < 1e-9,
                "det = {det} at {freq} Hz"
            );
        }
    }

    #[test]
    fn test_cone_with_equal_radii_degenerates_to_cylinder() {
        let params = PhysicalParameters::default();
        let k = params.wave_number(440.0);
        let cyl = cylinder_matrix(k, 0.25, 0.007, &params);
        let cone = cone_matrix(k, 0.25, 0.007, 0.007, &params);
        assert_eq!(cone.pp, cyl.pp);
        assert_eq!(cone.pu, cyl.pu);
        assert_eq!(cone.up, cyl.up);
        assert_eq!(cone.uu, cyl.uu);
    }

    #[test]
    fn test_cone_near_equal_radii_is_continuous_with_cylinder() {
        let params = PhysicalParameters::default();
        let k = params.wave_number(440.0);
        let cyl = cylinder_matrix(k, 0.25, 0.007, &params);
        let cone = cone_matrix(k, 0.25, 0.007, 0.007 * (1.0 + 1e-6), &params);
        assert!((cone.pp - cyl.pp).norm() < 1e-4, "pp: {} vs {}", cone.pp, cyl.pp);
        assert!((cone.uu - cyl.uu).norm() < 1e-4, "uu: {} vs {}", cone.uu, cyl.uu);
    }

    #[test]
    fn test_cylinder_is_symmetric_cone_is_not() {
        let params = PhysicalParameters::default();
        let k = params.wave_number(440.0);
        let cyl = cylinder_matrix(k, 0.3, 0.01, &params);
        assert!((cyl.pp - cyl.uu).norm() < 1e-15, "cylinder has PP == UU");
        let cone = cone_matrix(k, 0.2, 0.008, 0.012, &params);
        assert!(
            (cone.pp - cone.uu).norm() > 1e-3,
            "a cone is not symmetric end to end"
        );
    }

    #[test]
    fn test_zero_length_cone_is_clamped_not_nan() {
        let params = PhysicalParameters::default();
        let k = params.wave_number(440.0);
        let m = cone_matrix(k, 0.0, 0.008, 0.012, &params);
        assert!(m.pp.norm().is_finite());
        assert!(m.pu.norm().is_finite());
        assert!(m.up.norm().is_finite());
        assert!(m.uu.norm().is_finite());
    }

    #[test]
    fn test_converging_cone_determinant_is_unity() {
        let params = PhysicalParameters::default();
        let k = params.wave_number(300.0);
        let m = cone_matrix(k, 0.15, 0.012, 0.006, &params);
        let det = m.determinant();
        assert!(
            (det - Complex64::new(1.0, 0.0)).norm() < 1e-9,
            "det = {det} for a converging cone"
        );
    }

    #[test]
    fn test_half_wave_cylinder_approaches_identity() {
        // At kL = π a lossless cylinder is −I; with small viscothermal
        // losses cosh(γL) should still be close to −1.
        let params = PhysicalParameters::default();
        let length = 0.3;
        let freq = params.speed_of_sound() / (2.0 * length);
        let k = params.wave_number(freq);
        let m = cylinder_matrix(k, length, 0.01, &params);
        assert!(
            (m.pp + Complex64::new(1.0, 0.0)).norm() < 0.05,
            "PP = {} at the half-wave frequency",
            m.pp
        );
    }
}
