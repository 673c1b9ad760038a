use std::f64::consts::PI;

/// Universal gas constant, J/(mol·K).
const GAS_CONSTANT: f64 = 8.31446;
/// Molar mass of dry air, kg/mol.
const MOLAR_MASS_DRY_AIR: f64 = 0.028964;
/// Molar mass of water vapour, kg/mol.
const MOLAR_MASS_WATER: f64 = 0.018016;
/// Ratio of specific heats for air. Treated as constant over the
/// humidity range of interest.
const GAMMA: f64 = 1.402;
/// Prandtl number of air.
const PRANDTL: f64 = 0.710;

/// Derived air properties for the transmission-line model.
///
/// Constructed once from temperature, pressure, and relative humidity;
/// every derived quantity is computed at construction so the query
/// methods are trivially cheap inside the frequency sweep.
#[derive(Debug, Clone)]
pub struct PhysicalParameters {
    temperature: f64,
    pressure: f64,
    humidity: f64,
    speed_of_sound: f64,
    rho: f64,
    alpha_constant: f64,
}

impl PhysicalParameters {
    /// Build from temperature in °C, static pressure in Pa, and
    /// relative humidity in percent.
    pub fn new(temperature_c: f64, pressure_pa: f64, humidity_percent: f64) -> Self {
        let t_kelvin = temperature_c + 273.15;

        // Magnus formula for saturation vapour pressure, then the molar
        // fraction of water vapour in the mixture.
        let p_sat = 610.78 * (17.27 * temperature_c / (temperature_c + 237.3)).exp();
        let x_v = ((humidity_percent / 100.0) * p_sat / pressure_pa).clamp(0.0, 1.0);

        let molar_mass = MOLAR_MASS_DRY_AIR * (1.0 - x_v) + MOLAR_MASS_WATER * x_v;
        let rho = pressure_pa * molar_mass / (GAS_CONSTANT * t_kelvin);
        let speed_of_sound = (GAMMA * GAS_CONSTANT * t_kelvin / molar_mass).sqrt();

        // Sutherland's formula for the dynamic viscosity of air.
        let eta = 1.458e-6 * t_kelvin.powf(1.5) / (t_kelvin + 110.4);

        // Viscothermal loss coefficient: the boundary-layer loss term in
        // a tube of radius r at wave number k is
        //   ε = alpha_constant / (r·√k).
        let alpha_constant =
            (eta / (2.0 * rho * speed_of_sound)).sqrt() * (1.0 + (GAMMA - 1.0) / PRANDTL.sqrt());

        Self {
            temperature: temperature_c,
            pressure: pressure_pa,
            humidity: humidity_percent,
            speed_of_sound,
            rho,
            alpha_constant,
        }
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn pressure(&self) -> f64 {
        self.pressure
    }

    pub fn humidity(&self) -> f64 {
        self.humidity
    }

    /// Speed of sound in m/s.
    pub fn speed_of_sound(&self) -> f64 {
        self.speed_of_sound
    }

    /// Air density in kg/m³.
    pub fn rho(&self) -> f64 {
        self.rho
    }

    /// Ratio of specific heats.
    pub fn gamma(&self) -> f64 {
        GAMMA
    }

    /// Wave number `k = 2πf/c` for a frequency in Hz.
    pub fn wave_number(&self, frequency: f64) -> f64 {
        2.0 * PI * frequency / self.speed_of_sound
    }

    /// Frequency in Hz for a wave number, the inverse of `wave_number`.
    pub fn frequency(&self, wave_number: f64) -> f64 {
        wave_number * self.speed_of_sound / (2.0 * PI)
    }

    /// Characteristic impedance `Z0 = ρc/(πr²)` of a tube of radius r.
    pub fn z0(&self, radius: f64) -> f64 {
        self.rho * self.speed_of_sound / (PI * radius * radius)
    }

    /// Coefficient of the viscothermal loss term (see `new`).
    pub fn alpha_constant(&self) -> f64 {
        self.alpha_constant
    }
}

impl Default for PhysicalParameters {
    /// Room conditions: 20 °C, 101325 Pa, 45 % relative humidity.
    fn default() -> Self {
        Self::new(20.0, 101325.0, 45.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_conditions() {
        let params = PhysicalParameters::default();
        let c = params.speed_of_sound();
        let rho = params.rho();
        assert!((c - 344.0).abs() < 1.0, "c = {c}");
        assert!((rho - 1.199).abs() < 0.01, "rho = {rho}");
    }

    #[test]
    fn test_humidity_raises_speed_of_sound() {
        let dry = PhysicalParameters::new(20.0, 101325.0, 0.0);
        let humid = PhysicalParameters::new(20.0, 101325.0, 100.0);
        assert!(
            humid.speed_of_sound() > dry.speed_of_sound(),
            "humid air is lighter, so sound travels faster"
        );
        assert!(humid.rho() < dry.rho());
    }

    #[test]
    fn test_wave_number_frequency_inverse() {
        let params = PhysicalParameters::default();
        let f = 440.0;
        let k = params.wave_number(f);
        assert!((params.frequency(k) - f).abs() < 1e-9);
    }

    #[test]
    fn test_z0_scales_inverse_square_of_radius() {
        let params = PhysicalParameters::default();
        let z_small = params.z0(0.005);
        let z_large = params.z0(0.010);
        assert!((z_small / z_large - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_alpha_constant_magnitude() {
        // Boundary-layer loss coefficient for air is of order 1e-4 in SI
        // units; a wildly different value indicates a units error.
        let params = PhysicalParameters::default();
        let alpha = params.alpha_constant();
        assert!(alpha > 1e-5 && alpha < 1e-3, "alpha = {alpha}");
    }
}
