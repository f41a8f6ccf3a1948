//! ATP: Ablation Thermal Profile.
//!
//! Integrates a single-body entry model with fixed-step RK4 from the top of the
//! atmosphere. State is `[altitude m, velocity m/s, mass kg, surface T K]`:
//!
//! ```text
//! ρ_a(h) = ρ₀·exp(-h/H)
//! q      = ½·C_H·ρ_a·v³
//! dh/dt  = -v·sinθ
//! dv/dt  = -½·C_D·ρ_a·A·v²/m + g·sinθ
//! p_v(T) = p_atm·exp(Q*·μ/R·(1/T_b - 1/T))
//! ṁ      = p_v(T)·√(μ / 2πRT)
//! dm/dt  = -A·ṁ
//! dT/dt  = (q - σεT⁴ - k·(T - T_int)/δ - Q*·ṁ) / (ρ_m·c_p·δ)
//! ```
//!
//! Evaporation carries away `Q*` per kilogram, so the surface settles where the
//! vapour flux balances the incoming heat and peak temperature grows with the
//! logarithm of `q`. The sink is stiff near that balance; each step is split
//! into enough RK4 substeps to keep the temperature update stable. The surface
//! temperature is still capped at the material's vapour-limited ceiling.
//! Integration stops on breakup (`ρ_a·v² ≥ strength`), ground impact, dark
//! flight or complete ablation.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{DerivedQuantity, EntryParameters, Parameter, ParameterScore};
use crate::error::{AppError, Result};
use crate::math::rk4_step;
use crate::reference::Material;

const STEFAN_BOLTZMANN: f64 = 5.670_374e-8;
const GRAVITY: f64 = 9.81;
const KELVIN_OFFSET: f64 = 273.15;
const JOULES_PER_KILOTON: f64 = 4.184e12;
const SILICATE_DIFFUSIVITY: f64 = 1.0e-6;

pub const PEAK_TEMPERATURE_PRECISION_K: f64 = 180.0;

const MAX_SUBSTEPS: usize = 4096;
const SUBSTEP_STABILITY: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtpConfig {
    pub heat_transfer_coefficient: f64,
    pub drag_coefficient: f64,
    pub start_altitude_km: f64,
    pub scale_height_km: f64,
    pub sea_level_density: f64,
    /// Interior temperature of the body (K).
    pub interior_temperature_k: f64,
    /// Depth of the heated surface layer (m).
    pub thermal_skin_depth_m: f64,
    pub time_step_s: f64,
    pub max_steps: usize,
    pub dark_flight_velocity_km_s: f64,
    /// Record one time-series sample every N steps; 0 disables the series.
    pub series_interval: usize,
}

impl Default for AtpConfig {
    fn default() -> Self {
        Self {
            heat_transfer_coefficient: 0.15,
            drag_coefficient: 1.0,
            start_altitude_km: 120.0,
            scale_height_km: 7.16,
            sea_level_density: 1.225,
            interior_temperature_k: 250.0,
            thermal_skin_depth_m: 0.002,
            time_step_s: 0.01,
            max_steps: 200_000,
            dark_flight_velocity_km_s: 3.0,
            series_interval: 10,
        }
    }
}

impl AtpConfig {
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("heat_transfer_coefficient", self.heat_transfer_coefficient),
            ("drag_coefficient", self.drag_coefficient),
            ("start_altitude_km", self.start_altitude_km),
            ("scale_height_km", self.scale_height_km),
            ("sea_level_density", self.sea_level_density),
            ("interior_temperature_k", self.interior_temperature_k),
            ("thermal_skin_depth_m", self.thermal_skin_depth_m),
            ("time_step_s", self.time_step_s),
            ("dark_flight_velocity_km_s", self.dark_flight_velocity_km_s),
        ];
        for (name, v) in checks {
            if !(v.is_finite() && v > 0.0) {
                return Err(AppError::config(format!("atp.{name} must be finite and > 0 (got {v}).")));
            }
        }
        if self.max_steps == 0 {
            return Err(AppError::config("atp.max_steps must be >= 1."));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Breakup,
    GroundImpact,
    DarkFlight,
    Ablated,
}

impl Termination {
    pub fn label(self) -> &'static str {
        match self {
            Termination::Breakup => "breakup",
            Termination::GroundImpact => "ground impact",
            Termination::DarkFlight => "dark flight",
            Termination::Ablated => "fully ablated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThermalRegime {
    SubMelting,
    Melting,
    Vaporizing,
}

impl ThermalRegime {
    pub fn from_celsius(c: f64) -> Self {
        if c < 1200.0 {
            ThermalRegime::SubMelting
        } else if c < 2500.0 {
            ThermalRegime::Melting
        } else {
            ThermalRegime::Vaporizing
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ThermalRegime::SubMelting => "sub-melting",
            ThermalRegime::Melting => "melting",
            ThermalRegime::Vaporizing => "vaporizing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Airburst {
    pub altitude_km: f64,
    pub energy_kt: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySample {
    pub time_s: f64,
    pub altitude_km: f64,
    pub velocity_km_s: f64,
    pub mass_kg: f64,
    pub surface_temperature_k: f64,
    pub heat_flux_mw_m2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtpResult {
    pub peak_temperature_k: f64,
    pub peak_temperature_c: f64,
    pub precision_k: f64,
    pub peak_heat_flux_mw_m2: f64,
    pub time_to_peak_s: f64,
    pub peak_altitude_km: f64,
    pub fusion_crust_mm: f64,
    pub regime: ThermalRegime,
    pub termination: Termination,
    pub termination_altitude_km: f64,
    pub airburst: Option<Airburst>,
    pub final_mass_kg: f64,
    pub series: Vec<TrajectorySample>,
}

impl AtpResult {
    pub fn to_score(&self) -> ParameterScore {
        ParameterScore::new(Parameter::Atp, self.peak_temperature_c, self.regime.label()).with_derived(
            DerivedQuantity::PeakSurfaceTemperature {
                celsius: self.peak_temperature_c,
            },
        )
    }
}

/// Fusion crust thickness (mm) from the thermal skin depth reached by `heating_s`.
pub fn fusion_crust_thickness_mm(peak_temperature_k: f64, heating_s: f64) -> f64 {
    let skin_mm = if heating_s > 0.0 {
        (SILICATE_DIFFUSIVITY * heating_s).sqrt() * 1000.0
    } else {
        0.0
    };
    if peak_temperature_k > 3000.0 {
        (skin_mm * 1.5).min(2.0)
    } else {
        skin_mm.min(1.0)
    }
}

fn validate_entry(entry: &EntryParameters) -> Result<()> {
    let v = entry.velocity_km_s;
    if !(v.is_finite() && (11.0..=73.0).contains(&v)) {
        return Err(AppError::invalid(format!("Entry velocity must be within 11–73 km/s (got {v}).")));
    }
    let a = entry.angle_deg;
    if !(a.is_finite() && a > 0.0 && a <= 90.0) {
        return Err(AppError::invalid(format!("Entry angle must be within (0, 90] degrees (got {a}).")));
    }
    let d = entry.diameter_m;
    if !(d.is_finite() && d > 0.0) {
        return Err(AppError::invalid(format!("Diameter must be finite and > 0 (got {d}).")));
    }
    Ok(())
}

struct EntryModel {
    material: Material,
    sin_theta: f64,
    c_h: f64,
    c_d: f64,
    rho0: f64,
    scale_height_m: f64,
    t_interior: f64,
    skin: f64,
}

impl EntryModel {
    fn air_density(&self, h: f64) -> f64 {
        self.rho0 * (-h.max(0.0) / self.scale_height_m).exp()
    }

    fn cross_section(&self, m: f64) -> f64 {
        let r = (3.0 * m.max(0.0) / (4.0 * PI * self.material.density)).cbrt();
        PI * r * r
    }

    fn heat_flux(&self, h: f64, v: f64) -> f64 {
        0.5 * self.c_h * self.air_density(h) * v.powi(3)
    }

    fn derivatives(&self, s: &[f64; 4]) -> [f64; 4] {
        let [h, v, m, t] = *s;
        let rho = self.air_density(h);
        let area = self.cross_section(m);
        let mat = &self.material;

        let dh = -v * self.sin_theta;
        let dv = if m > 0.0 {
            -0.5 * self.c_d * rho * area * v * v / m + GRAVITY * self.sin_theta
        } else {
            0.0
        };

        let ceiling = mat.max_surface_temperature_k;
        let t_eff = t.clamp(1.0, ceiling);
        let flux = mat.evaporation_flux(t_eff);
        let dm = if m > 0.0 { -area * flux } else { 0.0 };

        let q = 0.5 * self.c_h * rho * v.powi(3);
        let net = q
            - STEFAN_BOLTZMANN * mat.emissivity * t_eff.powi(4)
            - mat.conductivity * (t_eff - self.t_interior) / self.skin
            - mat.heat_of_ablation * flux;
        let dt = if t_eff >= ceiling && net > 0.0 {
            0.0
        } else {
            net / (mat.density * mat.heat_capacity * self.skin)
        };

        [dh, dv, dm, dt]
    }

    /// Magnitude of `∂(dT/dt)/∂T` at the current surface temperature (1/s).
    fn thermal_stiffness(&self, t: f64) -> f64 {
        let mat = &self.material;
        let t = t.clamp(1.0, mat.max_surface_temperature_k);
        let d_sink = mat.heat_of_ablation * mat.evaporation_flux(t) * mat.vaporization_temperature() / (t * t);
        let d_rad = 4.0 * STEFAN_BOLTZMANN * mat.emissivity * t.powi(3);
        let d_cond = mat.conductivity / self.skin;
        (d_sink + d_rad + d_cond) / (mat.density * mat.heat_capacity * self.skin)
    }

    fn substeps(&self, t: f64, dt: f64) -> usize {
        let n = (self.thermal_stiffness(t) * dt / SUBSTEP_STABILITY).ceil();
        if n.is_finite() { (n as usize).clamp(1, MAX_SUBSTEPS) } else { MAX_SUBSTEPS }
    }
}

pub fn calculate_atp(entry: &EntryParameters, config: &AtpConfig) -> Result<AtpResult> {
    validate_entry(entry)?;

    let material = entry.composition.material();
    let model = EntryModel {
        material,
        sin_theta: entry.angle_deg.to_radians().sin(),
        c_h: config.heat_transfer_coefficient,
        c_d: config.drag_coefficient,
        rho0: config.sea_level_density,
        scale_height_m: config.scale_height_km * 1000.0,
        t_interior: config.interior_temperature_k,
        skin: config.thermal_skin_depth_m,
    };

    let radius = entry.diameter_m / 2.0;
    let initial_mass = material.density * 4.0 / 3.0 * PI * radius.powi(3);
    let dt = config.time_step_s;
    let dark_flight = config.dark_flight_velocity_km_s * 1000.0;

    let mut state = [
        config.start_altitude_km * 1000.0,
        entry.velocity_km_s * 1000.0,
        initial_mass,
        config.interior_temperature_k,
    ];
    let mut time = 0.0;
    let mut peak_t = state[3];
    let mut peak_time = 0.0;
    let mut peak_alt = state[0];
    let mut peak_flux = 0.0;
    let mut series = Vec::new();

    let sample = |time: f64, s: &[f64; 4], q: f64| TrajectorySample {
        time_s: time,
        altitude_km: s[0] / 1000.0,
        velocity_km_s: s[1] / 1000.0,
        mass_kg: s[2],
        surface_temperature_k: s[3],
        heat_flux_mw_m2: q / 1.0e6,
    };

    let mut termination = None;
    for step in 0..config.max_steps {
        if config.series_interval > 0 && step % config.series_interval == 0 {
            series.push(sample(time, &state, model.heat_flux(state[0], state[1])));
        }

        let n = model.substeps(state[3], dt);
        let h_sub = dt / n as f64;
        for i in 0..n {
            state = rk4_step(|_, s: &[f64; 4]| model.derivatives(s), time + i as f64 * h_sub, &state, h_sub);
            state[3] = state[3].clamp(0.0, material.max_surface_temperature_k);
        }
        time += dt;

        if state.iter().any(|v| !v.is_finite()) {
            return Err(AppError::numerical(format!("Entry integration diverged at t={time:.2} s.")));
        }

        let [h, v, m, t] = state;
        let q = model.heat_flux(h, v);
        if q > peak_flux {
            peak_flux = q;
        }
        if t > peak_t {
            peak_t = t;
            peak_time = time;
            peak_alt = h;
        }

        termination = if model.air_density(h) * v * v >= material.strength_pa {
            Some(Termination::Breakup)
        } else if h <= 0.0 {
            Some(Termination::GroundImpact)
        } else if v < dark_flight {
            Some(Termination::DarkFlight)
        } else if m <= initial_mass * 1.0e-6 {
            Some(Termination::Ablated)
        } else {
            None
        };
        if termination.is_some() {
            break;
        }
    }

    let Some(termination) = termination else {
        return Err(AppError::numerical(format!(
            "Entry integration did not terminate within {} steps.",
            config.max_steps
        )));
    };

    let [h, v, m, _] = state;
    if config.series_interval > 0 {
        series.push(sample(time, &state, model.heat_flux(h, v)));
    }
    let airburst = (termination == Termination::Breakup).then(|| Airburst {
        altitude_km: h / 1000.0,
        energy_kt: 0.5 * m * v * v / JOULES_PER_KILOTON,
    });

    let peak_c = peak_t - KELVIN_OFFSET;
    debug!(
        peak_k = peak_t,
        termination = termination.label(),
        altitude_km = h / 1000.0,
        steps = (time / dt).round(),
        "atp"
    );

    Ok(AtpResult {
        peak_temperature_k: peak_t,
        peak_temperature_c: peak_c,
        precision_k: PEAK_TEMPERATURE_PRECISION_K,
        peak_heat_flux_mw_m2: peak_flux / 1.0e6,
        time_to_peak_s: peak_time,
        peak_altitude_km: peak_alt / 1000.0,
        fusion_crust_mm: fusion_crust_thickness_mm(peak_t, peak_time),
        regime: ThermalRegime::from_celsius(peak_c),
        termination,
        termination_altitude_km: h.max(0.0) / 1000.0,
        airburst,
        final_mass_kg: m.max(0.0),
        series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::EntryComposition;

    fn entry(v: f64, angle: f64, d: f64, composition: EntryComposition) -> EntryParameters {
        EntryParameters {
            velocity_km_s: v,
            angle_deg: angle,
            diameter_m: d,
            composition,
        }
    }

    #[test]
    fn chelyabinsk_like_entry_breaks_up_hot() {
        let r = calculate_atp(&entry(18.6, 18.5, 19.0, EntryComposition::Stony), &AtpConfig::default()).unwrap();
        assert_eq!(r.termination, Termination::Breakup);
        let burst = r.airburst.unwrap();
        assert!(burst.altitude_km > 20.0 && burst.altitude_km < 60.0, "alt={}", burst.altitude_km);
        assert!(burst.energy_kt > 100.0, "energy={}", burst.energy_kt);
        assert!(r.peak_temperature_k <= 5100.0 + 1e-9);
        assert!(r.peak_temperature_c > 2500.0);
        assert_eq!(r.regime, ThermalRegime::Vaporizing);
        assert!(r.fusion_crust_mm > 0.0 && r.fusion_crust_mm <= 2.0);
    }

    #[test]
    fn peak_temperature_rises_with_velocity_below_ceiling() {
        let cfg = AtpConfig::default();
        let ceiling = EntryComposition::Stony.material().max_surface_temperature_k;
        let peaks: Vec<f64> = [12.0, 20.0, 35.0]
            .into_iter()
            .map(|v| {
                calculate_atp(&entry(v, 45.0, 1.0, EntryComposition::Stony), &cfg)
                    .unwrap()
                    .peak_temperature_k
            })
            .collect();
        for w in peaks.windows(2) {
            assert!(w[1] > w[0] + 50.0, "peaks {peaks:?}");
        }
        assert!(peaks.iter().all(|&t| t < ceiling - 500.0), "peaks {peaks:?}");
    }

    #[test]
    fn evaporation_holds_gentle_entries_well_below_ceiling() {
        let r = calculate_atp(&entry(11.5, 60.0, 0.3, EntryComposition::Stony), &AtpConfig::default()).unwrap();
        let ceiling = EntryComposition::Stony.material().max_surface_temperature_k;
        assert!(r.peak_temperature_k < ceiling - 1000.0, "peak={}", r.peak_temperature_k);
        assert!(r.peak_temperature_c > 1200.0, "peak={}", r.peak_temperature_c);
    }

    #[test]
    fn faster_entry_has_higher_peak_flux() {
        let cfg = AtpConfig::default();
        let slow = calculate_atp(&entry(15.0, 45.0, 1.0, EntryComposition::Stony), &cfg).unwrap();
        let fast = calculate_atp(&entry(30.0, 45.0, 1.0, EntryComposition::Stony), &cfg).unwrap();
        assert!(fast.peak_heat_flux_mw_m2 > slow.peak_heat_flux_mw_m2);
    }

    #[test]
    fn weak_material_breaks_up_higher() {
        let cfg = AtpConfig::default();
        let carb = calculate_atp(&entry(18.6, 30.0, 5.0, EntryComposition::Carbonaceous), &cfg).unwrap();
        let stony = calculate_atp(&entry(18.6, 30.0, 5.0, EntryComposition::Stony), &cfg).unwrap();
        assert_eq!(carb.termination, Termination::Breakup);
        assert!(carb.termination_altitude_km > stony.termination_altitude_km);
    }

    #[test]
    fn series_is_recorded_and_ordered() {
        let r = calculate_atp(&entry(20.0, 60.0, 2.0, EntryComposition::Stony), &AtpConfig::default()).unwrap();
        assert!(r.series.len() > 2);
        for pair in r.series.windows(2) {
            assert!(pair[1].time_s >= pair[0].time_s);
            assert!(pair[1].altitude_km <= pair[0].altitude_km);
        }
    }

    #[test]
    fn out_of_range_entry_is_invalid() {
        let cfg = AtpConfig::default();
        for e in [
            entry(8.0, 45.0, 1.0, EntryComposition::Stony),
            entry(20.0, 0.0, 1.0, EntryComposition::Stony),
            entry(20.0, 45.0, -1.0, EntryComposition::Stony),
        ] {
            assert!(matches!(calculate_atp(&e, &cfg), Err(AppError::InvalidInput(_))));
        }
    }

    #[test]
    fn step_budget_exhaustion_is_numerical() {
        let cfg = AtpConfig {
            max_steps: 5,
            ..AtpConfig::default()
        };
        let err = calculate_atp(&entry(20.0, 45.0, 1.0, EntryComposition::Stony), &cfg).unwrap_err();
        assert!(matches!(err, AppError::Numerical(_)));
    }

    #[test]
    fn crust_thickness_is_capped() {
        assert_eq!(fusion_crust_thickness_mm(4000.0, 1.0e6), 2.0);
        assert_eq!(fusion_crust_thickness_mm(2000.0, 1.0e6), 1.0);
        assert_eq!(fusion_crust_thickness_mm(2000.0, 0.0), 0.0);
    }
}
