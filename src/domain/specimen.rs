//! Specimen measurement records.
//!
//! A `Specimen` carries one optional section per measurement family. Each
//! parameter calculator reads exactly one section; a missing section means the
//! corresponding parameter is skipped by the composite.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::reference::{EntryComposition, HseElement, MineralGroup, Nuclide};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Specimen {
    pub id: String,
    pub name: Option<String>,
    pub mineralogy: Option<MineralComposition>,
    pub shock: Option<ShockIndicators>,
    pub weathering: Option<WeatheringIndicators>,
    pub isotopes: Option<IsotopeVector>,
    pub entry: Option<EntryParameters>,
    pub siderophiles: Option<SiderophileData>,
    pub nuclides: Option<NuclideData>,
}

impl Specimen {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// True when no measurement section is present.
    pub fn is_empty(&self) -> bool {
        self.mineralogy.is_none()
            && self.shock.is_none()
            && self.weathering.is_none()
            && self.isotopes.is_none()
            && self.entry.is_none()
            && self.siderophiles.is_none()
            && self.nuclides.is_none()
    }
}

/// Mineral chemistry used by MCC.
///
/// Stony specimens supply `fa`, `fs` and `d17o`; irons supply `ni`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MineralComposition {
    /// Olivine fayalite content (mol%).
    pub fa: Option<f64>,
    /// Low-Ca pyroxene ferrosilite content (mol%).
    pub fs: Option<f64>,
    /// Oxygen isotope Δ¹⁷O (‰).
    pub d17o: Option<f64>,
    /// Bulk metal Ni (wt%).
    pub ni: Option<f64>,
    /// Restrict MCC to a single group instead of searching the family.
    pub target_group: Option<MineralGroup>,
}

/// Petrographic shock indicators, each scaled to `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShockIndicators {
    pub olivine_planar: Option<f64>,
    pub feldspar_state: Option<f64>,
    pub metal_melting: Option<f64>,
    pub high_pressure_phases: Option<f64>,
    pub sulfide_state: Option<f64>,
    /// Remaining porosity fraction (1 = unshocked).
    pub porosity: Option<f64>,
    /// Independent peak-pressure estimates (GPa).
    pub pressure_estimates_gpa: Vec<f64>,
}

/// Weathering indicators, each pre-normalized to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatheringIndicators {
    pub metal_oxidation: Option<f64>,
    pub phyllosilicate: Option<f64>,
    pub carbonate_veins: Option<f64>,
    pub be_ne_deviation: Option<f64>,
    pub fe_ni_deviation: Option<f64>,
}

/// Nucleosynthetic anomalies in ε units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IsotopeVector {
    pub eps_ti50: f64,
    pub eps_cr54: f64,
    pub eps_mo96: f64,
    pub eps_mo100: f64,
    pub eps_ru92: f64,
    pub eps_ba137: f64,
    pub eps_nd142: f64,
}

impl IsotopeVector {
    pub const NAMES: [&'static str; 7] = ["ε⁵⁰Ti", "ε⁵⁴Cr", "ε⁹⁶Mo", "ε¹⁰⁰Mo", "ε⁹²Ru", "ε¹³⁷Ba", "ε¹⁴²Nd"];

    pub fn from_array(v: [f64; 7]) -> Self {
        Self {
            eps_ti50: v[0],
            eps_cr54: v[1],
            eps_mo96: v[2],
            eps_mo100: v[3],
            eps_ru92: v[4],
            eps_ba137: v[5],
            eps_nd142: v[6],
        }
    }

    pub fn to_array(&self) -> [f64; 7] {
        [
            self.eps_ti50,
            self.eps_cr54,
            self.eps_mo96,
            self.eps_mo100,
            self.eps_ru92,
            self.eps_ba137,
            self.eps_nd142,
        ]
    }
}

/// Fireball entry conditions for ATP.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntryParameters {
    pub velocity_km_s: f64,
    /// Entry angle measured from the horizontal.
    pub angle_deg: f64,
    pub diameter_m: f64,
    #[serde(default)]
    pub composition: EntryComposition,
}

/// Highly siderophile element concentrations (ng/g).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiderophileData {
    pub concentrations: BTreeMap<HseElement, f64>,
    /// Kamacite bandwidth of the Widmanstätten pattern (mm), for irons.
    pub widmanstatten_bandwidth_mm: Option<f64>,
}

/// Cosmogenic nuclide concentrations in the production-rate units of `reference::Nuclide`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NuclideData {
    pub concentrations: BTreeMap<Nuclide, f64>,
    /// Fixes the shielding depth instead of solving for it (cm).
    pub shielding_depth_cm: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specimen_json_accepts_partial_sections() {
        let json = r#"{
            "id": "NWA-001",
            "mineralogy": { "fa": 18.5, "fs": 16.5, "d17o": 0.75 },
            "siderophiles": { "concentrations": { "os": 486.0, "ir": 481.0 } },
            "nuclides": { "concentrations": { "he3": 30.0 } }
        }"#;
        let specimen: Specimen = serde_json::from_str(json).unwrap();
        assert_eq!(specimen.id, "NWA-001");
        assert_eq!(specimen.mineralogy.unwrap().fa, Some(18.5));
        assert!(specimen.shock.is_none());
        let hse = specimen.siderophiles.unwrap();
        assert_eq!(hse.concentrations.get(&HseElement::Ir), Some(&481.0));
        assert_eq!(specimen.nuclides.unwrap().concentrations.len(), 1);
    }

    #[test]
    fn empty_specimen_has_no_sections() {
        assert!(Specimen::new("x").is_empty());
    }
}
