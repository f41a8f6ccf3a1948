//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - produced by the parameter calculators
//! - combined by the EMI composite
//! - exported to JSON/CSV and MetBull packages

use serde::{Deserialize, Serialize};

/// The seven EMI parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parameter {
    Mcc,
    Smg,
    Twi,
    Iaf,
    Atp,
    Pbdr,
    Cnea,
}

impl Parameter {
    pub const ALL: [Parameter; 7] = [
        Parameter::Mcc,
        Parameter::Smg,
        Parameter::Twi,
        Parameter::Iaf,
        Parameter::Atp,
        Parameter::Pbdr,
        Parameter::Cnea,
    ];

    /// Short label for terminal output (`MCC`, `SMG`, ...).
    pub fn display_name(self) -> &'static str {
        match self {
            Parameter::Mcc => "MCC",
            Parameter::Smg => "SMG",
            Parameter::Twi => "TWI",
            Parameter::Iaf => "IAF",
            Parameter::Atp => "ATP",
            Parameter::Pbdr => "PBDR",
            Parameter::Cnea => "CNEA",
        }
    }

    /// Lowercase key used in config tables and export columns.
    pub fn key(self) -> &'static str {
        match self {
            Parameter::Mcc => "mcc",
            Parameter::Smg => "smg",
            Parameter::Twi => "twi",
            Parameter::Iaf => "iaf",
            Parameter::Atp => "atp",
            Parameter::Pbdr => "pbdr",
            Parameter::Cnea => "cnea",
        }
    }

    pub fn long_name(self) -> &'static str {
        match self {
            Parameter::Mcc => "Mineralogical Classification Coefficient",
            Parameter::Smg => "Shock Metamorphism Grade",
            Parameter::Twi => "Terrestrial Weathering Index",
            Parameter::Iaf => "Isotopic Anomaly Fingerprint",
            Parameter::Atp => "Ablation Thermal Profile",
            Parameter::Pbdr => "Parent Body Differentiation Ratio",
            Parameter::Cnea => "Cosmogenic Nuclide Exposure Age",
        }
    }
}

/// One value per EMI parameter.
///
/// Used for weights, normalization bounds and per-specimen raw scores so the
/// seven parameters are always addressed by name rather than by position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerParameter<T> {
    pub mcc: T,
    pub smg: T,
    pub twi: T,
    pub iaf: T,
    pub atp: T,
    pub pbdr: T,
    pub cnea: T,
}

impl<T> PerParameter<T> {
    pub fn from_fn(mut f: impl FnMut(Parameter) -> T) -> Self {
        Self {
            mcc: f(Parameter::Mcc),
            smg: f(Parameter::Smg),
            twi: f(Parameter::Twi),
            iaf: f(Parameter::Iaf),
            atp: f(Parameter::Atp),
            pbdr: f(Parameter::Pbdr),
            cnea: f(Parameter::Cnea),
        }
    }

    pub fn get(&self, parameter: Parameter) -> &T {
        match parameter {
            Parameter::Mcc => &self.mcc,
            Parameter::Smg => &self.smg,
            Parameter::Twi => &self.twi,
            Parameter::Iaf => &self.iaf,
            Parameter::Atp => &self.atp,
            Parameter::Pbdr => &self.pbdr,
            Parameter::Cnea => &self.cnea,
        }
    }

    pub fn get_mut(&mut self, parameter: Parameter) -> &mut T {
        match parameter {
            Parameter::Mcc => &mut self.mcc,
            Parameter::Smg => &mut self.smg,
            Parameter::Twi => &mut self.twi,
            Parameter::Iaf => &mut self.iaf,
            Parameter::Atp => &mut self.atp,
            Parameter::Pbdr => &mut self.pbdr,
            Parameter::Cnea => &mut self.cnea,
        }
    }

    /// Iterate in canonical parameter order.
    pub fn iter(&self) -> impl Iterator<Item = (Parameter, &T)> + '_ {
        Parameter::ALL.into_iter().map(move |p| (p, self.get(p)))
    }
}

/// EMI classification bands, ordered from least to most anomalous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationLevel {
    Unambiguous,
    HighConfidence,
    BoundaryZone,
    Anomalous,
    UngroupedCandidate,
}

impl ClassificationLevel {
    pub const ALL: [ClassificationLevel; 5] = [
        ClassificationLevel::Unambiguous,
        ClassificationLevel::HighConfidence,
        ClassificationLevel::BoundaryZone,
        ClassificationLevel::Anomalous,
        ClassificationLevel::UngroupedCandidate,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            ClassificationLevel::Unambiguous => "UNAMBIGUOUS",
            ClassificationLevel::HighConfidence => "HIGH CONFIDENCE",
            ClassificationLevel::BoundaryZone => "BOUNDARY ZONE",
            ClassificationLevel::Anomalous => "ANOMALOUS",
            ClassificationLevel::UngroupedCandidate => "UNGROUPED CANDIDATE",
        }
    }

    /// Recommended follow-up for specimens in this band.
    pub fn action(self) -> &'static str {
        match self {
            ClassificationLevel::Unambiguous => "Direct MetBull submission",
            ClassificationLevel::HighConfidence => "Standard expert review",
            ClassificationLevel::BoundaryZone => "Multi-parameter disambiguation required",
            ClassificationLevel::Anomalous => "Expert committee + isotopic verification",
            ClassificationLevel::UngroupedCandidate => "Full consortium characterization",
        }
    }
}

/// A physical quantity derived alongside a parameter score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DerivedQuantity {
    /// Mahalanobis distance to the assigned group centroid.
    CentroidDistance { value: f64 },
    /// Hugoniot post-shock temperature.
    PostShockTemperature { kelvin: f64 },
    /// Terrestrial residence age estimated from weathering.
    TerrestrialAge { years: f64, precision_years: f64 },
    /// Euclidean distance in ε-space to the assigned isotopic group.
    IsotopicDistance { value: f64 },
    /// Peak ablation surface temperature.
    PeakSurfaceTemperature { celsius: f64 },
    /// Parent body radius from metallographic cooling rate.
    ParentBodyRadius { km: f64 },
    /// Cosmic-ray exposure age (a lower bound when `saturated`).
    ExposureAge { ma: f64, saturated: bool },
}

impl DerivedQuantity {
    pub fn value(&self) -> f64 {
        match *self {
            DerivedQuantity::CentroidDistance { value } => value,
            DerivedQuantity::PostShockTemperature { kelvin } => kelvin,
            DerivedQuantity::TerrestrialAge { years, .. } => years,
            DerivedQuantity::IsotopicDistance { value } => value,
            DerivedQuantity::PeakSurfaceTemperature { celsius } => celsius,
            DerivedQuantity::ParentBodyRadius { km } => km,
            DerivedQuantity::ExposureAge { ma, .. } => ma,
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            DerivedQuantity::CentroidDistance { .. } | DerivedQuantity::IsotopicDistance { .. } => "",
            DerivedQuantity::PostShockTemperature { .. } => "K",
            DerivedQuantity::TerrestrialAge { .. } => "yr",
            DerivedQuantity::PeakSurfaceTemperature { .. } => "°C",
            DerivedQuantity::ParentBodyRadius { .. } => "km",
            DerivedQuantity::ExposureAge { .. } => "Ma",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DerivedQuantity::CentroidDistance { .. } => "centroid distance",
            DerivedQuantity::PostShockTemperature { .. } => "post-shock T",
            DerivedQuantity::TerrestrialAge { .. } => "terrestrial age",
            DerivedQuantity::IsotopicDistance { .. } => "isotopic distance",
            DerivedQuantity::PeakSurfaceTemperature { .. } => "peak surface T",
            DerivedQuantity::ParentBodyRadius { .. } => "parent body radius",
            DerivedQuantity::ExposureAge { .. } => "CRE age",
        }
    }
}

/// A calculator's output before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterScore {
    pub parameter: Parameter,
    /// Raw score in the parameter's own units (GPa-equivalent for SMG, °C for ATP, Ma for CNEA).
    pub raw: f64,
    /// Qualitative diagnostic band (shock stage, weathering grade, ...).
    pub grade: String,
    pub derived: Option<DerivedQuantity>,
    /// Set when the calculator degraded (missing indicators, singular covariance, saturation).
    pub low_confidence: bool,
}

impl ParameterScore {
    pub fn new(parameter: Parameter, raw: f64, grade: impl Into<String>) -> Self {
        Self {
            parameter,
            raw,
            grade: grade.into(),
            derived: None,
            low_confidence: false,
        }
    }

    pub fn with_derived(mut self, derived: DerivedQuantity) -> Self {
        self.derived = Some(derived);
        self
    }

    pub fn flagged(mut self, low_confidence: bool) -> Self {
        self.low_confidence = low_confidence;
        self
    }
}

/// A parameter score together with its normalized value in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterResult {
    #[serde(flatten)]
    pub score: ParameterScore,
    pub normalized: f64,
}

/// Final per-specimen output of the EMI pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub specimen_id: String,
    pub emi: f64,
    pub level: ClassificationLevel,
    /// Results for the parameters that could be evaluated, in canonical order.
    pub parameters: Vec<ParameterResult>,
    /// Parameters skipped because the specimen carried no data for them.
    pub missing: Vec<Parameter>,

    pub mineral_group: Option<String>,
    pub isotopic_group: Option<String>,
    pub presolar_candidate: bool,
    pub shock_stage: Option<String>,
    pub weathering_grade: Option<String>,
    pub exposure_history: Option<String>,
    pub terrestrial_age_years: Option<f64>,
    pub cre_age_ma: Option<f64>,
    pub peak_temperature_c: Option<f64>,
    pub parent_body_radius_km: Option<f64>,
    pub parent_body_type: Option<String>,
}

impl ClassificationResult {
    pub fn parameter(&self, parameter: Parameter) -> Option<&ParameterResult> {
        self.parameters.iter().find(|r| r.score.parameter == parameter)
    }

    /// Whether any evaluated parameter degraded.
    pub fn low_confidence(&self) -> bool {
        self.parameters.iter().any(|r| r.score.low_confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_parameter_iterates_in_canonical_order() {
        let table = PerParameter::from_fn(|p| p.key().len());
        let keys: Vec<Parameter> = table.iter().map(|(p, _)| p).collect();
        assert_eq!(keys, Parameter::ALL.to_vec());
        assert_eq!(*table.get(Parameter::Pbdr), 4);
    }

    #[test]
    fn levels_are_ordered() {
        for pair in ClassificationLevel::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn parameter_result_serializes_flat() {
        let result = ParameterResult {
            score: ParameterScore::new(Parameter::Twi, 0.2, "W1")
                .with_derived(DerivedQuantity::TerrestrialAge { years: 7000.0, precision_years: 8000.0 }),
            normalized: 0.2,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["parameter"], "twi");
        assert_eq!(json["grade"], "W1");
        assert_eq!(json["derived"]["kind"], "terrestrial_age");
    }
}
