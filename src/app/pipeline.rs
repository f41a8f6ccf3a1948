//! Shared classification pipeline used by every CLI front-end.
//!
//! specimen -> seven calculators -> normalization -> composite -> level
//!
//! Calculators only run for sections the specimen carries; a present but
//! invalid section aborts that specimen with the calculator's error. Every
//! entry point validates the configuration first, so a hand-built config that
//! never went through `EmiConfig::load` still fails with `Configuration`.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::EmiConfig;
use crate::domain::{
    ClassificationResult, EntryParameters, Parameter, ParameterResult, ParameterScore, PerParameter, Specimen,
};
use crate::emi::composite;
use crate::error::{AppError, Result};
use crate::params::{
    AtpResult, calculate_atp, calculate_cnea, calculate_iaf, calculate_mcc, calculate_pbdr, calculate_smg,
    calculate_twi,
};

/// Outcome of one specimen in a batch run.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub specimen_id: String,
    pub outcome: Result<ClassificationResult>,
}

fn in_context<T>(specimen: &Specimen, parameter: Parameter, result: Result<T>) -> Result<T> {
    result.map_err(|e| e.with_context(format!("specimen '{}' {}", specimen.id, parameter.display_name())))
}

pub fn classify_specimen(specimen: &Specimen, config: &EmiConfig) -> Result<ClassificationResult> {
    config.validate()?;
    if specimen.is_empty() {
        return Err(AppError::invalid(format!(
            "specimen '{}': no measurement section supplied.",
            specimen.id
        )));
    }

    let mut scores: PerParameter<Option<ParameterScore>> = PerParameter::default();
    let mut result = ClassificationResult {
        specimen_id: specimen.id.clone(),
        emi: 0.0,
        level: crate::domain::ClassificationLevel::Unambiguous,
        parameters: Vec::new(),
        missing: Vec::new(),
        mineral_group: None,
        isotopic_group: None,
        presolar_candidate: false,
        shock_stage: None,
        weathering_grade: None,
        exposure_history: None,
        terrestrial_age_years: None,
        cre_age_ma: None,
        peak_temperature_c: None,
        parent_body_radius_km: None,
        parent_body_type: None,
    };

    if let Some(m) = &specimen.mineralogy {
        let r = in_context(specimen, Parameter::Mcc, calculate_mcc(m, &config.mcc))?;
        result.mineral_group = Some(r.group.to_string());
        scores.mcc = Some(r.to_score());
    }
    if let Some(s) = &specimen.shock {
        let r = in_context(specimen, Parameter::Smg, calculate_smg(s, &config.smg))?;
        result.shock_stage = Some(r.stage.label().to_string());
        scores.smg = Some(r.to_score());
    }
    if let Some(w) = &specimen.weathering {
        let r = in_context(specimen, Parameter::Twi, calculate_twi(w))?;
        result.weathering_grade = Some(r.grade.to_string());
        result.terrestrial_age_years = Some(r.terrestrial_age_years);
        scores.twi = Some(r.to_score());
    }
    if let Some(i) = &specimen.isotopes {
        let r = in_context(specimen, Parameter::Iaf, calculate_iaf(i, &config.iaf))?;
        result.isotopic_group = Some(r.group.to_string());
        result.presolar_candidate = r.presolar_candidate;
        scores.iaf = Some(r.to_score());
    }
    if let Some(e) = &specimen.entry {
        let r = in_context(specimen, Parameter::Atp, calculate_atp(e, &config.atp))?;
        result.peak_temperature_c = Some(r.peak_temperature_c);
        scores.atp = Some(r.to_score());
    }
    if let Some(h) = &specimen.siderophiles {
        let r = in_context(specimen, Parameter::Pbdr, calculate_pbdr(h, &config.pbdr))?;
        result.parent_body_radius_km = r.parent_body_radius_km;
        result.parent_body_type = Some(r.parent_body.label().to_string());
        scores.pbdr = Some(r.to_score());
    }
    if let Some(n) = &specimen.nuclides {
        let r = in_context(specimen, Parameter::Cnea, calculate_cnea(n, &config.cnea))?;
        result.cre_age_ma = Some(r.exposure_age.value_ma());
        result.exposure_history = Some(r.history.label());
        scores.cnea = Some(r.to_score());
    }

    let raw = PerParameter::from_fn(|p| scores.get(p).as_ref().map(|s| s.raw));
    let composite = composite(&raw, config).map_err(|e| e.with_context(format!("specimen '{}'", specimen.id)))?;

    for p in Parameter::ALL {
        if let (Some(score), Some(normalized)) = (scores.get_mut(p).take(), *composite.normalized.get(p)) {
            if score.low_confidence {
                warn!(specimen = %specimen.id, parameter = p.display_name(), "low-confidence parameter result");
            }
            result.parameters.push(ParameterResult { score, normalized });
        }
    }
    result.emi = composite.emi;
    result.level = composite.level;
    result.missing = composite.missing;

    debug!(
        specimen = %specimen.id,
        emi = result.emi,
        level = result.level.display_name(),
        missing = result.missing.len(),
        "classified"
    );
    Ok(result)
}

/// Classify every specimen in parallel; output order follows input order.
pub fn classify_batch(specimens: &[Specimen], config: &EmiConfig) -> Vec<BatchEntry> {
    let entries: Vec<BatchEntry> = specimens
        .par_iter()
        .map(|s| BatchEntry {
            specimen_id: s.id.clone(),
            outcome: classify_specimen(s, config),
        })
        .collect();

    for entry in &entries {
        if let Err(e) = &entry.outcome {
            warn!(specimen = %entry.specimen_id, error = %e, "classification failed");
        }
    }
    entries
}

/// Standalone ablation run for the `fireball` command.
pub fn run_fireball(entry: &EntryParameters, config: &EmiConfig) -> Result<AtpResult> {
    config.validate()?;
    calculate_atp(entry, &config.atp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample::{SampleConfig, generate_specimens};
    use crate::domain::{
        ClassificationLevel, IsotopeVector, MineralComposition, NuclideData, ShockIndicators, SiderophileData,
        WeatheringIndicators,
    };
    use crate::params::ParentBodyType;
    use crate::reference::{EntryComposition, HseElement, IsotopicGroup, MineralGroup, Nuclide};

    fn pristine_h_chondrite() -> Specimen {
        let mut s = Specimen::new("H-pristine");
        s.mineralogy = Some(MineralComposition {
            fa: Some(18.5),
            fs: Some(16.5),
            d17o: Some(0.75),
            ..MineralComposition::default()
        });
        s.weathering = Some(WeatheringIndicators {
            metal_oxidation: Some(0.0),
            phyllosilicate: Some(0.0),
            carbonate_veins: Some(0.0),
            be_ne_deviation: Some(0.0),
            fe_ni_deviation: Some(0.0),
        });
        s
    }

    #[test]
    fn pristine_specimen_is_unambiguous() {
        let r = classify_specimen(&pristine_h_chondrite(), &EmiConfig::default()).unwrap();
        assert!(r.emi < 0.2, "emi={}", r.emi);
        assert_eq!(r.level, ClassificationLevel::Unambiguous);
        assert_eq!(r.mineral_group.as_deref(), Some("H"));
        assert_eq!(r.parameters.len(), 2);
        assert_eq!(r.missing.len(), 5);
        assert_eq!(r.terrestrial_age_years, Some(0.0));
    }

    fn shock(level: f64) -> ShockIndicators {
        ShockIndicators {
            olivine_planar: Some(level),
            feldspar_state: Some(level),
            metal_melting: Some(level),
            high_pressure_phases: Some(level),
            sulfide_state: Some(level),
            porosity: Some(1.0 - level),
            pressure_estimates_gpa: Vec::new(),
        }
    }

    fn weathering(level: f64) -> WeatheringIndicators {
        WeatheringIndicators {
            metal_oxidation: Some(level),
            phyllosilicate: Some(level),
            carbonate_veins: Some(level),
            be_ne_deviation: Some(level),
            fe_ni_deviation: Some(level),
        }
    }

    fn hse(factor: f64) -> SiderophileData {
        SiderophileData {
            concentrations: HseElement::ALL.into_iter().map(|e| (e, e.ci_abundance() * factor)).collect(),
            widmanstatten_bandwidth_mm: None,
        }
    }

    fn nuclides(pairs: &[(Nuclide, f64)]) -> NuclideData {
        NuclideData {
            concentrations: pairs.iter().copied().collect(),
            shielding_depth_cm: Some(0.0),
        }
    }

    #[test]
    fn fully_measured_pristine_specimen_is_unambiguous() {
        let mut s = pristine_h_chondrite();
        s.shock = Some(shock(0.0));
        s.isotopes = Some(IsotopeVector::from_array(IsotopicGroup::H.centroid().mean));
        s.entry = Some(EntryParameters {
            velocity_km_s: 11.5,
            angle_deg: 60.0,
            diameter_m: 0.3,
            composition: EntryComposition::Stony,
        });
        s.siderophiles = Some(hse(1.0));
        s.nuclides = Some(nuclides(&[(Nuclide::He3, 0.75)]));

        let r = classify_specimen(&s, &EmiConfig::default()).unwrap();
        assert_eq!(r.parameters.len(), 7);
        assert!(r.missing.is_empty());
        assert!(r.emi < 0.2, "emi={}", r.emi);
        assert_eq!(r.level, ClassificationLevel::Unambiguous);
        assert_eq!(r.isotopic_group.as_deref(), Some("H"));
        assert_eq!(r.parent_body_type.as_deref(), Some(ParentBodyType::Undifferentiated.label()));
        assert!((r.cre_age_ma.unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn fully_measured_anomalous_specimen_is_ungrouped_candidate() {
        let mut s = Specimen::new("anomalous");
        s.mineralogy = Some(MineralComposition {
            fa: Some(60.0),
            fs: Some(55.0),
            d17o: Some(10.0),
            ..MineralComposition::default()
        });
        s.shock = Some(shock(1.0));
        s.weathering = Some(weathering(1.0));
        s.isotopes = Some(IsotopeVector::from_array([12.0, -8.0, 6.0, 4.0, -3.0, 2.0, 1.5]));
        s.entry = Some(EntryParameters {
            velocity_km_s: 30.0,
            angle_deg: 45.0,
            diameter_m: 1.0,
            composition: EntryComposition::Stony,
        });
        s.siderophiles = Some(hse(0.001));
        s.nuclides = Some(nuclides(&[(Nuclide::He3, 180.0), (Nuclide::Ne21, 42.0)]));

        let r = classify_specimen(&s, &EmiConfig::default()).unwrap();
        assert_eq!(r.parameters.len(), 7);
        assert!(r.emi > 0.8, "emi={}", r.emi);
        assert_eq!(r.level, ClassificationLevel::UngroupedCandidate);
        assert!(r.presolar_candidate);
        assert_eq!(r.shock_stage.as_deref(), Some("S6"));
        let cre = r.cre_age_ma.unwrap();
        assert!((cre - 120.0).abs() < 0.5, "cre={cre}");
    }

    #[test]
    fn hand_built_invalid_config_is_rejected() {
        let mut cfg = EmiConfig::default();
        cfg.weights.mcc = 0.5;
        let err = classify_specimen(&pristine_h_chondrite(), &cfg).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)), "{err:?}");

        let batch = classify_batch(&[pristine_h_chondrite()], &cfg);
        assert!(matches!(batch[0].outcome, Err(AppError::Configuration(_))));

        let mut cfg = EmiConfig::default();
        cfg.thresholds.boundary = 0.9;
        let entry = EntryParameters {
            velocity_km_s: 18.6,
            angle_deg: 18.5,
            diameter_m: 19.0,
            composition: EntryComposition::Stony,
        };
        assert!(matches!(run_fireball(&entry, &cfg), Err(AppError::Configuration(_))));
    }

    #[test]
    fn invalid_section_fails_with_specimen_context() {
        let mut s = pristine_h_chondrite();
        s.nuclides = Some(crate::domain::NuclideData {
            concentrations: [(Nuclide::He3, -1.0)].into_iter().collect(),
            shielding_depth_cm: None,
        });
        let err = classify_specimen(&s, &EmiConfig::default()).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(err.to_string().contains("H-pristine"), "{err}");
        assert!(err.to_string().contains("CNEA"), "{err}");
    }

    #[test]
    fn empty_specimen_is_invalid() {
        let err = classify_specimen(&Specimen::new("blank"), &EmiConfig::default()).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn batch_matches_sequential_and_keeps_order() {
        let cfg = EmiConfig::default();
        let mut specimens = generate_specimens(&SampleConfig {
            group: MineralGroup::L,
            count: 12,
            seed: 11,
            scatter: 1.0,
        })
        .unwrap();
        specimens.insert(3, Specimen::new("blank"));

        let batch = classify_batch(&specimens, &cfg);
        assert_eq!(batch.len(), specimens.len());
        for (entry, specimen) in batch.iter().zip(&specimens) {
            assert_eq!(entry.specimen_id, specimen.id);
            let sequential = classify_specimen(specimen, &cfg);
            assert_eq!(entry.outcome, sequential);
        }
        assert!(batch[3].outcome.is_err());
    }

    #[test]
    fn fireball_runs_without_a_specimen() {
        let entry = EntryParameters {
            velocity_km_s: 18.6,
            angle_deg: 18.5,
            diameter_m: 19.0,
            composition: Default::default(),
        };
        let r = run_fireball(&entry, &EmiConfig::default()).unwrap();
        assert!(r.peak_temperature_c > 0.0);
    }
}
