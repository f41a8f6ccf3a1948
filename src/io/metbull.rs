//! Meteoritical Bulletin submission packages.
//!
//! One JSON document per specimen: export metadata, the specimen identity,
//! the proposed classification and the raw parameter scores. Files are named
//! `<id>_<YYYYmmdd_HHMMSS>.metbull.json`.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{ClassificationResult, Parameter, Specimen};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub exporter: String,
    pub export_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageSpecimen {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageClassification {
    pub group: String,
    pub isotopic_group: Option<String>,
    pub shock_stage: String,
    pub weathering_grade: String,
    pub parent_body_type: Option<String>,
    pub level: String,
    pub recommended_action: String,
    /// `1 - EMI`.
    pub confidence: f64,
}

/// Raw (unnormalized) scores; `None` for parameters without data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageParameters {
    pub emi: f64,
    pub mcc: Option<f64>,
    pub smg: Option<f64>,
    pub twi: Option<f64>,
    pub iaf: Option<f64>,
    pub atp: Option<f64>,
    pub pbdr: Option<f64>,
    pub cnea: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetBullPackage {
    pub metadata: PackageMetadata,
    pub specimen: PackageSpecimen,
    pub classification: PackageClassification,
    pub parameters: PackageParameters,
}

pub fn build_package(specimen: &Specimen, result: &ClassificationResult, exported_at: DateTime<Utc>) -> MetBullPackage {
    let raw = |p: Parameter| result.parameter(p).map(|r| r.score.raw);
    MetBullPackage {
        metadata: PackageMetadata {
            exporter: format!("METEORICA {}", env!("CARGO_PKG_VERSION")),
            export_date: exported_at,
        },
        specimen: PackageSpecimen {
            id: specimen.id.clone(),
            name: specimen.name.clone().unwrap_or_default(),
        },
        classification: PackageClassification {
            group: result.mineral_group.clone().unwrap_or_else(|| "Unknown".to_string()),
            isotopic_group: result.isotopic_group.clone(),
            shock_stage: result.shock_stage.clone().unwrap_or_default(),
            weathering_grade: result.weathering_grade.clone().unwrap_or_default(),
            parent_body_type: result.parent_body_type.clone(),
            level: result.level.display_name().to_string(),
            recommended_action: result.level.action().to_string(),
            confidence: 1.0 - result.emi,
        },
        parameters: PackageParameters {
            emi: result.emi,
            mcc: raw(Parameter::Mcc),
            smg: raw(Parameter::Smg),
            twi: raw(Parameter::Twi),
            iaf: raw(Parameter::Iaf),
            atp: raw(Parameter::Atp),
            pbdr: raw(Parameter::Pbdr),
            cnea: raw(Parameter::Cnea),
        },
    }
}

fn file_stem(id: &str) -> String {
    let stem: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() { "unknown".to_string() } else { stem }
}

/// Write the package for one specimen into `dir` (created if needed).
pub fn write_package(dir: &Path, specimen: &Specimen, result: &ClassificationResult) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::io(format!("Failed to create MetBull directory '{}': {e}", dir.display())))?;

    let now = Utc::now();
    let package = build_package(specimen, result, now);
    let path = dir.join(format!(
        "{}_{}.metbull.json",
        file_stem(&specimen.id),
        now.format("%Y%m%d_%H%M%S")
    ));
    let file = File::create(&path)
        .map_err(|e| AppError::io(format!("Failed to create MetBull package '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, &package)
        .map_err(|e| AppError::io(format!("Failed to write MetBull package: {e}")))?;

    info!(specimen = %specimen.id, path = %path.display(), "wrote MetBull package");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::classify_specimen;
    use crate::config::EmiConfig;
    use crate::domain::{MineralComposition, SiderophileData};
    use crate::params::ParentBodyType;
    use crate::reference::HseElement;
    use chrono::TimeZone;

    fn specimen() -> Specimen {
        let mut s = Specimen::new("NWA 001/a");
        s.name = Some("Northwest Africa 001".to_string());
        s.mineralogy = Some(MineralComposition {
            fa: Some(18.5),
            fs: Some(16.5),
            d17o: Some(0.75),
            ..MineralComposition::default()
        });
        s
    }

    #[test]
    fn package_maps_result_fields() {
        let s = specimen();
        let r = classify_specimen(&s, &EmiConfig::default()).unwrap();
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let p = build_package(&s, &r, at);
        assert_eq!(p.classification.group, "H");
        assert!((p.classification.confidence - (1.0 - r.emi)).abs() < 1e-12);
        assert!(p.parameters.mcc.is_some());
        assert!(p.parameters.cnea.is_none());
        assert!(p.classification.parent_body_type.is_none());
        assert!(p.metadata.exporter.starts_with("METEORICA "));
        assert_eq!(p.metadata.export_date, at);
    }

    #[test]
    fn package_carries_parent_body_type() {
        let mut s = specimen();
        s.siderophiles = Some(SiderophileData {
            concentrations: HseElement::ALL.into_iter().map(|e| (e, e.ci_abundance() * 0.01)).collect(),
            widmanstatten_bandwidth_mm: None,
        });
        let r = classify_specimen(&s, &EmiConfig::default()).unwrap();
        let p = build_package(&s, &r, Utc::now());
        assert_eq!(
            p.classification.parent_body_type.as_deref(),
            Some(ParentBodyType::VestaLikeMantle.label())
        );
    }

    #[test]
    fn write_package_uses_a_safe_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let s = specimen();
        let r = classify_specimen(&s, &EmiConfig::default()).unwrap();
        let path = write_package(&dir.path().join("metbull"), &s, &r).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("NWA_001_a_"), "{name}");
        assert!(name.ends_with(".metbull.json"), "{name}");

        let back: MetBullPackage = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.specimen.name, "Northwest Africa 001");
    }
}
