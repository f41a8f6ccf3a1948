//! Export classification results, synthetic specimens and ablation series.
//!
//! CSV exports are flat (one row per specimen, one raw/normalized column pair
//! per parameter) so they open directly in spreadsheets. Failed specimens keep
//! their row with the error in the `error` column.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::app::pipeline::BatchEntry;
use crate::domain::{Parameter, Specimen};
use crate::error::{AppError, Result};
use crate::params::TrajectorySample;

fn create(path: &Path, what: &str) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| AppError::io(format!("Failed to create {what} '{}': {e}", path.display())))
}

fn row_err(e: std::io::Error) -> AppError {
    AppError::io(format!("Failed to write export CSV row: {e}"))
}

/// Quote a CSV field only when it needs it.
fn field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn opt(v: Option<f64>, precision: usize) -> String {
    v.map(|v| format!("{v:.precision$}")).unwrap_or_default()
}

pub fn write_results_csv_to<W: Write>(mut out: W, entries: &[BatchEntry]) -> Result<()> {
    let mut header = String::from("id,emi,level");
    for p in Parameter::ALL {
        header.push_str(&format!(",{k}_raw,{k}_norm", k = p.key()));
    }
    header.push_str(
        ",mineral_group,isotopic_group,shock_stage,weathering_grade,cre_age_ma,\
         exposure_history,peak_temperature_c,parent_body_radius_km,parent_body_type,low_confidence,missing,error",
    );
    writeln!(out, "{header}").map_err(|e| AppError::io(format!("Failed to write export CSV header: {e}")))?;

    for entry in entries {
        let mut row = field(&entry.specimen_id);
        match &entry.outcome {
            Ok(r) => {
                row.push_str(&format!(",{:.6},{}", r.emi, r.level.display_name()));
                for p in Parameter::ALL {
                    let pr = r.parameter(p);
                    row.push_str(&format!(
                        ",{},{}",
                        opt(pr.map(|x| x.score.raw), 6),
                        opt(pr.map(|x| x.normalized), 6)
                    ));
                }
                let missing: Vec<&str> = r.missing.iter().map(|p| p.display_name()).collect();
                row.push_str(&format!(
                    ",{},{},{},{},{},{},{},{},{},{},{},",
                    r.mineral_group.as_deref().unwrap_or(""),
                    r.isotopic_group.as_deref().unwrap_or(""),
                    r.shock_stage.as_deref().unwrap_or(""),
                    r.weathering_grade.as_deref().unwrap_or(""),
                    opt(r.cre_age_ma, 4),
                    field(r.exposure_history.as_deref().unwrap_or("")),
                    opt(r.peak_temperature_c, 1),
                    opt(r.parent_body_radius_km, 2),
                    field(r.parent_body_type.as_deref().unwrap_or("")),
                    r.low_confidence(),
                    missing.join(";"),
                ));
            }
            Err(e) => {
                row.push_str(",,");
                row.push_str(&",".repeat(2 * Parameter::ALL.len() + 11));
                row.push(',');
                row.push_str(&field(&e.to_string()));
            }
        }
        writeln!(out, "{row}").map_err(row_err)?;
    }
    out.flush().map_err(row_err)?;
    Ok(())
}

/// Write per-specimen results to a CSV file.
pub fn write_results_csv(path: &Path, entries: &[BatchEntry]) -> Result<()> {
    write_results_csv_to(create(path, "export CSV")?, entries)
}

#[derive(Serialize)]
struct JsonEntry<'a> {
    specimen_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a crate::domain::ClassificationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Write per-specimen results (including failures) as a JSON array.
pub fn write_results_json(path: &Path, entries: &[BatchEntry]) -> Result<()> {
    let rows: Vec<JsonEntry<'_>> = entries
        .iter()
        .map(|e| JsonEntry {
            specimen_id: &e.specimen_id,
            result: e.outcome.as_ref().ok(),
            error: e.outcome.as_ref().err().map(ToString::to_string),
        })
        .collect();
    serde_json::to_writer_pretty(create(path, "results JSON")?, &rows)
        .map_err(|e| AppError::io(format!("Failed to write results JSON: {e}")))
}

/// Write specimens in the JSON layout `load_specimens` reads back.
pub fn write_specimens_json(path: &Path, specimens: &[Specimen]) -> Result<()> {
    serde_json::to_writer_pretty(create(path, "specimen JSON")?, specimens)
        .map_err(|e| AppError::io(format!("Failed to write specimen JSON: {e}")))
}

/// Write an ablation time series.
pub fn write_series_csv(path: &Path, series: &[TrajectorySample]) -> Result<()> {
    let mut out = create(path, "series CSV")?;
    writeln!(out, "time_s,altitude_km,velocity_km_s,mass_kg,surface_temperature_k,heat_flux_mw_m2")
        .map_err(|e| AppError::io(format!("Failed to write series CSV header: {e}")))?;
    for s in series {
        writeln!(
            out,
            "{:.3},{:.4},{:.4},{:.6e},{:.2},{:.6}",
            s.time_s, s.altitude_km, s.velocity_km_s, s.mass_kg, s.surface_temperature_k, s.heat_flux_mw_m2
        )
        .map_err(row_err)?;
    }
    out.flush().map_err(row_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmiConfig;
    use crate::domain::{MineralComposition, Specimen};

    fn entries() -> Vec<BatchEntry> {
        let mut good = Specimen::new("good, one");
        good.mineralogy = Some(MineralComposition {
            fa: Some(18.5),
            fs: Some(16.5),
            d17o: Some(0.75),
            ..MineralComposition::default()
        });
        crate::app::pipeline::classify_batch(&[good, Specimen::new("empty")], &EmiConfig::default())
    }

    #[test]
    fn csv_rows_have_a_constant_column_count() {
        let mut buf = Vec::new();
        write_results_csv_to(&mut buf, &entries()).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let mut reader = csv::ReaderBuilder::new().from_reader(text.as_bytes());
        let width = reader.headers().unwrap().len();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.len(), width, "{row:?}");
        }
        assert_eq!(&rows[0][0], "good, one");
        assert_eq!(&rows[0][2], "UNAMBIGUOUS");
        assert!(rows[1][width - 1].contains("no measurement section"));
    }

    #[test]
    fn json_export_keeps_failures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        write_results_json(&path, &entries()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value[0]["result"]["mineral_group"], "H");
        assert!(value[1]["result"].is_null());
        assert!(value[1]["error"].as_str().unwrap().starts_with("Invalid input"));
    }
}
