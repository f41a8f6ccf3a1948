//! Formatted terminal output.
//!
//! Formatting lives here so calculators and the pipeline stay free of
//! presentation concerns, and output changes stay localized.

use crate::app::pipeline::BatchEntry;
use crate::domain::{ClassificationLevel, ClassificationResult, Parameter};
use crate::emi::Composite;
use crate::params::AtpResult;
use crate::report::level_counts;

/// Full single-specimen report: composite, per-parameter table and derived quantities.
pub fn format_result(result: &ClassificationResult) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== METEORICA EMI: {} ===\n", result.specimen_id));
    out.push_str(&format!("EMI: {:.4} | {}\n", result.emi, result.level.display_name()));
    out.push_str(&format!("Action: {}\n", result.level.action()));
    if result.low_confidence() {
        out.push_str("Warning: one or more parameters are low-confidence.\n");
    }

    out.push('\n');
    out.push_str(&format!("{:<6} {:>12} {:>8} {:<18} {}\n", "param", "raw", "norm", "grade", "derived").trim_end());
    out.push('\n');
    out.push_str(&format!("{:-<6} {:-<12} {:-<8} {:-<18} {:-<24}", "", "", "", "", ""));
    out.push('\n');
    for r in &result.parameters {
        let s = &r.score;
        let derived = s
            .derived
            .map(|d| format!("{} {:.4} {}", d.label(), d.value(), d.unit()))
            .unwrap_or_default();
        let flag = if s.low_confidence { " (!)" } else { "" };
        out.push_str(
            format!(
                "{:<6} {:>12.4} {:>8.4} {:<18} {}{flag}\n",
                s.parameter.display_name(),
                s.raw,
                r.normalized,
                truncate(&s.grade, 18),
                derived.trim_end(),
            )
            .trim_end(),
        );
        out.push('\n');
    }
    if !result.missing.is_empty() {
        out.push_str(&format!("Skipped (no data): {}\n", join_params(&result.missing)));
    }

    out.push('\n');
    let mut facts: Vec<(&str, String)> = Vec::new();
    if let Some(g) = &result.mineral_group {
        facts.push(("mineral group", g.clone()));
    }
    if let Some(g) = &result.isotopic_group {
        let presolar = if result.presolar_candidate { " (presolar candidate)" } else { "" };
        facts.push(("isotopic group", format!("{g}{presolar}")));
    }
    if let Some(s) = &result.shock_stage {
        facts.push(("shock stage", s.clone()));
    }
    if let Some(w) = &result.weathering_grade {
        facts.push(("weathering grade", w.clone()));
    }
    if let Some(t) = result.terrestrial_age_years {
        facts.push(("terrestrial age", format!("{t:.0} yr")));
    }
    if let Some(c) = result.cre_age_ma {
        let history = result.exposure_history.as_deref().unwrap_or("");
        facts.push(("CRE age", format!("{c:.3} Ma {history}").trim_end().to_string()));
    }
    if let Some(t) = result.peak_temperature_c {
        facts.push(("peak surface T", format!("{t:.0} °C")));
    }
    if let Some(t) = &result.parent_body_type {
        facts.push(("parent body", t.clone()));
    }
    if let Some(r) = result.parent_body_radius_km {
        facts.push(("parent body radius", format!("{r:.1} km")));
    }
    for (k, v) in facts {
        out.push_str(&format!("- {k}: {v}\n"));
    }

    out
}

/// One line per specimen plus per-level counts.
pub fn format_batch(entries: &[BatchEntry]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<24} {:>8} {:<20} {:<8} {}\n", "id", "emi", "level", "group", "note").trim_end());
    out.push('\n');
    out.push_str(&format!("{:-<24} {:-<8} {:-<20} {:-<8} {:-<12}", "", "", "", "", ""));
    out.push('\n');

    for entry in entries {
        let line = match &entry.outcome {
            Ok(r) => {
                let note = if r.low_confidence() { "low confidence" } else { "" };
                format!(
                    "{:<24} {:>8.4} {:<20} {:<8} {note}",
                    truncate(&entry.specimen_id, 24),
                    r.emi,
                    r.level.display_name(),
                    r.mineral_group.as_deref().unwrap_or("-"),
                )
            }
            Err(e) => format!("{:<24} {:>8} {:<20} {:<8} {e}", truncate(&entry.specimen_id, 24), "-", "FAILED", "-"),
        };
        out.push_str(line.trim_end());
        out.push('\n');
    }

    let counts = level_counts(entries);
    let failed = entries.iter().filter(|e| e.outcome.is_err()).count();
    out.push_str(&format!("\nSpecimens: {} | failed: {failed}\n", entries.len()));
    for level in ClassificationLevel::ALL {
        out.push_str(&format!("  {:<20} {}\n", level.display_name(), counts.get(&level).copied().unwrap_or(0)));
    }
    out
}

/// Composite from raw scores (the `calculate` command).
pub fn format_composite(composite: &Composite) -> String {
    let mut out = String::new();
    out.push_str(&format!("EMI: {:.4} | {}\n", composite.emi, composite.level.display_name()));
    out.push_str(&format!("Action: {}\n", composite.level.action()));
    for (p, n) in composite.normalized.iter() {
        if let Some(n) = n {
            out.push_str(&format!("  {:<6} {n:.4}\n", p.display_name()));
        }
    }
    if !composite.missing.is_empty() {
        out.push_str(&format!("Skipped (no value): {}\n", join_params(&composite.missing)));
    }
    out
}

pub fn format_atp(result: &AtpResult) -> String {
    let mut out = String::new();
    out.push_str("=== Ablation thermal profile ===\n");
    out.push_str(&format!(
        "Peak surface T: {:.0} K ({:.0} °C ± {:.0} K) | {}\n",
        result.peak_temperature_k,
        result.peak_temperature_c,
        result.precision_k,
        result.regime.label()
    ));
    out.push_str(&format!(
        "Peak heat flux: {:.3} MW/m² at t={:.2}s, {:.1} km\n",
        result.peak_heat_flux_mw_m2, result.time_to_peak_s, result.peak_altitude_km
    ));
    out.push_str(&format!("Fusion crust: {:.2} mm\n", result.fusion_crust_mm));
    out.push_str(&format!(
        "Termination: {} at {:.1} km | final mass {:.3e} kg\n",
        result.termination.label(),
        result.termination_altitude_km,
        result.final_mass_kg
    ));
    if let Some(a) = &result.airburst {
        out.push_str(&format!("Airburst: {:.1} km, {:.1} kt TNT\n", a.altitude_km, a.energy_kt));
    }
    out
}

fn join_params(params: &[Parameter]) -> String {
    params.iter().map(|p| p.display_name()).collect::<Vec<_>>().join(", ")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::{classify_batch, classify_specimen};
    use crate::config::EmiConfig;
    use crate::domain::{MineralComposition, Specimen};

    fn h_chondrite() -> Specimen {
        let mut s = Specimen::new("H-1");
        s.mineralogy = Some(MineralComposition {
            fa: Some(18.5),
            fs: Some(16.5),
            d17o: Some(0.75),
            ..MineralComposition::default()
        });
        s
    }

    #[test]
    fn result_report_lists_parameters_and_skips() {
        let r = classify_specimen(&h_chondrite(), &EmiConfig::default()).unwrap();
        let text = format_result(&r);
        assert!(text.contains("=== METEORICA EMI: H-1 ==="));
        assert!(text.contains("UNAMBIGUOUS"));
        assert!(text.lines().any(|l| l.starts_with("MCC")));
        assert!(text.contains("Skipped (no data): SMG, TWI, IAF, ATP, PBDR, CNEA"));
        assert!(text.contains("- mineral group: H"));
    }

    #[test]
    fn batch_report_counts_levels_and_failures() {
        let entries = classify_batch(&[h_chondrite(), Specimen::new("blank")], &EmiConfig::default());
        let text = format_batch(&entries);
        assert!(text.contains("Specimens: 2 | failed: 1"));
        assert!(text.lines().any(|l| l.trim_start().starts_with("UNAMBIGUOUS") && l.trim_end().ends_with('1')));
        assert!(text.lines().any(|l| l.starts_with("blank") && l.contains("FAILED")));
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
