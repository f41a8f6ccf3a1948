//! Specimen ingest from CSV and JSON.
//!
//! CSV layout: one specimen per row, one column per measured quantity. Headers
//! are matched case-insensitively with spaces and dashes folded to `_`, and a
//! few common aliases are accepted (`δ17O`, `velocity`, `bandwidth_mm`, ...).
//!
//! A measurement section is built only when at least one of its columns has a
//! value on that row. Rows with unparsable numbers or incomplete sections are
//! reported with their line number and skipped.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use serde::Deserialize;
use tracing::{info, warn};

use crate::domain::{
    EntryParameters, IsotopeVector, MineralComposition, NuclideData, ShockIndicators, SiderophileData, Specimen,
    WeatheringIndicators,
};
use crate::error::{AppError, Result};
use crate::reference::{EntryComposition, HseElement, MineralGroup, Nuclide};

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub id: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct IngestedSpecimens {
    pub specimens: Vec<Specimen>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

const SHOCK_COLUMNS: [&str; 6] = [
    "olivine_planar",
    "feldspar_state",
    "metal_melting",
    "high_pressure_phases",
    "sulfide_state",
    "porosity",
];

const WEATHERING_COLUMNS: [&str; 5] = [
    "metal_oxidation",
    "phyllosilicate",
    "carbonate_veins",
    "be_ne_deviation",
    "fe_ni_deviation",
];

const ISOTOPE_COLUMNS: [&str; 7] = [
    "eps_ti50",
    "eps_cr54",
    "eps_mo96",
    "eps_mo100",
    "eps_ru92",
    "eps_ba137",
    "eps_nd142",
];

/// Load specimens from `path`, choosing the format by extension (`.json` or CSV).
pub fn load_specimens(path: &Path) -> Result<IngestedSpecimens> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open input '{}': {e}", path.display())))?;

    let ingested = if is_json {
        read_specimens_json(file)?
    } else {
        read_specimens_csv(file)?
    };
    for err in &ingested.row_errors {
        warn!(line = err.line, id = err.id.as_deref().unwrap_or(""), "{}", err.message);
    }
    if ingested.specimens.is_empty() {
        return Err(AppError::invalid(format!(
            "No valid specimen in '{}' ({} rows read, {} rejected).",
            path.display(),
            ingested.rows_read,
            ingested.row_errors.len()
        )));
    }
    info!(
        path = %path.display(),
        specimens = ingested.specimens.len(),
        rejected = ingested.row_errors.len(),
        "ingested specimens"
    );
    Ok(ingested)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<Specimen>),
    One(Box<Specimen>),
}

/// JSON input: a single specimen object or an array of them.
pub fn read_specimens_json<R: Read>(reader: R) -> Result<IngestedSpecimens> {
    let parsed: OneOrMany =
        serde_json::from_reader(reader).map_err(|e| AppError::invalid(format!("Invalid specimen JSON: {e}")))?;
    let mut specimens = match parsed {
        OneOrMany::Many(v) => v,
        OneOrMany::One(s) => vec![*s],
    };
    for (i, s) in specimens.iter_mut().enumerate() {
        if s.id.trim().is_empty() {
            s.id = format!("specimen-{}", i + 1);
        }
    }
    let rows_read = specimens.len();
    Ok(IngestedSpecimens {
        specimens,
        row_errors: Vec::new(),
        rows_read,
    })
}

pub fn read_specimens_csv<R: Read>(reader: R) -> Result<IngestedSpecimens> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::invalid(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    if !header_map.contains_key("id") {
        return Err(AppError::invalid("Missing required column: `id`"));
    }

    let mut specimens = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Line numbers are 1-based and the header occupies line 1.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    id: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let id = get_optional(&record, &header_map, "id").map(str::to_string);
        match parse_row(&record, &header_map) {
            Ok(specimen) => specimens.push(specimen),
            Err(message) => row_errors.push(RowError { line, id, message }),
        }
    }

    Ok(IngestedSpecimens {
        specimens,
        row_errors,
        rows_read,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (canonical_column(&normalize_header_name(name)), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_lowercase().replace([' ', '-'], "_")
}

fn canonical_column(name: &str) -> String {
    let canonical = match name {
        "specimen" | "specimen_id" => "id",
        "fa_mol" | "fayalite" => "fa",
        "fs_mol" | "ferrosilite" => "fs",
        "δ17o" | "delta17o" | "d17o_permil" | "cap_delta_17o" => "d17o",
        "ni_wt" | "ni_wt%" | "nickel" => "ni",
        "group" => "target_group",
        "peak_pressure" | "pressure_estimates_gpa" => "peak_pressure_gpa",
        "velocity" | "velocity_kms" => "velocity_km_s",
        "angle" => "angle_deg",
        "diameter" => "diameter_m",
        "bandwidth_mm" | "widmanstatten_bandwidth_mm" | "kamacite_bandwidth_mm" => "bandwidth_mm",
        "depth_cm" | "shielding_depth" => "shielding_depth_cm",
        other => other,
    };
    canonical.to_string()
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> std::result::Result<Specimen, String> {
    let mut specimen = Specimen::new(get_required(record, header_map, "id")?);
    specimen.name = get_optional(record, header_map, "name").map(str::to_string);

    let num = |name: &str| parse_f64(record, header_map, name);

    // Mineralogy
    let (fa, fs, d17o, ni) = (num("fa")?, num("fs")?, num("d17o")?, num("ni")?);
    let target_group = get_optional(record, header_map, "target_group")
        .map(|s| s.parse::<MineralGroup>().map_err(|e| e.to_string()))
        .transpose()?;
    if fa.is_some() || fs.is_some() || d17o.is_some() || ni.is_some() || target_group.is_some() {
        specimen.mineralogy = Some(MineralComposition {
            fa,
            fs,
            d17o,
            ni,
            target_group,
        });
    }

    // Shock
    let mut shock_values = [None; 6];
    for (slot, name) in shock_values.iter_mut().zip(SHOCK_COLUMNS) {
        *slot = num(name)?;
    }
    let pressure_estimates_gpa = match get_optional(record, header_map, "peak_pressure_gpa") {
        Some(s) => s
            .split(';')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| p.parse::<f64>().map_err(|_| format!("Invalid number in `peak_pressure_gpa`: '{p}'")))
            .collect::<std::result::Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };
    if shock_values.iter().any(Option::is_some) || !pressure_estimates_gpa.is_empty() {
        let [olivine_planar, feldspar_state, metal_melting, high_pressure_phases, sulfide_state, porosity] =
            shock_values;
        specimen.shock = Some(ShockIndicators {
            olivine_planar,
            feldspar_state,
            metal_melting,
            high_pressure_phases,
            sulfide_state,
            porosity,
            pressure_estimates_gpa,
        });
    }

    // Weathering
    let mut w = [None; 5];
    for (slot, name) in w.iter_mut().zip(WEATHERING_COLUMNS) {
        *slot = num(name)?;
    }
    if w.iter().any(Option::is_some) {
        let [metal_oxidation, phyllosilicate, carbonate_veins, be_ne_deviation, fe_ni_deviation] = w;
        specimen.weathering = Some(WeatheringIndicators {
            metal_oxidation,
            phyllosilicate,
            carbonate_veins,
            be_ne_deviation,
            fe_ni_deviation,
        });
    }

    // Isotopes: all seven or none.
    let mut eps = [None; 7];
    for (slot, name) in eps.iter_mut().zip(ISOTOPE_COLUMNS) {
        *slot = num(name)?;
    }
    if eps.iter().any(Option::is_some) {
        let mut v = [0.0; 7];
        for ((dst, src), name) in v.iter_mut().zip(eps).zip(ISOTOPE_COLUMNS) {
            *dst = src.ok_or_else(|| format!("Isotope vector is incomplete: missing `{name}`."))?;
        }
        specimen.isotopes = Some(IsotopeVector::from_array(v));
    }

    // Entry
    let (velocity, angle, diameter) = (num("velocity_km_s")?, num("angle_deg")?, num("diameter_m")?);
    let composition = get_optional(record, header_map, "composition")
        .map(|s| s.parse::<EntryComposition>().map_err(|e| e.to_string()))
        .transpose()?;
    if velocity.is_some() || angle.is_some() || diameter.is_some() || composition.is_some() {
        let need = |v: Option<f64>, name: &str| v.ok_or_else(|| format!("Entry parameters need `{name}`."));
        specimen.entry = Some(EntryParameters {
            velocity_km_s: need(velocity, "velocity_km_s")?,
            angle_deg: need(angle, "angle_deg")?,
            diameter_m: need(diameter, "diameter_m")?,
            composition: composition.unwrap_or_default(),
        });
    }

    // Siderophiles
    let mut hse = SiderophileData::default();
    for element in HseElement::ALL {
        if let Some(c) = num(&element.symbol().to_ascii_lowercase())? {
            hse.concentrations.insert(element, c);
        }
    }
    hse.widmanstatten_bandwidth_mm = num("bandwidth_mm")?;
    if !hse.concentrations.is_empty() || hse.widmanstatten_bandwidth_mm.is_some() {
        specimen.siderophiles = Some(hse);
    }

    // Nuclides
    let mut nuclides = NuclideData::default();
    for nuclide in Nuclide::ALL {
        if let Some(c) = num(nuclide.key())? {
            nuclides.concentrations.insert(nuclide, c);
        }
    }
    nuclides.shielding_depth_cm = num("shielding_depth_cm")?;
    if !nuclides.concentrations.is_empty() || nuclides.shielding_depth_cm.is_some() {
        specimen.nuclides = Some(nuclides);
    }

    Ok(specimen)
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> std::result::Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

/// Empty cell -> `None`; unparsable or non-finite -> row error.
fn parse_f64(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> std::result::Result<Option<f64>, String> {
    let Some(s) = get_optional(record, header_map, name) else {
        return Ok(None);
    };
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(format!("Invalid number in `{name}`: '{s}'")),
    }
}
