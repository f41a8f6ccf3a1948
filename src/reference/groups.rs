//! Meteorite group reference points.
//!
//! Groups are closed enums; every centroid lives in a lookup table keyed by the
//! enum so a group can never be requested without reference data.
//!
//! - `MineralGroup`: MCC centroids in (Fa mol%, Fs mol%, Δ¹⁷O ‰) for stony
//!   groups and (Ni wt%) for iron groups, with covariance matrices.
//! - `IsotopicGroup`: IAF centroids in the 7-D ε-anomaly space with a scalar
//!   intra-group dispersion.

use std::fmt;
use std::str::FromStr;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Group family; selects the composition axes and `d_max` used by MCC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupFamily {
    Stony,
    Iron,
}

impl GroupFamily {
    /// Number of composition axes for this family.
    pub fn dimension(self) -> usize {
        match self {
            GroupFamily::Stony => 3,
            GroupFamily::Iron => 1,
        }
    }
}

/// A reference point in composition space.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupCentroid {
    pub mean: Vec<f64>,
    pub covariance: DMatrix<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MineralGroup {
    H,
    L,
    LL,
    CO,
    CV,
    CR,
    IAB,
    IIAB,
    IIIAB,
    IVA,
    IVB,
}

impl MineralGroup {
    pub const ALL: [MineralGroup; 11] = [
        MineralGroup::H,
        MineralGroup::L,
        MineralGroup::LL,
        MineralGroup::CO,
        MineralGroup::CV,
        MineralGroup::CR,
        MineralGroup::IAB,
        MineralGroup::IIAB,
        MineralGroup::IIIAB,
        MineralGroup::IVA,
        MineralGroup::IVB,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MineralGroup::H => "H",
            MineralGroup::L => "L",
            MineralGroup::LL => "LL",
            MineralGroup::CO => "CO",
            MineralGroup::CV => "CV",
            MineralGroup::CR => "CR",
            MineralGroup::IAB => "IAB",
            MineralGroup::IIAB => "IIAB",
            MineralGroup::IIIAB => "IIIAB",
            MineralGroup::IVA => "IVA",
            MineralGroup::IVB => "IVB",
        }
    }

    pub fn family(self) -> GroupFamily {
        match self {
            MineralGroup::H
            | MineralGroup::L
            | MineralGroup::LL
            | MineralGroup::CO
            | MineralGroup::CV
            | MineralGroup::CR => GroupFamily::Stony,
            MineralGroup::IAB | MineralGroup::IIAB | MineralGroup::IIIAB | MineralGroup::IVA | MineralGroup::IVB => {
                GroupFamily::Iron
            }
        }
    }

    /// All groups of a family, in table order.
    pub fn of_family(family: GroupFamily) -> impl Iterator<Item = MineralGroup> {
        Self::ALL.into_iter().filter(move |g| g.family() == family)
    }

    /// Isotopic group sharing this name, if the group is represented in ε-space.
    pub fn isotopic_counterpart(self) -> Option<IsotopicGroup> {
        match self {
            MineralGroup::H => Some(IsotopicGroup::H),
            MineralGroup::L => Some(IsotopicGroup::L),
            MineralGroup::LL => Some(IsotopicGroup::LL),
            MineralGroup::CO => Some(IsotopicGroup::CO),
            MineralGroup::CV => Some(IsotopicGroup::CV),
            MineralGroup::CR => Some(IsotopicGroup::CR),
            _ => None,
        }
    }

    pub fn centroid(self) -> GroupCentroid {
        match self {
            MineralGroup::H => stony(
                [18.5, 16.5, 0.75],
                [[2.5, 1.2, 0.1], [1.2, 2.3, 0.08], [0.1, 0.08, 0.04]],
            ),
            MineralGroup::L => stony(
                [24.5, 21.0, 1.05],
                [[2.8, 1.4, 0.12], [1.4, 2.6, 0.1], [0.12, 0.1, 0.05]],
            ),
            MineralGroup::LL => stony(
                [29.0, 24.5, 1.25],
                [[3.0, 1.5, 0.15], [1.5, 2.8, 0.12], [0.15, 0.12, 0.06]],
            ),
            // Carbonaceous groups have no published covariance in the table; use 2·I.
            MineralGroup::CO => stony(
                [12.0, 3.5, -4.5],
                [[2.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 2.0]],
            ),
            MineralGroup::CV => stony(
                [8.5, 2.0, -3.8],
                [[2.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 2.0]],
            ),
            MineralGroup::CR => stony(
                [3.5, 2.0, -1.5],
                [[2.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 2.0]],
            ),
            MineralGroup::IAB => iron(8.5),
            MineralGroup::IIAB => iron(5.6),
            MineralGroup::IIIAB => iron(8.2),
            MineralGroup::IVA => iron(8.0),
            MineralGroup::IVB => iron(16.5),
        }
    }
}

fn stony(mean: [f64; 3], cov: [[f64; 3]; 3]) -> GroupCentroid {
    GroupCentroid {
        mean: mean.to_vec(),
        covariance: DMatrix::from_fn(3, 3, |i, j| cov[i][j]),
    }
}

// Unit variance keeps the iron distance in wt% Ni.
fn iron(ni: f64) -> GroupCentroid {
    GroupCentroid {
        mean: vec![ni],
        covariance: DMatrix::from_element(1, 1, 1.0),
    }
}

impl fmt::Display for MineralGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MineralGroup {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        MineralGroup::ALL
            .into_iter()
            .find(|g| g.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AppError::config(format!("Unknown mineralogical group '{wanted}'.")))
    }
}

/// A reference point in ε-anomaly space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsotopicCentroid {
    pub mean: [f64; 7],
    pub sigma: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IsotopicGroup {
    CI,
    CM,
    CR,
    CO,
    CV,
    CK,
    CH,
    CB,
    H,
    L,
    LL,
    EH,
    EL,
    HED,
    SNC,
    LUN,
    URE,
    AUB,
}

impl IsotopicGroup {
    pub const ALL: [IsotopicGroup; 18] = [
        IsotopicGroup::CI,
        IsotopicGroup::CM,
        IsotopicGroup::CR,
        IsotopicGroup::CO,
        IsotopicGroup::CV,
        IsotopicGroup::CK,
        IsotopicGroup::CH,
        IsotopicGroup::CB,
        IsotopicGroup::H,
        IsotopicGroup::L,
        IsotopicGroup::LL,
        IsotopicGroup::EH,
        IsotopicGroup::EL,
        IsotopicGroup::HED,
        IsotopicGroup::SNC,
        IsotopicGroup::LUN,
        IsotopicGroup::URE,
        IsotopicGroup::AUB,
    ];

    pub fn name(self) -> &'static str {
        match self {
            IsotopicGroup::CI => "CI",
            IsotopicGroup::CM => "CM",
            IsotopicGroup::CR => "CR",
            IsotopicGroup::CO => "CO",
            IsotopicGroup::CV => "CV",
            IsotopicGroup::CK => "CK",
            IsotopicGroup::CH => "CH",
            IsotopicGroup::CB => "CB",
            IsotopicGroup::H => "H",
            IsotopicGroup::L => "L",
            IsotopicGroup::LL => "LL",
            IsotopicGroup::EH => "EH",
            IsotopicGroup::EL => "EL",
            IsotopicGroup::HED => "HED",
            IsotopicGroup::SNC => "SNC",
            IsotopicGroup::LUN => "LUN",
            IsotopicGroup::URE => "URE",
            IsotopicGroup::AUB => "AUB",
        }
    }

    pub fn centroid(self) -> IsotopicCentroid {
        let (mean, sigma) = match self {
            IsotopicGroup::CI => ([0.00, 0.00, 0.00, 0.00, 0.00, 0.00, 0.00], 0.5),
            IsotopicGroup::CM => ([1.20, 0.88, -0.30, -0.20, 0.10, -0.10, 0.00], 0.6),
            IsotopicGroup::CR => ([2.10, 1.53, -0.80, -0.50, 0.30, -0.20, -0.10], 0.7),
            IsotopicGroup::CO => ([1.80, 1.20, -0.50, -0.30, 0.20, -0.15, -0.05], 0.6),
            IsotopicGroup::CV => ([1.50, 1.05, -0.40, -0.25, 0.15, -0.12, -0.03], 0.6),
            IsotopicGroup::CK => ([1.30, 0.95, -0.35, -0.22, 0.12, -0.11, -0.02], 0.6),
            IsotopicGroup::CH => ([2.20, 1.60, -0.90, -0.55, 0.35, -0.22, -0.12], 0.8),
            IsotopicGroup::CB => ([2.30, 1.70, -1.00, -0.60, 0.40, -0.25, -0.15], 0.8),
            IsotopicGroup::H => ([0.50, 0.30, 0.10, 0.05, 0.02, 0.01, 0.00], 0.4),
            IsotopicGroup::L => ([0.60, 0.40, 0.15, 0.08, 0.03, 0.02, 0.00], 0.4),
            IsotopicGroup::LL => ([0.70, 0.50, 0.20, 0.10, 0.04, 0.03, 0.00], 0.4),
            IsotopicGroup::EH => ([-0.20, -0.10, 0.00, 0.00, 0.00, 0.00, 0.00], 0.3),
            IsotopicGroup::EL => ([-0.15, -0.05, 0.00, 0.00, 0.00, 0.00, 0.00], 0.3),
            IsotopicGroup::HED => ([0.40, 0.25, 0.05, 0.02, 0.01, 0.00, 0.00], 0.4),
            IsotopicGroup::SNC => ([0.30, 0.20, 0.03, 0.01, 0.00, 0.00, 0.00], 0.4),
            IsotopicGroup::LUN => ([0.20, 0.15, 0.02, 0.01, 0.00, 0.00, 0.00], 0.3),
            IsotopicGroup::URE => ([0.80, 0.60, 0.25, 0.15, 0.05, 0.04, 0.02], 0.5),
            IsotopicGroup::AUB => ([-0.10, -0.05, 0.00, 0.00, 0.00, 0.00, 0.00], 0.3),
        };
        IsotopicCentroid { mean, sigma }
    }
}

impl fmt::Display for IsotopicGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centroid_dimensions_match_family() {
        for group in MineralGroup::ALL {
            let c = group.centroid();
            let n = group.family().dimension();
            assert_eq!(c.mean.len(), n, "{group}");
            assert_eq!(c.covariance.nrows(), n, "{group}");
            assert_eq!(c.covariance.ncols(), n, "{group}");
        }
    }

    #[test]
    fn covariances_are_symmetric() {
        for group in MineralGroup::ALL {
            let cov = group.centroid().covariance;
            assert_eq!(cov.clone(), cov.transpose(), "{group}");
        }
    }

    #[test]
    fn group_names_parse_case_insensitively() {
        assert_eq!("ll".parse::<MineralGroup>().unwrap(), MineralGroup::LL);
        assert_eq!(" IIIAB ".parse::<MineralGroup>().unwrap(), MineralGroup::IIIAB);
        assert!(matches!("XYZ".parse::<MineralGroup>(), Err(AppError::Configuration(_))));
    }

    #[test]
    fn isotopic_dispersions_are_positive() {
        for group in IsotopicGroup::ALL {
            assert!(group.centroid().sigma > 0.0, "{group}");
        }
    }
}
