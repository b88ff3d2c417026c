use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Integer privilege rank of a user. Higher is more privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessLevel(pub i32);

impl AccessLevel {
    pub const DISPO: AccessLevel = AccessLevel(0);
    pub const IDL: AccessLevel = AccessLevel(1);
    pub const SL: AccessLevel = AccessLevel(2);
    pub const GBL: AccessLevel = AccessLevel(3);
    pub const VERWALTUNG: AccessLevel = AccessLevel(4);
    pub const ADMIN: AccessLevel = AccessLevel(9);

    pub fn value(self) -> i32 { self.0 }
}

impl From<i32> for AccessLevel {
    fn from(v: i32) -> Self { AccessLevel(v) }
}

impl Display for AccessLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One "at least" band of the label table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelBand {
    pub min: AccessLevel,
    pub label: &'static str,
}

pub const BASELINE_LABEL: &str = "Dispo";

/// Label bands, highest threshold first. Levels below every band get `BASELINE_LABEL`.
pub const LEVEL_BANDS: &[LevelBand] = &[
    LevelBand { min: AccessLevel::ADMIN, label: "Admin" },
    LevelBand { min: AccessLevel::VERWALTUNG, label: "Verwaltung" },
    LevelBand { min: AccessLevel::GBL, label: "GBL" },
    LevelBand { min: AccessLevel::SL, label: "SL" },
    LevelBand { min: AccessLevel::IDL, label: "IDL" },
    LevelBand { min: AccessLevel::DISPO, label: BASELINE_LABEL },
];

/// First band whose threshold the level reaches; `bands` must be sorted descending.
pub(crate) fn band_label(bands: &[LevelBand], level: Option<AccessLevel>) -> &'static str {
    let Some(level) = level else { return BASELINE_LABEL; };
    bands
        .iter()
        .find(|b| level >= b.min)
        .map(|b| b.label)
        .unwrap_or(BASELINE_LABEL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_are_descending() {
        for pair in LEVEL_BANDS.windows(2) {
            assert!(pair[0].min > pair[1].min, "{:?} before {:?}", pair[0], pair[1]);
        }
        assert_eq!(LEVEL_BANDS.len(), 6);
    }

    #[test]
    fn levels_between_thresholds_fall_into_lower_band() {
        assert_eq!(band_label(LEVEL_BANDS, Some(AccessLevel(5))), "Verwaltung");
        assert_eq!(band_label(LEVEL_BANDS, Some(AccessLevel(8))), "Verwaltung");
        assert_eq!(band_label(LEVEL_BANDS, Some(AccessLevel(42))), "Admin");
    }

    #[test]
    fn below_every_band_is_baseline() {
        assert_eq!(band_label(LEVEL_BANDS, Some(AccessLevel(-7))), BASELINE_LABEL);
        assert_eq!(band_label(&[], Some(AccessLevel(3))), BASELINE_LABEL);
        assert_eq!(band_label(LEVEL_BANDS, None), BASELINE_LABEL);
    }
}
