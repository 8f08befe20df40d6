use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelThreshold {
    pub name: String,
    pub min_xp: i64,
}

impl LevelThreshold {
    pub fn new(name: impl Into<String>, min_xp: i64) -> Self {
        Self {
            name: name.into(),
            min_xp,
        }
    }
}

/// Inclusive XP range; an absent bound is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpRange {
    #[serde(default)]
    pub min: Option<i64>,
    #[serde(default)]
    pub max: Option<i64>,
}

impl XpRange {
    pub fn contains(&self, xp: i64) -> bool {
        self.min.map_or(true, |min| xp >= min) && self.max.map_or(true, |max| xp <= max)
    }
}

/// A band checked before the table scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelOverride {
    pub name: String,
    #[serde(flatten)]
    pub range: XpRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelTable {
    thresholds: Vec<LevelThreshold>,
    overrides: Vec<LevelOverride>,
}

impl LevelTable {
    /// Validate and build a table. Thresholds must be non-empty and strictly
    /// increasing by `min_xp`.
    pub fn new(thresholds: Vec<LevelThreshold>) -> Result<Self> {
        let Some(first) = thresholds.first() else {
            return Err(ConfigurationError::EmptyLevelTable);
        };

        let mut previous = first;
        for threshold in &thresholds[1..] {
            if threshold.min_xp <= previous.min_xp {
                return Err(ConfigurationError::UnorderedLevelTable {
                    previous: previous.name.clone(),
                    previous_xp: previous.min_xp,
                    name: threshold.name.clone(),
                    min_xp: threshold.min_xp,
                });
            }
            previous = threshold;
        }

        Ok(Self {
            thresholds,
            overrides: Vec::new(),
        })
    }

    pub fn with_overrides(mut self, overrides: Vec<LevelOverride>) -> Result<Self> {
        for band in &overrides {
            if let (Some(min), Some(max)) = (band.range.min, band.range.max) {
                if min > max {
                    return Err(ConfigurationError::InvertedOverride {
                        name: band.name.clone(),
                        min,
                        max,
                    });
                }
            }
        }
        self.overrides = overrides;
        Ok(self)
    }

    pub fn thresholds(&self) -> &[LevelThreshold] {
        &self.thresholds
    }

    pub fn overrides(&self) -> &[LevelOverride] {
        &self.overrides
    }

    /// Level name for `xp`: the first matching override, else the greatest
    /// threshold not above `xp`, else the floor band.
    pub fn classify(&self, xp: i64) -> &str {
        if let Some(band) = self.overrides.iter().find(|band| band.range.contains(xp)) {
            return &band.name;
        }
        &self.threshold_for(xp).name
    }

    /// Table scan only, ignoring overrides.
    pub fn threshold_for(&self, xp: i64) -> &LevelThreshold {
        self.thresholds
            .iter()
            .rev()
            .find(|threshold| threshold.min_xp <= xp)
            .unwrap_or(&self.thresholds[0])
    }

    /// Position of the band that `threshold_for(xp)` returns.
    pub fn index_for(&self, xp: i64) -> usize {
        self.thresholds
            .iter()
            .rposition(|threshold| threshold.min_xp <= xp)
            .unwrap_or(0)
    }

    /// The band directly above `threshold_for(xp)`, if any.
    pub fn next_after(&self, xp: i64) -> Option<&LevelThreshold> {
        self.thresholds.get(self.index_for(xp) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_table() -> LevelTable {
        LevelTable::new(vec![
            LevelThreshold::new("Beginner", 0),
            LevelThreshold::new("Novice", 10),
            LevelThreshold::new("Junior", 20),
        ])
        .unwrap()
    }

    fn negative_bands() -> Vec<LevelOverride> {
        vec![
            LevelOverride {
                name: "Maymuncha".to_string(),
                range: XpRange {
                    min: Some(-99),
                    max: Some(-1),
                },
            },
            LevelOverride {
                name: "Yalqov".to_string(),
                range: XpRange {
                    min: None,
                    max: Some(-100),
                },
            },
        ]
    }

    #[test]
    fn picks_greatest_lower_bound() {
        let table = small_table();
        assert_eq!(table.classify(15), "Novice");
        assert_eq!(table.classify(10), "Novice");
        assert_eq!(table.classify(20), "Junior");
        assert_eq!(table.classify(9_999), "Junior");
    }

    #[test]
    fn below_every_band_falls_to_floor() {
        assert_eq!(small_table().classify(-5), "Beginner");
    }

    #[test]
    fn negative_bands_in_the_table() {
        let table = LevelTable::new(vec![
            LevelThreshold::new("Yalqov", -100),
            LevelThreshold::new("Maymuncha", -1),
            LevelThreshold::new("Beginner", 0),
        ])
        .unwrap();
        assert_eq!(table.classify(-1), "Maymuncha");
        assert_eq!(table.classify(-50), "Yalqov");
        assert_eq!(table.classify(-500), "Yalqov");
        assert_eq!(table.classify(0), "Beginner");
    }

    #[test]
    fn overrides_run_before_the_scan() {
        let table = small_table().with_overrides(negative_bands()).unwrap();
        assert_eq!(table.classify(-1), "Maymuncha");
        assert_eq!(table.classify(-99), "Maymuncha");
        assert_eq!(table.classify(-100), "Yalqov");
        assert_eq!(table.classify(-4_000), "Yalqov");
        assert_eq!(table.classify(0), "Beginner");
        // overrides never affect the plain table scan
        assert_eq!(table.threshold_for(-50).name, "Beginner");
    }

    #[test]
    fn empty_table_is_rejected() {
        assert!(matches!(
            LevelTable::new(Vec::new()),
            Err(ConfigurationError::EmptyLevelTable)
        ));
    }

    #[test]
    fn unordered_table_is_rejected() {
        let err = LevelTable::new(vec![
            LevelThreshold::new("Beginner", 0),
            LevelThreshold::new("Novice", 10),
            LevelThreshold::new("Duplicate", 10),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::UnorderedLevelTable { ref name, min_xp: 10, .. } if name == "Duplicate"
        ));
    }

    #[test]
    fn inverted_override_is_rejected() {
        let band = LevelOverride {
            name: "Broken".to_string(),
            range: XpRange {
                min: Some(5),
                max: Some(-5),
            },
        };
        assert!(matches!(
            small_table().with_overrides(vec![band]),
            Err(ConfigurationError::InvertedOverride { min: 5, max: -5, .. })
        ));
    }

    #[test]
    fn next_band_lookup() {
        let table = small_table();
        assert_eq!(table.next_after(-5).map(|t| t.name.as_str()), Some("Novice"));
        assert_eq!(table.next_after(12).map(|t| t.name.as_str()), Some("Junior"));
        assert_eq!(table.next_after(25), None);
    }
}
