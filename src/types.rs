use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::LoadError;

/// Product type label, e.g. `product_food`. Shelter rule columns use the same labels.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(pub String);

impl Category {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        Category(s.to_owned())
    }
}

/// Article identifier. Integer identifiers compare numerically and sort before
/// any non-numeric identifier; everything else compares as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(pub String);

impl ArticleId {
    fn numeric(&self) -> Option<i64> {
        self.0.trim().parse().ok()
    }
}

impl Ord for ArticleId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for ArticleId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArticleId {
    fn from(s: &str) -> Self {
        ArticleId(s.to_owned())
    }
}

/// A catalog entry. `volume` is already scaled by the configured volume factor
/// and truncated; `raw_volume` keeps the value as it was read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub article: ArticleId,
    pub category: Category,
    pub convenience_value: u32,
    pub raw_volume: f64,
    pub volume: i64,
    pub price: i64,
    /// The input row, one field per table column. Empty when the product was
    /// not read from a table.
    #[serde(default)]
    pub record: Vec<String>,
}

/// Scale a volume into model units. Truncates toward zero, never rounds.
pub fn scale_volume(raw_volume: f64, volume_factor: u32) -> i64 {
    (raw_volume * f64::from(volume_factor)) as i64
}

/// Per-category requirement of a shelter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRule", into = "String")]
pub enum ShelterRule {
    /// Exactly `n` products of the category.
    Exact(u32),
    /// Between `lo` and `hi` products, inclusive.
    Range(u32, u32),
}

impl FromStr for ShelterRule {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || LoadError::InvalidRule(s.to_owned());
        let parts = s
            .split('-')
            .map(|part| part.trim().parse::<u32>().map_err(|_| bad()))
            .collect::<Result<Vec<_>, _>>()?;

        match parts.as_slice() {
            [n] => Ok(ShelterRule::Exact(*n)),
            [lo, hi] => Ok(ShelterRule::Range(*lo, *hi)),
            _ => Err(bad()),
        }
    }
}

impl fmt::Display for ShelterRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShelterRule::Exact(n) => write!(f, "{n}"),
            ShelterRule::Range(lo, hi) => write!(f, "{lo}-{hi}"),
        }
    }
}

impl From<ShelterRule> for String {
    fn from(rule: ShelterRule) -> Self {
        rule.to_string()
    }
}

/// Rules may be written as a bare integer or as text in YAML.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawRule {
    Count(u32),
    Text(String),
}

impl TryFrom<RawRule> for ShelterRule {
    type Error = LoadError;

    fn try_from(raw: RawRule) -> Result<Self, Self::Error> {
        match raw {
            RawRule::Count(n) => Ok(ShelterRule::Exact(n)),
            RawRule::Text(s) => s.parse(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shelter {
    pub name: String,
    pub rules: BTreeMap<Category, ShelterRule>,
}

/// Run-wide numeric settings, read from `config.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub volume_factor: u32,
    pub volume_min: f64,
    pub volume_max: f64,
    pub price_meet: i64,
    #[serde(default)]
    pub time_limit_seconds: Option<f64>,
}

impl Config {
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.volume_factor == 0 {
            return Err(LoadError::InvalidConfig(
                "volume_factor must be positive".into(),
            ));
        }
        if !(self.volume_min <= self.volume_max) {
            return Err(LoadError::InvalidConfig(format!(
                "volume_min ({}) exceeds volume_max ({})",
                self.volume_min, self.volume_max
            )));
        }
        if self.price_meet < 0 {
            return Err(LoadError::InvalidConfig(
                "price_meet must not be negative".into(),
            ));
        }
        if let Some(limit) = self.time_limit_seconds {
            if !(limit > 0.0) {
                return Err(LoadError::InvalidConfig(
                    "time_limit_seconds must be positive".into(),
                ));
            }
        }
        Ok(())
    }

    /// Volume bounds in model units.
    pub fn scaled_volume_bounds(&self) -> (f64, f64) {
        let factor = f64::from(self.volume_factor);
        (self.volume_min * factor, self.volume_max * factor)
    }
}
