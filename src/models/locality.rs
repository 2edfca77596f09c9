//! Locality records and the fixed administrative hierarchy.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Categorical locality type as used by the dataset.
///
/// Declaration order is the hierarchy order: broadest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum LocalityType {
    Country,
    County,
    State,
    Region,
    Province,
    District,
    City,
    Town,
    Village,
    Hamlet,
    Borough,
    Suburb,
    Neighborhood,
    Municipality,
}

/// Rank given to localities that carry no locality type.
pub const DEFAULT_RANK: u8 = 0;

impl LocalityType {
    /// Get all locality types in hierarchical order (country first)
    pub fn all() -> &'static [LocalityType] {
        &[
            LocalityType::Country,
            LocalityType::County,
            LocalityType::State,
            LocalityType::Region,
            LocalityType::Province,
            LocalityType::District,
            LocalityType::City,
            LocalityType::Town,
            LocalityType::Village,
            LocalityType::Hamlet,
            LocalityType::Borough,
            LocalityType::Suburb,
            LocalityType::Neighborhood,
            LocalityType::Municipality,
        ]
    }

    /// Position in the hierarchy order (country=0 ... municipality=13)
    pub fn rank(&self) -> u8 {
        match self {
            LocalityType::Country => 0,
            LocalityType::County => 1,
            LocalityType::State => 2,
            LocalityType::Region => 3,
            LocalityType::Province => 4,
            LocalityType::District => 5,
            LocalityType::City => 6,
            LocalityType::Town => 7,
            LocalityType::Village => 8,
            LocalityType::Hamlet => 9,
            LocalityType::Borough => 10,
            LocalityType::Suburb => 11,
            LocalityType::Neighborhood => 12,
            LocalityType::Municipality => 13,
        }
    }

    /// Get the dataset name for this type
    pub fn as_str(&self) -> &'static str {
        match self {
            LocalityType::Country => "country",
            LocalityType::County => "county",
            LocalityType::State => "state",
            LocalityType::Region => "region",
            LocalityType::Province => "province",
            LocalityType::District => "district",
            LocalityType::City => "city",
            LocalityType::Town => "town",
            LocalityType::Village => "village",
            LocalityType::Hamlet => "hamlet",
            LocalityType::Borough => "borough",
            LocalityType::Suburb => "suburb",
            LocalityType::Neighborhood => "neighborhood",
            LocalityType::Municipality => "municipality",
        }
    }
}

impl std::fmt::Display for LocalityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Axis-aligned bounding box in single precision, as stored by the dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

impl BBox {
    pub fn new(xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Corners widened to double precision: `([xmin, ymin], [xmax, ymax])`
    pub fn corners(&self) -> ([f64; 2], [f64; 2]) {
        (
            [self.xmin as f64, self.ymin as f64],
            [self.xmax as f64, self.ymax as f64],
        )
    }
}

/// Deserialize an explicit `null` the same way as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Provenance of one property of a feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default, deserialize_with = "null_as_default")]
    pub property: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
}

/// Attributes shared by every dataset feature, emitted as `base`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub theme: String,
    #[serde(default, rename = "type", deserialize_with = "null_as_default")]
    pub feature_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub version: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub update_time: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sources: Vec<Source>,
}

/// A naming rule: a variant name, optionally tagged with a language.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NameRule {
    #[serde(default, deserialize_with = "null_as_default")]
    pub variant: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: String,
    #[serde(default)]
    pub language: Option<String>,
}

/// Primary name plus localized and variant names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalityNames {
    #[serde(default, deserialize_with = "null_as_default")]
    pub primary: String,
    /// Localized names keyed by language tag: {"en": "...", "fr": "..."}
    #[serde(default, deserialize_with = "null_as_default")]
    pub common: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rules: Vec<NameRule>,
}

/// An administrative area record (country, state, city, ...).
///
/// Field names match the JSON returned by reverse lookups.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Locality {
    pub id: String,
    pub bbox: Option<BBox>,
    pub admin_level: Option<i64>,
    pub is_maritime: Option<bool>,
    pub geopol_display: Option<String>,
    pub subtype: Option<String>,
    pub locality_type: Option<LocalityType>,
    pub wikidata: Option<String>,
    /// Most granular locality that logically contains this one
    pub context_id: Option<String>,
    pub population: Option<i64>,
    pub iso_country_code_alpha_2: Option<String>,
    pub iso_sub_country_code: Option<String>,
    pub default_language: Option<String>,
    pub driving_side: Option<String>,
    pub names: LocalityNames,
    pub base: SourceInfo,
}

impl Locality {
    pub fn new(id: impl Into<String>, locality_type: Option<LocalityType>) -> Self {
        Self {
            id: id.into(),
            locality_type,
            ..Default::default()
        }
    }

    /// Hierarchy rank used for ordering results
    pub fn rank(&self) -> u8 {
        self.locality_type
            .map(|t| t.rank())
            .unwrap_or(DEFAULT_RANK)
    }

    /// Primary name, if the record has one
    pub fn primary_name(&self) -> Option<&str> {
        if self.names.primary.is_empty() {
            None
        } else {
            Some(&self.names.primary)
        }
    }
}
