use serde::{Deserialize, Serialize};

/// Field holding the completion candidates of each document
pub const SUGGEST_FIELD: &str = "name_suggest";

/// A single catalog entry as read from the dataset
///
/// Absent fields fall back to empty values so a sparse row or stored
/// document still yields a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MedicineRecord {
    /// Brand name
    pub name: String,

    /// Active ingredient / generic name
    pub generic_name: String,

    /// Manufacturer (exact-match facet)
    pub manufacturer: String,

    /// Therapeutic category (exact-match facet)
    pub category: String,

    /// Unit price; blank or unparsable values become `None`
    #[serde(deserialize_with = "csv::invalid_option")]
    pub price: Option<f64>,

    /// Dosage strength, e.g. "500mg"
    pub dosage: String,

    /// Free-text description
    pub description: String,
}

/// Completion candidates seeded into the suggestion field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameSuggest {
    pub input: Vec<String>,
    pub weight: u32,
}

impl NameSuggest {
    /// Uniform ranking weight given to every record
    pub const DEFAULT_WEIGHT: u32 = 1;
}

/// Indexed form of a record: the record plus its completion entry
#[derive(Debug, Clone, Serialize)]
pub struct MedicineDocument<'a> {
    #[serde(flatten)]
    pub record: &'a MedicineRecord,

    pub name_suggest: NameSuggest,
}

impl<'a> From<&'a MedicineRecord> for MedicineDocument<'a> {
    fn from(record: &'a MedicineRecord) -> Self {
        let input = [&record.name, &record.generic_name]
            .into_iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            record,
            name_suggest: NameSuggest {
                input,
                weight: NameSuggest::DEFAULT_WEIGHT,
            },
        }
    }
}

/// A search result: the stored record plus the engine's relevance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub record: MedicineRecord,

    pub score: Option<f64>,
}
