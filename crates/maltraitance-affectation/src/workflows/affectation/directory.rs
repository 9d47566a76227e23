//! In-memory lookup directories backing the geography and entity collaborators.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use super::domain::{EntiteAdminType, EntiteId};
use super::geo::{GeoEntite, GeoResolver};
use super::repository::{EntiteQuery, EntiteRecord, EntiteResolver, LookupError};

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("failed to read directory file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid directory CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: unknown entity type '{value}'")]
    UnknownEntiteType { line: usize, value: String },
}

/// Postal code index over communes. Several communes may share a postal code;
/// the first one loaded answers for it.
#[derive(Debug, Clone, Default)]
pub struct CommuneIndex {
    by_postal_code: HashMap<String, GeoEntite>,
}

impl CommuneIndex {
    pub fn new(communes: impl IntoIterator<Item = GeoEntite>) -> Self {
        let mut by_postal_code = HashMap::new();
        for commune in communes {
            by_postal_code
                .entry(commune.postal_code.clone())
                .or_insert(commune);
        }
        Self { by_postal_code }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, DirectoryError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DirectoryError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut communes = Vec::new();

        for row in csv_reader.deserialize::<CommuneRow>() {
            communes.push(row?.into_geo());
        }

        Ok(Self::new(communes))
    }

    pub fn len(&self) -> usize {
        self.by_postal_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_postal_code.is_empty()
    }
}

impl GeoResolver for CommuneIndex {
    fn find_geo_by_postal_code(
        &self,
        postal_code: &str,
    ) -> Result<Option<GeoEntite>, LookupError> {
        Ok(self.by_postal_code.get(postal_code.trim()).cloned())
    }
}

#[derive(Debug, Deserialize)]
struct CommuneRow {
    code_insee: String,
    code_postal: String,
    dpt_code: String,
    dpt_nom: String,
    ctcd_code: String,
    region_code: String,
    region_nom: String,
}

impl CommuneRow {
    fn into_geo(self) -> GeoEntite {
        GeoEntite {
            insee_code: self.code_insee,
            postal_code: self.code_postal,
            dpt_code: self.dpt_code,
            ctcd_code: self.ctcd_code,
            dpt_nom: self.dpt_nom,
            region_code: self.region_code,
            region_nom: self.region_nom,
        }
    }
}

/// Entity directory answering scoped root-entity lookups.
#[derive(Debug, Clone, Default)]
pub struct EntiteDirectory {
    entites: Vec<EntiteRecord>,
}

impl EntiteDirectory {
    pub fn new(entites: Vec<EntiteRecord>) -> Self {
        Self { entites }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, DirectoryError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DirectoryError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut entites = Vec::new();

        for (index, row) in csv_reader.deserialize::<EntiteRow>().enumerate() {
            let row = row?;
            let entite_type = EntiteAdminType::parse(&row.entite_type).ok_or_else(|| {
                DirectoryError::UnknownEntiteType {
                    // header is line 1
                    line: index + 2,
                    value: row.entite_type.clone(),
                }
            })?;

            entites.push(EntiteRecord {
                id: EntiteId(row.id),
                nom: row.nom,
                entite_type,
                parent_id: row.parent_id.map(EntiteId),
                region_code: row.region_code,
                ctcd_code: row.ctcd_code,
            });
        }

        Ok(Self::new(entites))
    }

    pub fn entites(&self) -> &[EntiteRecord] {
        &self.entites
    }
}

impl EntiteResolver for EntiteDirectory {
    fn find_entite(&self, query: &EntiteQuery) -> Result<Option<EntiteRecord>, LookupError> {
        Ok(self
            .entites
            .iter()
            .find(|record| query.matches(record))
            .cloned())
    }
}

#[derive(Debug, Deserialize)]
struct EntiteRow {
    id: String,
    nom: String,
    entite_type: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    parent_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    region_code: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    ctcd_code: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
