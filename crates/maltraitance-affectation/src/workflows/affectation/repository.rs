use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{EntiteAdminType, EntiteId, Requete, RequeteId, SituationId};
use super::geo::GeoEntite;

/// Organization record from the entity directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntiteRecord {
    pub id: EntiteId,
    pub nom: String,
    pub entite_type: EntiteAdminType,
    #[serde(default)]
    pub parent_id: Option<EntiteId>,
    #[serde(default)]
    pub region_code: Option<String>,
    #[serde(default)]
    pub ctcd_code: Option<String>,
}

impl EntiteRecord {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Lookup criteria accepted by an [`EntiteResolver`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntiteQuery {
    pub entite_type: EntiteAdminType,
    pub parentless: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ctcd_code: Option<String>,
}

impl EntiteQuery {
    /// ARS are scoped by region, departmental authorities by their `ctcd` code.
    pub fn for_geo(entite_type: EntiteAdminType, geo: &GeoEntite) -> Self {
        match entite_type {
            EntiteAdminType::Ars => Self::by_region(entite_type, &geo.region_code),
            EntiteAdminType::Cd | EntiteAdminType::Dd => Self {
                entite_type,
                parentless: true,
                region_code: None,
                ctcd_code: Some(geo.ctcd_code.clone()),
            },
        }
    }

    pub fn by_region(entite_type: EntiteAdminType, region_code: &str) -> Self {
        Self {
            entite_type,
            parentless: true,
            region_code: Some(region_code.to_string()),
            ctcd_code: None,
        }
    }

    pub fn matches(&self, record: &EntiteRecord) -> bool {
        record.entite_type == self.entite_type
            && (!self.parentless || record.is_root())
            && self
                .region_code
                .as_ref()
                .map_or(true, |code| record.region_code.as_ref() == Some(code))
            && self
                .ctcd_code
                .as_ref()
                .map_or(true, |code| record.ctcd_code.as_ref() == Some(code))
    }
}

/// Organization lookup collaborator.
pub trait EntiteResolver: Send + Sync {
    fn find_entite(&self, query: &EntiteQuery) -> Result<Option<EntiteRecord>, LookupError>;
}

/// Failure of a lookup backend. A miss is `Ok(None)`, never an error.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("lookup backend unavailable: {0}")]
    Unavailable(String),
}

/// Processing status of a complaint for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequeteStatut {
    Nouveau,
    EnCours,
    Cloturee,
}

impl RequeteStatut {
    pub const fn label(self) -> &'static str {
        match self {
            RequeteStatut::Nouveau => "NOUVEAU",
            RequeteStatut::EnCours => "EN_COURS",
            RequeteStatut::Cloturee => "CLOTUREE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EtapeStatut {
    AFaire,
    EnCours,
    Fait,
}

/// Complaint to entity link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequeteEntiteLink {
    pub requete_id: RequeteId,
    pub entite_id: EntiteId,
    pub statut: RequeteStatut,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SituationEntiteLink {
    pub situation_id: SituationId,
    pub entite_id: EntiteId,
}

/// Workflow step of a complaint handled by one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequeteEtape {
    pub requete_id: RequeteId,
    pub entite_id: EntiteId,
    pub nom: String,
    pub statut: EtapeStatut,
    pub created_at: DateTime<Utc>,
}

/// Changelog line written alongside created rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLogEntry {
    pub entity: String,
    pub entity_id: String,
    pub action: String,
    pub after: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

/// One audit record per orchestration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectationAudit {
    pub requete_id: RequeteId,
    pub entite_ids: Vec<EntiteId>,
    pub is_fallback: bool,
    pub recorded_at: DateTime<Utc>,
}

/// Write operations available inside one storage transaction.
pub trait AffectationTransaction {
    /// Creates the link with `statut` if absent. Returns whether a row was created.
    fn upsert_requete_entite(
        &mut self,
        requete_id: &RequeteId,
        entite_id: &EntiteId,
        statut: RequeteStatut,
    ) -> Result<bool, RepositoryError>;

    /// Creates the link if absent. Returns whether a row was created.
    fn upsert_situation_entite(&mut self, link: &SituationEntiteLink)
        -> Result<bool, RepositoryError>;

    fn has_etapes(&self, requete_id: &RequeteId, entite_id: &EntiteId)
        -> Result<bool, RepositoryError>;

    fn create_etape(&mut self, etape: RequeteEtape) -> Result<(), RepositoryError>;

    fn record_change(&mut self, entry: ChangeLogEntry) -> Result<(), RepositoryError>;

    fn record_audit(&mut self, audit: AffectationAudit) -> Result<(), RepositoryError>;
}

/// Complaint storage collaborator.
///
/// `transaction` must be atomic: when `work` returns an error nothing it wrote
/// may remain visible.
pub trait RequeteRepository: Send + Sync {
    fn fetch(&self, id: &RequeteId) -> Result<Option<Requete>, RepositoryError>;

    fn fetch_by_external_id(&self, external_id: u64) -> Result<Option<Requete>, RepositoryError>;

    fn transaction<T, F>(&self, work: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&mut dyn AffectationTransaction) -> Result<T, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("transaction aborted: {0}")]
    Aborted(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
