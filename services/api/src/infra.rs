use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

use maltraitance_affectation::config::AffectationConfig;
use maltraitance_affectation::error::AppError;
use maltraitance_affectation::workflows::affectation::{
    AffectationAudit, AffectationTransaction, ChangeLogEntry, CommuneIndex, EntiteDirectory,
    EntiteId, RepositoryError, Requete, RequeteEntiteLink, RequeteEtape, RequeteId,
    RequeteRepository, RequeteStatut, Situation, SituationEntiteLink,
};
use tracing::info;

use crate::demo;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Complaint storage tables kept in process memory.
#[derive(Debug, Default, Clone)]
pub(crate) struct RequeteTables {
    pub(crate) requetes: HashMap<RequeteId, Requete>,
    pub(crate) requete_entites: Vec<RequeteEntiteLink>,
    pub(crate) situation_entites: BTreeSet<SituationEntiteLink>,
    pub(crate) etapes: Vec<RequeteEtape>,
    pub(crate) changelog: Vec<ChangeLogEntry>,
    pub(crate) audits: Vec<AffectationAudit>,
}

impl AffectationTransaction for RequeteTables {
    fn upsert_requete_entite(
        &mut self,
        requete_id: &RequeteId,
        entite_id: &EntiteId,
        statut: RequeteStatut,
    ) -> Result<bool, RepositoryError> {
        let exists = self
            .requete_entites
            .iter()
            .any(|link| &link.requete_id == requete_id && &link.entite_id == entite_id);
        if exists {
            return Ok(false);
        }
        self.requete_entites.push(RequeteEntiteLink {
            requete_id: requete_id.clone(),
            entite_id: entite_id.clone(),
            statut,
        });
        Ok(true)
    }

    fn upsert_situation_entite(
        &mut self,
        link: &SituationEntiteLink,
    ) -> Result<bool, RepositoryError> {
        Ok(self.situation_entites.insert(link.clone()))
    }

    fn has_etapes(
        &self,
        requete_id: &RequeteId,
        entite_id: &EntiteId,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .etapes
            .iter()
            .any(|etape| &etape.requete_id == requete_id && &etape.entite_id == entite_id))
    }

    fn create_etape(&mut self, etape: RequeteEtape) -> Result<(), RepositoryError> {
        self.etapes.push(etape);
        Ok(())
    }

    fn record_change(&mut self, entry: ChangeLogEntry) -> Result<(), RepositoryError> {
        self.changelog.push(entry);
        Ok(())
    }

    fn record_audit(&mut self, audit: AffectationAudit) -> Result<(), RepositoryError> {
        self.audits.push(audit);
        Ok(())
    }
}

/// Requete repository whose transactions stage writes on a copy of the tables.
#[derive(Default, Clone)]
pub(crate) struct InMemoryRequeteRepository {
    tables: Arc<Mutex<RequeteTables>>,
}

impl InMemoryRequeteRepository {
    pub(crate) fn seeded(requetes: Vec<Requete>) -> Self {
        let repository = Self::default();
        {
            let mut guard = repository.tables.lock().expect("repository mutex poisoned");
            for requete in requetes {
                guard.requetes.insert(requete.id.clone(), requete);
            }
        }
        repository
    }

    fn lock(&self) -> Result<MutexGuard<'_, RequeteTables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }

    pub(crate) fn tables(&self) -> RequeteTables {
        self.tables.lock().expect("repository mutex poisoned").clone()
    }
}

impl RequeteRepository for InMemoryRequeteRepository {
    fn fetch(&self, id: &RequeteId) -> Result<Option<Requete>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.requetes.get(id).cloned())
    }

    fn fetch_by_external_id(&self, external_id: u64) -> Result<Option<Requete>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .requetes
            .values()
            .find(|requete| requete.external_id == Some(external_id))
            .cloned())
    }

    fn transaction<T, F>(&self, work: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&mut dyn AffectationTransaction) -> Result<T, RepositoryError>,
    {
        let mut guard = self.lock()?;
        let mut staged = guard.clone();
        let value = work(&mut staged)?;
        *guard = staged;
        Ok(value)
    }
}

/// Loads the lookup directories from the configured CSV files, falling back
/// to the bundled demo seed for any file left unset.
pub(crate) fn load_directories(
    config: &AffectationConfig,
) -> Result<(CommuneIndex, EntiteDirectory), AppError> {
    let communes = match &config.communes_csv {
        Some(path) => CommuneIndex::from_path(path)?,
        None => demo::seed_communes(),
    };
    let entites = match &config.entites_csv {
        Some(path) => EntiteDirectory::from_path(path)?,
        None => demo::seed_entites(),
    };
    info!(
        communes = communes.len(),
        entites = entites.entites().len(),
        "lookup directories loaded"
    );
    Ok((communes, entites))
}

pub(crate) fn read_situation(path: &Path) -> Result<Situation, AppError> {
    let raw = std::fs::read_to_string(path)?;
    let situation = serde_json::from_str(&raw).map_err(std::io::Error::from)?;
    Ok(situation)
}
