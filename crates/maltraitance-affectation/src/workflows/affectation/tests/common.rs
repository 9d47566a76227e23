use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::config::AffectationConfig;
use crate::workflows::affectation::directory::{CommuneIndex, EntiteDirectory};
use crate::workflows::affectation::domain::{
    Adresse, EntiteAdminType, EntiteId, Fait, LieuDeSurvenue, MisEnCause, Requete, RequeteId,
    Situation, SituationId,
};
use crate::workflows::affectation::geo::{GeoEntite, GeoResolver};
use crate::workflows::affectation::repository::{
    AffectationAudit, AffectationTransaction, ChangeLogEntry, EntiteRecord, LookupError,
    RepositoryError, RequeteEntiteLink, RequeteEtape, RequeteRepository, RequeteStatut,
    SituationEntiteLink,
};
use crate::workflows::affectation::service::AffectationService;

pub(super) type MemoryService =
    AffectationService<MemoryRepository, CommuneIndex, EntiteDirectory>;

fn commune(postal_code: &str, dpt: &str, ctcd: &str, region: &str) -> GeoEntite {
    GeoEntite {
        insee_code: format!("{dpt}000"),
        postal_code: postal_code.to_string(),
        dpt_code: dpt.to_string(),
        ctcd_code: ctcd.to_string(),
        dpt_nom: format!("Département {dpt}"),
        region_code: region.to_string(),
        region_nom: format!("Région {region}"),
    }
}

pub(super) fn communes() -> CommuneIndex {
    CommuneIndex::new([
        commune("75001", "75", "75C", "11"),
        commune("13008", "13", "13D", "93"),
        commune("14000", "14", "14D", "28"),
    ])
}

fn entite(
    id: &str,
    entite_type: EntiteAdminType,
    parent: Option<&str>,
    region: &str,
    ctcd: Option<&str>,
) -> EntiteRecord {
    EntiteRecord {
        id: EntiteId(id.to_string()),
        nom: id.to_uppercase(),
        entite_type,
        parent_id: parent.map(|parent| EntiteId(parent.to_string())),
        region_code: Some(region.to_string()),
        ctcd_code: ctcd.map(str::to_string),
    }
}

pub(super) fn entite_records() -> Vec<EntiteRecord> {
    vec![
        entite("ars-idf-dt75", EntiteAdminType::Ars, Some("ars-idf"), "11", None),
        entite("ars-idf", EntiteAdminType::Ars, None, "11", None),
        entite("ars-paca", EntiteAdminType::Ars, None, "93", None),
        entite("ars-normandie", EntiteAdminType::Ars, None, "28", None),
        entite("cd-75", EntiteAdminType::Cd, None, "11", Some("75C")),
        entite("cd-13", EntiteAdminType::Cd, None, "93", Some("13D")),
        entite("dd-75", EntiteAdminType::Dd, None, "11", Some("75C")),
        entite("dd-13", EntiteAdminType::Dd, None, "93", Some("13D")),
    ]
}

pub(super) fn entites() -> EntiteDirectory {
    EntiteDirectory::new(entite_records())
}

pub(super) fn entites_without_fallback() -> EntiteDirectory {
    EntiteDirectory::new(
        entite_records()
            .into_iter()
            .filter(|record| record.id.0 != "ars-normandie")
            .collect(),
    )
}

pub(super) fn entite_id(id: &str) -> EntiteId {
    EntiteId(id.to_string())
}

pub(super) fn requete_id(id: &str) -> RequeteId {
    RequeteId(id.to_string())
}

/// Situation at `lieu_type` with the postal code typed in the address label.
pub(super) fn situation(id: &str, lieu_type: &str, label: &str) -> Situation {
    Situation {
        id: Some(SituationId(id.to_string())),
        lieu_de_survenue: Some(LieuDeSurvenue {
            lieu_type: Some(lieu_type.to_string()),
            finess: None,
            adresse: Some(Adresse {
                label: Some(label.to_string()),
                code_postal: None,
            }),
        }),
        mis_en_cause: None,
        faits: Vec::new(),
    }
}

pub(super) fn accused(mut situation: Situation, kind: &str, precision: Option<&str>) -> Situation {
    situation.mis_en_cause = Some(MisEnCause {
        mis_en_cause_type: Some(kind.to_string()),
        precision: precision.map(str::to_string),
    });
    situation
}

pub(super) fn with_fait(
    mut situation: Situation,
    maltraitance_types: &[&str],
    motifs_declaratifs: &[&str],
) -> Situation {
    let owned = |values: &[&str]| values.iter().map(|value| value.to_string()).collect();
    situation.faits.push(Fait {
        maltraitance_types: owned(maltraitance_types),
        motifs_declaratifs: owned(motifs_declaratifs),
        motifs: Vec::new(),
    });
    situation
}

/// Family member mistreating the victim at home in Paris.
pub(super) fn domicile_famille(id: &str) -> Situation {
    accused(
        situation(id, "DOMICILE", "3 rue de Rivoli 75001 Paris"),
        "MEMBRE_FAMILLE",
        None,
    )
}

pub(super) fn requete(id: &str, situations: Vec<Situation>) -> Requete {
    Requete {
        id: requete_id(id),
        external_id: None,
        situations,
    }
}

pub(super) fn build_service(
    requetes: Vec<Requete>,
) -> (MemoryService, Arc<MemoryRepository>) {
    build_service_with(requetes, entites(), &AffectationConfig::default())
}

pub(super) fn build_service_with(
    requetes: Vec<Requete>,
    entites: EntiteDirectory,
    config: &AffectationConfig,
) -> (MemoryService, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::with_requetes(requetes));
    let service = AffectationService::new(
        repository.clone(),
        Arc::new(communes()),
        Arc::new(entites),
        config,
    );
    (service, repository)
}

#[derive(Debug, Default, Clone)]
pub(super) struct MemoryStore {
    pub(super) requetes: HashMap<RequeteId, Requete>,
    pub(super) requete_entites: Vec<RequeteEntiteLink>,
    pub(super) situation_entites: BTreeSet<SituationEntiteLink>,
    pub(super) etapes: Vec<RequeteEtape>,
    pub(super) changelog: Vec<ChangeLogEntry>,
    pub(super) audits: Vec<AffectationAudit>,
}

impl AffectationTransaction for MemoryStore {
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

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    store: Arc<Mutex<MemoryStore>>,
}

impl MemoryRepository {
    pub(super) fn with_requetes(requetes: Vec<Requete>) -> Self {
        let store = MemoryStore {
            requetes: requetes
                .into_iter()
                .map(|requete| (requete.id.clone(), requete))
                .collect(),
            ..MemoryStore::default()
        };
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    pub(super) fn snapshot(&self) -> MemoryStore {
        self.store.lock().expect("store mutex poisoned").clone()
    }

    /// Runs `work` on a copy of the store, kept only when `work` succeeds.
    fn stage<T>(
        &self,
        work: impl FnOnce(&mut MemoryStore) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let mut guard = self.store.lock().expect("store mutex poisoned");
        let mut staged = guard.clone();
        let value = work(&mut staged)?;
        *guard = staged;
        Ok(value)
    }
}

impl RequeteRepository for MemoryRepository {
    fn fetch(&self, id: &RequeteId) -> Result<Option<Requete>, RepositoryError> {
        let guard = self.store.lock().expect("store mutex poisoned");
        Ok(guard.requetes.get(id).cloned())
    }

    fn fetch_by_external_id(&self, external_id: u64) -> Result<Option<Requete>, RepositoryError> {
        let guard = self.store.lock().expect("store mutex poisoned");
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
        self.stage(|store| work(store))
    }
}

/// Table whose writes a [`FaultyRepository`] rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Fault {
    /// Rejects every situation link, as a foreign key violation would.
    SituationLinks,
    /// Rejects every audit record.
    Audit,
}

/// Repository whose transactions abort when they write to the faulty table.
#[derive(Clone)]
pub(super) struct FaultyRepository {
    inner: MemoryRepository,
    fault: Fault,
}

impl FaultyRepository {
    pub(super) fn with_requetes(fault: Fault, requetes: Vec<Requete>) -> Self {
        Self {
            inner: MemoryRepository::with_requetes(requetes),
            fault,
        }
    }

    pub(super) fn snapshot(&self) -> MemoryStore {
        self.inner.snapshot()
    }
}

struct FaultyTransaction<'a> {
    store: &'a mut MemoryStore,
    fault: Fault,
}

impl AffectationTransaction for FaultyTransaction<'_> {
    fn upsert_requete_entite(
        &mut self,
        requete_id: &RequeteId,
        entite_id: &EntiteId,
        statut: RequeteStatut,
    ) -> Result<bool, RepositoryError> {
        self.store.upsert_requete_entite(requete_id, entite_id, statut)
    }

    fn upsert_situation_entite(
        &mut self,
        link: &SituationEntiteLink,
    ) -> Result<bool, RepositoryError> {
        if self.fault == Fault::SituationLinks {
            return Err(RepositoryError::Aborted("fk violation".to_string()));
        }
        self.store.upsert_situation_entite(link)
    }

    fn has_etapes(
        &self,
        requete_id: &RequeteId,
        entite_id: &EntiteId,
    ) -> Result<bool, RepositoryError> {
        self.store.has_etapes(requete_id, entite_id)
    }

    fn create_etape(&mut self, etape: RequeteEtape) -> Result<(), RepositoryError> {
        self.store.create_etape(etape)
    }

    fn record_change(&mut self, entry: ChangeLogEntry) -> Result<(), RepositoryError> {
        self.store.record_change(entry)
    }

    fn record_audit(&mut self, audit: AffectationAudit) -> Result<(), RepositoryError> {
        if self.fault == Fault::Audit {
            return Err(RepositoryError::Aborted("audit table locked".to_string()));
        }
        self.store.record_audit(audit)
    }
}

impl RequeteRepository for FaultyRepository {
    fn fetch(&self, id: &RequeteId) -> Result<Option<Requete>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn fetch_by_external_id(&self, external_id: u64) -> Result<Option<Requete>, RepositoryError> {
        self.inner.fetch_by_external_id(external_id)
    }

    fn transaction<T, F>(&self, work: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&mut dyn AffectationTransaction) -> Result<T, RepositoryError>,
    {
        let fault = self.fault;
        self.inner
            .stage(|store| work(&mut FaultyTransaction { store, fault }))
    }
}

/// Geography backend that cannot answer.
pub(super) struct UnavailableGeo;

impl GeoResolver for UnavailableGeo {
    fn find_geo_by_postal_code(
        &self,
        _postal_code: &str,
    ) -> Result<Option<GeoEntite>, LookupError> {
        Err(LookupError::Unavailable("geo service offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
