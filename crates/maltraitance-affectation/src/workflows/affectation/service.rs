use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use super::context::{build_context, SituationContext};
use super::decision::{run_decision_tree, DecisionTree, DecisionTreeError};
use super::domain::{EntiteAdminType, EntiteId, Requete, RequeteId, Situation, SituationId};
use super::geo::GeoResolver;
use super::repository::{
    AffectationAudit, AffectationTransaction, ChangeLogEntry, EntiteQuery, EntiteResolver,
    EtapeStatut, LookupError, RepositoryError, RequeteEtape, RequeteRepository, RequeteStatut,
    SituationEntiteLink,
};
use crate::config::AffectationConfig;

pub const ETAPE_ACCUSE_RECEPTION: &str = "Envoyer un accusé de réception au déclarant";

/// Service routing complaints to the administrative entities in charge.
pub struct AffectationService<R, G, E> {
    repository: Arc<R>,
    geo: Arc<G>,
    entites: Arc<E>,
    tree: &'static DecisionTree,
    fallback_region_code: String,
}

/// Result of one assignment run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectationOutcome {
    pub requete_id: RequeteId,
    pub entite_ids: Vec<EntiteId>,
    pub is_fallback: bool,
    pub skipped_situations: Vec<SkippedSituation>,
}

/// Situation left out of routing because the tree could not evaluate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedSituation {
    pub index: usize,
    pub situation_id: Option<SituationId>,
    pub reason: String,
}

/// Decision tree dry run for a single situation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Simulation {
    pub context: SituationContext,
    pub entite_types: Vec<EntiteAdminType>,
}

#[derive(Debug, Default)]
struct Routing {
    entite_ids: Vec<EntiteId>,
    situation_links: BTreeSet<SituationEntiteLink>,
    skipped: Vec<SkippedSituation>,
}

impl Routing {
    fn assign(&mut self, situation_id: Option<&SituationId>, entite_id: EntiteId) {
        if let Some(situation_id) = situation_id {
            self.situation_links.insert(SituationEntiteLink {
                situation_id: situation_id.clone(),
                entite_id: entite_id.clone(),
            });
        }
        if !self.entite_ids.contains(&entite_id) {
            self.entite_ids.push(entite_id);
        }
    }
}

impl<R, G, E> AffectationService<R, G, E>
where
    R: RequeteRepository + 'static,
    G: GeoResolver + 'static,
    E: EntiteResolver + 'static,
{
    pub fn new(
        repository: Arc<R>,
        geo: Arc<G>,
        entites: Arc<E>,
        config: &AffectationConfig,
    ) -> Self {
        Self {
            repository,
            geo,
            entites,
            tree: DecisionTree::standard(),
            fallback_region_code: config.fallback_region_code.clone(),
        }
    }

    pub fn fallback_region_code(&self) -> &str {
        &self.fallback_region_code
    }

    /// Routes a complaint, designated by internal id or numeric external id,
    /// and persists the resulting links in one transaction.
    pub fn assign_entites_to_requete(
        &self,
        reference: &str,
    ) -> Result<AffectationOutcome, AffectationError> {
        let requete = self.resolve_requete(reference)?;

        let mut routing = Routing::default();
        if let Err(error) = self.route_situations(&requete, &mut routing) {
            warn!(requete = %requete.id.0, %error, "entity lookup failed, using fallback");
            routing.entite_ids.clear();
            routing.situation_links.clear();
        }

        let mut is_fallback = routing.entite_ids.is_empty();
        if is_fallback {
            self.assign_fallback(&requete.id, &mut routing)?;
        }

        let now = Utc::now();
        let committed = self.repository.transaction(|tx| {
            persist(tx, &requete.id, &routing, is_fallback, now)
        });
        if let Err(error) = committed {
            if is_fallback {
                return Err(error.into());
            }
            warn!(requete = %requete.id.0, %error, "routing commit failed, using fallback");
            routing.entite_ids.clear();
            routing.situation_links.clear();
            is_fallback = true;
            self.assign_fallback(&requete.id, &mut routing)?;
            self.repository.transaction(|tx| {
                persist(tx, &requete.id, &routing, is_fallback, now)
            })?;
        }

        info!(
            requete = %requete.id.0,
            entites = routing.entite_ids.len(),
            is_fallback,
            skipped = routing.skipped.len(),
            "requete assigned"
        );

        Ok(AffectationOutcome {
            requete_id: requete.id,
            entite_ids: routing.entite_ids,
            is_fallback,
            skipped_situations: routing.skipped,
        })
    }

    fn resolve_requete(&self, reference: &str) -> Result<Requete, AffectationError> {
        let reference = reference.trim();
        let by_external_id = match reference.parse::<u64>() {
            Ok(external_id) => self.repository.fetch_by_external_id(external_id)?,
            Err(_) => None,
        };
        let requete = match by_external_id {
            Some(requete) => Some(requete),
            None => self.repository.fetch(&RequeteId(reference.to_string()))?,
        };
        requete.ok_or_else(|| AffectationError::RequeteNotFound(reference.to_string()))
    }

    fn route_situations(
        &self,
        requete: &Requete,
        routing: &mut Routing,
    ) -> Result<(), LookupError> {
        for (index, situation) in requete.situations.iter().enumerate() {
            let context = build_context(situation);
            let entite_types = match self.tree.evaluate(&context) {
                Ok(entite_types) => entite_types,
                Err(error) => {
                    warn!(requete = %requete.id.0, index, %error, "situation skipped");
                    routing.skipped.push(SkippedSituation {
                        index,
                        situation_id: situation.id.clone(),
                        reason: error.to_string(),
                    });
                    continue;
                }
            };
            if entite_types.is_empty() {
                continue;
            }

            let Some(postal_code) = context.postal_code.as_deref() else {
                warn!(requete = %requete.id.0, index, "situation has no postal code");
                continue;
            };
            let Some(geo) = self.geo.find_geo_by_postal_code(postal_code)? else {
                warn!(requete = %requete.id.0, index, postal_code, "unknown postal code");
                continue;
            };

            for entite_type in entite_types {
                let query = EntiteQuery::for_geo(entite_type, &geo);
                match self.entites.find_entite(&query)? {
                    Some(entite) => routing.assign(situation.id.as_ref(), entite.id),
                    None => warn!(
                        requete = %requete.id.0,
                        index,
                        entite_type = entite_type.code(),
                        region = %geo.region_code,
                        ctcd = %geo.ctcd_code,
                        "no root entity for type"
                    ),
                }
            }
        }
        Ok(())
    }

    fn assign_fallback(
        &self,
        requete_id: &RequeteId,
        routing: &mut Routing,
    ) -> Result<(), AffectationError> {
        let fallback = self.fallback_entite()?;
        warn!(
            requete = %requete_id.0,
            entite = %fallback,
            "no entity resolved, assigning fallback"
        );
        routing.entite_ids.push(fallback);
        Ok(())
    }

    fn fallback_entite(&self) -> Result<EntiteId, AffectationError> {
        let query = EntiteQuery::by_region(EntiteAdminType::Ars, &self.fallback_region_code);
        self.entites
            .find_entite(&query)?
            .map(|entite| entite.id)
            .ok_or_else(|| AffectationError::FallbackEntiteNotFound {
                region_code: self.fallback_region_code.clone(),
            })
    }
}

fn persist(
    tx: &mut dyn AffectationTransaction,
    requete_id: &RequeteId,
    routing: &Routing,
    is_fallback: bool,
    now: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    for entite_id in &routing.entite_ids {
        if tx.upsert_requete_entite(requete_id, entite_id, RequeteStatut::Nouveau)? {
            tx.record_change(ChangeLogEntry {
                entity: "RequeteEntite".to_string(),
                entity_id: format!("{}:{}", requete_id.0, entite_id),
                action: "CREATED".to_string(),
                after: json!({
                    "requeteId": requete_id.0,
                    "entiteId": entite_id.0,
                    "statut": RequeteStatut::Nouveau.label(),
                }),
                recorded_at: now,
            })?;
        }

        if tx.has_etapes(requete_id, entite_id)? {
            continue;
        }
        for etape in default_etapes(requete_id, entite_id, now) {
            let entry = ChangeLogEntry {
                entity: "RequeteEtape".to_string(),
                entity_id: format!("{}:{}", requete_id.0, entite_id),
                action: "CREATED".to_string(),
                after: json!({
                    "nom": etape.nom,
                    "statut": etape.statut,
                }),
                recorded_at: now,
            };
            tx.create_etape(etape)?;
            tx.record_change(entry)?;
        }
    }

    for link in &routing.situation_links {
        tx.upsert_situation_entite(link)?;
    }

    tx.record_audit(AffectationAudit {
        requete_id: requete_id.clone(),
        entite_ids: routing.entite_ids.clone(),
        is_fallback,
        recorded_at: now,
    })
}

/// The two steps every entity starts with, in order.
pub fn default_etapes(
    requete_id: &RequeteId,
    entite_id: &EntiteId,
    now: DateTime<Utc>,
) -> [RequeteEtape; 2] {
    let etape = |nom: String, statut| RequeteEtape {
        requete_id: requete_id.clone(),
        entite_id: entite_id.clone(),
        nom,
        statut,
        created_at: now,
    };
    [
        etape(
            format!("Création le {}", now.format("%d/%m/%Y")),
            EtapeStatut::Fait,
        ),
        etape(ETAPE_ACCUSE_RECEPTION.to_string(), EtapeStatut::AFaire),
    ]
}

/// Runs the decision tree on one situation without touching storage.
pub async fn simulate(situation: &Situation) -> Result<Simulation, DecisionTreeError> {
    let context = build_context(situation);
    let entite_types = run_decision_tree(&context).await?;
    Ok(Simulation {
        context,
        entite_types: entite_types.into_iter().collect(),
    })
}

/// Error raised by the affectation service.
#[derive(Debug, thiserror::Error)]
pub enum AffectationError {
    #[error("requete {0} not found")]
    RequeteNotFound(String),
    #[error("fallback entity not found (ARS, region {region_code})")]
    FallbackEntiteNotFound { region_code: String },
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
