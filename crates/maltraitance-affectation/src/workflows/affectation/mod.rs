//! Routing ("affectation") of mistreatment complaints to the administrative
//! entities in charge: the regional health agency (ARS), the departmental
//! council (CD) or the departmental state services (DD).
//!
//! Each situation of a complaint is flattened into a [`SituationContext`],
//! walked through the routing [`DecisionTree`], and the resulting authority
//! types are resolved to concrete entities through the geography of the
//! situation's postal code. Complaints nothing could be routed for go to a
//! configured fallback ARS.

pub mod context;
pub mod decision;
pub mod directory;
pub mod domain;
pub mod extraction;
pub mod geo;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use context::{build_context, ContextField, SituationContext};
pub use decision::{run_decision_tree, DecisionTree, DecisionTreeError, MAX_DEPTH};
pub use directory::{CommuneIndex, DirectoryError, EntiteDirectory};
pub use domain::{
    Adresse, EntiteAdminType, EntiteId, Fait, LieuDeSurvenue, LieuType, MaltraitanceType,
    MisEnCause, MisEnCauseType, MotifType, ProfessionnelType, Requete, RequeteId, Situation,
    SituationId, Vocabulary,
};
pub use extraction::{extract_finess_from_raw_text, extract_postal_code, luhn_is_valid};
pub use geo::{GeoEntite, GeoResolver};
pub use repository::{
    AffectationAudit, AffectationTransaction, ChangeLogEntry, EntiteQuery, EntiteRecord,
    EntiteResolver, EtapeStatut, LookupError, RepositoryError, RequeteEntiteLink, RequeteEtape,
    RequeteRepository, RequeteStatut, SituationEntiteLink,
};
pub use router::affectation_router;
pub use service::{
    default_etapes, simulate, AffectationError, AffectationOutcome, AffectationService,
    Simulation, SkippedSituation, ETAPE_ACCUSE_RECEPTION,
};
