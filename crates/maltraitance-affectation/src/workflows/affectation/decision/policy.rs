//! The routing policy, authored once and shared by every evaluation.

use super::super::context::{ContextField, SituationContext};
use super::super::domain::{
    EntiteAdminType, LieuType, MisEnCauseType, ProfessionnelType, Vocabulary,
};
use super::motifs::{compute_entites_from_motifs, has_non_exempt_motif};
use super::node::{BranchNode, Contribution, LeafNode, NodeRef, SwitchNode};

const ARS: &[EntiteAdminType] = &[EntiteAdminType::Ars];
const CD: &[EntiteAdminType] = &[EntiteAdminType::Cd];
const DD: &[EntiteAdminType] = &[EntiteAdminType::Dd];
const NONE: &[EntiteAdminType] = &[];

pub(crate) fn standard_tree() -> NodeRef {
    BranchNode::new(
        "lieu_domicile",
        "Les faits se sont-ils produits au domicile ?",
        is_domicile,
        domicile_subtree(),
        hors_domicile_subtree(),
    )
    .requires(&[ContextField::PlaceType])
    .node()
}

fn is_domicile(context: &SituationContext) -> bool {
    context.place_type.as_deref() == Some(LieuType::Domicile.code())
}

fn is_professional(context: &SituationContext) -> bool {
    context
        .accused_type
        .as_deref()
        .and_then(MisEnCauseType::parse)
        .is_some_and(MisEnCauseType::is_professional)
}

fn is_maltraitance(context: &SituationContext) -> bool {
    context.is_maltraitance == Some(true)
}

fn select_professional_service(context: &SituationContext) -> Option<&str> {
    context.professional_service_type.as_deref()
}

/// Legal guardians are recognised by the precision, whatever the accused type.
fn select_mis_en_cause(context: &SituationContext) -> Option<&str> {
    match context.professional_service_type.as_deref() {
        Some(precision) if precision == ProfessionnelType::Mjpm.code() => Some(precision),
        _ => context.accused_type.as_deref(),
    }
}

fn select_lieu(context: &SituationContext) -> Option<&str> {
    context.place_type.as_deref()
}

fn domicile_subtree() -> NodeRef {
    let service = SwitchNode::new(
        "domicile_type_professionnel",
        "Type de service du professionnel mis en cause à domicile",
        select_professional_service,
    )
    .requires(&[ContextField::ProfessionalServiceType])
    .case(
        ProfessionnelType::TravailleurSocial,
        LeafNode::fixed("domicile_travailleur_social", "Travailleur social", CD).node(),
    )
    .case(
        ProfessionnelType::ProfessionnelSante,
        LeafNode::fixed("domicile_professionnel_sante", "Professionnel de santé", ARS).node(),
    )
    .case(
        ProfessionnelType::Ssiad,
        LeafNode::fixed("domicile_ssiad", "Service de soins infirmiers à domicile", ARS).node(),
    )
    .case(
        ProfessionnelType::Saad,
        LeafNode::fixed("domicile_saad", "Service d'aide à domicile", CD).node(),
    )
    .case(
        ProfessionnelType::Sessad,
        LeafNode::fixed(
            "domicile_sessad",
            "Service d'éducation spéciale et de soins à domicile",
            ARS,
        )
        .node(),
    )
    .case(
        ProfessionnelType::AideFamille,
        LeafNode::fixed("domicile_aide_famille", "Service d'aide aux familles", CD).node(),
    )
    .case(
        ProfessionnelType::Mjpm,
        LeafNode::fixed("domicile_mjpm", "Mandataire judiciaire", DD).node(),
    )
    .case(
        ProfessionnelType::Autre,
        LeafNode::fixed("domicile_autre_professionnel", "Autre professionnel", CD).node(),
    )
    .node();

    BranchNode::new(
        "domicile_mis_en_cause_professionnel",
        "Le mis en cause est-il un professionnel ?",
        is_professional,
        service,
        LeafNode::fixed("domicile_entourage", "Famille, proche ou autre", CD).node(),
    )
    .requires(&[ContextField::AccusedType])
    .node()
}

fn hors_domicile_subtree() -> NodeRef {
    let lieu = lieu_switch();

    let mis_en_cause = SwitchNode::new(
        "hors_domicile_mis_en_cause",
        "Qui est mis en cause dans la maltraitance ?",
        select_mis_en_cause,
    )
    .case(
        MisEnCauseType::MembreFamille,
        LeafNode::fixed("maltraitance_membre_famille", "Membre de la famille", CD)
            .then(lieu.clone())
            .node(),
    )
    .case(
        MisEnCauseType::Proche,
        LeafNode::fixed("maltraitance_proche", "Proche", CD)
            .then(lieu.clone())
            .node(),
    )
    .case(
        MisEnCauseType::ProfessionnelSante,
        LeafNode::fixed("maltraitance_professionnel_sante", "Professionnel de santé", ARS)
            .then(lieu.clone())
            .node(),
    )
    .case(
        ProfessionnelType::Mjpm,
        LeafNode::fixed("maltraitance_mjpm", "Mandataire judiciaire", DD)
            .then(lieu.clone())
            .node(),
    )
    .default_to(lieu.clone())
    .node();

    BranchNode::new(
        "hors_domicile_maltraitance",
        "La situation relève-t-elle de la maltraitance ?",
        is_maltraitance,
        mis_en_cause,
        lieu,
    )
    .requires(&[ContextField::IsMaltraitance])
    .node()
}

/// Place of occurrence outside the home. No default: an unknown place type is
/// an error rather than a silent miss.
fn lieu_switch() -> NodeRef {
    let reclamation = motif_reclamation_subtree();

    SwitchNode::new(
        "lieu_survenue",
        "Dans quel type de lieu les faits se sont-ils produits ?",
        select_lieu,
    )
    .requires(&[ContextField::PlaceType])
    .case(
        LieuType::EtablissementSante,
        LeafNode::fixed(
            "lieu_etablissement_sante",
            "Établissement de santé ou cabinet médical",
            ARS,
        )
        .node(),
    )
    .case(LieuType::EtablissementPersonnesAgees, reclamation.clone())
    .case(LieuType::EtablissementHandicap, reclamation.clone())
    .case(LieuType::EtablissementSocial, reclamation)
    .case(
        LieuType::Trajet,
        LeafNode::fixed("lieu_trajet", "Transport ou trajet", ARS).node(),
    )
    .case(
        LieuType::AutresEtablissements,
        LeafNode::fixed("lieu_autres_etablissements", "Autre établissement", ARS).node(),
    )
    .node()
}

fn motif_reclamation_subtree() -> NodeRef {
    // TODO: route through the FINESS registry once the facility lookup exists;
    // until then the leaf adds nothing.
    let referentiel = LeafNode::fixed(
        "reclamation_referentiel_finess",
        "Autorité de tutelle de l'établissement selon le référentiel FINESS",
        NONE,
    )
    .node();
    let terminal = LeafNode::fixed(
        "reclamation_motifs_sanitaires",
        "Motifs relevant uniquement de l'ARS",
        NONE,
    )
    .node();

    BranchNode::new(
        "reclamation_motifs_hors_soins",
        "Un motif sort-il du champ qualité ou accès aux soins ?",
        has_non_exempt_motif,
        referentiel,
        terminal,
    )
    .add_if_true(Contribution::Computed(compute_entites_from_motifs))
    .add_if_false(Contribution::Computed(compute_entites_from_motifs))
    .node()
}
