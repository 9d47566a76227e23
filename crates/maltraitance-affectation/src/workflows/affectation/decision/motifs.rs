use super::super::context::SituationContext;
use super::super::domain::{EntiteAdminType, MotifType, Vocabulary};

/// Motives handled by the health regulator whatever the facility registry says.
const EXEMPT_MOTIFS: [MotifType; 2] = [
    MotifType::ProblemeQualiteSoins,
    MotifType::DifficultesAccesSoins,
];

fn entite_for_motif(motif: MotifType) -> Option<EntiteAdminType> {
    match motif {
        MotifType::ProblemeQualiteSoins | MotifType::DifficultesAccesSoins => {
            Some(EntiteAdminType::Ars)
        }
        _ => None,
    }
}

/// Qualified motives restricted to the known vocabulary, followed by the
/// declared motives as written.
fn situation_motifs(context: &SituationContext) -> impl Iterator<Item = &str> {
    let qualified = context
        .qualified_motifs()
        .iter()
        .map(String::as_str)
        .filter(|code| MotifType::parse(code).is_some());
    let declared = context.declared_motifs().iter().map(String::as_str);
    qualified.chain(declared)
}

/// True when at least one motive falls outside the exempt set.
pub fn has_non_exempt_motif(context: &SituationContext) -> bool {
    situation_motifs(context).any(|code| match MotifType::parse(code) {
        Some(motif) => !EXEMPT_MOTIFS.contains(&motif),
        None => true,
    })
}

/// Authority types implied by the situation's motives, deduplicated in first-seen order.
pub fn compute_entites_from_motifs(context: &SituationContext) -> Vec<EntiteAdminType> {
    let mut entites = Vec::new();
    for entite in situation_motifs(context)
        .filter_map(MotifType::parse)
        .filter_map(entite_for_motif)
    {
        if !entites.contains(&entite) {
            entites.push(entite);
        }
    }
    entites
}
