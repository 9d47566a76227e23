use crate::infra::InMemoryRequeteRepository;
use clap::Args;
use std::sync::Arc;
use maltraitance_affectation::config::AffectationConfig;
use maltraitance_affectation::error::AppError;
use maltraitance_affectation::workflows::affectation::{
    Adresse, AffectationService, CommuneIndex, EntiteAdminType, EntiteDirectory, EntiteId,
    EntiteRecord, Fait, GeoEntite, LieuDeSurvenue, MisEnCause, Requete, RequeteId, Situation,
    SituationId,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Only assign this requete (internal id or numeric external id).
    #[arg(long)]
    pub(crate) requete: Option<String>,
    /// Region code of the ARS receiving unroutable requetes.
    #[arg(long)]
    pub(crate) fallback_region: Option<String>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        requete,
        fallback_region,
    } = args;

    let mut config = AffectationConfig::default();
    if let Some(region) = fallback_region {
        config.fallback_region_code = region;
    }

    let requetes = sample_requetes();
    let references: Vec<String> = match requete {
        Some(reference) => vec![reference],
        None => requetes.iter().map(|requete| requete.id.0.clone()).collect(),
    };

    let repository = Arc::new(InMemoryRequeteRepository::seeded(requetes));
    let service = AffectationService::new(
        repository.clone(),
        Arc::new(seed_communes()),
        Arc::new(seed_entites()),
        &config,
    );

    println!("Complaint routing demo (fallback ARS region {})", config.fallback_region_code);
    for reference in &references {
        let outcome = service.assign_entites_to_requete(reference)?;
        let entites: Vec<&str> = outcome.entite_ids.iter().map(|id| id.0.as_str()).collect();
        println!(
            "- {} -> {}{}",
            outcome.requete_id.0,
            entites.join(", "),
            if outcome.is_fallback { " (fallback)" } else { "" }
        );
        for skipped in &outcome.skipped_situations {
            println!("  skipped situation #{}: {}", skipped.index, skipped.reason);
        }
    }

    let tables = repository.tables();
    println!("\nWorkflow steps created");
    for etape in &tables.etapes {
        println!(
            "  - {} / {}: {} [{:?}]",
            etape.requete_id.0, etape.entite_id, etape.nom, etape.statut
        );
    }
    println!(
        "\n{} requete links, {} situation links, {} audit records",
        tables.requete_entites.len(),
        tables.situation_entites.len(),
        tables.audits.len()
    );

    Ok(())
}

fn commune(
    insee: &str,
    postal_code: &str,
    dpt: (&str, &str),
    ctcd: &str,
    region: (&str, &str),
) -> GeoEntite {
    GeoEntite {
        insee_code: insee.to_string(),
        postal_code: postal_code.to_string(),
        dpt_code: dpt.0.to_string(),
        ctcd_code: ctcd.to_string(),
        dpt_nom: dpt.1.to_string(),
        region_code: region.0.to_string(),
        region_nom: region.1.to_string(),
    }
}

pub(crate) fn seed_communes() -> CommuneIndex {
    CommuneIndex::new([
        commune("75101", "75001", ("75", "Paris"), "75C", ("11", "Île-de-France")),
        commune(
            "13208",
            "13008",
            ("13", "Bouches-du-Rhône"),
            "13D",
            ("93", "Provence-Alpes-Côte d'Azur"),
        ),
        commune("14118", "14000", ("14", "Calvados"), "14D", ("28", "Normandie")),
        commune(
            "69383",
            "69003",
            ("69", "Rhône"),
            "69M",
            ("84", "Auvergne-Rhône-Alpes"),
        ),
    ])
}

fn entite(
    id: &str,
    nom: &str,
    entite_type: EntiteAdminType,
    parent: Option<&str>,
    region: &str,
    ctcd: Option<&str>,
) -> EntiteRecord {
    EntiteRecord {
        id: EntiteId(id.to_string()),
        nom: nom.to_string(),
        entite_type,
        parent_id: parent.map(|parent| EntiteId(parent.to_string())),
        region_code: Some(region.to_string()),
        ctcd_code: ctcd.map(str::to_string),
    }
}

pub(crate) fn seed_entites() -> EntiteDirectory {
    use EntiteAdminType::{Ars, Cd, Dd};

    EntiteDirectory::new(vec![
        entite("ars-idf", "ARS Île-de-France", Ars, None, "11", None),
        entite("ars-idf-dd75", "ARS IDF délégation de Paris", Ars, Some("ars-idf"), "11", None),
        entite("ars-paca", "ARS Provence-Alpes-Côte d'Azur", Ars, None, "93", None),
        entite("ars-normandie", "ARS Normandie", Ars, None, "28", None),
        entite("ars-ara", "ARS Auvergne-Rhône-Alpes", Ars, None, "84", None),
        entite("cd-75", "Ville de Paris", Cd, None, "11", Some("75C")),
        entite("cd-13", "Département des Bouches-du-Rhône", Cd, None, "93", Some("13D")),
        entite("cd-14", "Département du Calvados", Cd, None, "28", Some("14D")),
        entite("metropole-lyon", "Métropole de Lyon", Cd, None, "84", Some("69M")),
        entite("dd-75", "DDETS de Paris", Dd, None, "11", Some("75C")),
        entite("dd-13", "DDETS des Bouches-du-Rhône", Dd, None, "93", Some("13D")),
        entite("dd-14", "DDETS du Calvados", Dd, None, "28", Some("14D")),
    ])
}

fn situation(
    id: &str,
    lieu_type: &str,
    adresse: &str,
    finess: Option<&str>,
    accused: (&str, Option<&str>),
    fait: Fait,
) -> Situation {
    Situation {
        id: Some(SituationId(id.to_string())),
        lieu_de_survenue: Some(LieuDeSurvenue {
            lieu_type: Some(lieu_type.to_string()),
            finess: finess.map(str::to_string),
            adresse: Some(Adresse {
                label: Some(adresse.to_string()),
                code_postal: None,
            }),
        }),
        mis_en_cause: Some(MisEnCause {
            mis_en_cause_type: Some(accused.0.to_string()),
            precision: accused.1.map(str::to_string),
        }),
        faits: vec![fait],
    }
}

fn fait(maltraitance_types: &[&str], motifs: &[&str]) -> Fait {
    let owned = |values: &[&str]| values.iter().map(|value| value.to_string()).collect();
    Fait {
        maltraitance_types: owned(maltraitance_types),
        motifs_declaratifs: owned(motifs),
        motifs: Vec::new(),
    }
}

pub(crate) fn sample_requetes() -> Vec<Requete> {
    let requete = |id: &str, external_id: u64, situations: Vec<Situation>| Requete {
        id: RequeteId(id.to_string()),
        external_id: Some(external_id),
        situations,
    };

    vec![
        requete(
            "REQ-2025-0001",
            1001,
            vec![situation(
                "SIT-0001",
                "DOMICILE",
                "12 rue de Rivoli 75001 Paris",
                None,
                ("MEMBRE_FAMILLE", None),
                fait(&["VIOLENCES"], &[]),
            )],
        ),
        requete(
            "REQ-2025-0002",
            1002,
            vec![situation(
                "SIT-0002",
                "ETABLISSEMENT_PERSONNES_AGEES",
                "EHPAD Les Calanques, 13008 Marseille",
                Some("EHPAD Les Calanques 130000011 tél 0491000000"),
                ("PROFESSIONNEL_SANTE", None),
                fait(&["NEGLIGENCES"], &["PROBLEME_QUALITE_SOINS"]),
            )],
        ),
        requete(
            "REQ-2025-0003",
            1003,
            vec![situation(
                "SIT-0003",
                "TRAJET",
                "Gare de Caen 14000",
                None,
                ("AUTRE_PROFESSIONNEL", Some("MJPM")),
                fait(&["MATERIELLE_FINANCIERE"], &[]),
            )],
        ),
        requete(
            "REQ-2025-0004",
            1004,
            vec![situation(
                "SIT-0004",
                "DOMICILE",
                "Chemin des Anglais 97400 Saint-Denis",
                None,
                ("PROCHE", None),
                fait(&["NE_SAIS_PAS"], &[]),
            )],
        ),
    ]
}
