use std::fmt;

use serde::{Deserialize, Serialize};

/// Internal identifier of a complaint ("requête").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequeteId(pub String);

/// Identifier of one situation reported inside a complaint.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SituationId(pub String);

/// Identifier of an administrative entity (ARS, departmental council, state service).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntiteId(pub String);

impl fmt::Display for EntiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Complaint as read from complaint storage, limited to what routing needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requete {
    pub id: RequeteId,
    #[serde(default)]
    pub external_id: Option<u64>,
    #[serde(default)]
    pub situations: Vec<Situation>,
}

/// One reported situation. Every nested part may be missing upstream.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Situation {
    pub id: Option<SituationId>,
    pub lieu_de_survenue: Option<LieuDeSurvenue>,
    pub mis_en_cause: Option<MisEnCause>,
    pub faits: Vec<Fait>,
}

/// Place where the reported facts happened.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LieuDeSurvenue {
    pub lieu_type: Option<String>,
    /// Free text typed by the declarant; may contain a FINESS code.
    pub finess: Option<String>,
    pub adresse: Option<Adresse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Adresse {
    pub label: Option<String>,
    pub code_postal: Option<String>,
}

/// Accused party.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MisEnCause {
    pub mis_en_cause_type: Option<String>,
    /// Sub-type, e.g. the kind of professional service involved.
    pub precision: Option<String>,
}

/// A declared fact with its harm and motive tags.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Fait {
    pub maltraitance_types: Vec<String>,
    pub motifs_declaratifs: Vec<String>,
    pub motifs: Vec<String>,
}

/// Kind of administrative authority a complaint can be routed to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum EntiteAdminType {
    #[serde(rename = "ARS")]
    Ars,
    #[serde(rename = "CD")]
    Cd,
    #[serde(rename = "DD")]
    Dd,
}

impl EntiteAdminType {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Ars => "ARS",
            Self::Cd => "CD",
            Self::Dd => "DD",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Ars => "Agence régionale de santé",
            Self::Cd => "Conseil départemental",
            Self::Dd => "Direction départementale",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ARS" => Some(Self::Ars),
            "CD" => Some(Self::Cd),
            "DD" => Some(Self::Dd),
            _ => None,
        }
    }
}

impl fmt::Display for EntiteAdminType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Closed upstream vocabulary whose members are exchanged as string codes.
///
/// `ALL` lists members in their canonical order; decision switches report their
/// supported keys in that order.
pub trait Vocabulary: Copy + Sized + 'static {
    const ALL: &'static [Self];

    fn code(self) -> &'static str;

    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL.iter().copied().find(|value| value.code() == raw)
    }

    fn rank(self) -> usize {
        let code = self.code();
        Self::ALL
            .iter()
            .position(|value| value.code() == code)
            .unwrap_or(usize::MAX)
    }
}

/// Type of place where the facts happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LieuType {
    Domicile,
    EtablissementSante,
    EtablissementPersonnesAgees,
    EtablissementHandicap,
    EtablissementSocial,
    Trajet,
    AutresEtablissements,
}

impl Vocabulary for LieuType {
    const ALL: &'static [Self] = &[
        Self::Domicile,
        Self::EtablissementSante,
        Self::EtablissementPersonnesAgees,
        Self::EtablissementHandicap,
        Self::EtablissementSocial,
        Self::Trajet,
        Self::AutresEtablissements,
    ];

    fn code(self) -> &'static str {
        match self {
            Self::Domicile => "DOMICILE",
            Self::EtablissementSante => "ETABLISSEMENT_SANTE",
            Self::EtablissementPersonnesAgees => "ETABLISSEMENT_PERSONNES_AGEES",
            Self::EtablissementHandicap => "ETABLISSEMENT_HANDICAP",
            Self::EtablissementSocial => "ETABLISSEMENT_SOCIAL",
            Self::Trajet => "TRAJET",
            Self::AutresEtablissements => "AUTRES_ETABLISSEMENTS",
        }
    }
}

/// Relationship of the accused party to the victim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MisEnCauseType {
    MembreFamille,
    Proche,
    ProfessionnelSante,
    ProfessionnelSocial,
    AutreProfessionnel,
    Autre,
}

impl MisEnCauseType {
    /// Family, relatives and unqualified third parties are not professionals.
    pub const fn is_professional(self) -> bool {
        !matches!(self, Self::MembreFamille | Self::Proche | Self::Autre)
    }
}

impl Vocabulary for MisEnCauseType {
    const ALL: &'static [Self] = &[
        Self::MembreFamille,
        Self::Proche,
        Self::ProfessionnelSante,
        Self::ProfessionnelSocial,
        Self::AutreProfessionnel,
        Self::Autre,
    ];

    fn code(self) -> &'static str {
        match self {
            Self::MembreFamille => "MEMBRE_FAMILLE",
            Self::Proche => "PROCHE",
            Self::ProfessionnelSante => "PROFESSIONNEL_SANTE",
            Self::ProfessionnelSocial => "PROFESSIONNEL_SOCIAL",
            Self::AutreProfessionnel => "AUTRE_PROFESSIONNEL",
            Self::Autre => "AUTRE",
        }
    }
}

/// Kind of professional service the accused belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfessionnelType {
    TravailleurSocial,
    ProfessionnelSante,
    /// Home-care nursing service.
    Ssiad,
    /// Home-aid service.
    Saad,
    /// Home special-education service.
    Sessad,
    AideFamille,
    /// Court-appointed legal guardian.
    Mjpm,
    Autre,
}

impl Vocabulary for ProfessionnelType {
    const ALL: &'static [Self] = &[
        Self::TravailleurSocial,
        Self::ProfessionnelSante,
        Self::Ssiad,
        Self::Saad,
        Self::Sessad,
        Self::AideFamille,
        Self::Mjpm,
        Self::Autre,
    ];

    fn code(self) -> &'static str {
        match self {
            Self::TravailleurSocial => "TRAVAILLEUR_SOCIAL",
            Self::ProfessionnelSante => "PROFESSIONNEL_SANTE",
            Self::Ssiad => "SSIAD",
            Self::Saad => "SAAD",
            Self::Sessad => "SESSAD",
            Self::AideFamille => "AIDE_FAMILLE",
            Self::Mjpm => "MJPM",
            Self::Autre => "AUTRE",
        }
    }
}

/// Harm categories a declarant can tick on a fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaltraitanceType {
    Negligences,
    Violences,
    MaterielleFinanciere,
    Sexuelle,
    NeSaisPas,
    Autre,
    Non,
}

impl MaltraitanceType {
    pub const fn is_mistreatment(self) -> bool {
        matches!(
            self,
            Self::Negligences | Self::Violences | Self::MaterielleFinanciere | Self::Sexuelle
        )
    }
}

impl Vocabulary for MaltraitanceType {
    const ALL: &'static [Self] = &[
        Self::Negligences,
        Self::Violences,
        Self::MaterielleFinanciere,
        Self::Sexuelle,
        Self::NeSaisPas,
        Self::Autre,
        Self::Non,
    ];

    fn code(self) -> &'static str {
        match self {
            Self::Negligences => "NEGLIGENCES",
            Self::Violences => "VIOLENCES",
            Self::MaterielleFinanciere => "MATERIELLE_FINANCIERE",
            Self::Sexuelle => "SEXUELLE",
            Self::NeSaisPas => "NE_SAIS_PAS",
            Self::Autre => "AUTRE",
            Self::Non => "NON",
        }
    }
}

/// Qualified complaint motives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotifType {
    ProblemeQualiteSoins,
    DifficultesAccesSoins,
    Facturations,
    ProblemeComportemental,
    NonRespectDroits,
    ProblemeLocaux,
    ProblemeOrganisationnel,
    Autre,
}

impl Vocabulary for MotifType {
    const ALL: &'static [Self] = &[
        Self::ProblemeQualiteSoins,
        Self::DifficultesAccesSoins,
        Self::Facturations,
        Self::ProblemeComportemental,
        Self::NonRespectDroits,
        Self::ProblemeLocaux,
        Self::ProblemeOrganisationnel,
        Self::Autre,
    ];

    fn code(self) -> &'static str {
        match self {
            Self::ProblemeQualiteSoins => "PROBLEME_QUALITE_SOINS",
            Self::DifficultesAccesSoins => "DIFFICULTES_ACCES_SOINS",
            Self::Facturations => "FACTURATIONS",
            Self::ProblemeComportemental => "PROBLEME_COMPORTEMENTAL",
            Self::NonRespectDroits => "NON_RESPECT_DROITS",
            Self::ProblemeLocaux => "PROBLEME_LOCAUX",
            Self::ProblemeOrganisationnel => "PROBLEME_ORGANISATIONNEL",
            Self::Autre => "AUTRE",
        }
    }
}
