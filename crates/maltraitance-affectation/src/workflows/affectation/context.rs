use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::{MaltraitanceType, Situation, Vocabulary};
use super::extraction::{extract_finess_from_raw_text, extract_postal_code};

/// Flat view of a situation consumed by the decision tree.
///
/// Every field is optional: `None` means the information was never provided,
/// which is not the same as `Some(false)` or an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SituationContext {
    pub place_type: Option<String>,
    pub finess: Option<String>,
    pub postal_code: Option<String>,
    pub accused_type: Option<String>,
    pub professional_service_type: Option<String>,
    pub is_maltraitance: Option<bool>,
    pub declared_motifs: Option<Vec<String>>,
    pub qualified_motifs: Option<Vec<String>>,
}

/// Fields a decision node can declare as prerequisites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextField {
    PlaceType,
    Finess,
    PostalCode,
    AccusedType,
    ProfessionalServiceType,
    IsMaltraitance,
    DeclaredMotifs,
    QualifiedMotifs,
}

impl ContextField {
    pub const fn name(self) -> &'static str {
        match self {
            ContextField::PlaceType => "placeType",
            ContextField::Finess => "finess",
            ContextField::PostalCode => "postalCode",
            ContextField::AccusedType => "accusedType",
            ContextField::ProfessionalServiceType => "professionalServiceType",
            ContextField::IsMaltraitance => "isMaltraitance",
            ContextField::DeclaredMotifs => "declaredMotifs",
            ContextField::QualifiedMotifs => "qualifiedMotifs",
        }
    }
}

impl fmt::Display for ContextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl SituationContext {
    pub fn is_defined(&self, field: ContextField) -> bool {
        match field {
            ContextField::PlaceType => self.place_type.is_some(),
            ContextField::Finess => self.finess.is_some(),
            ContextField::PostalCode => self.postal_code.is_some(),
            ContextField::AccusedType => self.accused_type.is_some(),
            ContextField::ProfessionalServiceType => self.professional_service_type.is_some(),
            ContextField::IsMaltraitance => self.is_maltraitance.is_some(),
            ContextField::DeclaredMotifs => self.declared_motifs.is_some(),
            ContextField::QualifiedMotifs => self.qualified_motifs.is_some(),
        }
    }

    pub fn declared_motifs(&self) -> &[String] {
        self.declared_motifs.as_deref().unwrap_or_default()
    }

    pub fn qualified_motifs(&self) -> &[String] {
        self.qualified_motifs.as_deref().unwrap_or_default()
    }
}

/// Flattens a situation into its evaluation context.
pub fn build_context(situation: &Situation) -> SituationContext {
    let lieu = situation.lieu_de_survenue.as_ref();
    let adresse = lieu.and_then(|lieu| lieu.adresse.as_ref());
    let mis_en_cause = situation.mis_en_cause.as_ref();

    let place_type = lieu.and_then(|lieu| non_blank(lieu.lieu_type.as_deref()));
    let finess = lieu
        .and_then(|lieu| lieu.finess.as_deref())
        .and_then(extract_finess_from_raw_text);
    let postal_code = adresse.and_then(|adresse| {
        adresse
            .code_postal
            .as_deref()
            .and_then(exact_postal_code)
            .or_else(|| adresse.label.as_deref().and_then(extract_postal_code))
    });

    let accused_type = mis_en_cause.and_then(|mec| non_blank(mec.mis_en_cause_type.as_deref()));
    let professional_service_type =
        mis_en_cause.and_then(|mec| non_blank(mec.precision.as_deref()));

    let is_maltraitance = situation
        .faits
        .iter()
        .flat_map(|fait| fait.maltraitance_types.iter())
        .filter_map(|raw| MaltraitanceType::parse(raw))
        .any(MaltraitanceType::is_mistreatment);

    let declared_motifs = situation
        .faits
        .iter()
        .flat_map(|fait| fait.motifs_declaratifs.iter().cloned())
        .collect();
    let qualified_motifs = situation
        .faits
        .iter()
        .flat_map(|fait| fait.motifs.iter().cloned())
        .collect();

    SituationContext {
        place_type,
        finess,
        postal_code,
        accused_type,
        professional_service_type,
        is_maltraitance: Some(is_maltraitance),
        declared_motifs: Some(declared_motifs),
        qualified_motifs: Some(qualified_motifs),
    }
}

fn exact_postal_code(raw: &str) -> Option<String> {
    let raw = raw.trim();
    (raw.len() == 5 && raw.bytes().all(|byte| byte.is_ascii_digit())).then(|| raw.to_string())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::affectation::domain::{Adresse, Fait, LieuDeSurvenue, MisEnCause};

    fn fait(types: &[&str], declared: &[&str], qualified: &[&str]) -> Fait {
        let owned = |values: &[&str]| values.iter().map(|v| v.to_string()).collect();
        Fait {
            maltraitance_types: owned(types),
            motifs_declaratifs: owned(declared),
            motifs: owned(qualified),
        }
    }

    #[test]
    fn empty_situation_yields_absent_fields() {
        let context = build_context(&Situation::default());
        assert_eq!(context.place_type, None);
        assert_eq!(context.postal_code, None);
        assert_eq!(context.accused_type, None);
        assert_eq!(context.is_maltraitance, Some(false));
        assert_eq!(context.declared_motifs, Some(Vec::new()));
        assert!(!context.is_defined(ContextField::PlaceType));
        assert!(context.is_defined(ContextField::IsMaltraitance));
    }

    #[test]
    fn flattens_nested_situation() {
        let situation = Situation {
            id: None,
            lieu_de_survenue: Some(LieuDeSurvenue {
                lieu_type: Some("ETABLISSEMENT_PERSONNES_AGEES".to_string()),
                finess: Some("EHPAD 130000011 (Marseille)".to_string()),
                adresse: Some(Adresse {
                    label: Some("12 rue de la Paix 13008 Marseille".to_string()),
                    code_postal: None,
                }),
            }),
            mis_en_cause: Some(MisEnCause {
                mis_en_cause_type: Some("PROFESSIONNEL_SANTE".to_string()),
                precision: Some(" SSIAD ".to_string()),
            }),
            faits: vec![
                fait(&["AUTRE"], &["FACTURATIONS"], &[]),
                fait(
                    &["NE_SAIS_PAS", "VIOLENCES"],
                    &["FACTURATIONS", "PROBLEME_QUALITE_SOINS"],
                    &["NON_RESPECT_DROITS"],
                ),
            ],
        };

        let context = build_context(&situation);

        assert_eq!(
            context.place_type.as_deref(),
            Some("ETABLISSEMENT_PERSONNES_AGEES")
        );
        assert_eq!(context.finess.as_deref(), Some("130000011"));
        assert_eq!(context.postal_code.as_deref(), Some("13008"));
        assert_eq!(context.professional_service_type.as_deref(), Some("SSIAD"));
        assert_eq!(context.is_maltraitance, Some(true));
        assert_eq!(
            context.declared_motifs(),
            ["FACTURATIONS", "FACTURATIONS", "PROBLEME_QUALITE_SOINS"]
        );
        assert_eq!(context.qualified_motifs(), ["NON_RESPECT_DROITS"]);
    }

    #[test]
    fn unknown_and_negative_harm_types_are_not_mistreatment() {
        let situation = Situation {
            faits: vec![fait(&["NON", "NE_SAIS_PAS", "AUTRE", "INCONNU"], &[], &[])],
            ..Situation::default()
        };
        assert_eq!(build_context(&situation).is_maltraitance, Some(false));
    }

    #[test]
    fn explicit_postal_code_wins_over_label() {
        let situation = Situation {
            lieu_de_survenue: Some(LieuDeSurvenue {
                adresse: Some(Adresse {
                    label: Some("Paris 75001".to_string()),
                    code_postal: Some("69003".to_string()),
                }),
                ..LieuDeSurvenue::default()
            }),
            ..Situation::default()
        };
        assert_eq!(build_context(&situation).postal_code.as_deref(), Some("69003"));
    }

    #[test]
    fn decorated_postal_code_defers_to_label() {
        let adresse = |code_postal: &str| Situation {
            lieu_de_survenue: Some(LieuDeSurvenue {
                adresse: Some(Adresse {
                    label: Some("Paris 75001".to_string()),
                    code_postal: Some(code_postal.to_string()),
                }),
                ..LieuDeSurvenue::default()
            }),
            ..Situation::default()
        };

        let decorated = build_context(&adresse("CP 69003 bis"));
        assert_eq!(decorated.postal_code.as_deref(), Some("75001"));

        let padded = build_context(&adresse(" 69003 "));
        assert_eq!(padded.postal_code.as_deref(), Some("69003"));
    }
}
