//! Free-text extraction of postal codes and FINESS facility identifiers.
//!
//! Both extractors only consider maximal runs of ASCII digits, so a code glued
//! to other digits (a phone number, a SIRET) is never split into a match.

use regex::Regex;
use std::sync::OnceLock;

const POSTAL_CODE_LEN: usize = 5;
const FINESS_LEN: usize = 9;

static DIGIT_RUN: OnceLock<Regex> = OnceLock::new();

fn digit_runs(raw: &str) -> impl Iterator<Item = &str> {
    DIGIT_RUN
        .get_or_init(|| Regex::new("[0-9]+").expect("digit run pattern compiles"))
        .find_iter(raw)
        .map(|found| found.as_str())
}

/// Returns the first standalone five-digit run in `raw`.
pub fn extract_postal_code(raw: &str) -> Option<String> {
    digit_runs(raw)
        .find(|run| run.len() == POSTAL_CODE_LEN)
        .map(str::to_string)
}

/// Extracts a FINESS number (`DD0OOOOOC`) from noisy free text.
///
/// Candidates are standalone nine-digit runs. Preference order: first
/// structurally valid candidate passing Luhn, then the only structurally valid
/// candidate, then the only nine-digit run at all.
pub fn extract_finess_from_raw_text(raw: &str) -> Option<String> {
    let candidates: Vec<&str> = digit_runs(raw)
        .filter(|run| run.len() == FINESS_LEN)
        .collect();
    if candidates.is_empty() {
        return None;
    }

    let structural: Vec<&str> = candidates
        .iter()
        .copied()
        .filter(|candidate| candidate.as_bytes().get(2) == Some(&b'0'))
        .collect();

    if let Some(valid) = structural.iter().find(|candidate| luhn_is_valid(candidate)) {
        return Some((*valid).to_string());
    }

    if structural.len() == 1 {
        return Some(structural[0].to_string());
    }

    if structural.is_empty() && candidates.len() == 1 {
        return Some(candidates[0].to_string());
    }

    None
}

/// Standard mod-10 check, doubling every second digit from the right.
pub fn luhn_is_valid(digits: &str) -> bool {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    let sum: u32 = digits
        .bytes()
        .rev()
        .enumerate()
        .map(|(index, byte)| {
            let digit = u32::from(byte - b'0');
            if index % 2 == 1 {
                let doubled = digit * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                digit
            }
        })
        .sum();

    sum % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    // 750000010 and 130000011 satisfy both the structure and the checksum.
    const VALID_PARIS: &str = "750000010";
    const VALID_MARSEILLE: &str = "130000011";

    #[test]
    fn luhn_accepts_known_valid_numbers() {
        assert!(luhn_is_valid(VALID_PARIS));
        assert!(luhn_is_valid(VALID_MARSEILLE));
        assert!(luhn_is_valid("79927398713"));
        assert!(!luhn_is_valid("750000016"));
        assert!(!luhn_is_valid(""));
        assert!(!luhn_is_valid("75a000010"));
    }

    #[test]
    fn postal_code_is_first_standalone_run() {
        assert_eq!(
            extract_postal_code("Paris 75001 France"),
            Some("75001".to_string())
        );
        assert_eq!(extract_postal_code("no code here"), None);
        assert_eq!(
            extract_postal_code("tel 0612345678, CP 69003"),
            Some("69003".to_string())
        );
        assert_eq!(
            extract_postal_code("13008Marseille"),
            Some("13008".to_string())
        );
    }

    #[test]
    fn finess_prefers_luhn_valid_structural_candidate() {
        let text = format!("EHPAD Les Lilas, FINESS {VALID_PARIS}");
        assert_eq!(
            extract_finess_from_raw_text(&text),
            Some(VALID_PARIS.to_string())
        );
    }

    #[test]
    fn finess_picks_luhn_valid_among_two_candidates() {
        let text = format!("ancien 750000016 nouveau {VALID_MARSEILLE}");
        assert_eq!(
            extract_finess_from_raw_text(&text),
            Some(VALID_MARSEILLE.to_string())
        );
    }

    #[test]
    fn finess_returns_single_structural_candidate_without_checksum() {
        assert_eq!(
            extract_finess_from_raw_text("code 750000016"),
            Some("750000016".to_string())
        );
    }

    #[test]
    fn finess_returns_lone_run_when_structure_rejects_everything() {
        assert_eq!(
            extract_finess_from_raw_text("numero 751234567"),
            Some("751234567".to_string())
        );
    }

    #[test]
    fn finess_is_not_found_when_ambiguous() {
        assert_eq!(extract_finess_from_raw_text("750000016 ou 130000012"), None);
        assert_eq!(extract_finess_from_raw_text("751234567 ou 131234567"), None);
        assert_eq!(extract_finess_from_raw_text("rien"), None);
        assert_eq!(extract_finess_from_raw_text("7500000150"), None);
    }
}
