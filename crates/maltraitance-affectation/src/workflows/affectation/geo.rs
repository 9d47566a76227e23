use serde::{Deserialize, Serialize};

use super::repository::LookupError;

/// Administrative geography of a commune, resolved from its postal code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoEntite {
    pub insee_code: String,
    pub postal_code: String,
    pub dpt_code: String,
    /// Code of the territorial authority exercising departmental powers.
    pub ctcd_code: String,
    pub dpt_nom: String,
    pub region_code: String,
    pub region_nom: String,
}

/// Postal code to geography collaborator.
///
/// An unknown postal code is `Ok(None)`; errors are reserved for a backend
/// that cannot answer at all.
pub trait GeoResolver: Send + Sync {
    fn find_geo_by_postal_code(&self, postal_code: &str)
        -> Result<Option<GeoEntite>, LookupError>;
}
