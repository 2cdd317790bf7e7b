use crate::error::ScoutError;
use serde::Deserialize;

/// The identification document served at `/xmldata?item=all`.
///
/// Only the fields the registry consumes are modeled; iLO generations vary
/// in which sections they emit, so everything below the root is optional.
/// quick-xml performs no DTD or external-entity processing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Rimp {
    #[serde(rename = "HSI", default)]
    pub hsi: Option<HostSystemInfo>,

    #[serde(rename = "MP", default)]
    pub mp: Option<ManagementProcessor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostSystemInfo {
    /// Server serial number.
    #[serde(rename = "SBSN", default)]
    pub serial_number: Option<String>,

    /// Server product name.
    #[serde(rename = "SPN", default)]
    pub product_name: Option<String>,

    #[serde(rename = "UUID", default)]
    pub uuid: Option<String>,

    /// Correlatable UUID, present on iLO 3 and newer.
    #[serde(rename = "cUUID", default)]
    pub c_uuid: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManagementProcessor {
    /// Management processor product name, e.g. "Integrated Lights-Out 4 (iLO 4)".
    #[serde(rename = "PN", default)]
    pub product_name: Option<String>,

    /// Firmware revision.
    #[serde(rename = "FWRI", default)]
    pub firmware: Option<String>,

    #[serde(rename = "SN", default)]
    pub serial_number: Option<String>,

    #[serde(rename = "UUID", default)]
    pub uuid: Option<String>,
}

impl Rimp {
    /// The controller identity used as the registry key: the host UUID when
    /// present, otherwise the correlatable UUID, otherwise the management
    /// processor UUID.
    pub fn uuid(&self) -> Option<&str> {
        self.hsi
            .as_ref()
            .and_then(|h| h.uuid.as_deref().or(h.c_uuid.as_deref()))
            .or_else(|| self.mp.as_ref().and_then(|m| m.uuid.as_deref()))
            .filter(|u| !u.is_empty())
    }
}

/// Parse an identification response body.
///
/// Valid bodies start with the literal `<RIMP>`; anything else (an HTML
/// login page, a different management product, garbage) is rejected before
/// the XML parser runs.
pub fn parse_rimp(body: &str) -> Result<Rimp, ScoutError> {
    let trimmed = body.trim_start();
    if !trimmed.starts_with("<RIMP>") {
        return Err(ScoutError::ProbeBadBody(
            "body does not start with <RIMP>".to_string(),
        ));
    }

    quick_xml::de::from_str(trimmed).map_err(|e| ScoutError::ProbeBadBody(e.to_string()))
}
