//! Coordinate reference system handles and the `srsName` resolver.
//!
//! Only EPSG codes are understood. The resolver accepts the identifier
//! spellings WFS servers put in `srsName` attributes and caches each raw
//! value for the lifetime of a decoder.

use std::fmt;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A resolved coordinate reference system, identified by its EPSG code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Crs {
    code: u32,
}

impl Crs {
    pub const WGS84: Crs = Crs { code: 4326 };

    #[must_use]
    pub const fn epsg(code: u32) -> Self {
        Self { code }
    }

    #[must_use]
    pub fn code(&self) -> u32 {
        self.code
    }

    /// The SRID handed to geozero processors.
    #[must_use]
    pub fn srid(&self) -> Option<i32> {
        i32::try_from(self.code).ok()
    }

    /// Whether the EPSG code falls in the geographic 2D/3D block, whose
    /// authority axis order is latitude first.
    #[must_use]
    pub fn is_geographic(&self) -> bool {
        (4000..5000).contains(&self.code)
    }
}

impl Default for Crs {
    fn default() -> Self {
        Crs::WGS84
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.code)
    }
}

impl TryFrom<String> for Crs {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        parse_identifier(&value).ok_or(Error::ReferenceLookup(value))
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self {
        crs.to_string()
    }
}

/// Extracts an EPSG code from any of the identifier forms below.
///
/// - `EPSG:4326`
/// - `urn:ogc:def:crs:EPSG::4326`, `urn:ogc:def:crs:EPSG:6.11:4326`
/// - `urn:x-ogc:def:crs:EPSG:4326`
/// - `http://www.opengis.net/gml/srs/epsg.xml#4326`
/// - `http://www.opengis.net/def/crs/EPSG/0/4326`
fn parse_identifier(raw: &str) -> Option<Crs> {
    let raw = raw.trim();
    let code = if raw.starts_with("http://") || raw.starts_with("https://") {
        if let Some((_, code)) = raw.rsplit_once('#') {
            code
        } else {
            let (prefix, code) = raw.rsplit_once('/')?;
            if !prefix.to_ascii_lowercase().contains("/crs/epsg/") {
                return None;
            }
            code
        }
    } else {
        let lower = raw.to_ascii_lowercase();
        let is_epsg = lower.starts_with("epsg:")
            || lower.starts_with("urn:ogc:def:crs:epsg:")
            || lower.starts_with("urn:x-ogc:def:crs:epsg:");
        if !is_epsg {
            return None;
        }
        raw.rsplit(':').next()?
    };

    code.trim().parse::<u32>().ok().map(Crs::epsg)
}

/// Resolves optional `srsName` values, memoising every raw identifier seen.
#[derive(Debug, Default)]
pub struct ReferenceResolver {
    cache: HashMap<String, Crs>,
}

impl ReferenceResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `default` when no identifier is given, otherwise the resolved
    /// system.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReferenceLookup`] if the identifier is present but not
    /// an EPSG code in one of the supported spellings.
    pub fn resolve(&mut self, srs_name: Option<&str>, default: Crs) -> Result<Crs> {
        let Some(srs_name) = srs_name else {
            return Ok(default);
        };
        if let Some(crs) = self.cache.get(srs_name) {
            return Ok(*crs);
        }
        let crs = parse_identifier(srs_name)
            .ok_or_else(|| Error::ReferenceLookup(srs_name.to_string()))?;
        self.cache.insert(srs_name.to_string(), crs);
        Ok(crs)
    }

    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
