//! # DID URLs
//!
//! Resources linked to a DID are addressed by their ordinal on the DID's
//! satoshi:
//!
//! ```text
//! did:btco:<sat>/<index>                       current form
//! did:btco:<sat>/<index>/info                  metadata about the resource
//! did:btco:<sat>/resources/<index>[/info]      legacy form
//! did:btco:<sat>/<index>?format=application/json
//! did:btco:<sat>#key-1                         fragment, no resource
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::identifier::BtcoDid;
use crate::error::{BtcoError, BtcoResult};

const LEGACY_RESOURCES_SEGMENT: &str = "resources";
const INFO_SEGMENT: &str = "info";

/// A parsed `did:btco` URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidUrl {
    pub did: BtcoDid,
    /// Path after the DID, without the leading `/`.
    pub resource_path: Option<String>,
    pub resource_index: Option<usize>,
    /// Whether the `/info` segment was present.
    pub info: bool,
    pub query: BTreeMap<String, String>,
    pub fragment: Option<String>,
}

impl DidUrl {
    pub fn is_resource(&self) -> bool {
        self.resource_index.is_some()
    }

    /// `format=` query value, if any.
    pub fn format(&self) -> Option<&str> {
        self.query.get("format").map(String::as_str)
    }

    /// The caller asked for resource metadata rather than the content.
    pub fn wants_info(&self) -> bool {
        self.info || self.format().is_some()
    }
}

impl FromStr for DidUrl {
    type Err = BtcoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (rest, fragment) = match s.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment.to_string())),
            None => (s, None),
        };
        let (rest, query) = match rest.split_once('?') {
            Some((rest, query)) => (rest, parse_query(query)),
            None => (rest, BTreeMap::new()),
        };
        let (did, path) = match rest.split_once('/') {
            Some((did, path)) => (did, Some(path)),
            None => (rest, None),
        };
        let did: BtcoDid = did.parse()?;

        let (resource_index, info) = match path {
            None => (None, false),
            Some(path) => {
                let (index, info) = parse_resource_path(path)
                    .ok_or_else(|| BtcoError::InvalidInput(format!("unsupported DID URL path '/{path}'")))?;
                (Some(index), info)
            }
        };

        Ok(DidUrl {
            did,
            resource_path: path.map(str::to_string),
            resource_index,
            info,
            query,
            fragment,
        })
    }
}

impl fmt::Display for DidUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.did)?;
        if let Some(path) = &self.resource_path {
            write!(f, "/{path}")?;
        }
        for (i, (key, value)) in self.query.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{sep}{key}={value}")?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

/// `<index>[/info]` or `resources/<index>[/info]`.
fn parse_resource_path(path: &str) -> Option<(usize, bool)> {
    let segments: Vec<&str> = path.trim_end_matches('/').split('/').collect();
    let segments = match segments.as_slice() {
        [LEGACY_RESOURCES_SEGMENT, rest @ ..] => rest,
        all => all,
    };
    match segments {
        [index] => Some((parse_index(index)?, false)),
        [index, INFO_SEGMENT] => Some((parse_index(index)?, true)),
        _ => None,
    }
}

fn parse_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

fn parse_query(query: &str) -> BTreeMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

pub fn parse_did_url(url: &str) -> BtcoResult<DidUrl> {
    url.parse()
}
