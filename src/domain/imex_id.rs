use crate::utils::error::{DxError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// IMEx identifier: `IM-<n>` for a publication, `IM-<n>-<m>` for one of its interactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImexId {
    publication: u64,
    sequence: Option<u64>,
}

impl ImexId {
    pub fn publication(n: u64) -> Self {
        Self {
            publication: n,
            sequence: None,
        }
    }

    /// The interaction id `IM-<n>-<m>` under this publication id.
    pub fn interaction(&self, m: u64) -> Self {
        Self {
            publication: self.publication,
            sequence: Some(m),
        }
    }

    pub fn publication_id(&self) -> Self {
        Self::publication(self.publication)
    }

    pub fn number(&self) -> u64 {
        self.publication
    }

    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    pub fn is_publication(&self) -> bool {
        self.sequence.is_none()
    }
}

impl fmt::Display for ImexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sequence {
            Some(m) => write!(f, "IM-{}-{}", self.publication, m),
            None => write!(f, "IM-{}", self.publication),
        }
    }
}

fn parse_number(part: &str, value: &str) -> Result<u64> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DxError::InvalidImexId {
            value: value.to_string(),
        });
    }
    part.parse().map_err(|_| DxError::InvalidImexId {
        value: value.to_string(),
    })
}

impl FromStr for ImexId {
    type Err = DxError;

    fn from_str(value: &str) -> Result<Self> {
        let rest = value
            .trim()
            .strip_prefix("IM-")
            .ok_or_else(|| DxError::InvalidImexId {
                value: value.to_string(),
            })?;

        let mut parts = rest.split('-');
        let publication = parse_number(parts.next().unwrap_or(""), value)?;
        let sequence = parts.next().map(|m| parse_number(m, value)).transpose()?;
        if parts.next().is_some() {
            return Err(DxError::InvalidImexId {
                value: value.to_string(),
            });
        }

        Ok(Self {
            publication,
            sequence,
        })
    }
}

impl TryFrom<String> for ImexId {
    type Error = DxError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ImexId> for String {
    fn from(id: ImexId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_publication_and_interaction_ids() {
        let publication: ImexId = "IM-1234".parse().unwrap();
        assert!(publication.is_publication());
        assert_eq!(publication.number(), 1234);

        let interaction: ImexId = "IM-1234-7".parse().unwrap();
        assert_eq!(interaction.sequence(), Some(7));
        assert_eq!(interaction.publication_id(), publication);
        assert_eq!(interaction.to_string(), "IM-1234-7");
    }

    #[test]
    fn test_rejects_malformed_ids() {
        for bad in ["", "IM-", "IM-x", "IM-1-", "IM-1-2-3", "im-1", "EBI-1", "IM--2"] {
            assert!(bad.parse::<ImexId>().is_err(), "accepted {}", bad);
        }
    }

    #[test]
    fn test_interaction_ids_sort_numerically() {
        let base = ImexId::publication(10);
        let mut ids = vec![base.interaction(10), base.interaction(2), base.interaction(1)];
        ids.sort();
        let rendered: Vec<String> = ids.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["IM-10-1", "IM-10-2", "IM-10-10"]);
    }
}
