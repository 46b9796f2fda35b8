//! Composite `<backupId>:<instanceId>` identity of a provisioned backup.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Separator between the backup id and the instance id.
pub const SEPARATOR: char = ':';

/// The only durable state this crate owns for a backup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceIdentity {
    pub backup_id: String,
    pub instance_id: String,
}

impl ResourceIdentity {
    pub fn new(backup_id: impl Into<String>, instance_id: impl Into<String>) -> Self {
        Self {
            backup_id: backup_id.into(),
            instance_id: instance_id.into(),
        }
    }

    /// Serialize to the persisted form.
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Parse the persisted form. Parts are used verbatim.
    pub fn decode(s: &str) -> Result<Self, Error> {
        let mut parts = s.split(SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(backup_id), Some(instance_id), None)
                if !backup_id.is_empty() && !instance_id.is_empty() =>
            {
                Ok(Self::new(backup_id, instance_id))
            }
            _ => Err(Error::MalformedIdentity(s.to_string())),
        }
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.backup_id, SEPARATOR, self.instance_id)
    }
}

impl FromStr for ResourceIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
