use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

/// Health of a tracked endpoint.
///
/// Only `Healthy` and `Unhealthy` are ever stored in the table. `Unspecified`
/// is what an absent or unrecognized wire value decodes to, and the merge
/// rejects it. DEAD is not a state: it is the sweeper's eviction condition.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthState {
    #[default]
    Unspecified,
    Healthy,
    Unhealthy,
}

impl HealthState {
    pub fn is_known(self) -> bool {
        !matches!(self, HealthState::Unspecified)
    }

    /// Numeric values as assigned by the protobuf `State` enum.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => HealthState::Healthy,
            2 => HealthState::Unhealthy,
            _ => HealthState::Unspecified,
        }
    }
}

impl FromStr for HealthState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HEALTHY" | "STATE_HEALTHY" => Ok(HealthState::Healthy),
            "UNHEALTHY" | "STATE_UNHEALTHY" => Ok(HealthState::Unhealthy),
            "UNSPECIFIED" | "STATE_UNSPECIFIED" => Ok(HealthState::Unspecified),
            other => Err(format!("unknown health state '{}'", other)),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawState {
    Name(String),
    Code(i64),
    Other(IgnoredAny),
}

// Anything unrecognized (unknown names, out-of-range codes, null, objects)
// decodes to `Unspecified`, so the merge can reject that one record instead
// of the whole batch failing to decode.
impl<'de> Deserialize<'de> for HealthState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let state = match RawState::deserialize(deserializer)? {
            RawState::Name(name) => name.parse().unwrap_or(HealthState::Unspecified),
            RawState::Code(code) => HealthState::from_code(code),
            RawState::Other(_) => HealthState::Unspecified,
        };
        Ok(state)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawText {
    Text(String),
    Other(IgnoredAny),
}

/// Non-string values (null included) become an empty string.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match RawText::deserialize(deserializer)? {
        RawText::Text(text) => Ok(text),
        RawText::Other(_) => Ok(String::new()),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRecord {
    Record(Record),
    Other(IgnoredAny),
}

/// Decodes a record batch element by element. An element that is not an
/// object becomes an empty record, which the merge then rejects.
pub(crate) fn lenient_records<'de, D>(deserializer: D) -> Result<Vec<Record>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<RawRecord>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|element| match element {
            RawRecord::Record(record) => record,
            RawRecord::Other(_) => Record::default(),
        })
        .collect())
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HealthState::Unspecified => "UNSPECIFIED",
            HealthState::Healthy => "HEALTHY",
            HealthState::Unhealthy => "UNHEALTHY",
        };
        f.write_str(name)
    }
}

/// A service endpoint as exchanged between nodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Record {
    #[serde(deserialize_with = "lenient_string")]
    pub service: String,
    #[serde(deserialize_with = "lenient_string")]
    pub endpoint: String,
    #[serde(deserialize_with = "lenient_string")]
    pub zone: String,
    pub state: HealthState,
}

impl Record {
    pub fn healthy(service: &str, endpoint: &str, zone: &str) -> Self {
        Self {
            service: service.to_string(),
            endpoint: endpoint.to_string(),
            zone: zone.to_string(),
            state: HealthState::Healthy,
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} service={} zone={} state={}",
            self.endpoint, self.service, self.zone, self.state
        )
    }
}

/// A table entry: the advertised record plus the local time it was last
/// confirmed.
///
/// `last_updated` is a local monotonic timestamp. Peer clocks are never
/// trusted, so it is always stamped with this node's receipt time.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthRecord {
    pub record: Record,
    pub last_updated: Instant,
}

impl HealthRecord {
    pub fn new(record: Record, now: Instant) -> Self {
        Self {
            record,
            last_updated: now,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.record.endpoint
    }

    pub fn state(&self) -> HealthState {
        self.record.state
    }

    /// Marks the record healthy and refreshes its timestamp.
    pub fn promote(&mut self, now: Instant) {
        self.record.state = HealthState::Healthy;
        if now > self.last_updated {
            self.last_updated = now;
        }
    }
}
