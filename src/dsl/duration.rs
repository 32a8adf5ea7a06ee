//! Duration fields accept integer seconds or ISO-8601 text and always
//! normalize to the ISO-8601 form.

use serde::{Deserialize, Deserializer};
use crate::dsl::Timeout;

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum RawDuration {
    Seconds(u64),
    Fractional(f64),
    Iso(String),
}

impl From<RawDuration> for String {
    fn from(raw: RawDuration) -> Self {
        match raw {
            RawDuration::Seconds(secs) => seconds(secs),
            RawDuration::Fractional(secs) => format!("PT{}S", secs),
            RawDuration::Iso(text) => text,
        }
    }
}

/// Canonical ISO-8601 form of a whole number of seconds.
pub fn seconds(secs: u64) -> String {
    format!("PT{}S", secs)
}

pub(crate) fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawDuration>::deserialize(deserializer)?.map(String::from))
}

/// Input shapes accepted for an event timeout.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum RawTimeout {
    Structured {
        period: RawDuration,
        #[serde(default, deserialize_with = "crate::dsl::scalar::opt_string")]
        then: Option<String>,
    },
    Bare(RawDuration),
}

impl From<RawTimeout> for Timeout {
    fn from(raw: RawTimeout) -> Self {
        match raw {
            RawTimeout::Structured { period, then } => Timeout {
                period: period.into(),
                then,
            },
            RawTimeout::Bare(period) => Timeout {
                period: period.into(),
                then: None,
            },
        }
    }
}
