// src/health/status.rs
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Severity of a dependency (or of the whole service), least to most severe.
///
/// The discriminants are the wire values; comparing two statuses compares
/// severity, so `max` is always the worse of the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(i32)]
pub enum HealthStatus {
    #[default]
    NotSet = 0,
    OK = 1,
    Warning = 2,
    Critical = 3,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatusError {
    #[error("{0} is not a valid HealthStatus")]
    InvalidName(String),

    #[error("{0} is not a valid HealthStatus value")]
    InvalidValue(i32),
}

const NAMES: [(HealthStatus, &str); 4] = [
    (HealthStatus::NotSet, "NotSet"),
    (HealthStatus::OK, "OK"),
    (HealthStatus::Warning, "Warning"),
    (HealthStatus::Critical, "Critical"),
];

impl HealthStatus {
    pub fn name(self) -> &'static str {
        NAMES[self as usize].1
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        NAMES
            .iter()
            .find(|(status, _)| *status as i32 == value)
            .map(|(status, _)| *status)
    }

    /// Exact, case-sensitive match against the canonical names.
    pub fn parse(name: &str) -> Result<Self, StatusError> {
        NAMES
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(status, _)| *status)
            .ok_or_else(|| StatusError::InvalidName(name.to_string()))
    }

    /// Like [`HealthStatus::parse`], but always hands back a status:
    /// `NotSet` accompanies the error when the name is unknown.
    pub fn parse_or_default(name: &str) -> (Self, Option<StatusError>) {
        match Self::parse(name) {
            Ok(status) => (status, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    pub fn marshal_text(self) -> Vec<u8> {
        self.name().as_bytes().to_vec()
    }

    /// Replaces `self` with the parsed status. On failure `self` is untouched.
    pub fn unmarshal_text(&mut self, text: &[u8]) -> Result<(), StatusError> {
        let name = String::from_utf8_lossy(text);
        *self = Self::parse(&name)?;
        Ok(())
    }

    pub fn worse(self, other: Self) -> Self {
        self.max(other)
    }

    pub fn is_healthy(self) -> bool {
        self <= HealthStatus::OK
    }
}

/// Reduces statuses to the most severe one. An empty input is `NotSet`.
pub fn worst<I>(statuses: I) -> HealthStatus
where
    I: IntoIterator<Item = HealthStatus>,
{
    statuses
        .into_iter()
        .fold(HealthStatus::NotSet, HealthStatus::worse)
}

/// Canonical name for a raw status value. Unknown values render as
/// `HealthStatus(<n>)` instead of failing.
pub fn status_name(value: i32) -> Cow<'static, str> {
    match HealthStatus::from_i32(value) {
        Some(status) => Cow::Borrowed(status.name()),
        None => Cow::Owned(format!("HealthStatus({})", value)),
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HealthStatus {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<i32> for HealthStatus {
    type Error = StatusError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::from_i32(value).ok_or(StatusError::InvalidValue(value))
    }
}

impl Serialize for HealthStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for HealthStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = Cow::<'de, str>::deserialize(deserializer)?;
        Self::parse(&name).map_err(serde::de::Error::custom)
    }
}
