use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Display and parsing shared by the UUID-backed ids; serde goes through the
/// inner `Uuid`, which already uses the hyphenated string form.
macro_rules! uuid_text {
    ($name:ident) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

/// Identifier of a task row.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

impl TaskId {
    #[must_use]
    /// Generate a fresh task identifier.
    pub fn new() -> Self {
        // Time-ordered ids keep locally generated rows sortable by creation.
        Self(Uuid::now_v7())
    }

    /// Short hexadecimal prefix used when listing tasks.
    #[must_use]
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_owned()
    }
}

uuid_text!(TaskId);

/// Identifier of an authenticated user (the task owner).
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    #[must_use]
    /// Generate a fresh user identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

uuid_text!(UserId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_uses_uuid_v7() {
        let id = TaskId::new();
        assert_eq!(id.0.get_version_num(), 7);
    }

    #[test]
    fn task_id_short_is_simple_prefix() {
        let id: TaskId = "019a6ff3-119f-7661-869e-2a6c4fca5c4f"
            .parse()
            .unwrap_or_else(|err| panic!("must parse task id: {err}"));
        assert_eq!(id.short(), "019a6ff3");
    }

    #[test]
    fn user_id_parses_supabase_uuid() {
        let raw = "6f1c0d8e-3c4b-4e55-9a77-0b1f2f0a9c11";
        let parsed: UserId = raw
            .parse()
            .unwrap_or_else(|err| panic!("must parse user id: {err}"));
        assert_eq!(parsed.to_string(), raw);
    }

    #[test]
    fn ids_travel_as_plain_strings() {
        let raw = "\"6f1c0d8e-3c4b-4e55-9a77-0b1f2f0a9c11\"";
        let id: UserId =
            serde_json::from_str(raw).unwrap_or_else(|err| panic!("must decode user id: {err}"));
        assert_eq!(
            serde_json::to_string(&id).unwrap_or_else(|err| panic!("must encode: {err}")),
            raw
        );
        assert!(serde_json::from_str::<TaskId>("\"nope\"").is_err());
    }

    #[test]
    fn ids_reject_garbage() {
        assert!("not-a-uuid".parse::<TaskId>().is_err());
        assert!("".parse::<UserId>().is_err());
    }
}
