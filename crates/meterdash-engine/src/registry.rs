//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Telemetry binding and aggregation for the metering dashboard."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::roles::{Role, ROLE_TABLE};

/// Opaque channel identifier handed out by the host.
///
/// Hosts send ids either as JSON strings or numbers while value maps are always
/// keyed by strings, so every id is normalised to its string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for ChannelId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for ChannelId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<i64> for ChannelId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for ChannelId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Unsigned(u64),
            Signed(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => ChannelId(text),
            RawId::Unsigned(number) => ChannelId::from(number),
            RawId::Signed(number) => ChannelId::from(number),
        })
    }
}

/// Ordered channel ids from the latest configuration event.
///
/// Binding replaces the previous list wholesale. Length and uniqueness are not
/// checked: a short list leaves the trailing roles unbound, and positions past
/// the role table are kept but never read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelRegistry {
    ids: Vec<ChannelId>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry directly from an ordered id list.
    pub fn from_ids<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ChannelId>,
    {
        let mut registry = Self::new();
        registry.bind(ids);
        registry
    }

    /// Replace the current binding unconditionally.
    pub fn bind<I, T>(&mut self, ids: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<ChannelId>,
    {
        self.ids = ids.into_iter().map(Into::into).collect();
    }

    /// Channel bound to `role`, or `None` when the configuration is too short.
    pub fn channel_for(&self, role: Role) -> Option<&ChannelId> {
        self.ids.get(role.position())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[ChannelId] {
        &self.ids
    }

    /// Roles with a channel behind them, in table order.
    pub fn bound_roles(&self) -> impl Iterator<Item = (Role, &ChannelId)> + '_ {
        ROLE_TABLE.iter().copied().zip(self.ids.iter())
    }

    /// Roles that will always resolve to the default until the next binding.
    pub fn unbound_roles(&self) -> impl Iterator<Item = Role> + '_ {
        ROLE_TABLE.iter().copied().skip(self.ids.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_and_text_ids_normalise_to_the_same_channel() {
        let numeric: ChannelId = serde_json::from_str("1042").unwrap();
        let text: ChannelId = serde_json::from_str("\"1042\"").unwrap();
        let negative: ChannelId = serde_json::from_str("-7").unwrap();
        assert_eq!(numeric, text);
        assert_eq!(numeric.as_str(), "1042");
        assert_eq!(negative.as_str(), "-7");
    }

    #[test]
    fn bind_replaces_previous_binding() {
        let mut registry = ChannelRegistry::from_ids(["a", "b", "c", "d"]);
        assert_eq!(registry.channel_for(Role::I1), Some(&ChannelId::from("d")));

        registry.bind(["x", "y"]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.channel_for(Role::U2), Some(&ChannelId::from("y")));
        assert_eq!(registry.channel_for(Role::U3), None);
        assert_eq!(registry.channel_for(Role::I1), None);
    }

    #[test]
    fn duplicates_and_overlong_lists_are_accepted() {
        let ids: Vec<u64> = (0..25).map(|i| i % 3).collect();
        let registry = ChannelRegistry::from_ids(ids);
        assert_eq!(registry.len(), 25);
        assert_eq!(registry.bound_roles().count(), 18);
        assert_eq!(registry.unbound_roles().count(), 0);
        assert_eq!(registry.channel_for(Role::U1), registry.channel_for(Role::I1));
    }

    #[test]
    fn unbound_roles_start_where_the_list_ends() {
        let registry = ChannelRegistry::from_ids(["u1", "u2", "u3"]);
        let unbound: Vec<Role> = registry.unbound_roles().collect();
        assert_eq!(unbound.len(), 15);
        assert_eq!(unbound.first(), Some(&Role::I1));
        assert_eq!(unbound.last(), Some(&Role::ThdU3N));
    }
}
