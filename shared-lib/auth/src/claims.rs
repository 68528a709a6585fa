//! Claim sets carried in a token payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Claim key holding the identity id.
pub const ID_CLAIM: &str = "id";

/// Claim key holding one role name.
pub const ROLES_CLAIM: &str = "roles";

/// Registered payload members that a claim set may not shadow.
pub const RESERVED_CLAIMS: [&str; 3] = ["iss", "aud", "exp"];

/// A single key/value fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub key: String,
    pub value: String,
}

impl Claim {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Ordered claims. Keys may repeat; nothing is deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimSet {
    claims: Vec<Claim>,
}

impl ClaimSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the claims for a verified identity: one `id` claim, then one
    /// `roles` claim per role in the given order.
    pub fn for_identity<S: AsRef<str>>(identity_id: &str, roles: &[S]) -> Self {
        let mut set = Self::new();
        set.push(ID_CLAIM, identity_id);
        for role in roles {
            set.push(ROLES_CLAIM, role.as_ref());
        }
        set
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.claims.push(Claim::new(key, value));
    }

    pub fn iter(&self) -> impl Iterator<Item = &Claim> {
        self.claims.iter()
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// All values for `key`, in claim order.
    pub fn values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.claims
            .iter()
            .filter(move |c| c.key == key)
            .map(|c| c.value.as_str())
    }

    /// The value for `key` if exactly one claim carries it.
    pub fn single<'a>(&'a self, key: &'a str) -> Option<&'a str> {
        let mut values = self.values(key);
        match (values.next(), values.next()) {
            (Some(value), None) => Some(value),
            _ => None,
        }
    }

    /// JSON members for a payload. A key seen once becomes a string, a key
    /// seen more than once becomes an array in claim order.
    pub fn to_json_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for claim in &self.claims {
            if RESERVED_CLAIMS.contains(&claim.key.as_str()) {
                tracing::warn!("Dropping claim shadowing registered member '{}'", claim.key);
                continue;
            }
            let value = Value::String(claim.value.clone());
            match map.get_mut(&claim.key) {
                None => {
                    map.insert(claim.key.clone(), value);
                }
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
            }
        }
        map
    }

    /// Inverse of [`ClaimSet::to_json_map`]. Arrays expand to one claim per
    /// element; numbers and booleans keep their JSON text. Nested objects
    /// and nulls carry no claim and are skipped.
    pub fn from_json_map(map: &Map<String, Value>) -> Self {
        let mut set = Self::new();
        for (key, value) in map {
            match value {
                Value::Array(items) => {
                    for item in items {
                        if let Some(text) = scalar_text(item) {
                            set.push(key.as_str(), text);
                        }
                    }
                }
                other => {
                    if let Some(text) = scalar_text(other) {
                        set.push(key.as_str(), text);
                    }
                }
            }
        }
        set
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl<'a> IntoIterator for &'a ClaimSet {
    type Item = &'a Claim;
    type IntoIter = std::slice::Iter<'a, Claim>;

    fn into_iter(self) -> Self::IntoIter {
        self.claims.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_for_identity_order() {
        let set = ClaimSet::for_identity("U1", &["admin", "editor"]);
        let pairs: Vec<(&str, &str)> = set
            .iter()
            .map(|c| (c.key.as_str(), c.value.as_str()))
            .collect();
        assert_eq!(pairs, vec![("id", "U1"), ("roles", "admin"), ("roles", "editor")]);
    }

    #[test]
    fn test_duplicate_roles_kept() {
        let set = ClaimSet::for_identity("U1", &["admin", "admin"]);
        assert_eq!(set.len(), 3);
        assert_eq!(set.values(ROLES_CLAIM).collect::<Vec<_>>(), vec!["admin", "admin"]);
    }

    #[test]
    fn test_no_roles() {
        let set = ClaimSet::for_identity::<&str>("U1", &[]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.single(ID_CLAIM), Some("U1"));
    }

    #[test]
    fn test_json_shape() {
        let one = ClaimSet::for_identity("U1", &["admin"]).to_json_map();
        assert_eq!(Value::Object(one), json!({"id": "U1", "roles": "admin"}));

        let many = ClaimSet::for_identity("U1", &["admin", "editor", "admin"]).to_json_map();
        assert_eq!(
            Value::Object(many),
            json!({"id": "U1", "roles": ["admin", "editor", "admin"]})
        );
    }

    #[test]
    fn test_reserved_keys_dropped() {
        let mut set = ClaimSet::for_identity::<&str>("U1", &[]);
        set.push("iss", "spoofed");
        let map = set.to_json_map();
        assert!(!map.contains_key("iss"));
    }

    #[test]
    fn test_from_json_map() {
        let value = json!({"id": "U1", "roles": ["admin", "editor"], "level": 3, "meta": {"x": 1}});
        let set = ClaimSet::from_json_map(value.as_object().unwrap());

        assert_eq!(set.single(ID_CLAIM), Some("U1"));
        assert_eq!(set.values(ROLES_CLAIM).collect::<Vec<_>>(), vec!["admin", "editor"]);
        assert_eq!(set.single("level"), Some("3"));
        assert_eq!(set.single("meta"), None);
    }

    #[test]
    fn test_single_rejects_repeats() {
        let mut set = ClaimSet::for_identity::<&str>("U1", &[]);
        set.push(ID_CLAIM, "U2");
        assert_eq!(set.single(ID_CLAIM), None);
    }

    #[test]
    fn test_single_outlives_key() {
        let set = ClaimSet::for_identity("U1", &["admin"]);
        let value = {
            let key = String::from(ID_CLAIM);
            set.single(&key).map(str::to_string)
        };
        assert_eq!(value.as_deref(), Some("U1"));
    }
}
