//! Resource keys: deterministic cache identity
//!
//! A [`ResourceKey`] is an ordered tuple of string tokens. Keys sharing a
//! prefix form a family, and invalidating a prefix invalidates every key in
//! the family. Prefix matching is token-by-token over the tuple, never over
//! a joined string, so `["product"]` can never match `["products", "list"]`.
//!
//! Filter parameters are folded into a single token through [`FilterSet`]:
//! fields are kept in a sorted map with absent values omitted, and the token
//! is the JSON encoding of that map. Two filter sets built in different
//! orders therefore always produce byte-equal tokens, and distinct sets
//! always differ.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Ordered, hierarchical identifier for a cached value or family of values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    tokens: Vec<String>,
}

impl ResourceKey {
    /// Create a key rooted at a resource domain (e.g. `"products"`).
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            tokens: vec![domain.into()],
        }
    }

    /// Create a key from an explicit token sequence.
    pub fn from_tokens<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Extend the key with one more token, consuming self.
    pub fn child(mut self, token: impl Into<String>) -> Self {
        self.tokens.push(token.into());
        self
    }

    /// The ordered tokens of this key.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// True if this key belongs to the family rooted at `prefix`.
    ///
    /// A key is a member of its own family.
    pub fn starts_with(&self, prefix: &ResourceKey) -> bool {
        self.tokens.len() >= prefix.tokens.len()
            && self.tokens[..prefix.tokens.len()] == prefix.tokens[..]
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tokens.join(":"))
    }
}

/// Normalized filter parameters for a collection query.
///
/// Fields live in a sorted map; setting a `None` value is a no-op, so
/// "undefined padding" cannot change the resulting key token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    fields: BTreeMap<String, String>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a filter field.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Set a filter field when the value is present; otherwise do nothing.
    pub fn set_opt<V: Into<String>>(self, name: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.set(name, value),
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Canonical token for cache identity: the JSON encoding of the sorted
    /// field map. JSON string escaping keeps distinct sets from colliding.
    pub fn canonical(&self) -> String {
        let map: serde_json::Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, value)| (name.clone(), Value::String(value.clone())))
            .collect();
        Value::Object(map).to_string()
    }

    /// Field pairs in sorted order, for building a query string.
    pub fn pairs(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_extends_tokens() {
        let key = ResourceKey::new("products").child("detail").child("cookie-box");
        assert_eq!(key.tokens(), ["products", "detail", "cookie-box"]);
    }

    #[test]
    fn test_prefix_matching_is_token_wise() {
        let list = ResourceKey::new("products").child("list");
        assert!(list.starts_with(&ResourceKey::new("products")));
        assert!(list.starts_with(&list));
        // "product" is not a prefix of "products" at the token level
        assert!(!list.starts_with(&ResourceKey::new("product")));
        assert!(!ResourceKey::new("products").starts_with(&list));
    }

    #[test]
    fn test_sub_resource_families_are_distinct() {
        let text = ResourceKey::from_tokens(["testimonials", "list", "text"]);
        let video = ResourceKey::from_tokens(["testimonials", "list", "video"]);
        assert_ne!(text, video);
        assert!(!text.starts_with(&video));
        let family = ResourceKey::from_tokens(["testimonials", "list"]);
        assert!(text.starts_with(&family));
        assert!(video.starts_with(&family));
    }

    #[test]
    fn test_filter_set_ignores_absent_values() {
        let filters = FilterSet::new()
            .set("category", "COOKIE")
            .set_opt("search", None::<String>);
        assert_eq!(filters.canonical(), r#"{"category":"COOKIE"}"#);
    }

    #[test]
    fn test_filter_order_does_not_matter() {
        let a = FilterSet::new().set("category", "COOKIE").set("sort", "price_asc");
        let b = FilterSet::new().set("sort", "price_asc").set("category", "COOKIE");
        assert_eq!(a.canonical(), b.canonical());
    }

    #[test]
    fn test_reserved_characters_cannot_collide() {
        // A value embedding a separator must not merge into another field.
        let sneaky = FilterSet::new().set("a", r#"1","b":"2"#);
        let honest = FilterSet::new().set("a", "1").set("b", "2");
        assert_ne!(sneaky.canonical(), honest.canonical());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_fields() -> impl Strategy<Value = Vec<(String, String)>> {
        proptest::collection::vec(("[a-z_]{1,10}", "[ -~]{0,20}"), 0..6)
    }

    proptest! {
        /// Set-equal filter maps produce byte-equal key tokens regardless of
        /// construction order or undefined padding.
        #[test]
        fn prop_key_determinism(fields in arb_fields()) {
            let forward = fields
                .iter()
                .fold(FilterSet::new(), |set, (k, v)| set.set(k.clone(), v.clone()));
            let backward = fields
                .iter()
                .rev()
                .fold(FilterSet::new(), |set, (k, v)| set.set(k.clone(), v.clone()))
                .set_opt("padding", None::<String>);
            prop_assert_eq!(forward.canonical(), backward.canonical());
        }

        /// Changing one defined field always changes the token.
        #[test]
        fn prop_distinct_filters_never_collide(
            fields in arb_fields(),
            name in "[a-z_]{1,10}",
            value in "[ -~]{0,20}",
        ) {
            let base = fields
                .iter()
                .fold(FilterSet::new(), |set, (k, v)| set.set(k.clone(), v.clone()));
            let changed = base.clone().set(name.clone(), format!("{value}!"));
            if base.pairs().iter().any(|(k, v)| *k == name && *v == format!("{value}!")) {
                prop_assert_eq!(base.canonical(), changed.canonical());
            } else {
                prop_assert_ne!(base.canonical(), changed.canonical());
            }
        }

        /// A key is always a member of every family formed by its prefixes.
        #[test]
        fn prop_prefixes_match(tokens in proptest::collection::vec("[a-z-]{1,8}", 1..5)) {
            let key = ResourceKey::from_tokens(tokens.clone());
            for cut in 1..=tokens.len() {
                let prefix = ResourceKey::from_tokens(tokens[..cut].to_vec());
                prop_assert!(key.starts_with(&prefix));
            }
        }
    }
}
