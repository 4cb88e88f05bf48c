//! Ordered, case-insensitive header multimap used in captured events

use actix_web::http::header::HeaderMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::{Deserialize, Deserializer};

/// Header names mapped to every value supplied for them.
///
/// Names are stored lowercased, distinct names keep the order of their
/// first [`append`](Self::append), and repeated names keep all of their
/// values in the order they were added.
/// Serializes as `{"name": ["v1", "v2"]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMultimap {
    entries: Vec<(String, Vec<String>)>,
}

impl HeaderMultimap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value, keeping any values already present for `name`
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        let key = name.to_ascii_lowercase();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((key, vec![value])),
        }
    }

    /// All values for `name`, empty if the header is absent
    pub fn get_all(&self, name: &str) -> &[String] {
        let key = name.to_ascii_lowercase();
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_slice())
            .unwrap_or(&[])
    }

    /// First value for `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        !self.get_all(name).is_empty()
    }

    /// Drop a header and all its values. Intended for masking policies.
    pub fn remove(&mut self, name: &str) -> Vec<String> {
        let key = name.to_ascii_lowercase();
        match self.entries.iter().position(|(k, _)| *k == key) {
            Some(idx) => self.entries.remove(idx).1,
            None => Vec::new(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Distinct names follow the iteration order of actix's `HeaderMap`, which
/// is hash-ordered rather than wire order. Values of one name keep the order
/// in which they arrived.
impl From<&HeaderMap> for HeaderMultimap {
    fn from(headers: &HeaderMap) -> Self {
        let mut map = HeaderMultimap::new();
        for (name, value) in headers.iter() {
            // Non-visible-ASCII values are kept rather than dropped.
            let value = match value.to_str() {
                Ok(v) => v.to_string(),
                Err(_) => String::from_utf8_lossy(value.as_bytes()).into_owned(),
            };
            map.append(name.as_str(), value);
        }
        map
    }
}

impl Serialize for HeaderMultimap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, values) in &self.entries {
            map.serialize_entry(name, values)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for HeaderMultimap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Order of a JSON object is not preserved by BTreeMap, which is fine
        // for events read back in tests and tools.
        let raw = std::collections::BTreeMap::<String, Vec<String>>::deserialize(deserializer)?;
        let mut map = HeaderMultimap::new();
        for (name, values) in raw {
            for value in values {
                map.append(&name, value);
            }
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::{HeaderName, HeaderValue};

    #[test]
    fn test_repeated_keys_keep_every_value() {
        let mut map = HeaderMultimap::new();
        map.append("Accept", "text/html");
        map.append("X-Trace", "a");
        map.append("accept", "application/json");

        assert_eq!(map.len(), 2);
        assert_eq!(map.get_all("ACCEPT"), ["text/html", "application/json"]);
        let names: Vec<_> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["accept", "x-trace"]);
    }

    #[test]
    fn test_missing_header() {
        let map = HeaderMultimap::new();
        assert!(map.get("host").is_none());
        assert!(map.get_all("host").is_empty());
        assert!(!map.contains("host"));
    }

    #[test]
    fn test_remove() {
        let mut map = HeaderMultimap::new();
        map.append("Authorization", "Bearer x");
        map.append("Accept", "*/*");

        assert_eq!(map.remove("authorization"), ["Bearer x"]);
        assert!(!map.contains("authorization"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_from_actix_header_map() {
        let mut headers = HeaderMap::new();
        headers.append(
            HeaderName::from_static("set-cookie"),
            HeaderValue::from_static("a=1"),
        );
        headers.append(
            HeaderName::from_static("set-cookie"),
            HeaderValue::from_static("b=2"),
        );

        let map = HeaderMultimap::from(&headers);
        assert_eq!(map.get_all("Set-Cookie"), ["a=1", "b=2"]);
    }

    #[test]
    fn test_from_actix_header_map_keeps_every_name() {
        let mut headers = HeaderMap::new();
        for name in ["x-one", "x-two", "x-three", "x-four"] {
            headers.insert(HeaderName::from_static(name), HeaderValue::from_static("v"));
        }

        let map = HeaderMultimap::from(&headers);
        let mut names: Vec<_> = map.iter().map(|(k, _)| k.to_string()).collect();
        names.sort();
        assert_eq!(names, ["x-four", "x-one", "x-three", "x-two"]);
    }

    #[test]
    fn test_serializes_as_object_of_arrays() {
        let mut map = HeaderMultimap::new();
        map.append("Content-Type", "application/json");
        map.append("Vary", "Accept");
        map.append("Vary", "Origin");

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(
            json,
            r#"{"content-type":["application/json"],"vary":["Accept","Origin"]}"#
        );

        let back: HeaderMultimap = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get_all("vary"), ["Accept", "Origin"]);
    }
}
