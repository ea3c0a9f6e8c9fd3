use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Multi-valued query parameters, encoded in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryParams(BTreeMap<String, Vec<String>>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the params already present in the url query string.
    pub fn from_url(url: &Url) -> Self {
        let mut params = Self::new();
        for (key, value) in url.query_pairs() {
            params.add(key, value);
        }
        params
    }

    /// Replaces all values of `key` with `value`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), vec![value.into()]);
    }

    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    /// First value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn get_all(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.0.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    /// Replaces all values of `key` with `values`.
    pub fn set_all(&mut self, key: impl Into<String>, values: Vec<String>) {
        self.0.insert(key.into(), values);
    }

    /// Merges `other` into `self`. Every key of `other` is set to its last
    /// value, so a later writer replaces earlier ones for the same key.
    pub fn merge_override(&mut self, other: &QueryParams) {
        for (key, values) in other.iter() {
            if let Some(last) = values.last() {
                self.set(key.clone(), last.clone());
            }
        }
    }

    /// Writes the params into the url query string, dropping the previous one.
    pub fn apply_to(&self, url: &mut Url) {
        if self.is_empty() {
            url.set_query(None);
            return;
        }
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (key, values) in self.iter() {
            for value in values {
                pairs.append_pair(key, value);
            }
        }
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.add(key, value);
        }
        params
    }
}

impl From<BTreeMap<String, Vec<String>>> for QueryParams {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn merge_override_replaces_values() {
        let mut base: QueryParams = [("nocache", "1"), ("format", "csv"), ("format", "raw")]
            .into_iter()
            .collect();
        let overrides: QueryParams = [("format", "json"), ("extra_label", "env=prod")]
            .into_iter()
            .collect();

        base.merge_override(&overrides);

        assert_eq!(base.get_all("format"), &["json".to_string()]);
        assert_eq!(base.get("nocache"), Some("1"));
        assert_eq!(base.get("extra_label"), Some("env=prod"));
        assert_eq!(base.len(), 3);
    }

    #[test]
    fn merge_override_keeps_last_value() {
        let mut base: QueryParams = [("k", "base")].into_iter().collect();
        let overrides: QueryParams = [("k", "a"), ("k", "b")].into_iter().collect();

        base.merge_override(&overrides);

        assert_eq!(base.get_all("k"), &["b".to_string()]);
    }

    #[test]
    fn merge_override_skips_empty_lists() {
        let mut base: QueryParams = [("k", "base")].into_iter().collect();
        let overrides = QueryParams::from(BTreeMap::from([("k".to_string(), Vec::new())]));

        base.merge_override(&overrides);

        assert_eq!(base.get_all("k"), &["base".to_string()]);
    }

    #[test]
    fn apply_to_url_is_sorted_and_encoded() {
        let mut url = Url::parse("http://localhost:8428/api/v1/query?stale=1").unwrap();
        let mut params = QueryParams::from_url(&url);
        params.set("query", "sum(rate(http_requests_total[5m])) by (job)");
        params.add("extra_filters", "{env=\"prod\"}");

        params.apply_to(&mut url);

        assert_eq!(
            url.query(),
            Some(
                "extra_filters=%7Benv%3D%22prod%22%7D\
                 &query=sum%28rate%28http_requests_total%5B5m%5D%29%29+by+%28job%29\
                 &stale=1"
            )
        );
        let decoded = QueryParams::from_url(&url);
        assert_eq!(decoded, params);
    }

    #[test]
    fn empty_params_clear_query() {
        let mut url = Url::parse("http://localhost/render?target=a").unwrap();
        QueryParams::new().apply_to(&mut url);
        assert_eq!(url.query(), None);
    }
}
