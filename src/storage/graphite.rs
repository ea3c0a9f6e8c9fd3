use super::{shift_back, VmStorage};
use chrono::{DateTime, Utc};
use std::time::Duration;
use url::Url;

const GRAPHITE_PREFIX: &str = "/graphite";
const GRAPHITE_PATH: &str = "/render";
/// Relative `from` used when no look-back is configured.
const DEFAULT_FROM: &str = "-5min";

impl VmStorage {
    pub(super) fn set_graphite_params(&self, url: &mut Url, query: &str, ts: DateTime<Utc>) {
        self.append_path(url, GRAPHITE_PREFIX, GRAPHITE_PATH);
        let mut params = self.base_params(url);
        params.set("format", "json");
        params.set("target", query);
        let from = if self.look_back > Duration::ZERO {
            shift_back(ts, self.look_back).timestamp().to_string()
        } else {
            DEFAULT_FROM.to_string()
        };
        params.set("from", from);
        params.set("until", "now");
        params.apply_to(url);
    }
}
