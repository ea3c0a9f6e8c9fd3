use super::{format_step, shift_back, VmStorage};
use crate::QueryParams;
use chrono::{DateTime, Utc};
use std::time::Duration;
use url::Url;

const PROMETHEUS_PREFIX: &str = "/prometheus";
const PROMETHEUS_INSTANT_PATH: &str = "/api/v1/query";
const PROMETHEUS_RANGE_PATH: &str = "/api/v1/query_range";

impl VmStorage {
    pub(super) fn set_prometheus_instant_params(&self, url: &mut Url, query: &str, ts: DateTime<Utc>) {
        self.append_path(url, PROMETHEUS_PREFIX, PROMETHEUS_INSTANT_PATH);
        let mut params = self.base_params(url);
        let ts = if self.look_back > Duration::ZERO {
            shift_back(ts, self.look_back)
        } else {
            ts
        };
        params.set("time", ts.timestamp().to_string());
        self.set_prometheus_params(&mut params, query);
        params.apply_to(url);
    }

    pub(super) fn set_prometheus_range_params(
        &self,
        url: &mut Url,
        query: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) {
        self.append_path(url, PROMETHEUS_PREFIX, PROMETHEUS_RANGE_PATH);
        let mut params = self.base_params(url);
        params.set("start", start.timestamp().to_string());
        params.set("end", end.timestamp().to_string());
        self.set_prometheus_params(&mut params, query);
        params.apply_to(url);
    }

    fn set_prometheus_params(&self, params: &mut QueryParams, query: &str) {
        if self.evaluation_interval > Duration::ZERO {
            params.set("step", format_step(self.evaluation_interval));
        }
        params.set("query", query);
        // user-specified step wins over the one derived from the evaluation interval
        if self.query_step > Duration::ZERO {
            params.set("step", format_step(self.query_step));
        }
    }
}
