use super::{decode, QueryRequest, QueryResponse};
use crate::{Error, Metric};

mod json {
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, Deserialize)]
    pub struct Target {
        #[serde(default)]
        pub target: String,
        #[serde(default)]
        pub tags: BTreeMap<String, String>,
        /// `[<value or null>, <unix seconds>]`
        pub datapoints: Vec<(Option<f64>, f64)>,
    }
}

/// Parses `/render?format=json` responses. Only the most recent datapoint
/// of every target is kept, targets without datapoints are skipped.
pub fn parse_response(req: &QueryRequest, resp: QueryResponse) -> Result<Vec<Metric>, Error> {
    let targets: Vec<json::Target> = decode(req, &resp.body)?;
    let metrics = targets
        .into_iter()
        .filter_map(|target| {
            let (value, timestamp) = *target.datapoints.last()?;
            let mut metric = Metric::new(target.tags);
            if metric.label("name").is_none() && !target.target.is_empty() {
                metric.set_label("name", target.target);
            }
            metric.push_sample(timestamp as i64, value.unwrap_or(f64::NAN));
            Some(metric)
        })
        .collect();
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use reqwest::{header::HeaderMap, Method, StatusCode};

    fn parse(body: &'static str) -> Result<Vec<Metric>, Error> {
        let req = QueryRequest::new(
            Method::POST,
            "http://localhost:8428/render".parse().unwrap(),
        );
        let resp = QueryResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::from_static(body.as_bytes()),
        };
        parse_response(&req, resp)
    }

    #[test]
    fn keeps_last_datapoint() {
        let metrics = parse(
            r#"[{"target":"constantLine(10)","tags":{"name":"constantLine(10)"},
                "datapoints":[[10,1611758343],[10,1611758373],[20,1611758403]]}]"#,
        )
        .unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].label("name"), Some("constantLine(10)"));
        assert_eq!(metrics[0].samples.len(), 1);
        assert_eq!(metrics[0].samples[0].timestamp, 1611758403);
        assert_eq!(metrics[0].samples[0].value, 20.0);
    }

    #[test]
    fn skips_empty_targets_and_maps_nulls() {
        let metrics = parse(
            r#"[
                {"target":"empty","tags":{},"datapoints":[]},
                {"target":"app.requests","tags":{"name":"app.requests","dc":"eu"},"datapoints":[[1,1611758343],[null,1611758373]]}
            ]"#,
        )
        .unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].label("dc"), Some("eu"));
        assert!(metrics[0].samples[0].value.is_nan());
    }

    #[test]
    fn target_becomes_name_without_tags() {
        let metrics = parse(r#"[{"target":"servers.web1.cpu","datapoints":[[0.5,1611758343]]}]"#)
            .unwrap();
        assert_eq!(metrics[0].label("name"), Some("servers.web1.cpu"));
    }

    #[test]
    fn invalid_payload() {
        let err = parse(r#"{"status":"success"}"#).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
