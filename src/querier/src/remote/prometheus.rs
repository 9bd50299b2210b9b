use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prom_api::{ApiResponse, QueryData, SamplePair, Status};
use url::Url;

use super::{QueryError, QueryFunction, QueryOutcome};
use crate::query::promql::types::{Metric, Point, Sample, Series, Value};

/// Longest error body echoed back in [`QueryError::Status`]
const MAX_ERROR_BODY: usize = 512;

/// [`QueryFunction`] backed by the Prometheus HTTP API (`/api/v1/query`)
#[derive(Debug, Clone)]
pub struct PrometheusClient {
    query_url: Url,
    http: reqwest::Client,
}

impl PrometheusClient {
    /// Create a client for the API rooted at `base_url`
    ///
    /// Any path on `base_url` is kept as a prefix, so
    /// `https://host/v1/projects/p/location/global/prometheus` works.
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, QueryError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("promrelay/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_client(base_url, http))
    }

    pub fn with_client(base_url: &Url, http: reqwest::Client) -> Self {
        Self {
            query_url: api_url(base_url, "/api/v1/query"),
            http,
        }
    }

    #[tracing::instrument(skip(self))]
    async fn instant_query(&self, expr: &str, instant: DateTime<Utc>) -> QueryOutcome {
        let time = format_time(instant);
        let response = match self
            .http
            .get(self.query_url.clone())
            .query(&[("query", expr), ("time", time.as_str())])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return QueryOutcome::err(e.into()),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return QueryOutcome::err(e.into()),
        };

        let envelope = match serde_json::from_str::<ApiResponse<QueryData>>(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return QueryOutcome::err(QueryError::Status {
                    status: status.as_u16(),
                    body: truncate(body),
                });
            }
            Err(e) => return QueryOutcome::err(e.into()),
        };

        let result = match envelope.status {
            Status::Error => Err(QueryError::Api {
                status: status.as_u16(),
                error_type: envelope.error_type.unwrap_or_default(),
                message: envelope.error.unwrap_or_default(),
            }),
            Status::Success => envelope
                .data
                .ok_or(QueryError::MissingData)
                .and_then(convert_value),
        };

        QueryOutcome {
            result,
            warnings: envelope.warnings,
        }
    }
}

#[async_trait]
impl QueryFunction for PrometheusClient {
    async fn query(&self, expr: &str, instant: DateTime<Utc>) -> QueryOutcome {
        self.instant_query(expr, instant).await
    }
}

/// Append `path` to the path of `base`, keeping any prefix
pub(crate) fn api_url(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let joined = format!("{}{path}", base.path().trim_end_matches('/'));
    url.set_path(&joined);
    url
}

/// Unix seconds with millisecond precision, as accepted by the `time` parameter
fn format_time(instant: DateTime<Utc>) -> String {
    format!(
        "{}.{:03}",
        instant.timestamp(),
        instant.timestamp_subsec_millis()
    )
}

fn truncate(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}

fn convert_value(data: QueryData) -> Result<Value, QueryError> {
    match data {
        QueryData::Matrix(result) => {
            let series = result
                .into_iter()
                .map(|s| {
                    let points = s
                        .values
                        .iter()
                        .map(convert_point)
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Series::new(Metric::from(s.metric), points))
                })
                .collect::<Result<Vec<_>, QueryError>>()?;
            Ok(Value::Matrix(series))
        }
        QueryData::Vector(result) => {
            let mut samples = Vec::with_capacity(result.len());
            // Native histogram samples have no float value
            for sample in result {
                if let Some(pair) = sample.value {
                    let point = convert_point(&pair)?;
                    samples.push(Sample {
                        metric: Metric::from(sample.metric),
                        value: point.value,
                        timestamp: point.timestamp,
                    });
                }
            }
            Ok(Value::Vector(samples))
        }
        QueryData::Scalar(pair) => Ok(Value::Scalar(convert_point(&pair)?)),
        QueryData::String(SamplePair(timestamp, value)) => Ok(Value::String {
            timestamp: to_millis(timestamp),
            value,
        }),
    }
}

fn convert_point(pair: &SamplePair) -> Result<Point, QueryError> {
    let value = pair
        .1
        .parse::<f64>()
        .map_err(|_| QueryError::InvalidSample(pair.1.clone()))?;
    Ok(Point::new(to_millis(pair.0), value))
}

fn to_millis(seconds: f64) -> i64 {
    (seconds * 1000.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, extract::Query, http::StatusCode, routing::get};
    use serde_json::json;
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    async fn serve(app: Router) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Url::parse(&format!("http://{addr}/prefix")).unwrap()
    }

    fn client(base: &Url) -> PrometheusClient {
        PrometheusClient::new(base, Duration::from_secs(5)).unwrap()
    }

    fn instant(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_api_url_keeps_prefix() {
        let base = Url::parse("https://monitoring.example.com/v1/projects/p/prometheus/").unwrap();
        assert_eq!(
            api_url(&base, "/api/v1/query").as_str(),
            "https://monitoring.example.com/v1/projects/p/prometheus/api/v1/query"
        );

        let bare = Url::parse("http://localhost:9090").unwrap();
        assert_eq!(
            api_url(&bare, "/api/v1/query").as_str(),
            "http://localhost:9090/api/v1/query"
        );
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(instant(2000)), "2000.000");
    }

    #[test]
    fn test_convert_special_values() {
        let data = QueryData::Matrix(vec![prom_api::RangeSeries {
            metric: [("__name__".to_string(), "up".to_string())].into(),
            values: vec![
                SamplePair(1.5, "NaN".to_string()),
                SamplePair(2.0, "+Inf".to_string()),
                SamplePair(3.0, "-Inf".to_string()),
            ],
        }]);

        let Value::Matrix(series) = convert_value(data).unwrap() else {
            panic!("expected matrix");
        };
        let points = series[0].points();
        assert_eq!(points[0].timestamp, 1500);
        assert!(points[0].value.is_nan());
        assert_eq!(points[1].value, f64::INFINITY);
        assert_eq!(points[2].value, f64::NEG_INFINITY);
    }

    #[test]
    fn test_convert_invalid_sample() {
        let data = QueryData::Scalar(SamplePair(1.0, "one".to_string()));
        assert!(matches!(
            convert_value(data),
            Err(QueryError::InvalidSample(v)) if v == "one"
        ));
    }

    #[tokio::test]
    async fn test_matrix_query_sends_expr_and_time() {
        let app = Router::new().route(
            "/prefix/api/v1/query",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params["query"], r#"{__name__="up"}[60s]"#);
                assert_eq!(params["time"], "2000.000");
                Json(json!({
                    "status": "success",
                    "data": {
                        "resultType": "matrix",
                        "result": [{"metric": {"__name__": "up"}, "values": [[1999, "1"], [2000, "0"]]}]
                    },
                    "warnings": ["some warning"]
                }))
            }),
        );
        let base = serve(app).await;

        let outcome = client(&base)
            .query(r#"{__name__="up"}[60s]"#, instant(2000))
            .await;

        assert_eq!(outcome.warnings, vec!["some warning".to_string()]);
        let Value::Matrix(series) = outcome.result.unwrap() else {
            panic!("expected matrix");
        };
        assert_eq!(series.len(), 1);
        assert_eq!(
            series[0].points(),
            &[Point::new(1_999_000, 1.0), Point::new(2_000_000, 0.0)]
        );
    }

    #[tokio::test]
    async fn test_error_envelope_keeps_warnings() {
        let app = Router::new().route(
            "/prefix/api/v1/query",
            get(|| async {
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({
                        "status": "error",
                        "errorType": "execution",
                        "error": "query timed out",
                        "warnings": ["w1"]
                    })),
                )
            }),
        );
        let base = serve(app).await;

        let outcome = client(&base).query("up[1s]", instant(1)).await;

        assert_eq!(outcome.warnings, vec!["w1".to_string()]);
        let err = outcome.result.unwrap_err();
        assert!(matches!(err, QueryError::Api { status: 422, .. }));
        assert_eq!(err.to_string(), "execution: query timed out");
    }

    #[tokio::test]
    async fn test_non_json_error_status() {
        let app = Router::new().route(
            "/prefix/api/v1/query",
            get(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
        );
        let base = serve(app).await;

        let outcome = client(&base).query("up[1s]", instant(1)).await;

        assert!(matches!(
            outcome.result,
            Err(QueryError::Status { status: 502, ref body }) if body == "upstream down"
        ));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let base = Url::parse(&format!("http://{addr}")).unwrap();
        let outcome = client(&base).query("up[1s]", instant(1)).await;

        assert!(matches!(outcome.result, Err(QueryError::Http(_))));
        assert!(outcome.warnings.is_empty());
    }
}
