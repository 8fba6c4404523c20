use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::ser::SerializeTuple;
use serde::{Serialize, Serializer};
use tracing::warn;

use promfix_common::format::format_value;
use promfix_runtime::Sample;

use crate::error::ServerError;

/// Successful Prometheus API envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    status: &'static str,
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            status: "success",
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    status: &'static str,
    error_type: &'static str,
    error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryData {
    result_type: &'static str,
    result: Vec<VectorSample>,
}

impl QueryData {
    pub fn vector(samples: Vec<Sample>) -> Self {
        QueryData {
            result_type: "vector",
            result: samples.into_iter().map(VectorSample::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VectorSample {
    metric: BTreeMap<String, String>,
    value: SamplePair,
}

impl From<Sample> for VectorSample {
    fn from(sample: Sample) -> Self {
        let metric = sample
            .metric
            .iter()
            .map(|l| (l.name.clone(), l.value.clone()))
            .collect();
        VectorSample {
            metric,
            value: SamplePair {
                timestamp: sample.timestamp,
                value: sample.value,
            },
        }
    }
}

/// `[<unix seconds>, "<value>"]`; seconds are an integer when whole.
#[derive(Debug)]
pub struct SamplePair {
    timestamp: i64,
    value: f64,
}

impl Serialize for SamplePair {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        if self.timestamp % 1000 == 0 {
            tuple.serialize_element(&(self.timestamp / 1000))?;
        } else {
            tuple.serialize_element(&(self.timestamp as f64 / 1e3))?;
        }
        tuple.serialize_element(&format_value(self.value))?;
        tuple.end()
    }
}

impl ServerError {
    fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            ServerError::BadData(_) => (StatusCode::BAD_REQUEST, "bad_data"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "execution"),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_type();
        warn!(%status, error = %self, "request failed");
        let body = ErrorResponse {
            status: "error",
            error_type,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use promfix_runtime::MetricName;
    use test_case::test_case;

    #[test_case(60_000, 1.0, r#"[60,"1"]"#)]
    #[test_case(1_500, 0.25, r#"[1.5,"0.25"]"#)]
    #[test_case(0, f64::INFINITY, r#"[0,"+Inf"]"#)]
    #[test_case(0, f64::NAN, r#"[0,"NaN"]"#)]
    fn sample_pair(timestamp: i64, value: f64, expected: &str) {
        let pair = SamplePair { timestamp, value };
        assert_eq!(serde_json::to_string(&pair).unwrap(), expected);
    }

    #[test]
    fn vector_envelope() {
        let metric = MetricName::from_strings(&[("__name__", "up"), ("job", "api")]);
        let sample = Sample::new(metric, 60_000, 1.0);
        let body = ApiResponse::success(QueryData::vector(vec![sample]));
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"status":"success","data":{"resultType":"vector","result":[{"metric":{"__name__":"up","job":"api"},"value":[60,"1"]}]}}"#
        );
    }

    #[test]
    fn empty_vector_keeps_result() {
        let body = ApiResponse::success(QueryData::vector(vec![]));
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"status":"success","data":{"resultType":"vector","result":[]}}"#
        );
    }

    #[test]
    fn error_status() {
        assert_eq!(
            ServerError::BadData("missing".into()).status_and_type(),
            (StatusCode::BAD_REQUEST, "bad_data")
        );
        assert_eq!(
            ServerError::UnexpectedResult.status_and_type(),
            (StatusCode::INTERNAL_SERVER_ERROR, "execution")
        );
    }
}
