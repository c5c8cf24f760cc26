pub mod prometheus {
    /// Prometheus remote-write protobuf messages, written out directly
    /// rather than generated: the canary only ever fills labels and
    /// samples, and unknown trailing fields are fine on the wire.
    pub mod prompb {
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct WriteRequest {
            #[prost(message, repeated, tag = "1")]
            pub timeseries: ::prost::alloc::vec::Vec<TimeSeries>,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct TimeSeries {
            #[prost(message, repeated, tag = "1")]
            pub labels: ::prost::alloc::vec::Vec<Label>,
            #[prost(message, repeated, tag = "2")]
            pub samples: ::prost::alloc::vec::Vec<Sample>,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Label {
            #[prost(string, tag = "1")]
            pub name: ::prost::alloc::string::String,
            #[prost(string, tag = "2")]
            pub value: ::prost::alloc::string::String,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Sample {
            #[prost(double, tag = "1")]
            pub value: f64,
            #[prost(int64, tag = "2")]
            pub timestamp: i64,
        }
    }
}

use chrono::Utc;
use prometheus::prompb::{Label, Sample, TimeSeries, WriteRequest};
use reqwest::{
    Client,
    header::{CONTENT_ENCODING, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use snap::raw::Encoder;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum PushError {
    #[error("failed to encode write request: {0}")]
    Encode(#[from] prost::EncodeError),
    #[error("failed to compress write request: {0}")]
    Compress(#[from] snap::Error),
    #[error("invalid tenant id: {0}")]
    Tenant(#[from] reqwest::header::InvalidHeaderValue),
    #[error("remote write request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("remote write rejected: {status} - {body}")]
    Rejected { status: u16, body: String },
}

/// Pushes metrics to a Prometheus remote-write endpoint (Mimir et al).
///
/// # Arguments
///
/// * `endpoint` - The base URL of the receiver (e.g., "http://localhost:9009").
/// * `tenant_id` - An optional tenant ID string for multi-tenant setups.
/// * `metrics` - A vector of `TimeSeries` to send.
pub async fn send_remote_write(
    endpoint: &str,
    tenant_id: Option<&str>,
    metrics: Vec<TimeSeries>,
) -> Result<(), PushError> {
    if metrics.is_empty() {
        debug!("no metrics to send");
        return Ok(());
    }

    let write_request = WriteRequest {
        timeseries: metrics,
    };

    let mut buf = Vec::new();
    prost::Message::encode(&write_request, &mut buf)?;
    let compressed = Encoder::new().compress_vec(&buf)?;

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_ENCODING, HeaderValue::from_static("snappy"));
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/x-protobuf"),
    );
    headers.insert(
        "X-Prometheus-Remote-Write-Version",
        HeaderValue::from_static("0.1.0"),
    );
    if let Some(id) = tenant_id {
        headers.insert("X-Scope-OrgID", HeaderValue::from_str(id)?);
    }

    let client = Client::new();
    let response = client
        .post(format!("{endpoint}/api/v1/push"))
        .headers(headers)
        .body(compressed)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        error!(status, %body, "remote write push rejected");
        return Err(PushError::Rejected { status, body });
    }
    Ok(())
}

/// Builds a single-sample `TimeSeries` with the given name, labels and
/// value. The sample timestamp defaults to now.
pub fn create_time_series(
    metric_name: &str,
    labels: &[(&str, &str)],
    value: f64,
    timestamp_ms: Option<i64>,
) -> TimeSeries {
    let mut all_labels = Vec::with_capacity(labels.len() + 1);
    all_labels.push(Label {
        name: "__name__".to_string(),
        value: metric_name.to_string(),
    });
    for (name, val) in labels {
        all_labels.push(Label {
            name: name.to_string(),
            value: val.to_string(),
        });
    }

    let sample = Sample {
        value,
        timestamp: timestamp_ms.unwrap_or_else(|| Utc::now().timestamp_millis()),
    };

    TimeSeries {
        labels: all_labels,
        samples: vec![sample],
    }
}
