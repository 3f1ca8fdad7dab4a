// Errors raised by outbound HTTP clients
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        source: reqwest::Error,
    },
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("could not decode {endpoint} response: {source}")]
    Decode {
        endpoint: &'static str,
        source: reqwest::Error,
    },
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

/// Send `request`, failing on transport errors and non-success statuses.
pub async fn send_checked(
    endpoint: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response, ApiError> {
    let response = request
        .send()
        .await
        .map_err(|source| ApiError::Transport { endpoint, source })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            endpoint,
            status,
            body,
        });
    }
    Ok(response)
}

pub async fn decode_json<T: serde::de::DeserializeOwned>(
    endpoint: &'static str,
    response: reqwest::Response,
) -> Result<T, ApiError> {
    response
        .json::<T>()
        .await
        .map_err(|source| ApiError::Decode { endpoint, source })
}

/// `k=v&k=v` with values percent-encoded; `None` values are skipped.
pub fn query_string(pairs: &[(&str, Option<String>)]) -> String {
    pairs
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_ref()
                .map(|v| format!("{}={}", key, urlencoding::encode(v)))
        })
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_string_skips_missing_and_encodes() {
        let query = query_string(&[
            ("status", Some("open".to_string())),
            ("source", None),
            ("coordinates", Some("40.7128,-74.006".to_string())),
        ]);
        assert_eq!(query, "status=open&coordinates=40.7128%2C-74.006");
        assert_eq!(query_string(&[("days", None)]), "");
    }
}
