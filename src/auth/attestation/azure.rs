//! Azure attestation (spec.md §4.8): prefers the Azure Functions identity
//! endpoint (`IDENTITY_ENDPOINT`/`IDENTITY_HEADER`) when present, falling
//! back to IMDS — the same precedence gosnowflake's `auth.go` uses,
//! because App Service/Functions hosts set those env vars and IMDS isn't
//! reachable from inside them the same way it is on a bare VM.

use std::{collections::HashMap, env};

use super::{Attestation, AttestationProvider, decode_jwt_claims_unverified, require_iss_sub};
use crate::{SnowflakeError, errors::ErrorKind, http::client::SnowflakeHttpClient, kind_error};

const IMDS_TOKEN_URL: &str = "http://169.254.169.254/metadata/identity/oauth2/token?api-version=2018-02-01";
const DEFAULT_RESOURCE: &str = "api://fd3f753b-eed3-462c-b6a7-a4b5bb650aad";

pub(crate) async fn resolve<C: SnowflakeHttpClient>(
    client: &C,
    entra_resource: Option<&str>,
) -> Result<Attestation, SnowflakeError> {
    let resource = entra_resource.unwrap_or(DEFAULT_RESOURCE);

    let (url, mut headers) = if let (Ok(endpoint), Ok(header_value)) = (
        env::var("IDENTITY_ENDPOINT"),
        env::var("IDENTITY_HEADER"),
    ) {
        let url = format!(
            "{endpoint}?resource={resource}&api-version=2019-08-01",
            resource = urlencode(resource)
        );
        let mut headers = HashMap::new();
        headers.insert("X-IDENTITY-HEADER".to_string(), header_value);
        (url, headers)
    } else {
        let url = format!(
            "{IMDS_TOKEN_URL}&resource={resource}",
            resource = urlencode(resource)
        );
        (url, HashMap::new())
    };

    headers.insert("Metadata".to_string(), "true".to_string());

    let body = client
        .get(&url, headers)
        .await
        .map_err(|e| kind_error!(ErrorKind::Attestation, "azure identity endpoint request failed", e))?;

    let parsed: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| kind_error!(ErrorKind::Attestation, "azure identity response is not json", e))?;

    let access_token = parsed
        .get("access_token")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            kind_error!(
                ErrorKind::Attestation,
                "azure identity response is missing a non-empty access_token"
            )
        })?
        .to_string();

    let claims = decode_jwt_claims_unverified(&access_token)?;
    require_iss_sub(&claims)?;

    Ok(Attestation {
        provider: AttestationProvider::Azure,
        credential: access_token,
        metadata: HashMap::new(),
    })
}

fn urlencode(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | '~' => c.to_string(),
            other => format!("%{:02X}", other as u32),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urlencode_leaves_unreserved_characters_alone() {
        assert_eq!(urlencode("abcXYZ019-_.~"), "abcXYZ019-_.~");
    }

    #[test]
    fn urlencode_percent_encodes_reserved_characters() {
        assert_eq!(urlencode("api://foo bar"), "api%3A%2F%2Ffoo%20bar");
    }
}
