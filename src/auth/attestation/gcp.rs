//! GCP attestation (spec.md §4.8): the instance metadata service hands out
//! a signed identity JWT with no extra setup needed — this only works
//! when actually running on GCE/GKE/Cloud Run, which is also what makes
//! it a reasonable autodetect probe (anywhere else, the metadata host
//! simply isn't reachable and the GET fails fast).

use std::collections::HashMap;

use super::{Attestation, AttestationProvider, decode_jwt_claims_unverified, require_iss_sub};
use crate::{SnowflakeError, errors::ErrorKind, http::client::SnowflakeHttpClient, kind_error};

const METADATA_IDENTITY_URL: &str = "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/identity?audience=snowflakecomputing.com&format=full";

pub(crate) async fn resolve<C: SnowflakeHttpClient>(
    client: &C,
) -> Result<Attestation, SnowflakeError> {
    let mut headers = HashMap::new();
    headers.insert("Metadata-Flavor".to_string(), "Google".to_string());

    let body = client
        .get(METADATA_IDENTITY_URL, headers)
        .await
        .map_err(|e| kind_error!(ErrorKind::Attestation, "gcp metadata identity request failed", e))?;

    let jwt = String::from_utf8(body)
        .map_err(|e| kind_error!(ErrorKind::Attestation, "gcp identity response is not utf-8", e))?;
    let jwt = jwt.trim().to_string();

    let claims = decode_jwt_claims_unverified(&jwt)?;
    require_iss_sub(&claims)?;

    Ok(Attestation {
        provider: AttestationProvider::Gcp,
        credential: jwt,
        metadata: HashMap::new(),
    })
}
