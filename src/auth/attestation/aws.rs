//! AWS attestation (spec.md §4.8): presigns an STS `GetCallerIdentity`
//! call the way gosnowflake's `auth.go` does, so the server can turn
//! around and replay the exact same request to confirm which AWS
//! principal is asking — without the client ever handing over raw
//! long-lived credentials.
//!
//! Unlike GCP/Azure, credential discovery here goes through
//! `aws-config`'s standard provider chain (env vars, instance profile,
//! container credentials, …) rather than this crate's
//! [`SnowflakeHttpClient`] — that chain already owns its own transport
//! and re-wrapping it behind our trait would just be an extra layer.

use std::{collections::HashMap, time::SystemTime};

use aws_credential_types::provider::ProvideCredentials;
use aws_sigv4::http_request::{SignableBody, SignableRequest, SigningSettings, sign};
use aws_sigv4::sign::v4;
use base64::Engine;

use super::{Attestation, AttestationProvider};
use crate::{SnowflakeError, errors::ErrorKind, kind_error};

const STS_ACTION_BODY: &str = "Action=GetCallerIdentity&Version=2011-06-15";

pub(crate) async fn resolve() -> Result<Attestation, SnowflakeError> {
    let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

    let region = config
        .region()
        .ok_or_else(|| kind_error!(ErrorKind::Attestation, "no AWS region configured"))?
        .to_string();

    let credentials_provider = config.credentials_provider().ok_or_else(|| {
        kind_error!(ErrorKind::Attestation, "no AWS credentials provider configured")
    })?;

    let credentials = credentials_provider
        .provide_credentials()
        .await
        .map_err(|e| kind_error!(ErrorKind::Attestation, "failed to obtain AWS credentials", e))?;

    let host = if region.starts_with("cn-") {
        format!("sts.{region}.amazonaws.com.cn")
    } else {
        format!("sts.{region}.amazonaws.com")
    };
    let url = format!("https://{host}/");

    let identity = credentials.into();
    let signing_params = v4::SigningParams::builder()
        .identity(&identity)
        .region(&region)
        .name("sts")
        .time(SystemTime::now())
        .settings(SigningSettings::default())
        .build()
        .map_err(|e| kind_error!(ErrorKind::Attestation, "failed to build AWS signing params", e))?
        .into();

    let headers = [
        ("host", host.as_str()),
        (
            "content-type",
            "application/x-www-form-urlencoded; charset=utf-8",
        ),
        ("x-snowflake-audience", "snowflakecomputing.com"),
    ];

    let signable = SignableRequest::new(
        "POST",
        &url,
        headers.into_iter(),
        SignableBody::Bytes(STS_ACTION_BODY.as_bytes()),
    )
    .map_err(|e| kind_error!(ErrorKind::Attestation, "failed to build signable STS request", e))?;

    let (instructions, _signature) = sign(signable, &signing_params)
        .map_err(|e| kind_error!(ErrorKind::Attestation, "failed to sign STS request", e))?
        .into_parts();

    let mut signed_headers = HashMap::new();
    signed_headers.insert(
        "content-type".to_string(),
        "application/x-www-form-urlencoded; charset=utf-8".to_string(),
    );
    signed_headers.insert("x-snowflake-audience".to_string(), "snowflakecomputing.com".to_string());
    for header in instructions.headers() {
        signed_headers.insert(header.0.to_string(), header.1.to_string());
    }

    let presigned = serde_json::json!({
        "url": url,
        "method": "POST",
        "headers": signed_headers,
    });

    let engine = base64::engine::GeneralPurpose::new(
        &base64::alphabet::STANDARD,
        base64::engine::general_purpose::PAD,
    );
    let credential = engine.encode(presigned.to_string());

    Ok(Attestation {
        provider: AttestationProvider::Aws,
        credential,
        metadata: HashMap::from([("region".to_string(), region)]),
    })
}

#[cfg(test)]
mod tests {
    #[test]
    fn cn_regions_use_the_amazonaws_cn_suffix() {
        let region = "cn-north-1";
        let host = if region.starts_with("cn-") {
            format!("sts.{region}.amazonaws.com.cn")
        } else {
            format!("sts.{region}.amazonaws.com")
        };
        assert_eq!(host, "sts.cn-north-1.amazonaws.com.cn");
    }
}
