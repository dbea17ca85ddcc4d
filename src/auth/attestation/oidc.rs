//! OIDC attestation (spec.md §4.8): the caller already obtained a token
//! out-of-band (e.g. a CI runner's ambient OIDC token); this just
//! validates it carries the claims the server will check and passes it
//! through unchanged.

use std::collections::HashMap;

use super::{Attestation, AttestationProvider, decode_jwt_claims_unverified, require_iss_sub};
use crate::{SnowflakeError, errors::ErrorKind, kind_error};

pub(crate) fn resolve(token: Option<&str>) -> Result<Attestation, SnowflakeError> {
    let token = token.ok_or_else(|| {
        kind_error!(
            ErrorKind::Attestation,
            "no OIDC token supplied; workload identity provider OIDC requires one"
        )
    })?;

    let claims = decode_jwt_claims_unverified(token)?;
    require_iss_sub(&claims)?;

    Ok(Attestation {
        provider: AttestationProvider::Oidc,
        credential: token.to_string(),
        metadata: HashMap::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_token_is_not_probed_over_the_network() {
        let err = resolve(None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Attestation);
    }
}
