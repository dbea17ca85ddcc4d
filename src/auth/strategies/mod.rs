use serde::Serialize;

#[cfg(feature = "auth-cert")]
pub(crate) mod cert_auth;

// Snowflake Auth Strategies can be found here:
// https://github.com/snowflakedb/gosnowflake/blob/master/auth.go#L139
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthStrategy {
    Password(String),
    #[cfg(feature = "auth-cert")]
    Certificate(String),
    /// Workload-identity federation (spec component C8): the driver
    /// resolves an attestation credential from the named provider (or
    /// autodetects one when `None`) and presents it as the
    /// `WORKLOAD_IDENTITY` authenticator instead of a static secret.
    #[cfg(feature = "attestation")]
    WorkloadIdentity(Option<crate::auth::attestation::AttestationProvider>),
    // TODO: Add more...
}
