use async_trait::async_trait;

/// Seam for credential checking. The server stores whatever `enroll` returns
/// and never interprets it; hashing/salting policy lives behind this trait.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Produce the stored form of a newly registered secret.
    fn enroll(&self, secret: &str) -> String;

    /// Check a presented secret against the stored form.
    async fn verify(&self, stored: &str, presented: &str) -> bool;
}

/// Stores secrets verbatim. Stands in until a hashing backend is plugged in.
pub struct PlainTextVerifier;

#[async_trait]
impl CredentialVerifier for PlainTextVerifier {
    fn enroll(&self, secret: &str) -> String {
        secret.to_string()
    }

    async fn verify(&self, stored: &str, presented: &str) -> bool {
        stored == presented
    }
}
