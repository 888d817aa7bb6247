use secrecy::SecretString;

use crate::layer::Container;

/// Optional registry credentials, typically from flags or the environment.
#[derive(Debug, Clone, Default)]
pub struct RegistryCredentials {
    pub username: Option<String>,
    pub password: Option<SecretString>,
}

impl RegistryCredentials {
    pub fn new(username: Option<String>, password: Option<SecretString>) -> Self {
        Self { username, password }
    }

    /// Username and password, if both are set.
    pub fn complete(&self) -> Option<(&str, &SecretString)> {
        Some((self.username.as_deref()?, self.password.as_ref()?))
    }
}

/// Attach registry auth to `container` when `registry` is a credentialed host.
///
/// Returns the container unchanged when the registry is not listed in
/// `credentialed_hosts` or either credential is missing. Anonymous
/// registries are a valid publish target, so this never fails.
pub fn attach_credentials(
    container: Container,
    registry: &str,
    credentials: &RegistryCredentials,
    credentialed_hosts: &[String],
) -> Container {
    let host = registry.to_lowercase();
    if !credentialed_hosts
        .iter()
        .any(|h| h.eq_ignore_ascii_case(&host))
    {
        tracing::debug!(registry = %host, "registry does not take credentials");
        return container;
    }

    let Some((username, password)) = credentials.complete() else {
        tracing::warn!(
            registry = %host,
            "credentialed registry but username or password missing; publishing anonymously"
        );
        return container;
    };

    tracing::debug!(registry = %host, username = %username, "attaching registry auth");
    container.with_registry_auth(host, username, password.clone())
}
