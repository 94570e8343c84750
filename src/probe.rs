//! Outbound health probe relay
//!
//! Browsers cannot probe third-party app URLs directly because of
//! cross-origin restrictions, so the server performs the GET on their behalf
//! and relays only the resulting status code. The target's body is never
//! forwarded.

use tracing::debug;

/// Relays health-check requests to arbitrary targets.
///
/// No timeout and no target allow-list: a hanging target stalls only the
/// requesting handler task, and host restriction is the caller's problem.
pub struct HealthProbe {
    client: reqwest::Client,
}

impl HealthProbe {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Issue a GET against the target and return its status code.
    pub async fn relay_status(&self, target: &str) -> Result<u16, reqwest::Error> {
        let response = self.client.get(target).send().await?;
        let status = response.status().as_u16();
        debug!(target, status, "Health probe relayed");
        Ok(status)
    }
}

impl Default for HealthProbe {
    fn default() -> Self {
        Self::new()
    }
}
