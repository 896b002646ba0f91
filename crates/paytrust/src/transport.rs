//! Blocking HTTP transport over `ureq`.

use paytrust_core::{CoreError, CoreResult, HttpRequest, HttpResponse, HttpTransport};
use std::io::Read;
use std::time::Duration;

/// Responses larger than this are cut off and rejected.
const MAX_BODY_BYTES: u64 = 10 * 1024 * 1024;

/// Sends requests with a shared `ureq::Agent`.
///
/// Non-2xx statuses are returned as responses, not errors: their bodies are
/// signed too and must go through verification.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { agent }
    }
}

impl HttpTransport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> CoreResult<HttpResponse> {
        let mut req = self.agent.request(request.method.as_str(), &request.url);
        for (name, value) in &request.headers {
            req = req.set(name, value);
        }

        let result = if request.body.is_empty() {
            req.call()
        } else {
            req.send_bytes(&request.body)
        };
        let response = match result {
            Ok(resp) => resp,
            Err(ureq::Error::Status(_, resp)) => resp,
            Err(ureq::Error::Transport(t)) => {
                return Err(CoreError::Transport(t.to_string()));
            }
        };

        let status = response.status();
        let headers: Vec<(String, String)> = response
            .headers_names()
            .into_iter()
            .filter_map(|name| {
                let value = response.header(&name)?.to_string();
                Some((name, value))
            })
            .collect();

        let mut body = Vec::new();
        response
            .into_reader()
            .take(MAX_BODY_BYTES + 1)
            .read_to_end(&mut body)
            .map_err(|e| CoreError::Transport(format!("reading response body: {}", e)))?;
        if body.len() as u64 > MAX_BODY_BYTES {
            return Err(CoreError::Transport(format!(
                "response body exceeds {} bytes",
                MAX_BODY_BYTES
            )));
        }

        tracing::debug!(
            method = %request.method,
            uri = %request.uri,
            status,
            body_len = body.len(),
            "response received"
        );
        Ok(HttpResponse::new(status, headers, body))
    }
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}
