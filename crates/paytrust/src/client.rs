use paytrust_auth::{
    AuthError, AuthResult, CertificateListing, CertificateSource, KeyMaterial, PayloadDecryptor,
    RequestSigner, ResponseVerifier, SignedRequestHeader, TrustCertificateStore,
    TrustedCertificate, VerificationMode,
};
use paytrust_core::{CoreError, HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use paytrust_notify::DecryptedNotification;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ApiError, ClientError, ClientResult};
use crate::transport::UreqTransport;

/// Platform certificate listing endpoint.
pub const CERTIFICATES_PATH: &str = "/v3/certificates";

const CONTENT_TYPE_JSON: &str = "application/json";

// ---------------------------------------------------------------------------
// PreparedRequest
// ---------------------------------------------------------------------------

/// A signed request ready for the transport.
///
/// The body bytes are the ones that were signed; nothing may re-serialize them.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub request: HttpRequest,
    pub authorization: SignedRequestHeader,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Signed, verified client for one merchant.
///
/// Each client owns its own trust store, so clients for different merchants
/// in one process never share platform certificates.
pub struct Client {
    config: ClientConfig,
    keys: Arc<KeyMaterial>,
    signer: RequestSigner,
    decryptor: PayloadDecryptor,
    store: Arc<TrustCertificateStore>,
    verifier: ResponseVerifier,
    transport: Arc<dyn HttpTransport>,
}

impl Client {
    /// Build a client. Key material is not checked until first use.
    pub fn new(config: ClientConfig, keys: KeyMaterial, transport: Arc<dyn HttpTransport>) -> Self {
        let keys = Arc::new(keys);
        let decryptor = PayloadDecryptor::new(Arc::clone(&keys));
        let store = Arc::new(TrustCertificateStore::new(
            decryptor.clone(),
            config.trust.expiry,
        ));
        Self {
            signer: RequestSigner::new(Arc::clone(&keys)),
            verifier: ResponseVerifier::new(Arc::clone(&store)),
            config,
            keys,
            decryptor,
            store,
            transport,
        }
    }

    /// Validate `config`, load its key material and connect over HTTPS.
    pub fn from_config(config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;
        let keys = config.key_material()?;
        let transport = UreqTransport::new(Duration::from_secs(config.timeout_secs));
        Ok(Self::new(config, keys, Arc::new(transport)))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn keys(&self) -> &KeyMaterial {
        &self.keys
    }

    pub fn signer(&self) -> &RequestSigner {
        &self.signer
    }

    pub fn decryptor(&self) -> &PayloadDecryptor {
        &self.decryptor
    }

    pub fn trust_store(&self) -> &Arc<TrustCertificateStore> {
        &self.store
    }

    /// Serialize `body` as JSON (if any) and sign the request.
    pub fn prepare<B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> ClientResult<PreparedRequest> {
        let bytes = match body {
            Some(b) => serde_json::to_vec(b)?,
            None => Vec::new(),
        };
        self.prepare_raw(method, path, bytes)
    }

    /// Sign a request whose body is already serialized.
    ///
    /// `path` is an absolute path plus optional query. It is percent-encoded
    /// once here, and the encoded form is both signed and sent.
    pub fn prepare_raw(
        &self,
        method: HttpMethod,
        path: &str,
        body: Vec<u8>,
    ) -> ClientResult<PreparedRequest> {
        let target = self.resolve(path)?;
        let uri = request_uri(&target);

        let authorization = self.signer.sign(method, &uri, &body)?;
        let mut request = HttpRequest {
            method,
            url: String::from(target),
            uri,
            headers: Vec::new(),
            body,
        };
        request.set_header("Authorization", authorization.to_header_value());
        request.set_header("Accept", CONTENT_TYPE_JSON);
        request.set_header("User-Agent", self.config.user_agent.as_str());
        if !request.body.is_empty() {
            request.set_header("Content-Type", CONTENT_TYPE_JSON);
        }

        Ok(PreparedRequest {
            request,
            authorization,
        })
    }

    fn resolve(&self, path: &str) -> ClientResult<Url> {
        if !path.starts_with('/') {
            return Err(CoreError::InvalidUri(path.to_string()).into());
        }
        let joined = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let url = Url::parse(&joined)
            .map_err(|e| CoreError::InvalidUri(format!("{}: {}", path, e)))?;
        if url.fragment().is_some() {
            return Err(CoreError::InvalidUri(format!("{}: fragments are not sent", path)).into());
        }
        Ok(url)
    }

    /// Send a prepared request and check the response.
    ///
    /// Order matters: the signature is verified first, then the status. A
    /// forged error body therefore surfaces as an auth failure.
    pub fn execute(
        &self,
        prepared: &PreparedRequest,
        mode: VerificationMode,
    ) -> ClientResult<HttpResponse> {
        let request = &prepared.request;
        debug!(method = %request.method, uri = %request.uri, "sending request");

        let response = self.transport.send(request)?;
        self.verifier.verify(&response, mode, self)?;

        if response.is_success() {
            return Ok(response);
        }

        let err = ApiError::from_response(
            request.method,
            &request.uri,
            response.status,
            response.body(),
        );
        warn!(
            method = %request.method,
            uri = %request.uri,
            status = response.status,
            code = %err.code,
            "api call failed"
        );
        Err(err.into())
    }

    /// Sign, send, verify and return the raw response.
    pub fn send<B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> ClientResult<HttpResponse> {
        let prepared = self.prepare(method, path, body)?;
        self.execute(&prepared, VerificationMode::Verify)
    }

    /// Sign, send, verify and decode a JSON response.
    pub fn call<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> ClientResult<T> {
        let response = self.send(method, path, body)?;
        Ok(serde_json::from_slice(response.body())?)
    }

    /// Fetch the certificate listing. The response is not verified: it is
    /// where the verifying certificates come from.
    pub fn fetch_certificate_listing(&self) -> ClientResult<CertificateListing> {
        let prepared = self.prepare_raw(HttpMethod::Get, CERTIFICATES_PATH, Vec::new())?;
        let response = self.execute(&prepared, VerificationMode::Bootstrap)?;
        Ok(serde_json::from_slice(response.body())?)
    }

    /// Re-download platform certificates into the trust store.
    pub fn refresh_certificates(&self) -> ClientResult<usize> {
        Ok(self.store.refresh(self)?)
    }

    /// Refresh and return every trusted platform certificate.
    pub fn certificates(&self) -> ClientResult<Vec<Arc<TrustedCertificate>>> {
        self.refresh_certificates()?;
        Ok(self.store.certificates()?)
    }

    /// Decrypt an inbound webhook body.
    pub fn parse_notification(&self, raw: &[u8]) -> ClientResult<DecryptedNotification> {
        Ok(paytrust_notify::parse_notification(raw, &self.decryptor)?)
    }
}

/// Path plus `?query` of `url`, as it appears in the HTTP request line.
fn request_uri(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

impl CertificateSource for Client {
    fn fetch_certificates(&self) -> AuthResult<CertificateListing> {
        self.fetch_certificate_listing().map_err(|e| match e {
            ClientError::Auth(auth) => auth,
            other => AuthError::Source(other.to_string()),
        })
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.config.base_url)
            .field("keys", &self.keys)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
