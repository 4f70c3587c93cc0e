use tokio_util::sync::CancellationToken;

/// Per-request state threaded from the HTTP surface down to tool calls.
///
/// Holds the caller's backend credential, which overrides the configured default
/// cookie for every backend call made on behalf of this request, and the token
/// that is cancelled when the request goes away.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub login_cert: Option<String>,
    pub cancel: CancellationToken,
}

impl RequestContext {
    pub fn new(login_cert: Option<String>) -> Self {
        Self {
            login_cert,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}
