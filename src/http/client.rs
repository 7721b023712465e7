//! Resilient catalog client.
//!
//! # Responsibilities
//! - Wrap every verb with admission, retry and re-authentication handling
//! - Attach the certified context header and a request id to each attempt
//! - Run the success hook and await host readiness before settling
//!
//! # Data Flow
//! ```text
//! get/post/... → execute
//!     → AuthGate::admit
//!     → prepare (merge context defaults, stamp elapsed_ms, certify)
//!     → Transport::send
//!     → classify
//!         Success           → success hook → settle Ok
//!         DeleteAlreadyDone → settle Ok (synthesized 204)
//!         Retriable         → backoff sleep → admit → send again
//!                             (or settle Err once retries run out)
//!         Unauthorized      → AuthGate::report_unauthorized → send again
//!                             (or settle Err when rejected)
//!         Fatal             → settle Err
//!     → Readiness::ready → caller
//! ```
//!
//! Unauthorized responses never consume retry budget. Retry settings are read
//! once when a call starts, so swapping them does not affect calls in flight.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use serde_json::{json, Value};
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

use crate::auth::{AuthGate, GateRejection, ReauthHandler};
use crate::config::ClientConfig;
use crate::context::{certify, ConstraintLookup, ContextHeader, NoConstraints};
use crate::http::error::{CallError, ErrorKind};
use crate::http::request::{Request, RequestOptions, Verb, X_REQUEST_ID};
use crate::http::response::{status, Response};
use crate::http::transport::{Transport, TransportError};
use crate::lifecycle::{AlwaysReady, Readiness, SuccessHook};
use crate::observability::metrics;
use crate::resilience::{classify, Outcome, RetrySettings, RetryState};

/// Catalog client with retry, re-authentication and context header handling.
pub struct CatalogClient {
    transport: Arc<dyn Transport>,
    gate: Arc<AuthGate>,
    settings: ArcSwap<RetrySettings>,
    header_name: String,
    header_budget: usize,
    constraints: Arc<dyn ConstraintLookup>,
    context_defaults: Option<ContextHeader>,
    on_success: Option<Arc<dyn SuccessHook>>,
    readiness: Arc<dyn Readiness>,
    created: Instant,
}

impl CatalogClient {
    pub fn new<T: Transport + 'static>(transport: T, config: &ClientConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            gate: Arc::new(AuthGate::new()),
            settings: ArcSwap::from_pointee(RetrySettings::from(&config.retry)),
            header_name: config.context_header.name.clone(),
            header_budget: config.context_header.byte_budget,
            constraints: Arc::new(NoConstraints),
            context_defaults: None,
            on_success: None,
            readiness: Arc::new(AlwaysReady),
            created: Instant::now(),
        }
    }

    /// Share an auth gate with other clients.
    pub fn with_gate(mut self, gate: Arc<AuthGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Use a private gate driven by `handler`.
    pub fn with_reauth_handler<H: ReauthHandler + 'static>(self, handler: H) -> Self {
        self.with_gate(Arc::new(AuthGate::with_handler(Arc::new(handler))))
    }

    pub fn with_success_hook<S: SuccessHook + 'static>(mut self, hook: S) -> Self {
        self.on_success = Some(Arc::new(hook));
        self
    }

    pub fn with_readiness<R: Readiness + 'static>(mut self, readiness: R) -> Self {
        self.readiness = Arc::new(readiness);
        self
    }

    pub fn with_constraints(mut self, constraints: Arc<dyn ConstraintLookup>) -> Self {
        self.constraints = constraints;
        self
    }

    /// Context parameters merged into every request's context header.
    pub fn with_context_defaults(mut self, defaults: ContextHeader) -> Self {
        self.context_defaults = Some(defaults);
        self
    }

    pub fn gate(&self) -> &Arc<AuthGate> {
        &self.gate
    }

    pub fn retry_settings(&self) -> RetrySettings {
        **self.settings.load()
    }

    pub fn set_retry_settings(&self, settings: RetrySettings) {
        self.settings.store(Arc::new(settings));
        tracing::info!(
            max_retries = settings.max_retries,
            initial_delay_ms = settings.initial_delay.as_millis() as u64,
            "Retry settings updated"
        );
    }

    /// Apply the hot-swappable parts of a reloaded configuration.
    pub fn apply_config(&self, config: &ClientConfig) {
        self.set_retry_settings(RetrySettings::from(&config.retry));
    }

    pub async fn get(&self, url: &str, options: RequestOptions) -> Result<Response, CallError> {
        self.execute(Verb::Get, url, None, options).await
    }

    pub async fn head(&self, url: &str, options: RequestOptions) -> Result<Response, CallError> {
        self.execute(Verb::Head, url, None, options).await
    }

    pub async fn delete(&self, url: &str, options: RequestOptions) -> Result<Response, CallError> {
        self.execute(Verb::Delete, url, None, options).await
    }

    pub async fn post(
        &self,
        url: &str,
        body: Value,
        options: RequestOptions,
    ) -> Result<Response, CallError> {
        self.execute(Verb::Post, url, Some(body), options).await
    }

    pub async fn put(
        &self,
        url: &str,
        body: Value,
        options: RequestOptions,
    ) -> Result<Response, CallError> {
        self.execute(Verb::Put, url, Some(body), options).await
    }

    pub async fn patch(
        &self,
        url: &str,
        body: Value,
        options: RequestOptions,
    ) -> Result<Response, CallError> {
        self.execute(Verb::Patch, url, Some(body), options).await
    }

    /// Run one logical call to completion.
    ///
    /// Transient failures are retried with exponential backoff and only the
    /// last one is returned once retries run out.
    pub async fn execute(
        &self,
        verb: Verb,
        url: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<Response, CallError> {
        let start = Instant::now();
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "catalog_call",
            request_id = %request_id,
            verb = %verb,
            url = %url
        );

        let result = async {
            let url = Url::parse(url)
                .map_err(|e| CallError::Request(format!("invalid url '{}': {}", url, e)))?;
            self.run(verb, &url, body, &options, request_id).await
        }
        .instrument(span.clone())
        .await;

        self.readiness.ready().await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(err) => kind_label(err.kind()),
        };
        metrics::record_call(verb.as_str(), outcome, start);
        span.in_scope(|| match &result {
            Ok(resp) => tracing::debug!(status = resp.status, "Call settled"),
            Err(err) => tracing::debug!(error = %err, "Call failed"),
        });
        result
    }

    /// Log a fatal client error on the service.
    ///
    /// Issues `PUT <location>/terminal_error` with the error in the context
    /// header. The service answers with an error status after logging, so any
    /// service response counts as delivered.
    pub async fn report_terminal_error(
        &self,
        location: &str,
        name: &str,
        message: &str,
        context: Option<ContextHeader>,
    ) -> Result<(), CallError> {
        let mut header = context.unwrap_or_default();
        header.extra.insert("e".to_string(), json!(1));
        header.extra.insert("name".to_string(), json!(name));
        header.extra.insert("message".to_string(), json!(message));

        let url = format!("{}/terminal_error", location.trim_end_matches('/'));
        let options = RequestOptions::new().context(header).skip_auth_handling();

        match self.put(&url, json!({}), options).await {
            Ok(_) | Err(CallError::Service(_)) | Err(CallError::Unauthorized(_)) => {
                tracing::info!(error_name = name, "Terminal error reported");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn call_settings(&self, options: &RequestOptions) -> RetrySettings {
        let mut settings = self.retry_settings();
        if let Some(max_retries) = options.max_retries {
            settings.max_retries = max_retries;
        }
        if let Some(delay) = options.initial_delay {
            settings.initial_delay = delay;
        }
        settings
    }

    async fn run(
        &self,
        verb: Verb,
        url: &Url,
        body: Option<Value>,
        options: &RequestOptions,
        request_id: Uuid,
    ) -> Result<Response, CallError> {
        let mut retry = RetryState::new(self.call_settings(options));

        self.gate.admit(options.skip_auth_handling).await;

        loop {
            let request = self.prepare(verb, url, body.clone(), options, request_id);
            let result = self.transport.send(&request).await;
            metrics::record_dispatch(verb.as_str(), dispatch_status(&result));

            match classify(verb, result) {
                Outcome::Success(resp) => {
                    if let Some(hook) = &self.on_success {
                        hook.on_success();
                    }
                    return Ok(resp);
                }
                Outcome::DeleteAlreadyDone(resp) => {
                    tracing::info!(
                        retries = retry.attempt_count(),
                        "Delete target already gone, treating as success"
                    );
                    return Ok(resp);
                }
                Outcome::Retriable(err) => {
                    if options.skip_retry_on_offline_codes && err.is_offline() {
                        tracing::debug!(error = %err, "Offline failure, retry skipped for this call");
                        return Err(err);
                    }
                    if !retry.can_retry() {
                        tracing::warn!(
                            error = %err,
                            retries = retry.attempt_count(),
                            "Retries exhausted"
                        );
                        return Err(err);
                    }

                    let delay = retry.next_delay();
                    tracing::info!(
                        error = %err,
                        attempt = retry.attempt_count(),
                        max_retries = retry.max_retries(),
                        delay_ms = delay.as_millis() as u64,
                        "Transient failure, retrying"
                    );
                    metrics::record_retry(verb.as_str());
                    tokio::time::sleep(delay).await;

                    // Retries always queue behind a running handshake.
                    self.gate.admit(false).await;
                }
                Outcome::Unauthorized(resp) => {
                    match self.gate.report_unauthorized(options.skip_auth_handling).await {
                        Ok(()) => tracing::debug!("Redispatching after re-authentication"),
                        Err(rejection) => {
                            tracing::info!(reason = %rejection, "Unauthorized call rejected");
                            return Err(rejection_error(rejection, resp));
                        }
                    }
                }
                Outcome::Fatal(err) => return Err(err),
            }
        }
    }

    fn prepare(
        &self,
        verb: Verb,
        url: &Url,
        body: Option<Value>,
        options: &RequestOptions,
        request_id: Uuid,
    ) -> Request {
        let mut headers = options.headers.clone();

        let context = match (&options.context, &self.context_defaults) {
            (None, None) => None,
            (Some(context), _) => Some(context.clone()),
            (None, Some(_)) => Some(ContextHeader::default()),
        };
        if let Some(mut context) = context {
            if let Some(defaults) = &self.context_defaults {
                context.merge_defaults(defaults);
            }
            context.elapsed_ms = Some(elapsed_ms(self.created.elapsed()));
            let certified = certify(&context, self.header_budget, self.constraints.as_ref());
            headers.insert(self.header_name.clone(), certified.value);
        }
        headers.insert(X_REQUEST_ID.to_string(), request_id.to_string());

        Request {
            verb,
            url: url.clone(),
            body: body.filter(|_| verb.has_body()),
            headers,
        }
    }
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("gate", &self.gate)
            .field("settings", &self.retry_settings())
            .field("header_name", &self.header_name)
            .field("header_budget", &self.header_budget)
            .finish()
    }
}

fn elapsed_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

fn dispatch_status(result: &Result<Response, TransportError>) -> i32 {
    match result {
        Ok(resp) => resp.status,
        Err(TransportError::TimedOut(_)) => status::TIMED_OUT,
        Err(_) => status::NO_CONNECTION,
    }
}

fn kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::NoConnection => "no_connection",
        ErrorKind::Timeout => "timeout",
        ErrorKind::ServerUnavailable => "server_unavailable",
        ErrorKind::Unauthorized => "unauthorized",
        ErrorKind::Fatal => "fatal",
    }
}

fn rejection_error(rejection: GateRejection, resp: Response) -> CallError {
    match rejection {
        GateRejection::Skipped | GateRejection::NoHandler => CallError::Unauthorized(Box::new(resp)),
        GateRejection::IdentityChanged => CallError::IdentityChanged(Box::new(resp)),
        GateRejection::Handshake(e) => CallError::Handshake(e),
    }
}
