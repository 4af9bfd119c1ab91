//! Alt-text generation providers.
//!
//! A provider turns one image into a draft description. Failures are
//! values on [`AltTextResult`], never panics, so one bad image does not
//! stop the others. [`Throttled`] wraps any provider with a fixed minimum
//! gap between requests and bounded exponential backoff on rate limits.

use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hasher};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use accesspdf_core::PdfError;
use tracing::{debug, warn};

use crate::config::AiConfig;

/// Largest fraction of a backoff delay added as jitter.
const MAX_JITTER: f64 = 0.25;

/// What a provider is asked to describe.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AltTextRequest {
    pub image: Vec<u8>,
    pub mime_type: String,
    pub caption: String,
    pub surrounding_text: String,
    /// 1-based page of the image.
    pub page: usize,
    pub document_title: String,
}

impl AltTextRequest {
    pub fn png(image: Vec<u8>) -> Self {
        Self {
            image,
            mime_type: "image/png".to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The provider refused because of rate limiting, optionally saying
    /// how long to wait.
    RateLimited { retry_after: Option<Duration> },
    /// Missing credentials or an unreachable service.
    Unavailable(String),
    Failed(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::RateLimited {
                retry_after: Some(wait),
            } => write!(f, "rate limited, retry after {:.1}s", wait.as_secs_f64()),
            ProviderError::RateLimited { retry_after: None } => write!(f, "rate limited"),
            ProviderError::Unavailable(msg) => write!(f, "provider unavailable: {msg}"),
            ProviderError::Failed(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ProviderError {}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AltTextResult {
    pub alt_text: String,
    pub confidence: f32,
    pub is_decorative: bool,
    pub error: Option<ProviderError>,
}

impl AltTextResult {
    pub fn failed(error: ProviderError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self.error, Some(ProviderError::RateLimited { .. }))
    }
}

pub trait AltTextProvider: Send + Sync {
    fn name(&self) -> &str;

    fn generate(&self, request: &AltTextRequest) -> AltTextResult;

    fn is_available(&self) -> bool;

    /// Cheap check run before a batch of requests, returning a message
    /// describing why the batch would fail.
    fn preflight(&self) -> Option<String> {
        None
    }
}

impl<P: AltTextProvider + ?Sized> AltTextProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn generate(&self, request: &AltTextRequest) -> AltTextResult {
        (**self).generate(request)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn preflight(&self) -> Option<String> {
        (**self).preflight()
    }
}

/// Produces no text; every image stays in review.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProvider;

impl AltTextProvider for NoOpProvider {
    fn name(&self) -> &str {
        "noop"
    }

    fn generate(&self, _request: &AltTextRequest) -> AltTextResult {
        AltTextResult::default()
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// Provider named by the configuration, throttled per its settings.
pub fn provider_from_config(config: &AiConfig) -> Result<Throttled<Box<dyn AltTextProvider>>, PdfError> {
    let provider: Box<dyn AltTextProvider> = match config.provider.trim().to_lowercase().as_str() {
        "" | "none" | "noop" => Box::new(NoOpProvider),
        other => {
            return Err(PdfError::ConfigError(format!(
                "unknown alt-text provider: {other:?} (available: none)"
            )));
        }
    };
    Ok(Throttled::new(provider, ThrottleSettings::from_config(config)))
}

/// Pacing of requests sent through [`Throttled`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrottleSettings {
    /// Fixed gap between the start of consecutive requests.
    pub min_interval: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl ThrottleSettings {
    pub fn from_config(config: &AiConfig) -> Self {
        Self {
            min_interval: config.min_interval(),
            max_retries: config.max_retries,
            initial_backoff: config.initial_backoff(),
            max_backoff: config.max_backoff(),
        }
    }

    /// Delay before retry `attempt` (0-based), without jitter. A server
    /// hint is waited out in full; only the computed exponential delay is
    /// capped at `max_backoff`.
    pub fn backoff(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        retry_after.unwrap_or_else(|| {
            self.initial_backoff
                .saturating_mul(2u32.saturating_pow(attempt))
                .min(self.max_backoff)
        })
    }
}

type SleepFn = Box<dyn Fn(Duration) + Send + Sync>;

/// A provider wrapper enforcing a minimum request interval and retrying
/// rate-limited requests with exponential backoff plus jitter.
pub struct Throttled<P> {
    inner: P,
    settings: ThrottleSettings,
    last_request: Mutex<Option<Instant>>,
    sleep: SleepFn,
    jitter: bool,
}

impl<P: AltTextProvider> Throttled<P> {
    pub fn new(inner: P, settings: ThrottleSettings) -> Self {
        Self {
            inner,
            settings,
            last_request: Mutex::new(None),
            sleep: Box::new(std::thread::sleep),
            jitter: true,
        }
    }

    /// Replace the blocking sleep and disable jitter, for deterministic
    /// pacing.
    pub fn with_sleep(mut self, sleep: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.sleep = Box::new(sleep);
        self.jitter = false;
        self
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Wait until `min_interval` has passed since the previous request.
    fn pace(&self) {
        let mut last = self
            .last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.settings.min_interval {
                (self.sleep)(self.settings.min_interval - elapsed);
            }
        }
        *last = Some(Instant::now());
    }

    fn with_jitter(&self, delay: Duration) -> Duration {
        if !self.jitter {
            return delay;
        }
        let mut hasher = RandomState::new().build_hasher();
        hasher.write_u128(Instant::now().elapsed().as_nanos());
        let fraction = (hasher.finish() % 1000) as f64 / 1000.0 * MAX_JITTER;
        delay.mul_f64(1.0 + fraction)
    }
}

impl<P: AltTextProvider> AltTextProvider for Throttled<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn generate(&self, request: &AltTextRequest) -> AltTextResult {
        let mut attempt = 0;
        loop {
            self.pace();
            let result = self.inner.generate(request);
            let retry_after = match &result.error {
                Some(ProviderError::RateLimited { retry_after }) => *retry_after,
                _ => return result,
            };
            if attempt >= self.settings.max_retries {
                warn!(provider = self.name(), attempts = attempt + 1, "giving up after rate limiting");
                return result;
            }
            let delay = self.with_jitter(self.settings.backoff(attempt, retry_after));
            debug!(
                provider = self.name(),
                attempt = attempt + 1,
                wait_secs = delay.as_secs_f64(),
                "rate limited, backing off"
            );
            (self.sleep)(delay);
            attempt += 1;
        }
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }

    fn preflight(&self) -> Option<String> {
        self.inner.preflight()
    }
}
