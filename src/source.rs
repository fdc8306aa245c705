use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::api::{BatchQuery, ResponseCode, TriviaApi, BATCH_SIZE};
use crate::question::{QuestionBatch, RoundConfiguration};

/// Why a batch could not be fetched
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Could not obtain a session token from the trivia service")]
    CredentialUnavailable,

    #[error("Not enough questions available for your criteria. Try different settings.")]
    InsufficientQuestions,

    #[error("Invalid parameter: check your settings and try again.")]
    InvalidParameters,

    #[error("Still rate limited after {attempts} attempts. Please wait a few seconds and try again.")]
    RateLimited { attempts: u32 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response from the trivia service: {0}")]
    InvalidResponse(String),
}

/// Anything that can produce a question batch for a round
pub trait QuestionSource {
    fn fetch_batch(&mut self, config: &RoundConfiguration) -> Result<QuestionBatch, FetchError>;
}

/// Wait applied between rate-limited attempts
pub trait Backoff {
    fn wait(&self, attempt: u32);
}

/// Sleeps for the same interval before every retry
#[derive(Clone, Copy, Debug)]
pub struct FixedBackoff {
    interval: Duration,
}

impl FixedBackoff {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for FixedBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl Backoff for FixedBackoff {
    fn wait(&self, _attempt: u32) {
        if !self.interval.is_zero() {
            std::thread::sleep(self.interval);
        }
    }
}

/// Caps on the client's internal retries
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Rate-limited responses tolerated before giving up
    pub max_rate_limit_retries: u32,
    /// Fresh tokens requested after the service forgot ours
    pub max_credential_renewals: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_rate_limit_retries: 3,
            max_credential_renewals: 3,
        }
    }
}

/// Opaque token scoping which questions the service has already served us
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCredential {
    token: String,
}

impl SessionCredential {
    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Fetches question batches, hiding token management and transient retries
#[derive(Debug)]
pub struct QuestionClient<A: TriviaApi, B: Backoff = FixedBackoff> {
    api: A,
    backoff: B,
    policy: RetryPolicy,
    credential: Option<SessionCredential>,
}

impl<A: TriviaApi> QuestionClient<A, FixedBackoff> {
    pub fn new(api: A) -> Self {
        Self::with_backoff(api, FixedBackoff::default())
    }
}

impl<A: TriviaApi, B: Backoff> QuestionClient<A, B> {
    pub fn with_backoff(api: A, backoff: B) -> Self {
        Self {
            api,
            backoff,
            policy: RetryPolicy::default(),
            credential: None,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn credential(&self) -> Option<&SessionCredential> {
        self.credential.as_ref()
    }

    /// Returns the live token, requesting one if there is none
    fn ensure_credential(&mut self) -> Result<String, FetchError> {
        if let Some(credential) = &self.credential {
            return Ok(credential.token.clone());
        }

        let response = self.api.request_token().map_err(|e| {
            warn!(error = %e, "token request failed");
            FetchError::CredentialUnavailable
        })?;

        if response.response_code != 0 || response.token.is_empty() {
            warn!(code = response.response_code, "token request refused");
            return Err(FetchError::CredentialUnavailable);
        }

        info!("obtained new session token");
        self.credential = Some(SessionCredential {
            token: response.token.clone(),
        });
        Ok(response.token)
    }

    /// Asks the service to forget what it has served to the current token
    fn reset_credential(&mut self) -> Result<(), FetchError> {
        let Some(credential) = self.credential.take() else {
            return Err(FetchError::CredentialUnavailable);
        };

        let response = self.api.reset_token(&credential.token).map_err(|e| {
            warn!(error = %e, "token reset failed");
            FetchError::CredentialUnavailable
        })?;

        if response.response_code != 0 {
            warn!(code = response.response_code, "token reset refused");
            return Err(FetchError::CredentialUnavailable);
        }

        let token = if response.token.is_empty() {
            credential.token
        } else {
            response.token
        };
        self.credential = Some(SessionCredential { token });
        Ok(())
    }
}

impl<A: TriviaApi, B: Backoff> QuestionSource for QuestionClient<A, B> {
    fn fetch_batch(&mut self, config: &RoundConfiguration) -> Result<QuestionBatch, FetchError> {
        let query = BatchQuery::from(config);
        let mut renewals = 0;
        let mut rate_limited = 0;
        let mut reset_done = false;

        loop {
            let token = self.ensure_credential()?;
            let response = self.api.fetch_questions(&query, &token)?;

            match ResponseCode::from(response.response_code) {
                ResponseCode::Success => {
                    if response.results.len() != BATCH_SIZE {
                        return Err(FetchError::InvalidResponse(format!(
                            "expected {BATCH_SIZE} questions, got {}",
                            response.results.len()
                        )));
                    }

                    let batch = response
                        .results
                        .into_iter()
                        .map(|raw| {
                            let kind = raw.kind.clone();
                            raw.decode()
                                .filter(|q| q.format == config.format)
                                .ok_or_else(|| {
                                    FetchError::InvalidResponse(format!(
                                        "question type '{kind}' does not match '{}'",
                                        config.format.as_param()
                                    ))
                                })
                        })
                        .collect::<Result<QuestionBatch, FetchError>>()?;

                    info!(category = config.category_id, "fetched {} questions", batch.len());
                    return Ok(batch);
                }
                ResponseCode::NoResults => return Err(FetchError::InsufficientQuestions),
                ResponseCode::InvalidParameter => return Err(FetchError::InvalidParameters),
                ResponseCode::TokenNotFound => {
                    self.credential = None;
                    renewals += 1;
                    if renewals > self.policy.max_credential_renewals {
                        warn!(renewals, "service keeps rejecting fresh tokens");
                        return Err(FetchError::CredentialUnavailable);
                    }
                    warn!("session token not found, requesting a new one");
                }
                ResponseCode::TokenEmpty => {
                    if reset_done {
                        warn!("token exhausted again right after a reset");
                        return Err(FetchError::CredentialUnavailable);
                    }
                    warn!("all questions for this token have been used, resetting it");
                    self.reset_credential()?;
                    reset_done = true;
                }
                ResponseCode::RateLimit => {
                    rate_limited += 1;
                    if rate_limited > self.policy.max_rate_limit_retries {
                        return Err(FetchError::RateLimited {
                            attempts: rate_limited,
                        });
                    }
                    warn!(attempt = rate_limited, "rate limited, backing off");
                    self.backoff.wait(rate_limited);
                }
                ResponseCode::Unknown(code) => {
                    return Err(FetchError::InvalidResponse(format!(
                        "unknown response code {code}"
                    )));
                }
            }
        }
    }
}
