//! Rate limiting utilities for the GitHub API.
//!
//! Before each core API call the remaining budget is checked; short waits
//! are absorbed here, long ones are surfaced as a retryable error so the
//! caller's retry policy and timeouts stay in charge.

use octocrab::Octocrab;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Longest wait absorbed here before reporting the limit as exceeded.
const MAX_WAIT_SECS: u64 = 60;

/// Minimum remaining requests before proactively waiting.
const MIN_REMAINING_THRESHOLD: u32 = 5;

/// Rate limit information for a specific resource.
#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    /// Requests remaining in the current window.
    pub remaining: u32,
    /// Unix timestamp when the rate limit resets.
    pub reset: u64,
    /// Total requests allowed per window.
    pub limit: u32,
}

/// Errors from rate limit handling.
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// GitHub API error while reading the limit.
    #[error("GitHub API error: {0}")]
    GitHubError(#[from] octocrab::Error),

    /// Budget exhausted and the reset is too far away to wait for.
    #[error("Rate limit exceeded, reset at {reset_at}")]
    RateLimitExceeded { reset_at: u64 },
}

/// Checks the current rate limit status for core API (issues, PRs, etc.).
///
/// # Errors
///
/// Returns an error if the rate limit API call fails.
pub async fn check_core_rate_limit(octocrab: &Octocrab) -> Result<RateLimitInfo, octocrab::Error> {
    let rate_limit = octocrab.ratelimit().get().await?;
    let core = &rate_limit.resources.core;

    Ok(RateLimitInfo {
        remaining: core.remaining as u32,
        reset: core.reset,
        limit: core.limit as u32,
    })
}

/// Decides how long to wait before the next call, given the current time.
///
/// Returns `Ok(None)` when no wait is needed.
///
/// # Errors
///
/// Returns [`RateLimitError::RateLimitExceeded`] when the reset is further
/// away than the longest wait absorbed here.
pub fn required_wait(info: &RateLimitInfo, now: u64) -> Result<Option<Duration>, RateLimitError> {
    if info.remaining >= MIN_REMAINING_THRESHOLD || info.reset <= now {
        return Ok(None);
    }

    let wait_secs = info.reset - now;
    if wait_secs > MAX_WAIT_SECS {
        return Err(RateLimitError::RateLimitExceeded {
            reset_at: info.reset,
        });
    }
    Ok(Some(Duration::from_secs(wait_secs)))
}

/// Waits if the rate limit is low, returning true if we waited.
///
/// # Errors
///
/// Returns [`RateLimitError::RateLimitExceeded`] if the wait would be too long.
pub async fn wait_if_needed(info: &RateLimitInfo) -> Result<bool, RateLimitError> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    match required_wait(info, now)? {
        Some(wait) => {
            info!(
                remaining = info.remaining,
                wait_secs = wait.as_secs(),
                "Rate limit low, waiting for reset"
            );
            tokio::time::sleep(wait).await;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Ensures sufficient rate limit before making core API calls.
///
/// # Errors
///
/// Returns an error if the rate limit check fails or the budget is exhausted.
pub async fn ensure_core_rate_limit(octocrab: &Octocrab) -> Result<(), RateLimitError> {
    let info = check_core_rate_limit(octocrab).await?;
    wait_if_needed(&info).await?;
    Ok(())
}
