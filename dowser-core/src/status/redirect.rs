//! Redirect-following strategies for link probes.
//!
//! Only 301 and 302 are ever followed; every other status ends the chain.
//! The two followers are observationally equivalent: same final status,
//! same effective URL, same hop limit.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::error::DowserError;

/// Maximum redirect hops before a chain is abandoned.
pub const MAX_REDIRECTS: usize = 5;

/// Response bodies are read at most this far; titles live near the top.
pub const MAX_BODY_BYTES: usize = 512 * 1024;

/// The response that ended a redirect chain.
#[derive(Debug)]
pub struct Fetched {
    pub code: u16,
    pub final_url: String,
    pub body: String,
}

/// Why a fetch produced no final response.
#[derive(Debug)]
pub enum FetchError {
    /// The HTTP client failed below the status layer.
    Transport(reqwest::Error),
    /// Still being redirected after [`MAX_REDIRECTS`] hops.
    TooManyRedirects,
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_redirect() {
            FetchError::TooManyRedirects
        } else {
            FetchError::Transport(err)
        }
    }
}

/// How a probe follows redirects. Chosen once at resolver construction and
/// injected; the resolver never inspects its environment per request.
pub trait RedirectFollower: Send + Sync + fmt::Debug {
    /// Redirect policy the HTTP client must be built with.
    fn client_policy(&self) -> Policy;

    /// Fetch `url` and return the response that ended the chain.
    fn fetch<'a>(
        &'a self,
        client: &'a Client,
        url: &'a str,
    ) -> BoxFuture<'a, Result<Fetched, FetchError>>;
}

/// Lets the HTTP client follow redirects itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRedirects;

impl RedirectFollower for NativeRedirects {
    fn client_policy(&self) -> Policy {
        Policy::custom(|attempt| {
            let code = attempt.status().as_u16();
            if code != 301 && code != 302 {
                attempt.stop()
            } else if attempt.previous().len() > MAX_REDIRECTS {
                attempt.error("redirect hop limit reached")
            } else {
                attempt.follow()
            }
        })
    }

    fn fetch<'a>(
        &'a self,
        client: &'a Client,
        url: &'a str,
    ) -> BoxFuture<'a, Result<Fetched, FetchError>> {
        Box::pin(async move {
            let response = client.get(url).send().await?;
            let code = response.status().as_u16();
            let final_url = effective_url(url, response.url());
            let body = read_body_capped(response).await;
            debug!(code, final_url = %final_url, "fetch complete");
            Ok(Fetched {
                code,
                final_url,
                body,
            })
        })
    }
}

/// Follows redirects by hand with the client's own redirects disabled.
/// Hop responses never have their bodies read, so each hop costs a
/// HEAD-like exchange and only the final response is downloaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualRedirects;

impl RedirectFollower for ManualRedirects {
    fn client_policy(&self) -> Policy {
        Policy::none()
    }

    fn fetch<'a>(
        &'a self,
        client: &'a Client,
        url: &'a str,
    ) -> BoxFuture<'a, Result<Fetched, FetchError>> {
        Box::pin(async move {
            let mut current = url.to_string();
            let mut hops_left = MAX_REDIRECTS;

            loop {
                let response = client.get(&current).send().await?;
                let code = response.status().as_u16();

                if code != 301 && code != 302 {
                    let final_url = effective_url(url, response.url());
                    let body = read_body_capped(response).await;
                    debug!(code, final_url = %final_url, "fetch complete");
                    return Ok(Fetched {
                        code,
                        final_url,
                        body,
                    });
                }

                // A redirect without a usable Location header is terminal.
                let Some(next) = next_location(&response) else {
                    warn!(code, url = %current, "redirect carries no location header");
                    let final_url = effective_url(url, response.url());
                    return Ok(Fetched {
                        code,
                        final_url,
                        body: String::new(),
                    });
                };

                if hops_left == 0 {
                    warn!(url = %url, limit = MAX_REDIRECTS, "redirect chain exhausted hop budget");
                    return Err(FetchError::TooManyRedirects);
                }
                hops_left -= 1;

                debug!(from = %current, to = %next, hops_left, "following redirect");
                current = next;
            }
        })
    }
}

/// Follower selection by name, as exposed on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RedirectMode {
    #[default]
    Native,
    Manual,
}

impl RedirectMode {
    /// Materialize the follower this mode names.
    pub fn follower(&self) -> Arc<dyn RedirectFollower> {
        match self {
            RedirectMode::Native => Arc::new(NativeRedirects),
            RedirectMode::Manual => Arc::new(ManualRedirects),
        }
    }
}

impl FromStr for RedirectMode {
    type Err = DowserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "native" => Ok(RedirectMode::Native),
            "manual" => Ok(RedirectMode::Manual),
            _ => Err(DowserError::InvalidRedirectMode(s.to_string())),
        }
    }
}

/// Resolve a redirect's Location header against the URL that produced it.
/// Absolute values pass through; relative values are joined onto the
/// current URL; unparseable values yield `None`.
fn next_location(response: &reqwest::Response) -> Option<String> {
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    response.url().join(location).ok().map(|u| u.to_string())
}

/// Keep the caller's spelling of the URL when the chain never left it, so
/// an unredirected probe reports exactly the URL it was given.
fn effective_url(requested: &str, responded: &Url) -> String {
    match Url::parse(requested) {
        Ok(parsed) if parsed == *responded => requested.to_string(),
        _ => responded.to_string(),
    }
}

/// Read at most [`MAX_BODY_BYTES`] of the body, lossily decoded. A read
/// error mid-body keeps the prefix read so far; the status line already
/// arrived and truncation is indistinguishable from the cap.
async fn read_body_capped(mut response: reqwest::Response) -> String {
    let mut buf: Vec<u8> = Vec::new();
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let remaining = MAX_BODY_BYTES - buf.len();
                if chunk.len() >= remaining {
                    buf.extend_from_slice(&chunk[..remaining]);
                    break;
                }
                buf.extend_from_slice(&chunk);
            }
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "body read ended early");
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}
