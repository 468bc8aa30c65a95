//! Link status probing module
//!
//! Resolves what actually lives behind a URL:
//! - Final HTTP status code after following redirects
//! - Page title of the responding document
//! - Classified transport failures for links that never answered

mod client;
mod redirect;
mod types;

pub use client::{ResolverBuilder, StatusResolver, DEFAULT_USER_AGENT};
pub use redirect::{
    FetchError, Fetched, ManualRedirects, NativeRedirects, RedirectFollower, RedirectMode,
    MAX_REDIRECTS,
};
pub use types::{
    reason_phrase, LinkRecord, LinkStatus, ProbeOutcome, TransportError, TransportKind,
};
