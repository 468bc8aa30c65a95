pub mod cache;
pub mod checker;
pub mod colors;
pub mod error;
pub mod extract;
pub mod output;
pub mod status;

pub use error::{DowserError, Result};
pub use extract::extract_links;

pub use cache::{CacheStats, StatusCache};
pub use checker::{DocumentReport, LinkChecker, ProgressCallback};
pub use status::{
    reason_phrase, LinkRecord, LinkStatus, ManualRedirects, NativeRedirects, ProbeOutcome,
    RedirectFollower, RedirectMode, ResolverBuilder, StatusResolver, TransportError,
    TransportKind, DEFAULT_USER_AGENT, MAX_REDIRECTS,
};

pub use output::{get_formatter, OutputFormat, OutputFormatter};
