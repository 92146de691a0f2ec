//! # Authgate (federated sign-in gateway)
//!
//! `authgate` sits between a browser and a hosted identity provider. It never
//! validates credentials or issues tokens itself; every authentication decision
//! is delegated to the provider.
//!
//! ## Federated sign-in (`OAuth2` authorization code)
//!
//! - **Login Initiator:** `GET /sign-in/{provider}` builds the provider's
//!   `/oauth2/authorize` URL, stores a fresh anti-forgery nonce in a
//!   browser-session cookie and redirects the browser away.
//! - **Callback Receiver:** `GET /callback` evaluates the redirect in a fixed
//!   order (provider error, then nonce, then code), clears the nonce in every
//!   branch, exchanges the code at `/oauth2/token` and stores the issued tokens
//!   in durable cookies.
//!
//! Every failure ends in a redirect to `/sign-in?error=...`.
//!
//! ## Credential screens
//!
//! Sign-in, sign-up, passcode verification and password reset are thin JSON
//! endpoints over the provider's user-pool API.

pub mod api;
pub mod cli;
pub mod idp;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
