//! Federated sign-in through an external identity provider.
//!
//! The browser is sent to the provider's `/oauth2/authorize` endpoint with a
//! fresh nonce in `state`, and comes back to `/callback` where the nonce is
//! checked and the authorization code is exchanged for tokens.
//!
//! ## Nonce lifecycle
//!
//! One slot, one value. `GET /sign-in/{provider}` overwrites the
//! `authgate_oauth_state` cookie and `GET /callback` clears it on every
//! response, so a nonce is accepted at most once and only the latest attempt
//! can complete. Two tabs sharing a cookie jar race on that slot.

pub(crate) mod callback;
pub(crate) mod config;
pub(crate) mod initiator;
mod nonce;
pub(crate) mod screen;
mod state;

pub use callback::{CallbackError, CallbackOutcome, CallbackParams};
pub use config::{DEFAULT_SCOPES, FederationConfig, Provider, ProviderSettings};
pub use initiator::AuthorizationRequest;
pub use state::FederationState;
