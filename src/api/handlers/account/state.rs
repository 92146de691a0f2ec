use crate::{api::handlers::cookies::CookiePolicy, idp::UserPoolClient};

/// Shared state for the credential screens and the dashboard.
#[derive(Debug)]
pub struct AccountState {
    idp: UserPoolClient,
    cookies: CookiePolicy,
}

impl AccountState {
    #[must_use]
    pub fn new(idp: UserPoolClient, cookies: CookiePolicy) -> Self {
        Self { idp, cookies }
    }

    #[must_use]
    pub fn idp(&self) -> &UserPoolClient {
        &self.idp
    }

    #[must_use]
    pub fn cookies(&self) -> CookiePolicy {
        self.cookies
    }
}
