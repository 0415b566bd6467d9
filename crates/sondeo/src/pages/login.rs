//! Login screen.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{candidates, error_banner};
use crate::classifier::{OutcomeSignal, SignalCheck};
use crate::locator::{CandidateSelector, Visibility};
use crate::page_object::{
    run_operation, FieldBundle, FieldSpec, NavigationRoute, Operation, OperationReport, PageContext,
    PageObject,
};
use crate::result::SondeoResult;

/// Username and password
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Login name
    #[serde(alias = "usuario")]
    pub username: String,
    /// Password
    #[serde(alias = "contrasena")]
    pub password: String,
}

impl Credentials {
    /// Create credentials
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// As a field bundle
    #[must_use]
    pub fn to_bundle(&self) -> FieldBundle {
        FieldBundle::new()
            .with("username", self.username.as_str())
            .with("password", self.password.as_str())
    }
}

/// The Dolibarr login form
#[derive(Debug, Clone)]
pub struct LoginPage<'a> {
    ctx: PageContext<'a>,
    username: CandidateSelector,
    password: CandidateSelector,
    submit: CandidateSelector,
    logged_in: CandidateSelector,
    logout: CandidateSelector,
}

impl PageObject for LoginPage<'_> {
    fn url_pattern(&self) -> &str {
        "/index.php"
    }

    fn page_name(&self) -> &str {
        "login"
    }
}

impl<'a> LoginPage<'a> {
    /// Bind the login page to a context
    #[must_use]
    pub fn new(ctx: &PageContext<'a>) -> Self {
        Self {
            ctx: ctx.clone(),
            username: candidates(
                "username",
                "#username",
                &[
                    "input[name=\"username\"]",
                    "input[id=\"username\"]",
                    "input.flat[name=\"username\"]",
                ],
            ),
            password: candidates(
                "password",
                "#password",
                &[
                    "input[name=\"password\"]",
                    "input[id=\"password\"]",
                    "input[type=\"password\"]",
                ],
            ),
            submit: candidates(
                "login button",
                "#login_button",
                &[
                    "input[type=\"submit\"][name=\"login\"]",
                    "button[type=\"submit\"][name=\"login\"]",
                    "input.button[type=\"submit\"]",
                    ".button[type=\"submit\"]",
                    "input[value=\"Connect\"]",
                    "input[value=\"Conexión\"]",
                ],
            ),
            logged_in: candidates(
                "logged-in marker",
                ".login_block_user",
                &[
                    "#topmenu-bookmark-dropdown",
                    "a.dropdown-toggle.login_block_user",
                    ".atoplogin",
                ],
            ),
            logout: candidates(
                "logout link",
                "a[href*=\"logout\"]",
                &["a[href*=\"logoff\"]", "#logout", ".logout"],
            ),
        }
    }

    /// Load the login screen
    pub async fn open(&self) -> SondeoResult<()> {
        self.ctx.goto("/").await
    }

    fn operation(&self) -> Operation {
        Operation::new("login", self.page_name(), self.submit.clone())
            .field(FieldSpec::input("username", self.username.clone()))
            .field(FieldSpec::input("password", self.password.clone()))
            .signal(error_banner(".error", &["div.error", ".opacitymedium.error"]))
            .signal(
                OutcomeSignal::success(
                    "logged-in marker",
                    SignalCheck::ElementVisible(
                        self.logged_in.clone().with_visibility(Visibility::Attached),
                    ),
                )
                .with_priority(0),
            )
            .signal(
                OutcomeSignal::success("url changed", SignalCheck::UrlChanged { from: None })
                    .with_priority(1),
            )
            .signal(
                OutcomeSignal::success("login form gone", SignalCheck::ElementGone(self.password.clone()))
                    .with_priority(2),
            )
    }

    /// Submit the login form
    pub async fn login(&self, credentials: &Credentials) -> SondeoResult<OperationReport> {
        run_operation(&self.ctx, &self.operation(), &credentials.to_bundle()).await
    }

    /// Whether a logged-in marker is on the page
    pub async fn is_logged_in(&self) -> bool {
        let marker = self.logged_in.clone().with_visibility(Visibility::Attached);
        self.ctx.resolver().resolve(&marker).await.is_found()
    }

    /// Log out through a visible logout link, or the logout URL when the link
    /// is hidden in a collapsed menu
    pub async fn logout(&self) -> SondeoResult<NavigationRoute> {
        if let Some(link) = self.ctx.resolver().resolve(&self.logout).await.into_handle() {
            if link.click().await.is_ok() {
                return Ok(NavigationRoute::Menu);
            }
        }
        debug!("logout link not usable, loading logout URL");
        self.ctx.goto("/user/logout.php").await?;
        Ok(NavigationRoute::Direct)
    }
}
