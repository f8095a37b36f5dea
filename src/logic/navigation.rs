//! Page router
//!
//! ```text
//!   login ──GoToSignup──▶ signup
//!   login ◀─BackToLogin── signup
//!   login ◀─SignupSucceeded─ signup
//!   login ──LoginSucceeded─▶ home ──GoToDashboard──▶ dashboard
//!                            home ◀──BackToHome───── dashboard
//!   login ◀────────────────Logout─────────────────── dashboard
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    #[default]
    Login,
    Signup,
    Home,
    Dashboard,
}

impl Page {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Signup => "signup",
            Self::Home => "home",
            Self::Dashboard => "dashboard",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user action that may move the session to another page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    GoToSignup,
    BackToLogin,
    GoToDashboard,
    BackToHome,
    LoginSucceeded,
    SignupSucceeded,
    Logout,
}

impl Action {
    /// Actions a client may request directly; the rest are outcomes of auth
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            Self::GoToSignup | Self::BackToLogin | Self::GoToDashboard | Self::BackToHome
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {action:?} from the {from} page")]
pub struct InvalidTransition {
    pub from: Page,
    pub action: Action,
}

pub fn transition(from: Page, action: Action) -> Result<Page, InvalidTransition> {
    use Action::*;
    use Page::*;

    match (from, action) {
        (Login, LoginSucceeded) => Ok(Home),
        (Login, GoToSignup) => Ok(Signup),
        (Signup, SignupSucceeded) | (Signup, BackToLogin) => Ok(Login),
        (Home, GoToDashboard) => Ok(Dashboard),
        (Dashboard, BackToHome) => Ok(Home),
        (Dashboard, Logout) => Ok(Login),
        _ => Err(InvalidTransition { from, action }),
    }
}

/// Fail unless the session is on `expected`
pub fn require_page(current: Page, expected: Page) -> Result<(), InvalidPage> {
    if current == expected {
        Ok(())
    } else {
        Err(InvalidPage { current, expected })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("this action is only available on the {expected} page (current page: {current})")]
pub struct InvalidPage {
    pub current: Page,
    pub expected: Page,
}
