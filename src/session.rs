use crate::model::Username;
use crate::Result;
use anyhow::Context;
use tracing::info;

/// Who is signed in. There are no credentials here; signing in only records the username that the
/// service calls are made for.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Session {
    username: Option<Username>,
}

impl Session {
    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn sign_in(&mut self, username: Username) {
        info!("Signed in as {username}");
        self.username = Some(username);
    }

    pub fn sign_out(&mut self) {
        if let Some(username) = self.username.take() {
            info!("Signed out {username}");
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }

    pub fn username(&self) -> Option<&Username> {
        self.username.as_ref()
    }

    /// The signed-in username, or an error when nobody is signed in.
    pub fn require(&self) -> Result<&Username> {
        self.username().context("You need to sign in first")
    }
}

#[test]
fn sign_in_and_out() {
    let mut session = Session::signed_out();
    assert!(!session.is_authenticated());
    assert!(session.require().is_err());

    session.sign_in(Username::new("user_good").unwrap());
    assert!(session.is_authenticated());
    assert_eq!(session.require().unwrap().as_str(), "user_good");

    session.sign_out();
    assert_eq!(session.username(), None);
}
