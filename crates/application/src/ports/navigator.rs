//! Navigation port

/// Sends the user to the login entry point.
pub trait LoginNavigator: Send + Sync {
    /// Redirects to `login_path`.
    fn redirect_to_login(&self, login_path: &str);
}
