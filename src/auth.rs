use tracing::error;

/// The single shared credential pair that unlocks the application and its
/// salary columns.
///
/// Plain equality against values taken from the environment: no per-user
/// identity, no hashing, no lockout. It needs a real identity provider before
/// it guards anything that matters.
#[derive(Debug, Clone, Default)]
pub struct Gate {
    user: Option<String>,
    password: Option<String>,
}

impl Gate {
    pub fn new(user: Option<String>, password: Option<String>) -> Self {
        Self { user, password }
    }

    /// Check a submitted pair. Failures are logged with the username only.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        let (Some(user), Some(pass)) = (self.user.as_deref(), self.password.as_deref()) else {
            error!("Error loading environment variables: SEN_USER/SEN_PASSWORD not set");
            error!("Incorrect login attempt with username: {}", username);
            return false;
        };

        if username == user && password == pass {
            true
        } else {
            error!("Incorrect login attempt with username: {}", username);
            false
        }
    }
}
