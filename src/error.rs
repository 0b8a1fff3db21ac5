use thiserror::Error;

/// Every failure an operation can report back to the user.
///
/// None of these abort the process except a `Connection` failure while the
/// application is starting up; that decision is made by the caller.
#[derive(Debug, Error)]
pub enum AppError {
    /// Store unreachable or misconfigured
    #[error("Error connecting to the database:\n{0}")]
    Connection(String),

    /// Mutation attempted while sensitive data is masked
    #[error("{0}")]
    Operation(String),

    /// Missing, oversized or malformed field
    #[error("{0}")]
    Input(String),

    /// A numeric field failed to parse
    #[error("Please enter a valid {expected} value for {field}.")]
    DataType {
        field: &'static str,
        expected: &'static str,
    },

    /// No row selected for an operation that needs one
    #[error("Please select a record to {0}.")]
    Selection(&'static str),

    /// Credential pair did not match
    #[error("Invalid username or password.")]
    Login,

    #[error("Error fetching data:\n{0}")]
    Fetch(String),

    #[error("Error adding record:\n{0}")]
    Insert(String),

    #[error("Error updating record:\n{0}")]
    Update(String),

    #[error("Error deleting record:\n{0}")]
    Delete(String),

    #[error("Error searching records:\n{0}")]
    Search(String),
}

impl AppError {
    /// Dialog title shown above the message.
    pub fn title(&self) -> &'static str {
        match self {
            AppError::Connection(_) => "Connection Error",
            AppError::Operation(_) => "Operation Error",
            AppError::Input(_) => "Input Error",
            AppError::DataType { .. } => "Data Type Error",
            AppError::Selection(_) => "Selection Error",
            AppError::Login => "Login Failed",
            AppError::Fetch(_) => "Fetch Error",
            AppError::Insert(_) => "Insert Error",
            AppError::Update(_) => "Update Error",
            AppError::Delete(_) => "Delete Error",
            AppError::Search(_) => "Search Error",
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        AppError::Input(message.into())
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
