//! Typed user intents and the state transitions they cause.
//!
//! Nothing here knows about the terminal: a front end builds a `Command`,
//! hands it to `App::execute` together with its `Session`, and renders the
//! returned `Outcome`.

use std::any::type_name_of_val;

use tracing::error;

use crate::auth::Gate;
use crate::db::{Database, DELETE_EMPLOYEE, INSERT_EMPLOYEE, UPDATE_EMPLOYEE};
use crate::error::{AppError, AppResult};
use crate::models::{Employee, EmployeeForm, EmployeeRecord};
use crate::records;
use crate::session::Session;

#[derive(Debug, Clone)]
pub enum Command {
    /// Startup login. Admits the user; the grid stays masked.
    Login { username: String, password: String },
    /// Show real salary values. Credentials are only checked while masked.
    Reveal { username: String, password: String },
    /// Hide salary values again. Never needs a credential.
    Mask,
    /// Default masked fetch.
    Refresh,
    Add(EmployeeForm),
    Update {
        selected: Option<i64>,
        form: EmployeeForm,
    },
    Delete {
        selected: Option<i64>,
        confirmed: bool,
    },
    Search(String),
    ClearSearch,
}

/// What the front end should show after a command.
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    /// Fresh grid contents, or `None` when the grid is unchanged.
    pub rows: Option<Vec<Employee>>,
    pub message: Option<String>,
}

impl Outcome {
    fn rows(rows: Vec<Employee>) -> Self {
        Self {
            rows: Some(rows),
            message: None,
        }
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

pub struct App {
    db: Database,
    gate: Gate,
}

impl App {
    pub fn new(db: Database, gate: Gate) -> Self {
        Self { db, gate }
    }

    pub fn execute(&self, session: &mut Session, command: Command) -> AppResult<Outcome> {
        match command {
            Command::Login { username, password } => {
                if !self.gate.verify(&username, &password) {
                    return Err(AppError::Login);
                }
                self.fetch(session, false).map(Outcome::rows)
            }
            Command::Reveal { username, password } => {
                if !session.is_revealed() && !self.gate.verify(&username, &password) {
                    return Err(AppError::Login);
                }
                self.fetch(session, true).map(Outcome::rows)
            }
            Command::Mask | Command::Refresh | Command::ClearSearch => {
                self.fetch(session, false).map(Outcome::rows)
            }
            Command::Add(form) => self.add(session, &form),
            Command::Update { selected, form } => self.update(session, selected, &form),
            Command::Delete {
                selected,
                confirmed,
            } => self.delete(session, selected, confirmed),
            Command::Search(keyword) => self.search(&keyword).map(Outcome::rows),
        }
    }

    /// Load the whole table and record the masking mode it was loaded in.
    pub fn fetch(&self, session: &mut Session, reveal: bool) -> AppResult<Vec<Employee>> {
        let store = self.db.connect()?;
        let rows = store
            .fetch_employees(reveal)
            .map_err(|e| AppError::Fetch(e.to_string()))?;
        session.set_revealed(reveal);
        Ok(rows)
    }

    fn add(&self, session: &mut Session, form: &EmployeeForm) -> AppResult<Outcome> {
        if !session.is_revealed() {
            return Err(AppError::Operation(
                "Cannot add a record while sensitive data is masked. Please reveal sensitive data first."
                    .to_string(),
            ));
        }
        let record = records::prepare_insert(form)?;

        {
            let store = self.db.connect()?;
            store.insert_employee(&record).map_err(|e| {
                error!(
                    "Error adding record: {}, Query: {}, Parameters: {:?}",
                    e, INSERT_EMPLOYEE, record
                );
                AppError::Insert(e.to_string())
            })?;
        }

        let rows = self.fetch(session, false)?;
        Ok(Outcome::rows(rows).with_message("Record added successfully!"))
    }

    fn update(
        &self,
        session: &mut Session,
        selected: Option<i64>,
        form: &EmployeeForm,
    ) -> AppResult<Outcome> {
        if !session.is_revealed() {
            return Err(AppError::Operation(
                "Cannot update a record while sensitive data is masked. Please reveal sensitive data first."
                    .to_string(),
            ));
        }
        let id = selected.ok_or(AppError::Selection("update"))?;
        let record = records::prepare_update(form)?;

        let affected = {
            let store = self.db.connect()?;
            store.update_employee(id, &record).map_err(|e| {
                error!(
                    "Error updating record: {}, Query: {}, Parameters: {:?}, ID: {}, Parameter Types: {:?}",
                    e,
                    UPDATE_EMPLOYEE,
                    record,
                    id,
                    parameter_types(&record, id)
                );
                AppError::Update(e.to_string())
            })?
        };

        let rows = self.fetch(session, true)?;
        let message = if affected == 0 {
            format!("No record with ID {} was found.", id)
        } else {
            "Record updated successfully!".to_string()
        };
        Ok(Outcome::rows(rows).with_message(message))
    }

    fn delete(
        &self,
        session: &mut Session,
        selected: Option<i64>,
        confirmed: bool,
    ) -> AppResult<Outcome> {
        let id = selected.ok_or(AppError::Selection("delete"))?;
        if !confirmed {
            return Ok(Outcome::default());
        }

        let affected = {
            let store = self.db.connect()?;
            store.delete_employee(id).map_err(|e| {
                error!(
                    "Error deleting record: {}, Query: {}, Parameters: ({},)",
                    e, DELETE_EMPLOYEE, id
                );
                AppError::Delete(e.to_string())
            })?
        };

        let rows = self.fetch(session, false)?;
        let message = if affected == 0 {
            format!("No record with ID {} was found.", id)
        } else {
            "Record deleted successfully!".to_string()
        };
        Ok(Outcome::rows(rows).with_message(message))
    }

    /// Search ignores the masking mode and leaves the session untouched.
    fn search(&self, keyword: &str) -> AppResult<Vec<Employee>> {
        let store = self.db.connect()?;
        store
            .search_employees(keyword)
            .map_err(|e| AppError::Search(e.to_string()))
    }
}

fn parameter_types(record: &EmployeeRecord, id: i64) -> [&'static str; 9] {
    [
        type_name_of_val(&record.name),
        type_name_of_val(&record.job_title),
        type_name_of_val(&record.department),
        type_name_of_val(&record.full_or_part_time),
        type_name_of_val(&record.salary_or_hourly),
        type_name_of_val(&record.typical_hours),
        type_name_of_val(&record.annual_salary),
        type_name_of_val(&record.hourly_rate),
        type_name_of_val(&id),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::settings_in;
    use crate::models::SensitiveCell;
    use crate::records::tests::form;
    use tempfile::TempDir;

    const USER: &str = "hr";
    const PASS: &str = "s3cret";

    fn app() -> (TempDir, App) {
        let dir = TempDir::new().unwrap();
        let db = Database::new(settings_in(&dir));
        db.init().unwrap();
        let gate = Gate::new(Some(USER.into()), Some(PASS.into()));
        (dir, App::new(db, gate))
    }

    fn reveal() -> Command {
        Command::Reveal {
            username: USER.into(),
            password: PASS.into(),
        }
    }

    fn revealed_session(app: &App) -> Session {
        let mut session = Session::new();
        app.execute(&mut session, reveal()).unwrap();
        assert!(session.is_revealed());
        session
    }

    fn only_row(outcome: &Outcome) -> &Employee {
        let rows = outcome.rows.as_ref().unwrap();
        assert_eq!(rows.len(), 1);
        &rows[0]
    }

    #[test]
    fn login_keeps_grid_masked() {
        let (_dir, app) = app();
        let mut session = Session::new();

        let err = app
            .execute(
                &mut session,
                Command::Login {
                    username: USER.into(),
                    password: "nope".into(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, AppError::Login));

        let outcome = app
            .execute(
                &mut session,
                Command::Login {
                    username: USER.into(),
                    password: PASS.into(),
                },
            )
            .unwrap();
        assert!(outcome.rows.is_some());
        assert!(!session.is_revealed());
    }

    #[test]
    fn reveal_requires_credentials_only_while_masked() {
        let (_dir, app) = app();
        let mut session = Session::new();

        let bad = Command::Reveal {
            username: USER.into(),
            password: "wrong".into(),
        };
        assert!(matches!(app.execute(&mut session, bad.clone()), Err(AppError::Login)));
        assert!(!session.is_revealed());

        app.execute(&mut session, reveal()).unwrap();
        assert!(session.is_revealed());

        // already revealed: no credential check, still refetches
        let outcome = app.execute(&mut session, bad).unwrap();
        assert!(outcome.rows.is_some());
        assert!(session.is_revealed());
    }

    #[test]
    fn masking_needs_no_credentials() {
        let (_dir, app) = app();
        let mut session = revealed_session(&app);
        app.execute(&mut session, Command::Mask).unwrap();
        assert!(!session.is_revealed());
    }

    #[test]
    fn mutations_blocked_while_masked() {
        let (_dir, app) = app();
        let mut session = Session::new();

        let err = app
            .execute(&mut session, Command::Add(form("Keith Richardson")))
            .unwrap_err();
        assert!(matches!(err, AppError::Operation(_)));

        let err = app
            .execute(
                &mut session,
                Command::Update {
                    selected: Some(1),
                    form: form("Keith Richardson"),
                },
            )
            .unwrap_err();
        assert!(matches!(err, AppError::Operation(_)));

        let mut revealed = revealed_session(&app);
        let rows = app.fetch(&mut revealed, true).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn add_persists_transformed_row_and_remasks() {
        let (_dir, app) = app();
        let mut session = revealed_session(&app);

        let outcome = app
            .execute(&mut session, Command::Add(form("Keith Richardson")))
            .unwrap();
        assert_eq!(outcome.message.as_deref(), Some("Record added successfully!"));
        assert!(!session.is_revealed());

        let row = only_row(&outcome);
        assert_eq!(row.name, "RICHARDSON KEITH");
        assert_eq!(row.job_title, "SOFTWARE ENGINEER");
        assert_eq!(row.department, "INFORMATION TECHNOLOGY");
        assert_eq!(row.full_or_part_time, "F");
        assert_eq!(row.salary_or_hourly, "Salary");
        assert!(row.annual_salary.is_masked());
        assert!(row.hourly_rate.is_masked());
    }

    #[test]
    fn add_and_update_case_asymmetry() {
        let (_dir, app) = app();
        let mut session = revealed_session(&app);

        let outcome = app
            .execute(&mut session, Command::Add(form("keith richardson")))
            .unwrap();
        let id = only_row(&outcome).id;

        app.execute(&mut session, reveal()).unwrap();
        let outcome = app
            .execute(
                &mut session,
                Command::Update {
                    selected: Some(id),
                    form: form("keith richardson"),
                },
            )
            .unwrap();
        let row = only_row(&outcome);
        assert_eq!(row.name, "keith richardson");
        assert_eq!(row.job_title, "Software Engineer");
        assert_eq!(row.department, "Information Technology");
        assert_eq!(row.full_or_part_time, "f");
    }

    #[test]
    fn update_refreshes_revealed() {
        let (_dir, app) = app();
        let mut session = revealed_session(&app);
        let id = only_row(
            &app.execute(&mut session, Command::Add(form("Keith Richardson")))
                .unwrap(),
        )
        .id;

        app.execute(&mut session, reveal()).unwrap();
        let mut edited = form("RICHARDSON KEITH");
        edited.annual_salary = "90000".into();
        let outcome = app
            .execute(
                &mut session,
                Command::Update {
                    selected: Some(id),
                    form: edited,
                },
            )
            .unwrap();

        assert!(session.is_revealed());
        assert_eq!(only_row(&outcome).annual_salary, SensitiveCell::Amount(90000.0));
        assert_eq!(outcome.message.as_deref(), Some("Record updated successfully!"));
    }

    #[test]
    fn bound_row_updates_without_drift() {
        let (_dir, app) = app();
        let mut session = revealed_session(&app);
        let mut entered = form("Keith Richardson");
        entered.annual_salary = "85000.005".into();
        entered.hourly_rate = "40.875".into();
        app.execute(&mut session, Command::Add(entered)).unwrap();

        let before = only_row(&app.execute(&mut session, reveal()).unwrap()).clone();
        let outcome = app
            .execute(
                &mut session,
                Command::Update {
                    selected: Some(before.id),
                    form: EmployeeForm::from_row(&before),
                },
            )
            .unwrap();

        let after = only_row(&outcome);
        assert_eq!(after.annual_salary, SensitiveCell::Amount(85000.005));
        assert_eq!(after.hourly_rate, SensitiveCell::Amount(40.875));
        assert_eq!(after, &before);
    }

    #[test]
    fn insert_failure_logs_statement_and_parameters() {
        let (_dir, app) = app();
        let mut session = revealed_session(&app);
        // "ß" upper-cases to "SS", so the stored name outgrows its column
        let name = format!("a {}", "ß".repeat(25));

        let mut result = None;
        let log = crate::logging::capture(|| {
            result = Some(app.execute(&mut session, Command::Add(form(&name))));
        });

        assert!(matches!(result, Some(Err(AppError::Insert(_)))));
        assert!(log.contains("Error adding record"));
        assert!(log.contains(INSERT_EMPLOYEE));
        assert!(log.contains(&format!("{} A", "SS".repeat(25))));
        assert!(log.contains("SOFTWARE ENGINEER"));
    }

    #[test]
    fn update_failure_logs_parameter_types() {
        let (dir, app) = app();
        let mut session = revealed_session(&app);
        let id = only_row(
            &app.execute(&mut session, Command::Add(form("Keith Richardson")))
                .unwrap(),
        )
        .id;

        let conn = rusqlite::Connection::open(dir.path().join("employees.db")).unwrap();
        conn.execute_batch(
            "CREATE TRIGGER freeze BEFORE UPDATE ON Current_Employee \
             BEGIN SELECT RAISE(ABORT, 'frozen'); END;",
        )
        .unwrap();
        drop(conn);

        app.execute(&mut session, reveal()).unwrap();
        let mut result = None;
        let log = crate::logging::capture(|| {
            result = Some(app.execute(
                &mut session,
                Command::Update {
                    selected: Some(id),
                    form: form("Keith Richardson"),
                },
            ));
        });

        assert!(matches!(result, Some(Err(AppError::Update(_)))));
        assert!(log.contains("Error updating record"));
        assert!(log.contains(UPDATE_EMPLOYEE));
        assert!(log.contains("Software Engineer"));
        assert!(log.contains("Parameter Types"));
        assert!(log.contains("alloc::string::String"));
        assert!(log.contains("f64"));
        assert!(log.contains("i64"));
    }

    #[test]
    fn update_without_selection_is_selection_error() {
        let (_dir, app) = app();
        let mut session = revealed_session(&app);
        let err = app
            .execute(
                &mut session,
                Command::Update {
                    selected: None,
                    form: form("Keith Richardson"),
                },
            )
            .unwrap_err();
        assert!(matches!(err, AppError::Selection("update")));
    }

    #[test]
    fn delete_needs_selection_and_confirmation() {
        let (_dir, app) = app();
        let mut session = revealed_session(&app);
        let keep = only_row(
            &app.execute(&mut session, Command::Add(form("Keith Richardson")))
                .unwrap(),
        )
        .id;
        app.execute(&mut session, reveal()).unwrap();
        let outcome = app
            .execute(&mut session, Command::Add(form("Jane Doe")))
            .unwrap();
        let gone = outcome.rows.unwrap().iter().find(|r| r.id != keep).unwrap().id;

        let err = app
            .execute(
                &mut session,
                Command::Delete {
                    selected: None,
                    confirmed: true,
                },
            )
            .unwrap_err();
        assert!(matches!(err, AppError::Selection("delete")));

        let cancelled = app
            .execute(
                &mut session,
                Command::Delete {
                    selected: Some(gone),
                    confirmed: false,
                },
            )
            .unwrap();
        assert!(cancelled.rows.is_none());

        // permitted while masked
        assert!(!session.is_revealed());
        let outcome = app
            .execute(
                &mut session,
                Command::Delete {
                    selected: Some(gone),
                    confirmed: true,
                },
            )
            .unwrap();
        assert_eq!(only_row(&outcome).id, keep);
        assert!(!session.is_revealed());
    }

    #[test]
    fn deleting_missing_row_is_handled() {
        let (_dir, app) = app();
        let mut session = Session::new();
        let outcome = app
            .execute(
                &mut session,
                Command::Delete {
                    selected: Some(999),
                    confirmed: true,
                },
            )
            .unwrap();
        assert_eq!(outcome.message.as_deref(), Some("No record with ID 999 was found."));
        assert!(outcome.rows.unwrap().is_empty());
    }

    #[test]
    fn search_bypasses_masking() {
        let (_dir, app) = app();
        let mut session = revealed_session(&app);
        app.execute(&mut session, Command::Add(form("Keith Richardson")))
            .unwrap();
        assert!(!session.is_revealed());

        let outcome = app
            .execute(&mut session, Command::Search("eng".into()))
            .unwrap();
        assert_eq!(only_row(&outcome).annual_salary, SensitiveCell::Amount(85000.0));
        assert!(!session.is_revealed());

        let outcome = app
            .execute(&mut session, Command::Search(String::new()))
            .unwrap();
        assert_eq!(outcome.rows.unwrap().len(), 1);

        let outcome = app.execute(&mut session, Command::ClearSearch).unwrap();
        assert!(only_row(&outcome).annual_salary.is_masked());
    }

    #[test]
    fn missing_store_config_is_connection_error() {
        let app = App::new(
            Database::new(Default::default()),
            Gate::new(Some(USER.into()), Some(PASS.into())),
        );
        let mut session = Session::new();
        let err = app.execute(&mut session, Command::Refresh).unwrap_err();
        assert_eq!(err.title(), "Connection Error");
    }
}
