use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection, OpenFlags};
use tracing::{debug, error};

use crate::config::ConnectionSettings;
use crate::error::{AppError, AppResult};
use crate::models::{Employee, EmployeeRecord, SensitiveCell, MASK_TOKEN};

pub const SELECT_MASKED: &str = "SELECT ID, Name, Job_Titles, Department, Full_or_Part_Time, Salary_or_Hourly, \
     Typical_Hours, '****' AS Annual_Salary, '****' AS Hourly_Rate \
     FROM Current_Employee ORDER BY ID";

pub const SELECT_REVEALED: &str = "SELECT ID, Name, Job_Titles, Department, Full_or_Part_Time, Salary_or_Hourly, \
     Typical_Hours, Annual_Salary, Hourly_Rate \
     FROM Current_Employee ORDER BY ID";

pub const INSERT_EMPLOYEE: &str = "INSERT INTO Current_Employee (Name, Job_Titles, Department, Full_or_Part_Time, \
     Salary_or_Hourly, Typical_Hours, Annual_Salary, Hourly_Rate) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

pub const UPDATE_EMPLOYEE: &str = "UPDATE Current_Employee \
     SET Name = ?1, Job_Titles = ?2, Department = ?3, Full_or_Part_Time = ?4, \
         Salary_or_Hourly = ?5, Typical_Hours = ?6, Annual_Salary = ?7, Hourly_Rate = ?8 \
     WHERE ID = ?9";

pub const DELETE_EMPLOYEE: &str = "DELETE FROM Current_Employee WHERE ID = ?1";

pub const SEARCH_EMPLOYEES: &str = "SELECT ID, Name, Job_Titles, Department, Full_or_Part_Time, Salary_or_Hourly, \
     Typical_Hours, Annual_Salary, Hourly_Rate \
     FROM Current_Employee \
     WHERE fold_case(Name) LIKE ?1 OR fold_case(Job_Titles) LIKE ?1 OR fold_case(Department) LIKE ?1 \
     ORDER BY ID";

/// Knows where the store lives; hands out one connection per operation.
#[derive(Debug, Clone)]
pub struct Database {
    settings: ConnectionSettings,
}

impl Database {
    pub fn new(settings: ConnectionSettings) -> Self {
        Self { settings }
    }

    /// Create the store file and table if they do not exist yet.
    pub fn init(&self) -> AppResult<std::path::PathBuf> {
        let resolved = self.settings.resolve().inspect_err(log_connection_error)?;
        if let Some(parent) = resolved.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Connection(e.to_string()))
                .inspect_err(log_connection_error)?;
        }
        let conn = Connection::open(&resolved.path)
            .map_err(|e| AppError::Connection(e.to_string()))
            .inspect_err(log_connection_error)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS Current_Employee (
                ID INTEGER PRIMARY KEY AUTOINCREMENT,
                Name TEXT NOT NULL CHECK (length(Name) <= 50),
                Job_Titles TEXT NOT NULL CHECK (length(Job_Titles) <= 50),
                Department TEXT NOT NULL CHECK (length(Department) <= 100),
                Full_or_Part_Time TEXT NOT NULL CHECK (length(Full_or_Part_Time) <= 50),
                Salary_or_Hourly TEXT NOT NULL CHECK (length(Salary_or_Hourly) <= 50),
                Typical_Hours INTEGER NOT NULL,
                Annual_Salary REAL NOT NULL,
                Hourly_Rate REAL NOT NULL
            );
            "#,
        )
        .map_err(|e| AppError::Connection(e.to_string()))
        .inspect_err(log_connection_error)?;
        Ok(resolved.path)
    }

    /// Open a connection scoped to the caller; it closes when the `Store` drops.
    pub fn connect(&self) -> AppResult<Store> {
        let resolved = self.settings.resolve().inspect_err(log_connection_error)?;

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&resolved.path, flags)
            .map_err(|e| AppError::Connection(format!("{}: {}", resolved.path.display(), e)))
            .inspect_err(log_connection_error)?;

        register_fold_case(&conn)
            .map_err(|e| AppError::Connection(e.to_string()))
            .inspect_err(log_connection_error)?;

        let store = Store { conn };
        if !store.is_initialized().map_err(|e| AppError::Connection(e.to_string()))? {
            let err = AppError::Connection(
                "Database not initialized. Run 'roster init' first.".to_string(),
            );
            log_connection_error(&err);
            return Err(err);
        }

        debug!(user = %resolved.user, path = %resolved.path.display(), "connected");
        Ok(store)
    }
}

/// `fold_case(text)`: Unicode lower-casing. SQLite's own `LOWER` only folds ASCII.
fn register_fold_case(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "fold_case",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
}

fn log_connection_error(err: &AppError) {
    error!("Error connecting to the database: {}", err);
}

/// An open connection to the employee table.
pub struct Store {
    conn: Connection,
}

impl Store {
    fn is_initialized(&self) -> rusqlite::Result<bool> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='Current_Employee'",
            [],
            |row| row.get(0),
        )?;
        Ok(tables > 0)
    }

    /// Every row, with salary columns replaced by the mask token unless `reveal`.
    pub fn fetch_employees(&self, reveal: bool) -> rusqlite::Result<Vec<Employee>> {
        let sql = if reveal { SELECT_REVEALED } else { SELECT_MASKED };
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], Self::row_to_employee)?;
        rows.collect()
    }

    pub fn insert_employee(&self, record: &EmployeeRecord) -> rusqlite::Result<i64> {
        self.conn.execute(
            INSERT_EMPLOYEE,
            params![
                record.name,
                record.job_title,
                record.department,
                record.full_or_part_time,
                record.salary_or_hourly,
                record.typical_hours,
                record.annual_salary,
                record.hourly_rate,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Replace all eight fields of row `id`. Returns the number of rows touched.
    pub fn update_employee(&self, id: i64, record: &EmployeeRecord) -> rusqlite::Result<usize> {
        self.conn.execute(
            UPDATE_EMPLOYEE,
            params![
                record.name,
                record.job_title,
                record.department,
                record.full_or_part_time,
                record.salary_or_hourly,
                record.typical_hours,
                record.annual_salary,
                record.hourly_rate,
                id,
            ],
        )
    }

    pub fn delete_employee(&self, id: i64) -> rusqlite::Result<usize> {
        self.conn.execute(DELETE_EMPLOYEE, [id])
    }

    /// Case-insensitive substring match on name, job title and department.
    /// Always returns real salary values.
    pub fn search_employees(&self, keyword: &str) -> rusqlite::Result<Vec<Employee>> {
        let pattern = format!("%{}%", keyword.trim().to_lowercase());
        let mut stmt = self.conn.prepare(SEARCH_EMPLOYEES)?;
        let rows = stmt.query_map([pattern], Self::row_to_employee)?;
        rows.collect()
    }

    fn row_to_employee(row: &rusqlite::Row) -> rusqlite::Result<Employee> {
        Ok(Employee {
            id: row.get(0)?,
            name: row.get(1)?,
            job_title: row.get(2)?,
            department: row.get(3)?,
            full_or_part_time: row.get(4)?,
            salary_or_hourly: row.get(5)?,
            typical_hours: row.get(6)?,
            annual_salary: row.get(7)?,
            hourly_rate: row.get(8)?,
        })
    }
}

impl FromSql for SensitiveCell {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Text(t) if t == MASK_TOKEN.as_bytes() => Ok(SensitiveCell::Masked),
            ValueRef::Real(v) => Ok(SensitiveCell::Amount(v)),
            ValueRef::Integer(v) => Ok(SensitiveCell::Amount(v as f64)),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    pub(crate) fn settings_in(dir: &TempDir) -> ConnectionSettings {
        ConnectionSettings {
            server: Some(dir.path().to_string_lossy().into_owned()),
            name: Some("employees".into()),
            user: Some("app".into()),
            password: Some("app-password".into()),
        }
    }

    pub(crate) fn record(name: &str, title: &str, dept: &str) -> EmployeeRecord {
        EmployeeRecord {
            name: name.into(),
            job_title: title.into(),
            department: dept.into(),
            full_or_part_time: "F".into(),
            salary_or_hourly: "Salary".into(),
            typical_hours: 40,
            annual_salary: 85000.0,
            hourly_rate: 40.87,
        }
    }

    fn initialized() -> (TempDir, Database) {
        let dir = TempDir::new().unwrap();
        let db = Database::new(settings_in(&dir));
        db.init().unwrap();
        (dir, db)
    }

    #[test]
    fn connect_before_init_fails() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(settings_in(&dir));
        assert!(matches!(db.connect(), Err(AppError::Connection(_))));
    }

    #[test]
    fn connect_without_settings_fails() {
        let db = Database::new(ConnectionSettings::default());
        let err = db.connect().err().unwrap();
        assert!(err.to_string().contains("DB_SERVER"));
    }

    #[test]
    fn init_schema_failure_is_logged() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("employees.db"), vec![b'x'; 4096]).unwrap();
        let db = Database::new(settings_in(&dir));

        let mut result = None;
        let log = crate::logging::capture(|| result = Some(db.init()));

        assert!(matches!(result, Some(Err(AppError::Connection(_)))));
        assert!(log.contains("Error connecting to the database"));
    }

    #[test]
    fn init_is_idempotent() {
        let (_dir, db) = initialized();
        db.init().unwrap();
        assert!(db.connect().unwrap().fetch_employees(true).unwrap().is_empty());
    }

    #[test]
    fn masked_fetch_never_returns_amounts() {
        let (_dir, db) = initialized();
        let store = db.connect().unwrap();
        store.insert_employee(&record("RICHARDSON KEITH", "ENGINEER", "IT")).unwrap();
        store.insert_employee(&record("DOE JANE", "CLERK", "FINANCE")).unwrap();

        let rows = store.fetch_employees(false).unwrap();
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert!(row.annual_salary.is_masked());
            assert!(row.hourly_rate.is_masked());
        }

        let rows = store.fetch_employees(true).unwrap();
        assert_eq!(rows[0].annual_salary, SensitiveCell::Amount(85000.0));
        assert_eq!(rows[0].hourly_rate, SensitiveCell::Amount(40.87));
    }

    #[test]
    fn insert_assigns_increasing_ids() {
        let (_dir, db) = initialized();
        let store = db.connect().unwrap();
        let a = store.insert_employee(&record("A B", "X", "Y")).unwrap();
        let b = store.insert_employee(&record("C D", "X", "Y")).unwrap();
        assert!(b > a);
    }

    #[test]
    fn oversized_name_is_rejected_by_store() {
        let (_dir, db) = initialized();
        let store = db.connect().unwrap();
        let long = "X".repeat(51);
        assert!(store.insert_employee(&record(&long, "X", "Y")).is_err());
    }

    #[test]
    fn update_replaces_whole_row() {
        let (_dir, db) = initialized();
        let store = db.connect().unwrap();
        let id = store.insert_employee(&record("A B", "X", "Y")).unwrap();

        let mut changed = record("b a", "lead", "ops");
        changed.typical_hours = 20;
        assert_eq!(store.update_employee(id, &changed).unwrap(), 1);

        let row = &store.fetch_employees(true).unwrap()[0];
        assert_eq!(row.name, "b a");
        assert_eq!(row.job_title, "lead");
        assert_eq!(row.typical_hours, 20);
    }

    #[test]
    fn delete_removes_only_target_row() {
        let (_dir, db) = initialized();
        let store = db.connect().unwrap();
        let keep = store.insert_employee(&record("A B", "X", "Y")).unwrap();
        let gone = store.insert_employee(&record("C D", "X", "Y")).unwrap();

        assert_eq!(store.delete_employee(gone).unwrap(), 1);
        let rows = store.fetch_employees(true).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, keep);

        assert_eq!(store.delete_employee(gone).unwrap(), 0);
    }

    #[test]
    fn search_matches_name_title_department() {
        let (_dir, db) = initialized();
        let store = db.connect().unwrap();
        store.insert_employee(&record("ENGLE MARY", "CLERK", "FINANCE")).unwrap();
        store.insert_employee(&record("DOE JOHN", "ENGINEER", "IT")).unwrap();
        store.insert_employee(&record("ROE ANN", "ANALYST", "ENGAGEMENT")).unwrap();
        store.insert_employee(&record("POE AL", "CLERK", "SALES")).unwrap();

        assert_eq!(store.search_employees("eng").unwrap().len(), 3);
        assert_eq!(store.search_employees("  ENG ").unwrap().len(), 3);
        assert_eq!(store.search_employees("").unwrap().len(), 4);

        let hits = store.search_employees("sales").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].annual_salary, SensitiveCell::Amount(85000.0));
    }

    #[test]
    fn search_folds_accented_text() {
        let (_dir, db) = initialized();
        let store = db.connect().unwrap();
        store.insert_employee(&record("ZOË ÉMILE", "INGÉNIEUR", "R&D")).unwrap();
        store.insert_employee(&record("DOE JOHN", "CLERK", "SALES")).unwrap();

        for keyword in ["émile", "ÉMILE", "zoë", "Zoë", "ingénieur", "INGÉNIEUR", "mile"] {
            let hits = store.search_employees(keyword).unwrap();
            assert_eq!(hits.len(), 1, "keyword {keyword:?}");
            assert_eq!(hits[0].name, "ZOË ÉMILE");
        }
    }
}
