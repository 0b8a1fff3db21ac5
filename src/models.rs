use serde::{Serialize, Serializer};
use std::fmt;

/// Placeholder the masked query substitutes for salary columns.
pub const MASK_TOKEN: &str = "****";

/// A salary-related column: either the real amount or the masking token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensitiveCell {
    Masked,
    Amount(f64),
}

impl SensitiveCell {
    pub fn is_masked(&self) -> bool {
        matches!(self, SensitiveCell::Masked)
    }

    pub fn amount(&self) -> Option<f64> {
        match self {
            SensitiveCell::Masked => None,
            SensitiveCell::Amount(v) => Some(*v),
        }
    }
}

impl fmt::Display for SensitiveCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensitiveCell::Masked => f.write_str(MASK_TOKEN),
            SensitiveCell::Amount(v) => write!(f, "{}", v),
        }
    }
}

impl Serialize for SensitiveCell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SensitiveCell::Masked => serializer.serialize_str(MASK_TOKEN),
            SensitiveCell::Amount(v) => serializer.serialize_f64(*v),
        }
    }
}

/// One row of `Current_Employee` as the grid shows it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Employee {
    pub id: i64,
    pub name: String, // "LAST FIRST"
    pub job_title: String,
    pub department: String,
    pub full_or_part_time: String,
    pub salary_or_hourly: String,
    pub typical_hours: i64,
    pub annual_salary: SensitiveCell,
    pub hourly_rate: SensitiveCell,
}

impl Employee {
    /// Display values in grid column order.
    pub fn cells(&self) -> [String; 9] {
        [
            self.id.to_string(),
            self.name.clone(),
            self.job_title.clone(),
            self.department.clone(),
            self.full_or_part_time.clone(),
            self.salary_or_hourly.clone(),
            self.typical_hours.to_string(),
            self.annual_salary.to_string(),
            self.hourly_rate.to_string(),
        ]
    }
}

pub const COLUMN_HEADINGS: [&str; 9] = [
    "ID",
    "Name",
    "Job Titles",
    "Department",
    "Full/Part-Time",
    "Salary/Hourly",
    "Typical Hours",
    "Annual Salary",
    "Hourly Rate",
];

/// Raw text of the eight editable fields, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmployeeForm {
    pub name: String,
    pub job_title: String,
    pub department: String,
    pub full_or_part_time: String,
    pub salary_or_hourly: String,
    pub typical_hours: String,
    pub annual_salary: String,
    pub hourly_rate: String,
}

pub const FORM_LABELS: [&str; 8] = [
    "Name",
    "Job Title",
    "Department",
    "Full/Part-Time",
    "Salary/Hourly",
    "Typical Hours",
    "Annual Salary",
    "Hourly Rate",
];

impl EmployeeForm {
    /// Copy a grid row into the form verbatim, masking token included.
    pub fn from_row(row: &Employee) -> Self {
        let [_, name, job_title, department, full_or_part_time, salary_or_hourly, typical_hours, annual_salary, hourly_rate] =
            row.cells();
        Self {
            name,
            job_title,
            department,
            full_or_part_time,
            salary_or_hourly,
            typical_hours,
            annual_salary,
            hourly_rate,
        }
    }

    pub fn fields(&self) -> [&str; 8] {
        [
            &self.name,
            &self.job_title,
            &self.department,
            &self.full_or_part_time,
            &self.salary_or_hourly,
            &self.typical_hours,
            &self.annual_salary,
            &self.hourly_rate,
        ]
    }

    pub fn field_mut(&mut self, index: usize) -> Option<&mut String> {
        match index {
            0 => Some(&mut self.name),
            1 => Some(&mut self.job_title),
            2 => Some(&mut self.department),
            3 => Some(&mut self.full_or_part_time),
            4 => Some(&mut self.salary_or_hourly),
            5 => Some(&mut self.typical_hours),
            6 => Some(&mut self.annual_salary),
            7 => Some(&mut self.hourly_rate),
            _ => None,
        }
    }
}

/// Field values ready to be bound to an INSERT or UPDATE.
#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeRecord {
    pub name: String,
    pub job_title: String,
    pub department: String,
    pub full_or_part_time: String,
    pub salary_or_hourly: String,
    pub typical_hours: i64,
    pub annual_salary: f64,
    pub hourly_rate: f64,
}
