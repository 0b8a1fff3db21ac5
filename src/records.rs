//! Validation and transformation for the Add and Update forms.
//!
//! Both paths share the same field checks. Only Add reshapes the text: the
//! name is flipped to "LAST FIRST" and the category fields are upper-cased.
//! Update writes text fields exactly as entered.

use crate::error::{AppError, AppResult};
use crate::models::{EmployeeForm, EmployeeRecord};

const MAX_NAME: usize = 50;
const MAX_JOB_TITLE: usize = 50;
const MAX_DEPARTMENT: usize = 100;
const MAX_FULL_OR_PART_TIME: usize = 50;
const MAX_SALARY_OR_HOURLY: usize = 50;

/// Numeric fields parsed out of a form.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Numbers {
    typical_hours: i64,
    annual_salary: f64,
    hourly_rate: f64,
}

fn validate_common(form: &EmployeeForm) -> AppResult<Numbers> {
    if form.fields().iter().any(|f| f.is_empty()) {
        return Err(AppError::input("All fields must be filled out."));
    }

    let too_long = [
        (&form.name, MAX_NAME),
        (&form.job_title, MAX_JOB_TITLE),
        (&form.department, MAX_DEPARTMENT),
        (&form.full_or_part_time, MAX_FULL_OR_PART_TIME),
        (&form.salary_or_hourly, MAX_SALARY_OR_HOURLY),
    ]
    .iter()
    .any(|(value, max)| value.chars().count() > *max);
    if too_long {
        return Err(AppError::input(
            "One or more fields exceed the maximum length.",
        ));
    }

    let hours = form.typical_hours.trim();
    let annual = form.annual_salary.trim();
    let hourly = form.hourly_rate.trim();

    for (value, label) in [(hours, "Hours"), (annual, "Annual Salary"), (hourly, "Hourly Rate")] {
        if value.is_empty() {
            return Err(AppError::input(format!("{} cannot be empty.", label)));
        }
    }

    let typical_hours = hours.parse::<i64>().map_err(|_| AppError::DataType {
        field: "Hours",
        expected: "integer",
    })?;
    let annual_salary = parse_decimal(annual, "Annual Salary")?;
    let hourly_rate = parse_decimal(hourly, "Hourly Rate")?;

    Ok(Numbers {
        typical_hours,
        annual_salary,
        hourly_rate,
    })
}

fn parse_decimal(value: &str, field: &'static str) -> AppResult<f64> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(AppError::DataType {
            field,
            expected: "numeric",
        }),
    }
}

/// `"Keith Richardson"` -> `"RICHARDSON KEITH"`.
pub fn reverse_name(name: &str) -> AppResult<String> {
    let parts: Vec<&str> = name.split_whitespace().collect();
    if parts.len() < 2 {
        return Err(AppError::input(
            "Please enter both first name and last name.",
        ));
    }
    let reversed: Vec<&str> = parts.into_iter().rev().collect();
    Ok(reversed.join(" ").to_uppercase())
}

/// Validate a form for insertion and apply the Add transforms.
pub fn prepare_insert(form: &EmployeeForm) -> AppResult<EmployeeRecord> {
    let numbers = validate_common(form)?;
    let name = reverse_name(&form.name)?;

    Ok(EmployeeRecord {
        name,
        job_title: form.job_title.trim().to_uppercase(),
        department: form.department.trim().to_uppercase(),
        full_or_part_time: form.full_or_part_time.trim().to_uppercase(),
        salary_or_hourly: form.salary_or_hourly.clone(),
        typical_hours: numbers.typical_hours,
        annual_salary: numbers.annual_salary,
        hourly_rate: numbers.hourly_rate,
    })
}

/// Validate a form for update. Text fields pass through untouched.
pub fn prepare_update(form: &EmployeeForm) -> AppResult<EmployeeRecord> {
    let numbers = validate_common(form)?;

    Ok(EmployeeRecord {
        name: form.name.clone(),
        job_title: form.job_title.clone(),
        department: form.department.clone(),
        full_or_part_time: form.full_or_part_time.clone(),
        salary_or_hourly: form.salary_or_hourly.clone(),
        typical_hours: numbers.typical_hours,
        annual_salary: numbers.annual_salary,
        hourly_rate: numbers.hourly_rate,
    })
}
