mod auth;
mod commands;
mod config;
mod db;
mod error;
mod logging;
mod models;
mod records;
mod session;
mod tui;

use anyhow::{anyhow, Result};
use auth::Gate;
use clap::{Args, Parser, Subcommand};
use commands::{App, Command, Outcome};
use config::Config;
use db::Database;
use error::AppError;
use models::{Employee, EmployeeForm};
use session::Session;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "roster")]
#[command(about = "Employee records with login-gated salary masking")]
struct Cli {
    /// Append-only error log (default: error_log.txt)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the employee table
    Init,

    /// Interactive form and grid (default)
    Browse,

    /// List every employee
    List {
        #[command(flatten)]
        login: Login,

        /// Show real salary values (re-checks the credentials)
        #[arg(long)]
        reveal: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Search name, job title and department
    Search {
        #[command(flatten)]
        login: Login,

        /// Case-insensitive keyword; empty matches everything
        #[arg(default_value = "")]
        keyword: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Add an employee
    Add {
        #[command(flatten)]
        login: Login,

        #[command(flatten)]
        fields: FormArgs,
    },

    /// Replace every field of an employee
    Update {
        #[command(flatten)]
        login: Login,

        /// Employee ID
        id: i64,

        #[command(flatten)]
        fields: FormArgs,
    },

    /// Delete an employee
    Delete {
        #[command(flatten)]
        login: Login,

        /// Employee ID
        id: i64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Args)]
struct Login {
    /// Login username
    #[arg(short, long)]
    username: String,

    /// Login password
    #[arg(short, long)]
    password: String,
}

#[derive(Args)]
struct FormArgs {
    /// "First Last"
    #[arg(long)]
    name: String,

    #[arg(long)]
    job_title: String,

    #[arg(long)]
    department: String,

    /// Full or part time
    #[arg(long)]
    full_or_part_time: String,

    /// Salary or hourly
    #[arg(long)]
    salary_or_hourly: String,

    #[arg(long)]
    typical_hours: String,

    #[arg(long)]
    annual_salary: String,

    #[arg(long)]
    hourly_rate: String,
}

impl From<FormArgs> for EmployeeForm {
    fn from(args: FormArgs) -> Self {
        Self {
            name: args.name,
            job_title: args.job_title,
            department: args.department,
            full_or_part_time: args.full_or_part_time,
            salary_or_hourly: args.salary_or_hourly,
            typical_hours: args.typical_hours,
            annual_salary: args.annual_salary,
            hourly_rate: args.hourly_rate,
        }
    }
}

fn report(err: AppError) -> anyhow::Error {
    anyhow!("{}: {}", err.title(), err)
}

/// Startup gate for scripted commands; optionally unmask afterwards.
fn sign_in(app: &App, session: &mut Session, login: &Login, reveal: bool) -> Result<Outcome> {
    let mut outcome = app
        .execute(
            session,
            Command::Login {
                username: login.username.clone(),
                password: login.password.clone(),
            },
        )
        .map_err(report)?;
    if reveal {
        outcome = app
            .execute(
                session,
                Command::Reveal {
                    username: login.username.clone(),
                    password: login.password.clone(),
                },
            )
            .map_err(report)?;
    }
    Ok(outcome)
}

fn print_outcome(outcome: Outcome, json: bool) -> Result<()> {
    if let Some(message) = &outcome.message {
        eprintln!("{}", message);
    }
    if let Some(rows) = outcome.rows {
        if json {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        } else {
            print_table(&rows);
        }
    }
    Ok(())
}

fn print_table(rows: &[Employee]) {
    if rows.is_empty() {
        println!("No employees found.");
        return;
    }
    println!(
        "{:<6} {:<24} {:<20} {:<20} {:<6} {:<8} {:>6} {:>12} {:>10}",
        "ID", "NAME", "JOB TITLE", "DEPARTMENT", "F/P", "PAY", "HOURS", "ANNUAL", "HOURLY"
    );
    println!("{}", "-".repeat(120));
    for row in rows {
        println!(
            "{:<6} {:<24} {:<20} {:<20} {:<6} {:<8} {:>6} {:>12} {:>10}",
            row.id,
            truncate(&row.name, 22),
            truncate(&row.job_title, 18),
            truncate(&row.department, 18),
            truncate(&row.full_or_part_time, 6),
            truncate(&row.salary_or_hourly, 8),
            row.typical_hours,
            row.annual_salary.to_string(),
            row.hourly_rate.to_string()
        );
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{} [y/N] ", prompt);
    io::stderr().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "YES"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().with_log_file(cli.log_file);
    let _log_guard = logging::init(&config.log_file, config.log_level.as_deref());

    let db = Database::new(config.connection.clone());
    let app = App::new(
        db.clone(),
        Gate::new(config.sensitive_user.clone(), config.sensitive_password.clone()),
    );
    let mut session = Session::new();

    match cli.command.unwrap_or(Commands::Browse) {
        Commands::Init => {
            let path = db.init().map_err(report)?;
            println!("Database initialized at {}", path.display());
        }

        Commands::Browse => {
            // A store that cannot be reached at startup ends the process.
            db.connect().map_err(report)?;
            tui::run_browse(&app)?;
        }

        Commands::List {
            login,
            reveal,
            json,
        } => {
            let outcome = sign_in(&app, &mut session, &login, reveal)?;
            print_outcome(outcome, json)?;
        }

        Commands::Search {
            login,
            keyword,
            json,
        } => {
            sign_in(&app, &mut session, &login, false)?;
            let outcome = app
                .execute(&mut session, Command::Search(keyword))
                .map_err(report)?;
            print_outcome(outcome, json)?;
        }

        Commands::Add { login, fields } => {
            sign_in(&app, &mut session, &login, true)?;
            let outcome = app
                .execute(&mut session, Command::Add(fields.into()))
                .map_err(report)?;
            print_outcome(outcome, false)?;
        }

        Commands::Update { login, id, fields } => {
            sign_in(&app, &mut session, &login, true)?;
            let outcome = app
                .execute(
                    &mut session,
                    Command::Update {
                        selected: Some(id),
                        form: fields.into(),
                    },
                )
                .map_err(report)?;
            print_outcome(outcome, false)?;
        }

        Commands::Delete { login, id, yes } => {
            sign_in(&app, &mut session, &login, false)?;
            let confirmed = yes || confirm("Are you sure you want to delete this record?")?;
            let outcome = app
                .execute(
                    &mut session,
                    Command::Delete {
                        selected: Some(id),
                        confirmed,
                    },
                )
                .map_err(report)?;
            if outcome.rows.is_none() {
                eprintln!("Deletion cancelled.");
            }
            print_outcome(outcome, false)?;
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
