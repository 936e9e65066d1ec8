//! Cinema Desk - command-line staff client for the cinema ticketing service.
//!
//! Logs staff in and out, reports the session state, and checks or scans
//! tickets through the session core.

use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use cinema_core::{
    ApiError, AuthError, Config, Desk, GuardDecision, Route, StorageBackend, TicketResponse,
};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

/// Directory for rolling log files; logs go to stderr when unset
const ENV_LOG_DIR: &str = "CINEMA_LOG_DIR";

const USAGE: &str = "\
Usage: cinema [--ephemeral] <command>

Commands:
  login [username]       Log in as a staff member
  logout                 End the current session
  status                 Show whether a staff session is active
  check-ticket <id>      Show a ticket's status
  scan-ticket <id>       Mark a ticket as used
  open <route>           Show whether a route may be entered";

/// Initialize the tracing subscriber for logging
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match std::env::var(ENV_LOG_DIR) {
        Ok(dir) if !dir.is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, "cinema.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        _ => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    let _log_guard = init_tracing();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let ephemeral = take_flag(&mut args, "--ephemeral");

    let mut config = Config::load()?;
    if ephemeral {
        config.storage = StorageBackend::Memory;
    }
    let desk = Desk::open(config)?;
    info!(authenticated = desk.session().is_authenticated(), "Cinema desk starting");

    match args.first().map(String::as_str) {
        Some("login") => login(&desk, args.get(1).cloned()).await,
        Some("logout") => {
            if desk.api().logout() {
                println!("Logged out.");
            } else {
                println!("No active session.");
            }
            Ok(())
        }
        Some("status") => {
            status(&desk);
            Ok(())
        }
        Some("check-ticket") => ticket_command(&desk, Route::CheckTicket, args.get(1)).await,
        Some("scan-ticket") => ticket_command(&desk, Route::ScanTicket, args.get(1)).await,
        Some("open") => {
            let path = args.get(1).map(String::as_str).unwrap_or("/");
            match desk.navigate(path) {
                (route, GuardDecision::Enter) => println!("Entering {}", route),
                (route, GuardDecision::Redirect(to)) => {
                    println!("{} is staff only; redirected to {}", route, to)
                }
            }
            Ok(())
        }
        _ => {
            eprintln!("{}", USAGE);
            Ok(())
        }
    }
}

fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    let before = args.len();
    args.retain(|a| a != flag);
    args.len() != before
}

fn status(desk: &Desk) {
    if desk.session().is_authenticated() {
        println!("Staff session active.");
    } else {
        println!("Not logged in.");
    }
}

async fn login(desk: &Desk, username: Option<String>) -> Result<()> {
    let username = match username {
        Some(u) => u,
        None => prompt_username(desk.config().last_username.as_deref())?,
    };
    let password = rpassword::prompt_password("Password: ")?;

    match desk.api().login(&username, &password).await {
        Ok(_) => {
            println!("Logged in as {}.", username);
            let mut config = desk.config().clone();
            config.last_username = Some(username);
            if let Err(e) = config.save() {
                warn!(error = %e, "Failed to save config");
            }
            Ok(())
        }
        Err(AuthError::CredentialRejected) => {
            println!("Invalid username or password.");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn prompt_username(last: Option<&str>) -> Result<String> {
    match last {
        Some(last) => print!("Username [{}]: ", last),
        None => print!("Username: "),
    }
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read username")?;
    let entered = line.trim();
    match (entered.is_empty(), last) {
        (false, _) => Ok(entered.to_string()),
        (true, Some(last)) => Ok(last.to_string()),
        (true, None) => bail!("A username is required"),
    }
}

async fn ticket_command(desk: &Desk, route: Route, id: Option<&String>) -> Result<()> {
    if let GuardDecision::Redirect(_) = desk.guard().check(route) {
        println!("Staff login required. Run `cinema login` first.");
        return Ok(());
    }
    let Some(id) = id else {
        bail!("A ticket id is required");
    };
    let ticket_id = Uuid::parse_str(id.trim()).context("Invalid ticket id")?;

    let result = match route {
        Route::ScanTicket => desk.tickets().scan_ticket(ticket_id).await,
        _ => desk.tickets().check_ticket(ticket_id).await,
    };

    match result {
        Ok(ticket) => {
            print_ticket(&ticket);
            Ok(())
        }
        Err(e) if e.is_session_expired() => {
            println!("Session expired. Please log in again.");
            Ok(())
        }
        Err(ApiError::NotFound(_)) => {
            println!("No active ticket with id {}.", ticket_id);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_ticket(ticket: &TicketResponse) {
    println!("Ticket   {}", ticket.ticket_id);
    println!("Movie    {}", ticket.movie_title.as_deref().unwrap_or("-"));
    if let Some(start) = ticket.screening_start_time {
        println!("Starts   {}", start.format("%Y-%m-%d %H:%M"));
    }
    println!("Seats    {}", ticket.seats_display());
    println!("Status   {}", ticket.status.display());
}
