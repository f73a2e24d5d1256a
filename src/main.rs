//! WhatsApp Broadcast CLI
//!
//! Reads a contact CSV and a message template, authenticates a session with
//! the external messaging client, and runs the paced broadcast loop.

use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use whatsapp_broadcast::backend::{CliBackend, MessagingBackend};
use whatsapp_broadcast::broadcast::{BroadcastController, CancelToken, Mode};
use whatsapp_broadcast::config::Config;
use whatsapp_broadcast::contacts::read_contacts;
use whatsapp_broadcast::delay::DelayBound;
use whatsapp_broadcast::session::SessionAuthenticator;
use whatsapp_broadcast::{Error, Result};

/// WhatsApp Broadcast - send a message template to a CSV contact list
#[derive(Parser)]
#[command(name = "whatsapp-broadcast")]
#[command(about = "Send a personalized broadcast to a CSV contact list")]
struct Cli {
    /// Path to contacts CSV file (name,number)
    #[arg(short = 'n', long)]
    numbers: Option<PathBuf>,

    /// Path to message template file
    #[arg(short = 'm', long)]
    message: Option<PathBuf>,

    /// Send to all contacts (default: test mode - first contact only)
    #[arg(short = 'f', long)]
    full: bool,

    /// Delay range in seconds between messages (e.g. 15-35)
    #[arg(short = 'd', long, default_value = "15-35")]
    delay: String,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = Config::default();

    // Fatal setup validation happens before anything touches the backend
    let bound = DelayBound::parse(&cli.delay)?;

    let contacts_path = resolve_path(
        cli.numbers,
        &config.contacts_path,
        "Enter path to numbers CSV file",
    )?;
    if !contacts_path.exists() {
        return Err(Error::Config(format!(
            "numbers file not found: {}",
            contacts_path.display()
        )));
    }

    let template_path = resolve_path(
        cli.message,
        &config.template_path,
        "Enter path to message template file",
    )?;
    if !template_path.exists() {
        return Err(Error::Config(format!(
            "message file not found: {}",
            template_path.display()
        )));
    }

    let mode = if cli.full || prompt_yes_no("Send to all contacts? (y/N): ")? {
        Mode::Full
    } else {
        Mode::Test
    };

    let template = std::fs::read_to_string(&template_path)?.trim().to_string();
    let contacts = read_contacts(&contacts_path)?;
    if contacts.is_empty() {
        return Err(Error::NoContacts(contacts_path.display().to_string()));
    }

    let mode_text = match mode {
        Mode::Full => "FULL MODE - all contacts",
        Mode::Test => "TEST MODE - first contact only",
    };
    println!("Found {} contacts, running in {}", contacts.len(), mode_text);
    println!("Delay between messages: {} seconds\n", bound);
    println!("Message template:\n\"{}\"\n", preview(&template));

    // Session bootstrap: pairing on first run, then the connection wait
    let backend = Box::new(CliBackend::new(&config));
    if !backend.has_credentials() {
        println!("Session not found or expired. Please authenticate:");
    }
    let mut authenticator = SessionAuthenticator::new();
    let session = authenticator.authenticate(backend, |code| {
        println!("Scan this code in the app (Menu -> Linked Devices):");
        println!("  {}", code);
    })?;
    println!("Session ready\n");
    println!("Starting broadcast...\n");

    let controller = BroadcastController::new(template, bound, mode);
    let cancel = CancelToken::new();
    let mut rng = rand::thread_rng();
    let mut sleep = |d: Duration| std::thread::sleep(d);

    let (summary, _outcomes) =
        controller.run(&session, &contacts, &mut rng, &cancel, &mut sleep);

    println!("\nBroadcast completed!");
    println!(
        "Summary: {} successful, {} failed",
        summary.succeeded, summary.failed
    );

    // Individual send failures do not affect the exit code
    Ok(())
}

/// Use the provided path, or prompt with a default
fn resolve_path(provided: Option<PathBuf>, default: &Path, label: &str) -> Result<PathBuf> {
    if let Some(path) = provided {
        return Ok(path);
    }

    print!("{} (default: {}): ", label, default.display());
    io::stdout().flush()?;

    let input = read_line()?;
    if input.is_empty() {
        Ok(default.to_path_buf())
    } else {
        Ok(PathBuf::from(input))
    }
}

fn prompt_yes_no(label: &str) -> Result<bool> {
    print!("{}", label);
    io::stdout().flush()?;

    let input = read_line()?.to_lowercase();
    Ok(input == "y" || input == "yes")
}

fn read_line() -> Result<String> {
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// First 100 characters of the template, for the pre-run banner
fn preview(template: &str) -> String {
    let short: String = template.chars().take(100).collect();
    if short.len() < template.len() {
        format!("{}...", short)
    } else {
        short
    }
}
