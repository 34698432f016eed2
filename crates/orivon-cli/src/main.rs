//! Orivon CLI - operator surface over identity, purchases, attempts and availability.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod output;

use commands::{attempt, availability, purchase, session};
use context::Context;

#[derive(Parser)]
#[command(name = "orivon")]
#[command(about = "Orivon certification platform CLI")]
struct Cli {
    /// Configuration file; missing files fall back to defaults
    #[arg(long, global = true, default_value = "orivon.toml")]
    config: PathBuf,
    /// Use a local JSON snapshot instead of the remote store
    #[arg(long, global = true)]
    store: Option<PathBuf>,
    /// Log filter written to stderr, e.g. `info` or `orivon_store=debug`
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve an identity and issue a session token
    SignIn {
        /// Email of the external identity
        #[arg(long)]
        email: String,
        /// Display name of the external identity
        #[arg(long)]
        name: Option<String>,
    },
    /// Show the user behind a session token
    Whoami {
        /// Session token
        #[arg(long)]
        token: String,
    },
    /// Open a purchase for a certification
    CreateOrder {
        /// Session token
        #[arg(long)]
        token: String,
        /// Certification id
        #[arg(long)]
        certification: String,
    },
    /// Confirm a checkout with the processor's signature
    VerifyPayment {
        /// Session token
        #[arg(long)]
        token: String,
        /// Purchase id returned by create-order
        #[arg(long)]
        purchase: String,
        /// Payment reference reported by the processor
        #[arg(long)]
        payment: String,
        /// Hex HMAC signature reported by the processor
        #[arg(long)]
        signature: String,
    },
    /// Start an exam attempt
    Start {
        /// Session token
        #[arg(long)]
        token: String,
        /// Certification id
        #[arg(long)]
        certification: String,
        /// Client metadata as a JSON object
        #[arg(long)]
        metadata: Option<String>,
    },
    /// Record a proctoring event
    Event {
        /// Session token
        #[arg(long)]
        token: String,
        /// Attempt id
        #[arg(long)]
        attempt: String,
        /// Event type, e.g. tab_switch
        #[arg(long = "type")]
        event_type: String,
        /// Event payload as JSON
        #[arg(long)]
        metadata: Option<String>,
    },
    /// Score answers and send the attempt to review
    Submit {
        /// Session token
        #[arg(long)]
        token: String,
        /// Attempt id
        #[arg(long)]
        attempt: String,
        /// Answers as a JSON array of {question_id, selected_option}
        #[arg(long)]
        answers: String,
    },
    /// Finalize an attempt with a score
    Complete {
        /// Session token
        #[arg(long)]
        token: String,
        /// Attempt id
        #[arg(long)]
        attempt: String,
        /// Final score
        #[arg(long)]
        score: i64,
        /// Mark the attempt as passed
        #[arg(long)]
        pass: bool,
        /// Exam title for the result record
        #[arg(long)]
        title: Option<String>,
        /// Name the result is recorded under
        #[arg(long)]
        name: Option<String>,
    },
    /// Check whether a certificate may be issued
    Availability {
        /// Session token
        #[arg(long)]
        token: String,
        /// Certification id
        #[arg(long)]
        certification: String,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = Context::open(&cli.config, cli.store.as_deref()).and_then(|ctx| match cli.command {
        Commands::SignIn { email, name } => session::sign_in(&ctx, &email, name.as_deref()),
        Commands::Whoami { token } => session::whoami(&ctx, &token),
        Commands::CreateOrder {
            token,
            certification,
        } => purchase::create_order(&ctx, &token, certification),
        Commands::VerifyPayment {
            token,
            purchase,
            payment,
            signature,
        } => purchase::verify_payment(&ctx, &token, purchase, &payment, &signature),
        Commands::Start {
            token,
            certification,
            metadata,
        } => attempt::start(&ctx, &token, certification, metadata.as_deref()),
        Commands::Event {
            token,
            attempt,
            event_type,
            metadata,
        } => attempt::event(&ctx, &token, attempt, &event_type, metadata.as_deref()),
        Commands::Submit {
            token,
            attempt,
            answers,
        } => attempt::submit(&ctx, &token, attempt, &answers),
        Commands::Complete {
            token,
            attempt,
            score,
            pass,
            title,
            name,
        } => attempt::complete(&ctx, &token, attempt, score, pass, title, name),
        Commands::Availability {
            token,
            certification,
        } => availability::run(&ctx, &token, certification),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
