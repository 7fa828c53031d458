use std::path::PathBuf;

use anyhow::{Context, anyhow, bail};
use client::{AuthState, Client, ClientConfig, ProfilePicture};

#[derive(Debug, Default)]
struct CliArgs {
    command: Option<String>,
    positional: Vec<String>,
    api_base: Option<String>,
    timeout_ms: Option<u64>,
    session_file: Option<PathBuf>,
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
    code: Option<String>,
    subject: Option<String>,
    message: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let args = parse_args()?;
    let Some(command) = args.command.clone() else {
        print_help();
        return Ok(());
    };

    let mut config = ClientConfig::from_env().context("failed to load client configuration")?;
    if let Some(api_base) = &args.api_base {
        config.api_base = api_base.clone();
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    if let Some(path) = &args.session_file {
        config.session_file = Some(path.clone());
    }

    let client = Client::new(config).context("failed to create client")?;
    log::debug!("API base: {}", client.config().base_url());

    match command.as_str() {
        "register" => {
            let state = client
                .auth()
                .register(
                    required(&args.username, "--username")?,
                    required(&args.email, "--email")?,
                    required(&args.password, "--password")?,
                )
                .await?;
            if let Some(email) = state.pending_email() {
                println!("Registered. A verification code was sent to {}.", email);
            }
        }
        "verify" => {
            client.auth().resume_registration(required(&args.email, "--email")?)?;
            match client.auth().verify(required(&args.code, "--code")?).await? {
                AuthState::LoggedIn(user) => println!("Verified and logged in as {}.", user.username),
                AuthState::Verified { email } => println!("{} verified. Please log in.", email),
                other => bail!("unexpected state after verification: {:?}", other),
            }
        }
        "resend-code" => {
            client.auth().resume_registration(required(&args.email, "--email")?)?;
            client.auth().resend_code().await?;
            println!("Verification code re-sent.");
        }
        "login" => {
            let state = client
                .auth()
                .login(
                    required(&args.email, "--email")?,
                    required(&args.password, "--password")?,
                )
                .await?;
            if let AuthState::LoggedIn(user) = state {
                println!("Logged in as {} ({}).", user.username, user.email);
            }
        }
        "logout" => {
            client.auth().logout();
            println!("Logged out.");
        }
        "me" => match client.auth().restore().await? {
            AuthState::LoggedIn(user) => {
                println!("{} <{}> id={}", user.username, user.email, user.id);
                if let Some(role) = &user.role {
                    println!("role: {}", role);
                }
            }
            _ => bail!("Please login to continue."),
        },
        "dashboard" => {
            let view = client.dashboard().load().await?;
            match &view.profile {
                Some(profile) => println!("{} <{}>", profile.username, profile.email),
                None => println!("<profile unavailable>"),
            }
            match &view.picture {
                Some(ProfilePicture::Image { bytes, content_type }) => println!(
                    "picture: {} bytes ({})",
                    bytes.len(),
                    content_type.as_deref().unwrap_or("unknown type")
                ),
                Some(ProfilePicture::Url(url)) => println!("picture: {}", url),
                None => println!("picture: none"),
            }
            println!("balance: {:.2}", view.balance);
            println!("transactions: {}", view.transactions.len());
            for tx in view.transactions.iter().take(5) {
                println!("  - {} {:.2} [{}]", tx.kind, tx.amount, tx.status);
            }
            println!(
                "notifications: {} ({} unread)",
                view.notifications.len(),
                view.unread_notifications()
            );
            for section in &view.failed_sections {
                eprintln!("warning: {} failed to load", section);
            }
            for warning in &view.warnings {
                eprintln!("warning: {}: {}", warning.name, warning.reason);
            }
        }
        "balance" => {
            let balance = client.api().balance().await?;
            println!(
                "{:.2} {}",
                balance.balance,
                balance.currency.as_deref().unwrap_or("")
            );
        }
        "transactions" => {
            for tx in client.api().transactions().await? {
                println!("{} {} {:.2} [{}]", tx.id, tx.kind, tx.amount, tx.status);
            }
        }
        "deposit" | "withdraw" => {
            let raw = args
                .positional
                .first()
                .ok_or_else(|| anyhow!("{} requires an amount", command))?;
            let amount = raw
                .parse::<f64>()
                .with_context(|| format!("invalid amount: {}", raw))?;
            let ack = if command == "deposit" {
                client.api().deposit(amount).await?
            } else {
                client.api().withdraw(amount).await?
            };
            println!("{}", serde_json::to_string_pretty(&ack)?);
        }
        "bets" => {
            for bet in client.api().bets().await? {
                println!(
                    "{} | {} | stake {:.2} @ {:.2} | {}",
                    bet.event_name,
                    bet.pick,
                    bet.amount,
                    bet.odds,
                    bet.status_label()
                );
            }
        }
        "notifications" => {
            for note in client.api().notifications().await? {
                let marker = if note.read { " " } else { "*" };
                println!("{} {} {}", marker, note.id, note.message);
            }
        }
        "tickets" => {
            for ticket in client.api().support_tickets().await? {
                println!(
                    "{} [{}] {}",
                    ticket.id,
                    ticket.status.as_deref().unwrap_or("open"),
                    ticket.subject
                );
            }
        }
        "create-ticket" => {
            client
                .api()
                .create_ticket(
                    required(&args.subject, "--subject")?,
                    required(&args.message, "--message")?,
                )
                .await?;
            println!("Ticket submitted.");
        }
        "admin-users" => {
            client.auth().restore().await?;
            client.auth().require_admin()?;
            for user in client.api().admin_users().await? {
                println!(
                    "{} {} <{}>{}",
                    user.id,
                    user.username,
                    user.email,
                    if user.disabled { " (disabled)" } else { "" }
                );
            }
        }
        "health" => {
            let health = client.api().health().await?;
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
        other => bail!("unknown command: {}\nUse --help to list commands.", other),
    }

    Ok(())
}

fn required<'a>(value: &'a Option<String>, flag: &str) -> anyhow::Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| anyhow!("{} is required for this command", flag))
}

fn parse_args() -> anyhow::Result<CliArgs> {
    let mut cli = CliArgs::default();

    let mut args = std::env::args().skip(1).peekable();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--api-base" => cli.api_base = Some(next_arg_value(&mut args, &arg)?),
            "--timeout-ms" => {
                let value = next_arg_value(&mut args, &arg)?;
                cli.timeout_ms = Some(
                    value
                        .parse::<u64>()
                        .with_context(|| format!("invalid --timeout-ms: {}", value))?,
                );
            }
            "--session-file" => {
                cli.session_file = Some(PathBuf::from(next_arg_value(&mut args, &arg)?))
            }
            "--username" => cli.username = Some(next_arg_value(&mut args, &arg)?),
            "--email" => cli.email = Some(next_arg_value(&mut args, &arg)?),
            "--password" => cli.password = Some(next_arg_value(&mut args, &arg)?),
            "--code" => cli.code = Some(next_arg_value(&mut args, &arg)?),
            "--subject" => cli.subject = Some(next_arg_value(&mut args, &arg)?),
            "--message" => cli.message = Some(next_arg_value(&mut args, &arg)?),
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            flag if flag.starts_with("--") => {
                bail!("unknown option: {}\nUse --help to list options.", flag);
            }
            _ if cli.command.is_none() => cli.command = Some(arg.clone()),
            _ => cli.positional.push(arg.clone()),
        }
    }

    Ok(cli)
}

fn next_arg_value<I>(args: &mut std::iter::Peekable<I>, flag: &str) -> anyhow::Result<String>
where
    I: Iterator<Item = String>,
{
    args.next()
        .ok_or_else(|| anyhow!("missing value for {}", flag))
}

fn print_help() {
    println!(
        "clutch - command line client for the ClutchDen backend\n\n\
Usage:\n\
  clutch [options] <command> [args]\n\n\
Commands:\n\
  register         --username --email --password\n\
  verify           --email --code\n\
  resend-code      --email\n\
  login            --email --password\n\
  logout\n\
  me               Show the signed-in user\n\
  dashboard        Profile, picture, balance, transactions and notifications\n\
  balance | transactions | bets | notifications | tickets\n\
  deposit <amount> | withdraw <amount>\n\
  create-ticket    --subject --message\n\
  admin-users      List users (admin role required)\n\
  health           Backend health document\n\n\
Options:\n\
  --api-base <url>        Backend base URL (default: CLUTCH_API_BASE or the hosted API)\n\
  --timeout-ms <ms>       Per-request timeout (default: 15000)\n\
  --session-file <path>   Where the session is persisted\n\
  -h, --help              Show this help\n\n\
Environment:\n\
  CLUTCH_CONFIG_PATH, CLUTCH_API_BASE, CLUTCH_TIMEOUT_MS, CLUTCH_AUTH_SCHEME,\n\
  CLUTCH_SESSION_FILE, CLUTCH_PROFILE_PICTURE, RUST_LOG"
    );
}
