//! AgriLink session command line
//!
//! Run with: cargo run --bin agrilink -- <command>
//!
//! Commands:
//!   status
//!   login <email> <password>
//!   register <name> <email> <password> <farmer|landowner|corporate>
//!   google [farmer|landowner|corporate]
//!   logout
//!   config [<key> <value>]
//!
//! Reads `settings.json` from the AgriLink config dir; AGRILINK_* env vars override it.
//! `config` shows or edits the file itself, without the overrides.

use agrilink_core::auth::{SessionStorage, SupabaseClient};
use agrilink_core::{
    Navigator, Notice, NoticeLevel, Notifier, RegisterOutcome, Role, Route, Session,
    SessionConfig, SessionManager, get_settings_path, load_settings, load_settings_from,
    save_settings,
};
use agrilink_core::utils::redact;
use anyhow::{Context, Result, bail};
use log::debug;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => println!("    ✓ {}: {}", notice.title, notice.message),
            NoticeLevel::Info => println!("    i {}: {}", notice.title, notice.message),
            NoticeLevel::Error => eprintln!("    ✗ {}: {}", notice.title, notice.message),
        }
    }
}

struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, route: Route) {
        println!("    → {}", route);
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run(&args).await {
        eprintln!("ERROR: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: &[String]) -> Result<()> {
    let command = args.first().map(String::as_str).unwrap_or("status");
    if command == "config" {
        return config(args);
    }

    let settings = load_settings();
    let storage = Arc::new(SessionStorage::new().context("Failed to open session storage")?);
    let client = Arc::new(
        SupabaseClient::new(&settings, storage).context("Failed to create Supabase client")?,
    );

    let manager = SessionManager::new(
        client.clone(),
        client,
        SessionConfig::from_settings(&settings),
    )
    .with_notifier(Arc::new(ConsoleNotifier))
    .with_navigator(Arc::new(ConsoleNavigator))
    .start()
    .await;

    debug!("Running command '{}'", command);
    let result = match command {
        "status" => {
            print_session(&manager.current_session());
            Ok(())
        }
        "login" => {
            let [email, password] = expect_args::<2>(args, "login <email> <password>")?;
            manager.login(email, password).await?;
            print_session(&manager.current_session());
            Ok(())
        }
        "register" => {
            let [name, email, password, role] =
                expect_args::<4>(args, "register <name> <email> <password> <role>")?;
            let role: Role = role.parse()?;
            match manager.register(name, email, password, role).await? {
                RegisterOutcome::SignedIn => print_session(&manager.current_session()),
                RegisterOutcome::ConfirmationRequired => {
                    println!("Check your inbox, then run `agrilink login`.")
                }
            }
            Ok(())
        }
        "google" => google(&manager, args.get(1)).await,
        "logout" => {
            manager.logout().await?;
            Ok(())
        }
        other => Err(anyhow::anyhow!(
            "Unknown command '{}'. Try status, login, register, google, logout or config.",
            other
        )),
    };

    manager.dispose();
    result
}

async fn google(manager: &SessionManager, role: Option<&String>) -> Result<()> {
    let url = match role {
        Some(role) => manager.signup_with_google(role.parse()?)?,
        None => manager.login_with_google()?,
    };
    println!("If no browser opened, visit:\n    {}\n", url);
    print!("Paste the URL you were redirected to: ");
    io::stdout().flush()?;

    let mut callback = String::new();
    io::stdin().lock().read_line(&mut callback)?;
    let callback = callback.trim();
    if callback.is_empty() {
        manager.cancel_oauth();
        bail!("No callback URL given, sign-in cancelled");
    }

    manager.complete_oauth(callback).await?;
    print_session(&manager.current_session());
    Ok(())
}

fn config(args: &[String]) -> Result<()> {
    let path = get_settings_path().context("Could not determine settings path")?;
    let mut settings = load_settings_from(&path);

    if args.len() > 1 {
        let [key, value] = expect_args::<2>(args, "config [<key> <value>]")?;
        settings.set(key, value).map_err(anyhow::Error::msg)?;
        save_settings(&settings).map_err(anyhow::Error::msg)?;
        println!("Saved {}", key);
    }

    println!("File:     {}", path.display());
    println!("Supabase: {}", settings.supabase_url);
    if settings.supabase_anon_key.is_empty() {
        println!("Anon key: (not set)");
    } else {
        println!("Anon key: {}", redact(&settings.supabase_anon_key));
    }
    println!("Site:     {}", settings.site_url);
    println!("Timeout:  {}s", settings.request_timeout_secs);
    Ok(())
}

fn expect_args<'a, const N: usize>(args: &'a [String], usage: &str) -> Result<[&'a str; N]> {
    let rest: Vec<&str> = args.iter().skip(1).map(String::as_str).collect();
    rest.try_into()
        .map_err(|_| anyhow::anyhow!("Usage: agrilink {}", usage))
}

fn print_session(session: &Session) {
    println!("State:   {:?}", session.state);
    match (&session.identity, &session.profile) {
        (Some(identity), Some(profile)) => {
            println!("User:    {} <{}>", profile.display_name, identity.email);
            println!("Role:    {}", profile.role);
        }
        (Some(identity), None) => {
            println!("User:    {}", identity.email);
            println!("Role:    unknown (profile could not be loaded)");
        }
        _ => {}
    }
    println!("Home:    {}", Route::landing_for(session));
}
