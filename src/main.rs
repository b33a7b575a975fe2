// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Ypareo CLI
//!
//! Logs in with credentials from the environment and saves or restores
//! sessions on disk.

use std::env;
use std::fs;
use std::process::ExitCode;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use ypareo::client::{ENV_BASE_URL, ENV_PASSWORD, ENV_USERNAME};
use ypareo::{Client, ClientConfig, User};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ypareo=info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    let result = match args[1].as_str() {
        "login" => login(args.get(2).map(String::as_str)).await,
        "restore" => {
            if args.len() < 3 {
                eprintln!("Usage: ypareo restore <session-file>");
                return ExitCode::from(1);
            }
            restore(&args[2]).await
        }
        "--help" | "-h" | "help" => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        "--version" | "-v" | "version" => {
            println!("ypareo {}", ypareo::VERSION);
            return ExitCode::SUCCESS;
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            return ExitCode::from(1);
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn print_usage() {
    println!(
        r#"Ypareo - Session client

USAGE:
    ypareo <COMMAND> [OPTIONS]

COMMANDS:
    login [session-file]     Log in, optionally saving the session
    restore <session-file>   Restore a saved session (re-login if a password is set)
    help                     Show this help message
    version                  Show version information

ENVIRONMENT:
    {}          Site root, e.g. https://ypareo.example.com
    {}          Account name
    {}          Account password (optional for restore)
    RUST_LOG                 Log filter (default: ypareo=info)
"#,
        ENV_BASE_URL, ENV_USERNAME, ENV_PASSWORD
    );
}

fn print_user(user: &User) {
    println!("Logged in as: {}", user);
    println!("  Username: {}", user.username);
    for registration in &user.registrations {
        println!("  Registration {}: {}", registration.code, registration);
    }
}

async fn login(save_to: Option<&str>) -> anyhow::Result<()> {
    let client = Client::new(ClientConfig::from_env()?)?;
    let user = client.login().await?;
    print_user(&user);

    if let Some(path) = save_to {
        let data = client.save_session()?;
        fs::write(path, data).with_context(|| format!("Failed to write {}", path))?;
        println!("Session saved to {}", path);
    }

    Ok(())
}

async fn restore(path: &str) -> anyhow::Result<()> {
    let data = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    let base_url = env::var(ENV_BASE_URL).with_context(|| format!("{} is not set", ENV_BASE_URL))?;
    let username = env::var(ENV_USERNAME).with_context(|| format!("{} is not set", ENV_USERNAME))?;
    let password = env::var(ENV_PASSWORD).ok().filter(|p| !p.is_empty());
    let auto_relogin = password.is_some();

    let client = Client::new(ClientConfig::new(
        base_url,
        username,
        password.unwrap_or_default(),
    ))?;
    let user = client.restore_session(&data, auto_relogin).await?;
    print_user(&user);

    // refresh the timestamp so the saved session stays valid
    fs::write(path, client.save_session()?).with_context(|| format!("Failed to write {}", path))?;
    Ok(())
}
