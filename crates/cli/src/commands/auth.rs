//! Account and session commands

use anyhow::{bail, Context, Result};
use serde_json::json;
use sleepwise_core::{models::Credentials, ApiClient, FileSession};
use std::io::{BufRead, Write};

use crate::output::{print_info, print_json, print_success, OutputFormat};

/// Sign in and persist the credential
pub async fn login(
    client: &ApiClient,
    session: &FileSession,
    email: String,
    password: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let credentials = Credentials {
        password: resolve_password(password)?,
        email,
    };

    let response = client.login(&credentials).await?;
    session.store(&response).await?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "user_id": response.user_id,
            "session_file": session.path(),
        }))?,
        OutputFormat::Table => {
            print_success(&format!("Signed in as {}", credentials.email));
            println!("Session stored at {}", session.path().display());
        }
    }

    Ok(())
}

/// Register a new account
pub async fn signup(
    client: &ApiClient,
    email: String,
    password: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let credentials = Credentials {
        password: resolve_password(password)?,
        email,
    };

    let response = client.signup(&credentials).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            print_success(&response.message);
            if let Some(user) = &response.user {
                println!("User: {}", user);
            }
        }
    }

    Ok(())
}

/// Forget the stored credential
pub async fn logout(session: &FileSession) -> Result<()> {
    if session.clear().await? {
        print_success("Signed out");
    } else {
        print_info("No active session");
    }
    Ok(())
}

/// Use the given password or read one line from stdin
fn resolve_password(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }

    eprint!("Password: ");
    std::io::stderr().flush().ok();

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password")?;

    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("A password is required");
    }
    Ok(password)
}
