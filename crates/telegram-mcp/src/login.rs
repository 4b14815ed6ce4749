//! Interactive sign-in that creates the session file `serve` needs.

use anyhow::{bail, Context, Result};
use grammers_client::SignInError;
use tgconf::TelegramConfig;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing::info;

use crate::telegram::mtproto;

pub async fn run(config: &TelegramConfig, phone: Option<String>) -> Result<()> {
    let client = mtproto::open(config)
        .await
        .context("Failed to connect to Telegram")?;
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    if client
        .is_authorized()
        .await
        .context("Failed to check authorization")?
    {
        eprintln!(
            "Session at {} is already authorized",
            config.session_path.display()
        );
        return Ok(());
    }

    let phone = match phone.or_else(|| config.phone.clone()) {
        Some(phone) => phone,
        None => prompt(&mut input, "Phone number (international format): ").await?,
    };

    let token = client
        .request_login_code(&phone)
        .await
        .context("Failed to request login code")?;
    let code = prompt(&mut input, "Login code: ").await?;

    let user = match client.sign_in(&token, &code).await {
        Ok(user) => user,
        Err(SignInError::PasswordRequired(password_token)) => {
            let hint = password_token.hint().unwrap_or("none").to_string();
            let password = prompt(&mut input, &format!("Two-step password (hint: {}): ", hint)).await?;
            client
                .check_password(password_token, password.as_bytes())
                .await
                .context("Password check failed")?
        }
        Err(SignInError::SignUpRequired { .. }) => {
            bail!("No Telegram account exists for {}", phone)
        }
        Err(e) => return Err(e).context("Sign in failed"),
    };

    client
        .session()
        .save_to_file(&config.session_path)
        .with_context(|| format!("Failed to save session to {}", config.session_path.display()))?;

    info!(user_id = user.id(), "Signed in");
    eprintln!(
        "Signed in as {}. Session saved to {}",
        user.full_name(),
        config.session_path.display()
    );
    Ok(())
}

async fn prompt(input: &mut Lines<BufReader<Stdin>>, label: &str) -> Result<String> {
    let mut stderr = tokio::io::stderr();
    stderr.write_all(label.as_bytes()).await?;
    stderr.flush().await?;

    let line = input
        .next_line()
        .await?
        .context("stdin closed before input was entered")?;
    let line = line.trim().to_string();
    if line.is_empty() {
        bail!("{} cannot be empty", label.trim_end_matches([':', ' ']));
    }
    Ok(line)
}
