use std::sync::{Arc, RwLock};

use anyhow::bail;
use clap::Parser;
use inquire::error::InquireResult;

mod app;
mod auth;
mod backup;
mod cli;
mod config;
mod eid;
mod extract;
mod images;
mod lock;
mod normalize;
mod records;
mod search;
mod semantic;
mod storage;
#[cfg(test)]
mod tests;
mod web;

use app::App;
use auth::AuthContext;
use config::Config;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = cli::Args::parse();

    let config = Arc::new(RwLock::new(Config::load()));
    let base_path = config.read().unwrap().base_path().to_path_buf();

    match args.command {
        cli::Command::Daemon {} => {
            let _lock = lock::FileLock::try_acquire(&base_path)?;
            let app = App::new(config.clone())?;
            web::start_daemon(app);
            Ok(())
        }

        cli::Command::Search {
            query,
            collection,
            top,
        } => {
            let app = App::new(config.clone())?;
            let outcome = app.search(&query, collection, top)?;

            if outcome.status == search::SearchStatus::Degraded {
                eprintln!("search is unavailable: the embedding model could not be loaded");
            }

            println!("{}", serde_json::to_string_pretty(&outcome).unwrap());
            Ok(())
        }

        cli::Command::Add {
            collection,
            description,
            screenshot,
            original_link,
            additional_links,
        } => {
            let _lock = lock::FileLock::try_acquire(&base_path)?;
            let ctx = curator_context(&config.read().unwrap())?;

            let screenshot = std::fs::read(&screenshot)?;

            let app = App::new(config.clone())?;
            let record = app.create_record(
                &ctx,
                collection,
                description,
                screenshot,
                original_link,
                additional_links,
            )?;

            println!("{}", serde_json::to_string_pretty(&record).unwrap());
            Ok(())
        }

        cli::Command::List {
            collection,
            archived,
        } => {
            let app = App::new(config.clone())?;

            if archived {
                let records = app.list_archived(collection)?;
                println!("{}", serde_json::to_string_pretty(&records).unwrap());
            } else {
                let records = app.list_active(collection)?;
                println!("{}", serde_json::to_string_pretty(&records).unwrap());
            }
            Ok(())
        }

        cli::Command::Archive {
            collection,
            id,
            yes,
        } => {
            if !yes {
                match inquire::prompt_confirmation(format!(
                    "Move {collection} record #{id} to the archive?"
                )) {
                    InquireResult::Ok(true) => {}
                    InquireResult::Ok(false) => return Ok(()),
                    InquireResult::Err(err) => bail!("An error occurred: {}", err),
                }
            }

            let _lock = lock::FileLock::try_acquire(&base_path)?;
            let ctx = curator_context(&config.read().unwrap())?;

            let app = App::new(config.clone())?;
            if app.archive_record(&ctx, collection, id)? {
                println!("record #{id} archived");
            } else {
                println!("record #{id} not found in {collection}");
            }
            Ok(())
        }

        cli::Command::Restore { collection, id } => {
            let _lock = lock::FileLock::try_acquire(&base_path)?;
            let ctx = curator_context(&config.read().unwrap())?;

            let app = App::new(config.clone())?;
            if app.restore_record(&ctx, collection, id)? {
                println!("record #{id} restored");
            } else {
                println!("record #{id} not found in the {collection} archive");
            }
            Ok(())
        }

        cli::Command::Backup { output } => backup::create_backup(output, &base_path),

        cli::Command::SetPassword {} => {
            let mut cfg = config.write().unwrap();

            let current = if cfg.auth.username.is_empty() {
                "admin".to_string()
            } else {
                cfg.auth.username.clone()
            };
            let username = inquire::Text::new("Username:")
                .with_default(&current)
                .prompt()?;
            let password = inquire::Password::new("New password:").prompt()?;

            let salt = auth::generate_salt();
            cfg.auth.username = username;
            cfg.auth.password_hash = auth::hash_password(&password, &salt);
            cfg.auth.password_salt = salt;
            cfg.save();

            println!("password updated");
            Ok(())
        }
    }
}

/// Build the auth context for a mutating CLI command. With no password
/// configured the local store is open; otherwise the password comes from
/// $DOVIDKA_PASSWORD or an interactive prompt.
fn curator_context(config: &Config) -> anyhow::Result<AuthContext> {
    if !config.auth.has_password() {
        let username = if config.auth.username.is_empty() {
            "local"
        } else {
            &config.auth.username
        };
        return Ok(AuthContext::admin(username));
    }

    let password = match std::env::var("DOVIDKA_PASSWORD") {
        Ok(password) => password,
        Err(_) => inquire::Password::new("Password:")
            .without_confirmation()
            .prompt()?,
    };

    let ctx = auth::login(&config.auth, &config.auth.username, &password);
    if !ctx.can_curate() {
        bail!("invalid credentials");
    }

    Ok(ctx)
}
