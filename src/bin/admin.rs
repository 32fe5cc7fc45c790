use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use uuid::Uuid;

use teamhub::authz::Role;
use teamhub::db;
use teamhub::utils::{hash_password, utc_now};

#[derive(Parser, Debug)]
#[command(author, version, about = "teamhub provisioning tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending migrations
    Migrate,
    /// Create an administrator account
    CreateAdmin {
        email: String,
        full_name: String,
        password: String,
        /// Mark the account as the primary admin
        #[arg(long)]
        primary: bool,
        /// Demote the current primary admin if one already exists
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Try to load env from CWD; when running in Docker the binary CWD may
    // differ, so fall back to the crate-local `.env`.
    if dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();
    let pool = db::init().await?;

    match cli.command {
        Commands::Migrate => {
            db::migrate(&pool).await?;
            println!("Migrations applied");
        }
        Commands::CreateAdmin {
            email,
            full_name,
            password,
            primary,
            force,
        } => {
            db::migrate(&pool).await?;

            let email = email.trim().to_lowercase();
            let taken: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE email = ?")
                .bind(&email)
                .fetch_one(&pool)
                .await?;
            if taken > 0 {
                anyhow::bail!("email already in use: {email}");
            }

            if primary {
                let existing: Option<String> = sqlx::query_scalar(
                    "SELECT email FROM users WHERE is_primary_admin = 1",
                )
                .fetch_optional(&pool)
                .await?;

                if let Some(current) = existing {
                    if !force {
                        anyhow::bail!(
                            "a primary admin already exists ({current}); pass --force to demote it"
                        );
                    }
                    sqlx::query("UPDATE users SET is_primary_admin = 0, updated_at = ? WHERE is_primary_admin = 1")
                        .bind(utc_now())
                        .execute(&pool)
                        .await?;
                }
            }

            let password_hash =
                hash_password(&password).context("password rejected")?;
            let user_id = Uuid::new_v4();
            let now = utc_now();

            sqlx::query(
                "INSERT INTO users (id, email, full_name, password_hash, role, is_primary_admin, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(user_id)
            .bind(&email)
            .bind(full_name.trim())
            .bind(&password_hash)
            .bind(Role::Admin.as_str())
            .bind(primary)
            .bind(now)
            .bind(now)
            .execute(&pool)
            .await?;

            println!("Created admin {email} ({user_id})");
        }
    }

    Ok(())
}
