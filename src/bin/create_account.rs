use std::io::{self, Write};
use std::sync::Arc;

use clap::Parser;
use serde_json::json;
use sqlx::postgres::PgPoolOptions;

use cards_api::auth::passwords::{HashCost, PasswordService};
use cards_api::auth::validation::validate_registration;
use cards_api::auth::{AccountService, AuthError, Role};
use cards_api::db;
use cards_api::store::PgAccountStore;

#[derive(Parser, Debug)]
#[command(
    name = "create_account",
    about = "Create a Cards API account directly in the database"
)]
struct Args {
    /// Email address for the account (case insensitive).
    #[arg(long)]
    email: String,

    /// Plaintext password to hash and store for this account.
    #[arg(long)]
    password: String,

    #[arg(long)]
    first_name: String,

    #[arg(long)]
    middle_name: Option<String>,

    #[arg(long)]
    last_name: String,

    #[arg(long)]
    phone: String,

    #[arg(long)]
    state: Option<String>,

    #[arg(long)]
    country: String,

    #[arg(long)]
    city: String,

    #[arg(long)]
    street: String,

    #[arg(long)]
    house_number: String,

    /// Role to assign (`user` or `admin`).
    #[arg(long, default_value = "user")]
    role: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();

    let role: Role = match args.role.trim().to_lowercase().parse() {
        Ok(role) => role,
        Err(_) => {
            writeln!(
                io::stderr(),
                "error: unsupported role '{}'. Use 'user' or 'admin'.",
                args.role
            )?;
            std::process::exit(1);
        }
    };

    let mut name = json!({ "first": args.first_name, "last": args.last_name });
    if let Some(middle) = args.middle_name {
        name["middle"] = json!(middle);
    }
    let mut address = json!({
        "country": args.country,
        "city": args.city,
        "street": args.street,
        "houseNumber": args.house_number,
    });
    if let Some(state) = args.state {
        address["state"] = json!(state);
    }
    let payload = json!({
        "name": name,
        "email": args.email,
        "password": args.password,
        "phone": args.phone,
        "address": address,
    });

    let input = match validate_registration(&payload) {
        Ok(input) => input,
        Err(errors) => {
            for message in errors.messages() {
                writeln!(io::stderr(), "error: {message}")?;
            }
            std::process::exit(1);
        }
    };

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;
    db::run_migrations(&pool).await?;

    let cost = HashCost::from_env();
    let passwords = PasswordService::with_cost(cost)?;
    let service = AccountService::new(Arc::new(PgAccountStore::new(pool)), Arc::new(passwords));

    let email = input.email.clone();
    match service.provision(input, role).await {
        Ok(account) => {
            println!("Created {role} account '{email}' with id {}", account.id);
            Ok(())
        }
        Err(AuthError::DuplicateIdentity) => {
            writeln!(
                io::stderr(),
                "error: an account with email '{email}' already exists."
            )?;
            std::process::exit(1);
        }
        Err(err) => Err(err.into()),
    }
}
