use clap::{Parser, Subcommand};
use redb::Database;
use researchdesk_backend::config::Config;
use researchdesk_backend::models::db_operations::accounts_db_operations;
use researchdesk_backend::models::Role;
use researchdesk_backend::setup::db_setup;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "setup_cli", author, version, about = "A CLI for initial ResearchDesk setup.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand, Debug)]
enum DbAction {
    /// Create the databases. Pass `accounts` or `content` to set up only one.
    Setup { db_type: Option<String> },
}

#[derive(Subcommand, Debug)]
enum AdminAction {
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    List,
    ChangePassword {
        #[arg(long)]
        email: String,
        #[arg(long)]
        new_password: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match Config::from_env(&cli.env_file) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(&config.log_level));

    match &cli.command {
        Commands::Db { action } => match action {
            DbAction::Setup { db_type } => match db_type.as_deref() {
                Some("accounts") => setup_accounts_database(&config),
                Some("content") => setup_content_database(&config),
                Some(other) => eprintln!(
                    "❌ Error: Unknown database type '{}'. Use 'accounts' or 'content'.",
                    other
                ),
                None => {
                    setup_accounts_database(&config);
                    setup_content_database(&config);
                }
            },
        },
        Commands::Admin { action } => match action {
            AdminAction::Create { email, password } => create_admin(&config, email, password),
            AdminAction::List => list_admins(&config),
            AdminAction::ChangePassword { email, new_password } => {
                change_admin_password(&config, email, new_password)
            }
        },
    }
}

fn open_accounts(config: &Config) -> Option<Connection> {
    let db_path = config.accounts_db_path();
    if !db_path.exists() {
        eprintln!(
            "❌ Error: Accounts database not found at '{}'. Please run `setup_cli db setup` first.",
            db_path.display()
        );
        return None;
    }
    match Connection::open(&db_path) {
        Ok(conn) => Some(conn),
        Err(e) => {
            eprintln!("❌ Error opening accounts database: {}", e);
            None
        }
    }
}

fn setup_accounts_database(config: &Config) {
    let db_path = config.accounts_db_path();
    if let Some(parent_dir) = db_path.parent() {
        if let Err(e) = fs::create_dir_all(parent_dir) {
            eprintln!("❌ Could not create database directory: {}", e);
            return;
        }
    }
    println!("\nSetting up accounts database at '{}'...", db_path.display());

    let mut conn = match Connection::open(&db_path) {
        Ok(conn) => conn,
        Err(e) => {
            eprintln!("❌ Could not create accounts database file: {}", e);
            return;
        }
    };
    match db_setup::setup_accounts_db(&mut conn) {
        Ok(_) => println!("✅ Accounts database setup completed successfully."),
        Err(e) => eprintln!("❌ Error setting up accounts database: {}", e),
    }
}

fn setup_content_database(config: &Config) {
    let db_path = config.content_db_path();
    if let Some(parent_dir) = db_path.parent() {
        if let Err(e) = fs::create_dir_all(parent_dir) {
            eprintln!("❌ Could not create database directory: {}", e);
            return;
        }
    }
    println!("\nSetting up content database at '{}'...", db_path.display());

    let db = match Database::create(&db_path) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("❌ Failed to create content database file: {}", e);
            return;
        }
    };
    match db_setup::setup_content_db(&db) {
        Ok(_) => println!("✅ Content database setup completed successfully."),
        Err(e) => eprintln!("❌ Error setting up content database: {}", e),
    }
}

fn create_admin(config: &Config, email: &str, password: &str) {
    let Some(conn) = open_accounts(config) else { return };
    match accounts_db_operations::create_account(&conn, email, password, Role::Admin, None) {
        Ok(_) => println!("✅ Admin '{}' created successfully.", email),
        Err(e) if accounts_db_operations::is_unique_violation(&e) => {
            eprintln!("❌ Error: An account with email '{}' already exists.", email)
        }
        Err(e) => eprintln!("❌ Error creating admin: {}", e),
    }
}

fn list_admins(config: &Config) {
    let Some(conn) = open_accounts(config) else { return };
    match accounts_db_operations::read_accounts_by_role(&conn, Role::Admin) {
        Ok(admins) => {
            println!("Listing admins:");
            for admin in admins {
                let state = if admin.is_active { "active" } else { "suspended" };
                println!("- {} ({})", admin.email, state);
            }
        }
        Err(e) => eprintln!("❌ Error fetching admins: {}", e),
    }
}

fn change_admin_password(config: &Config, email: &str, new_password: &str) {
    let Some(conn) = open_accounts(config) else { return };
    match accounts_db_operations::update_password(&conn, email, Role::Admin, new_password) {
        Ok(0) => eprintln!("❌ Error: No admin with email '{}' found.", email),
        Ok(_) => println!("✅ Password for admin '{}' changed successfully.", email),
        Err(e) => eprintln!("❌ Error updating password: {}", e),
    }
}
