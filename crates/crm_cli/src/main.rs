//! Command-line transport over the registry service.
//!
//! # Responsibility
//! - Parse commands into domain requests and print domain values as JSON.
//! - Map repository error kinds to process exit codes.
//!
//! # Invariants
//! - Every command requires a non-empty `--principal`.
//! - No business rule lives here; the core validates everything.

use clap::{Args, Parser, Subcommand};
use crm_core::{
    default_log_level, init_logging, AccountDefaults, BankAccountPatch, CallContext,
    Cancellation, ErrorKind, NewBankAccount, NewLegalEntity, Principal, RepoError, Store,
    StoreConfig, SqliteRegistryService,
};
use log::info;
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "crm", version, about = "Legal entity and bank account registry")]
struct Cli {
    /// SQLite database file.
    #[arg(long, default_value = "crm.sqlite3", conflicts_with = "memory")]
    db: PathBuf,
    /// Use a throwaway in-memory database.
    #[arg(long)]
    memory: bool,
    /// Opaque caller token passed through to the core.
    #[arg(long)]
    principal: String,
    /// trace|debug|info|warn|error
    #[arg(long)]
    log_level: Option<String>,
    /// Absolute directory for rolling log files. Logs go to stderr when omitted.
    #[arg(long)]
    log_dir: Option<String>,
    /// Abort the command after this many milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Currency applied when `account create` omits one.
    #[arg(long, default_value = "RUB")]
    default_currency: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Legal entity operations.
    #[command(subcommand)]
    Entity(EntityCommand),
    /// Bank account operations.
    #[command(subcommand)]
    Account(AccountCommand),
}

#[derive(Debug, Subcommand)]
enum EntityCommand {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        id: Option<Uuid>,
    },
    List,
    Get {
        id: Uuid,
    },
    Rename {
        id: Uuid,
        #[arg(long)]
        name: String,
    },
    Delete {
        id: Uuid,
    },
    /// Show an entity together with its bank accounts.
    Accounts {
        id: Uuid,
    },
}

#[derive(Debug, Subcommand)]
enum AccountCommand {
    Create(CreateAccountArgs),
    List,
    Get {
        id: Uuid,
    },
    Update(UpdateAccountArgs),
    Delete {
        id: Uuid,
    },
}

#[derive(Debug, Args)]
struct CreateAccountArgs {
    #[arg(long)]
    entity: Uuid,
    #[arg(long)]
    bic: String,
    #[arg(long)]
    bank_name: String,
    #[arg(long)]
    correspondent_account: String,
    #[arg(long)]
    payment_account: String,
    #[arg(long)]
    bank_address: Option<String>,
    #[arg(long)]
    currency: Option<String>,
    #[arg(long)]
    comment: Option<String>,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    primary: bool,
}

#[derive(Debug, Args)]
struct UpdateAccountArgs {
    id: Uuid,
    #[arg(long)]
    bic: Option<String>,
    #[arg(long)]
    bank_name: Option<String>,
    #[arg(long)]
    bank_address: Option<String>,
    #[arg(long)]
    correspondent_account: Option<String>,
    #[arg(long)]
    payment_account: Option<String>,
    #[arg(long)]
    currency: Option<String>,
    #[arg(long)]
    comment: Option<String>,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    primary: Option<bool>,
}

/// Failure surfaced to the shell with its exit code.
#[derive(Debug)]
struct CliFailure {
    code: u8,
    message: String,
}

impl From<RepoError> for CliFailure {
    fn from(err: RepoError) -> Self {
        Self {
            code: exit_code_for(err.kind()),
            message: err.to_string(),
        }
    }
}

fn exit_code_for(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Store => 1,
        ErrorKind::Validation => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::Conflict => 4,
        ErrorKind::Canceled => 5,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(failure) => {
            eprintln!("error: {}", failure.message);
            ExitCode::from(failure.code)
        }
    }
}

fn run(cli: Cli) -> Result<String, CliFailure> {
    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    init_logging(level, cli.log_dir.as_deref()).map_err(usage_failure)?;

    let principal = Principal::new(cli.principal.as_str())
        .map_err(|err| usage_failure(err.to_string()))?;
    let cancellation = match cli.timeout_ms {
        Some(ms) => Cancellation::with_timeout(Duration::from_millis(ms)),
        None => Cancellation::new(),
    };
    let ctx = CallContext::with_cancellation(principal, cancellation);

    let config = if cli.memory {
        StoreConfig::memory()
    } else {
        StoreConfig::file(cli.db.clone())
    };
    let store = Store::open(config).map_err(RepoError::from)?;
    let defaults = AccountDefaults {
        currency: cli.default_currency.clone(),
        ..AccountDefaults::default()
    };
    let service = SqliteRegistryService::sqlite(store, defaults);

    info!("event=cli_command module=cli status=start command={:?}", cli.command);
    let value = match cli.command {
        Command::Entity(command) => run_entity(&service, &ctx, command)?,
        Command::Account(command) => run_account(&service, &ctx, command)?,
    };

    serde_json::to_string_pretty(&value).map_err(|err| CliFailure {
        code: 1,
        message: format!("failed to encode output: {err}"),
    })
}

fn run_entity(
    service: &SqliteRegistryService,
    ctx: &CallContext,
    command: EntityCommand,
) -> Result<Value, CliFailure> {
    let value = match command {
        EntityCommand::Create { name, id } => {
            let request = NewLegalEntity { id, name };
            to_json(&service.create_legal_entity(ctx, &request)?)?
        }
        EntityCommand::List => to_json(&service.list_legal_entities(ctx)?)?,
        EntityCommand::Get { id } => to_json(&service.get_legal_entity(ctx, id)?)?,
        EntityCommand::Rename { id, name } => {
            to_json(&service.update_legal_entity_name(ctx, id, &name)?)?
        }
        EntityCommand::Delete { id } => {
            service.delete_legal_entity(ctx, id)?;
            serde_json::json!({ "deleted": id })
        }
        EntityCommand::Accounts { id } => {
            to_json(&service.get_legal_entity_with_accounts(ctx, id)?)?
        }
    };
    Ok(value)
}

fn run_account(
    service: &SqliteRegistryService,
    ctx: &CallContext,
    command: AccountCommand,
) -> Result<Value, CliFailure> {
    let value = match command {
        AccountCommand::Create(args) => {
            let request = NewBankAccount {
                id: None,
                legal_entity_id: args.entity,
                name: args.name,
                bic: args.bic,
                bank_name: args.bank_name,
                bank_address: args.bank_address,
                correspondent_account: args.correspondent_account,
                payment_account: args.payment_account,
                currency: args.currency,
                comment: args.comment,
                is_primary: args.primary,
            };
            to_json(&service.create_bank_account(ctx, &request)?)?
        }
        AccountCommand::List => to_json(&service.list_bank_accounts(ctx)?)?,
        AccountCommand::Get { id } => to_json(&service.get_bank_account(ctx, id)?)?,
        AccountCommand::Update(args) => {
            let patch = BankAccountPatch {
                name: args.name,
                bic: args.bic,
                bank_name: args.bank_name,
                bank_address: args.bank_address,
                correspondent_account: args.correspondent_account,
                payment_account: args.payment_account,
                currency: args.currency,
                comment: args.comment,
                is_primary: args.primary,
            };
            to_json(&service.update_bank_account(ctx, args.id, &patch)?)?
        }
        AccountCommand::Delete { id } => {
            service.delete_bank_account(ctx, id)?;
            serde_json::json!({ "deleted": id })
        }
    };
    Ok(value)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, CliFailure> {
    serde_json::to_value(value).map_err(|err| CliFailure {
        code: 1,
        message: format!("failed to encode output: {err}"),
    })
}

fn usage_failure(message: String) -> CliFailure {
    CliFailure { code: 64, message }
}
