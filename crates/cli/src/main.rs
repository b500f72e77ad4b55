mod args;
mod commands;
mod serve;
mod view;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use taskripple_ledger::storage::TransactionFilter;
use taskripple_ledger::{Decision, NewTask, Proof, Registration};
use tracing_subscriber::EnvFilter;

use crate::args::{KindArg, ProofTypeArg, RoleArg, StatusArg, TxStatusArg};
use crate::commands::{account, admin, tasks, CliError, Session};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// TaskRipple ledger and account lifecycle engine.
#[derive(Parser)]
#[command(
    name = "taskripple",
    version,
    about = "TaskRipple ledger and account lifecycle engine"
)]
struct Cli {
    /// Directory holding the JSON record collections
    #[arg(
        long,
        global = true,
        env = "TASKRIPPLE_DATA_DIR",
        default_value = "taskripple-data"
    )]
    data_dir: PathBuf,

    /// Ledger configuration file (TOML); falls back to TASKRIPPLE_CONFIG
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Account id to act as
    #[arg(long = "as", global = true, value_name = "ACCOUNT_ID")]
    as_account: Option<String>,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress error messages
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the administrator account and starter tasks into an empty store
    Init,

    /// Register a new account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        secret: String,
        /// Referral code of the referring account
        #[arg(long)]
        referral_code: Option<String>,
    },

    /// Check credentials and print the account id to use with --as
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        secret: String,
    },

    /// Submit the activation fee payment for review
    Activate {
        /// Payment reference (e.g. exchange transaction id)
        #[arg(long)]
        payment_ref: String,
        /// Reference to the payment proof image
        #[arg(long)]
        proof_ref: String,
    },

    /// Browse and manage the task catalog
    Tasks {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Submit proof for a task
    Submit {
        task_id: String,
        /// Text proof
        #[arg(long)]
        text: Option<String>,
        /// Reference to a hosted proof image
        #[arg(long)]
        image: Option<String>,
    },

    /// List the caller's task submissions
    Submissions,

    /// Request a withdrawal of part of the balance
    Withdraw {
        amount: Decimal,
        /// Payout destination reference
        #[arg(long)]
        payment_ref: String,
    },

    /// Transaction history, newest first
    History {
        #[arg(long, value_enum)]
        kind: Option<KindArg>,
        #[arg(long, value_enum)]
        status: Option<TxStatusArg>,
    },

    /// Direct referrals of the caller
    Referrals {
        /// Show the whole downline grouped by level
        #[arg(long)]
        downline: bool,
    },

    /// Dashboard numbers (platform-wide for administrators)
    Overview,

    /// Administrative actions
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Recompute balances from completed transactions and report drift
    Reconcile,

    /// Start the HTTP JSON API server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8080")]
        port: u16,
    },
}

#[derive(Subcommand)]
enum TaskCommands {
    /// List tasks
    List {
        #[arg(long, value_enum)]
        proof_type: Option<ProofTypeArg>,
    },
    /// Create a task
    Create {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        reward: Decimal,
        /// Requirement line; repeat for several
        #[arg(long = "requirement")]
        requirements: Vec<String>,
        #[arg(long, value_enum)]
        proof_type: ProofTypeArg,
    },
    /// Delete a task
    Delete { task_id: String },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Approve a pending activation deposit and pay referral commissions
    ApproveActivation { transaction_id: String },
    /// Reject a pending activation deposit
    RejectActivation { transaction_id: String },
    /// Approve a pending submission and credit its reward
    ApproveSubmission { submission_id: String },
    /// Reject a pending submission
    RejectSubmission { submission_id: String },
    /// Approve a pending withdrawal and debit the balance
    ApproveWithdrawal { transaction_id: String },
    /// Reject a pending withdrawal
    RejectWithdrawal { transaction_id: String },
    /// Change an account's status
    SetStatus {
        account_id: String,
        #[arg(value_enum)]
        status: StatusArg,
    },
    /// Change an account's role
    SetRole {
        account_id: String,
        #[arg(value_enum)]
        role: RoleArg,
    },
    /// List all accounts
    Users,
    /// List transactions across all accounts, newest first
    Transactions {
        #[arg(long)]
        user: Option<String>,
        #[arg(long, value_enum)]
        kind: Option<KindArg>,
        #[arg(long, value_enum)]
        status: Option<TxStatusArg>,
    },
    /// Show everything awaiting review
    Pending,
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let output = cli.output;
    let quiet = cli.quiet;
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            report_error(&format!("failed to start runtime: {}", e), "runtime", output, quiet);
            process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(run(cli)) {
        report_error(&e.to_string(), e.code(), output, quiet);
        process::exit(1);
    }
}

/// Diagnostics go to stderr; RUST_LOG overrides the default `info` level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let platform = commands::open_platform(&cli.data_dir, cli.config.as_deref()).await?;
    let session = Session::new(platform, cli.as_account, cli.output);

    match cli.command {
        Commands::Init => account::cmd_init(&session).await,
        Commands::Register {
            name,
            email,
            phone,
            secret,
            referral_code,
        } => {
            let registration = Registration {
                full_name: name,
                email,
                phone,
                secret,
                referral_code,
            };
            account::cmd_register(&session, registration).await
        }
        Commands::Login { email, secret } => account::cmd_login(&session, &email, &secret).await,
        Commands::Activate {
            payment_ref,
            proof_ref,
        } => account::cmd_activate(&session, &payment_ref, &proof_ref).await,
        Commands::Tasks { command } => match command {
            TaskCommands::List { proof_type } => {
                tasks::cmd_list(&session, proof_type.map(Into::into)).await
            }
            TaskCommands::Create {
                title,
                description,
                reward,
                requirements,
                proof_type,
            } => {
                let task = NewTask {
                    title,
                    description,
                    reward,
                    requirements,
                    proof_type: proof_type.into(),
                };
                tasks::cmd_create(&session, task).await
            }
            TaskCommands::Delete { task_id } => tasks::cmd_delete(&session, &task_id).await,
        },
        Commands::Submit {
            task_id,
            text,
            image,
        } => {
            let proof = Proof {
                text,
                image_ref: image,
            };
            tasks::cmd_submit(&session, &task_id, proof).await
        }
        Commands::Submissions => tasks::cmd_my_submissions(&session).await,
        Commands::Withdraw {
            amount,
            payment_ref,
        } => account::cmd_withdraw(&session, amount, &payment_ref).await,
        Commands::History { kind, status } => {
            account::cmd_history(&session, kind.map(Into::into), status.map(Into::into)).await
        }
        Commands::Referrals { downline } => account::cmd_referrals(&session, downline).await,
        Commands::Overview => account::cmd_overview(&session).await,
        Commands::Admin { command } => run_admin(&session, command).await,
        Commands::Reconcile => admin::cmd_reconcile(&session).await,
        Commands::Serve { port } => serve::start_server(session.platform, port).await,
    }
}

async fn run_admin(session: &Session, command: AdminCommands) -> Result<(), CliError> {
    match command {
        AdminCommands::ApproveActivation { transaction_id } => {
            admin::cmd_approve_activation(session, &transaction_id).await
        }
        AdminCommands::RejectActivation { transaction_id } => {
            admin::cmd_reject_activation(session, &transaction_id).await
        }
        AdminCommands::ApproveSubmission { submission_id } => {
            admin::cmd_decide_submission(session, &submission_id, Decision::Approved).await
        }
        AdminCommands::RejectSubmission { submission_id } => {
            admin::cmd_decide_submission(session, &submission_id, Decision::Rejected).await
        }
        AdminCommands::ApproveWithdrawal { transaction_id } => {
            admin::cmd_approve_withdrawal(session, &transaction_id).await
        }
        AdminCommands::RejectWithdrawal { transaction_id } => {
            admin::cmd_reject_withdrawal(session, &transaction_id).await
        }
        AdminCommands::SetStatus { account_id, status } => {
            admin::cmd_set_status(session, &account_id, status.into()).await
        }
        AdminCommands::SetRole { account_id, role } => {
            admin::cmd_set_role(session, &account_id, role.into()).await
        }
        AdminCommands::Users => admin::cmd_users(session).await,
        AdminCommands::Transactions { user, kind, status } => {
            let mut filter = TransactionFilter::all();
            if let Some(user) = &user {
                filter = filter.user(user);
            }
            if let Some(kind) = kind {
                filter = filter.kind(kind.into());
            }
            if let Some(status) = status {
                filter = filter.status(status.into());
            }
            admin::cmd_transactions(session, &filter).await
        }
        AdminCommands::Pending => admin::cmd_pending(session).await,
    }
}

/// Report an error in the requested output format.
pub(crate) fn report_error(msg: &str, code: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("error: {}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg, "code": code }));
        }
    }
}
