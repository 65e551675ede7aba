//! Command line arguments

use clap::{Args, Parser, Subcommand};
use courier_core::models::{AccountId, MessageId};
use courier_core::Route;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// API server, overriding the configuration
    #[arg(long, global = true, env = "COURIER_API_URL")]
    pub api_url: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in and store the session
    Login {
        email: String,
        #[arg(long, env = "COURIER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create a user on the server
    Register {
        email: String,
        #[arg(long, env = "COURIER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show session and active account
    Status,
    /// Manage mailbox accounts
    Accounts {
        #[command(subcommand)]
        command: AccountsCommand,
    },
    /// List threads of an account
    Threads {
        /// Account to list; defaults to the active one
        #[arg(long)]
        account: Option<AccountId>,
    },
    /// Show the messages of a thread
    Messages { thread_id: String },
    /// Send an email from the active account
    Send(SendArgs),
    /// List extracted complaints and suggestions
    Complaints,
    /// Ask for reply suggestions to a message
    Suggest { message_id: MessageId },
}

#[derive(Subcommand, Debug)]
pub enum AccountsCommand {
    /// List accounts
    List,
    /// Connect a new mailbox
    Add(AddAccountArgs),
    /// Make an account active
    Use { id: AccountId },
}

#[derive(Args, Debug)]
pub struct AddAccountArgs {
    pub email: String,
    /// Login name, when it differs from the address
    #[arg(long)]
    pub email_user: Option<String>,
    #[arg(long)]
    pub imap_server: Option<String>,
    #[arg(long)]
    pub imap_port: Option<u16>,
    #[arg(long)]
    pub smtp_server: Option<String>,
    #[arg(long)]
    pub smtp_port: Option<u16>,
    /// Mailbox password
    #[arg(long, env = "COURIER_ACCOUNT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Sending account; defaults to the active one
    #[arg(long)]
    pub from: Option<AccountId>,
    #[arg(long, required = true)]
    pub to: Vec<String>,
    #[arg(long)]
    pub cc: Vec<String>,
    #[arg(long)]
    pub bcc: Vec<String>,
    #[arg(long)]
    pub subject: String,
    #[arg(long)]
    pub body: String,
    /// HTML alternative of the body
    #[arg(long)]
    pub html: Option<String>,
}

impl Command {
    /// View this command stands in for
    pub fn route(&self) -> Route {
        match self {
            Command::Login { .. } => Route::Login,
            Command::Register { .. } => Route::Register,
            Command::Logout | Command::Status => Route::About,
            Command::Accounts { .. } => Route::EmailAccounts,
            Command::Threads { .. }
            | Command::Messages { .. }
            | Command::Send(_)
            | Command::Complaints
            | Command::Suggest { .. } => Route::Home,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_send_collects_recipients() {
        let cli = Cli::try_parse_from([
            "courier", "send", "--to", "a@example.com", "--to", "b@example.com", "--subject", "Hi", "--body", "Hello",
        ])
        .unwrap();

        match cli.command {
            Command::Send(args) => {
                assert_eq!(args.to, vec!["a@example.com", "b@example.com"]);
                assert!(args.cc.is_empty());
                assert_eq!(args.from, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_routes() {
        let cli = Cli::try_parse_from(["courier", "accounts", "use", "3"]).unwrap();
        assert_eq!(cli.command.route(), Route::EmailAccounts);

        let cli = Cli::try_parse_from(["courier", "--debug", "suggest", "12"]).unwrap();
        assert!(cli.debug);
        assert_eq!(cli.command.route(), Route::Home);
    }

    #[test]
    fn test_send_requires_recipient() {
        assert!(Cli::try_parse_from(["courier", "send", "--subject", "Hi", "--body", "x"]).is_err());
    }
}
