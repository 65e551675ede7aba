//! Subcommand handlers

use anyhow::{anyhow, bail, Context, Result};
use courier_core::models::{AccountId, MessageId};
use courier_core::{ComposeRequest, NewAccount, Route, Services, ThreadId};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cli::{AccountsCommand, AddAccountArgs, Command, SendArgs};
use crate::terminal::TerminalNavigator;

/// Everything a command needs, built once per invocation
pub struct Runner {
    pub services: Services,
    pub navigator: Arc<TerminalNavigator>,
    pub json: bool,
}

impl Runner {
    pub async fn run(&self, command: Command) -> Result<()> {
        let requested = command.route();
        let resolved = self.services.guard.resolve(requested);
        if resolved != requested {
            match resolved {
                Route::Login => bail!("Not signed in. Run `courier login <email>` first."),
                _ => {
                    match self.services.auth.user() {
                        Some(user) => println!("Already signed in as {}.", user.email),
                        None => println!("Already signed in."),
                    }
                    return Ok(());
                }
            }
        }

        self.services.initialize().await;

        match command {
            Command::Login { email, password } => self.login(&email, &password).await,
            Command::Register { email, password } => self.register(&email, &password).await,
            Command::Logout => {
                self.services.auth.logout();
                println!("Signed out.");
                Ok(())
            }
            Command::Status => self.status(),
            Command::Accounts { command } => match command {
                AccountsCommand::List => self.list_accounts(),
                AccountsCommand::Add(args) => self.add_account(args).await,
                AccountsCommand::Use { id } => self.use_account(id),
            },
            Command::Threads { account } => self.threads(account).await,
            Command::Messages { thread_id } => self.messages(thread_id).await,
            Command::Send(args) => self.send(args).await,
            Command::Complaints => self.complaints().await,
            Command::Suggest { message_id } => self.suggest(message_id).await,
        }
    }

    async fn login(&self, email: &str, password: &str) -> Result<()> {
        self.services.auth.login(email, password).await?;
        // A fresh session has no accounts cached yet
        self.services.initialize().await;
        println!("Signed in as {}.", email);
        if let Some(account) = self.services.accounts.active_account() {
            println!("Active account: {} ({})", account.email_address, account.id);
        }
        Ok(())
    }

    async fn register(&self, email: &str, password: &str) -> Result<()> {
        self.services.auth.register(email, password).await?;
        if self.navigator.last_route() == Some(Route::Login) {
            println!("Next: courier login {}", email);
        }
        Ok(())
    }

    fn status(&self) -> Result<()> {
        let session = self.services.auth.session();
        let active = self.services.accounts.active_account();
        if self.json {
            return print_json(&serde_json::json!({
                "authenticated": self.services.auth.is_authenticated(),
                "user": session.user,
                "active_account": active,
                "error": self.services.accounts.error(),
            }));
        }

        match session.user {
            Some(user) => println!("Signed in as {}", user.email),
            None if session.token.is_some() => println!("Signed in"),
            None => println!("Not signed in"),
        }
        if let Some(account) = active {
            println!("Active account: {} ({})", account.email_address, account.id);
        }
        if let Some(error) = self.services.accounts.error() {
            println!("Accounts unavailable: {}", error);
        }
        Ok(())
    }

    fn list_accounts(&self) -> Result<()> {
        let accounts = &self.services.accounts;
        check(accounts.error())?;
        let list = accounts.accounts();
        if self.json {
            return print_json(&list);
        }
        if list.is_empty() {
            println!("No accounts. Add one with `courier accounts add <email>`.");
        }
        let active = accounts.active_account_id();
        for account in list {
            let marker = if Some(account.id) == active { "*" } else { " " };
            println!("{} {:>4}  {}", marker, account.id, account.email_address);
        }
        Ok(())
    }

    async fn add_account(&self, args: AddAccountArgs) -> Result<()> {
        let data = NewAccount {
            email_user: args.email_user,
            imap_server: args.imap_server,
            imap_port: args.imap_port,
            smtp_server: args.smtp_server,
            smtp_port: args.smtp_port,
            password: args.password,
            ..NewAccount::new(args.email)
        };
        data.validate()?;
        debug!("Adding account {:?}", data);

        let account = self.services.accounts.add_account(&data).await?;
        println!("Added {} ({}), now active.", account.email_address, account.id);
        Ok(())
    }

    fn use_account(&self, id: AccountId) -> Result<()> {
        let accounts = &self.services.accounts;
        check(accounts.error())?;
        let account = accounts
            .accounts()
            .into_iter()
            .find(|account| account.id == id)
            .ok_or_else(|| anyhow!("No account with id {}", id))?;

        accounts.set_active_account_id(Some(id));
        println!("Active account: {} ({})", account.email_address, account.id);
        Ok(())
    }

    async fn threads(&self, account: Option<AccountId>) -> Result<()> {
        let account = account.or_else(|| self.services.accounts.active_account_id());
        if account.is_none() {
            check(self.services.accounts.error())?;
            bail!("No active account. Add one with `courier accounts add <email>`.");
        }

        let threads = &self.services.threads;
        threads.fetch_threads(account).await;
        check(threads.error())?;

        let list = threads.threads();
        if self.json {
            return print_json(&list);
        }
        if list.is_empty() {
            println!("No threads.");
        }
        for thread in list {
            let when = thread
                .last_message_at
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            println!(
                "{:<24} {:<16} {}",
                thread.id,
                when,
                thread.subject.as_deref().unwrap_or("(no subject)")
            );
        }
        Ok(())
    }

    async fn messages(&self, thread_id: String) -> Result<()> {
        let threads = &self.services.threads;
        threads.fetch_messages_for_thread(Some(ThreadId::new(thread_id))).await;
        check(threads.error())?;

        let messages = threads.active_thread_messages();
        if self.json {
            return print_json(&messages);
        }
        for message in messages {
            println!("#{} {}", message.id, message.subject.as_deref().unwrap_or("(no subject)"));
            if let Some(sender) = &message.sender_address {
                println!("From: {}", sender);
            }
            if let Some(sent) = message.sent_at.or(message.received_at) {
                println!("Date: {}", sent.to_rfc2822());
            }
            println!();
            println!("{}", message.body_text.as_deref().unwrap_or_default().trim_end());
            println!();
        }
        Ok(())
    }

    async fn send(&self, args: SendArgs) -> Result<()> {
        let from_account_id = args
            .from
            .or_else(|| self.services.accounts.active_account_id())
            .context("No sending account. Pass --from or activate an account.")?;
        let payload = ComposeRequest {
            from_account_id,
            to_recipients: args.to,
            cc_recipients: args.cc,
            bcc_recipients: args.bcc,
            subject: args.subject,
            body_text: args.body,
            body_html: args.html,
        };
        payload.validate()?;

        let compose = &self.services.compose;
        compose.send_email(&payload).await?;
        if let Some(message) = compose.success_message() {
            println!("{}", message);
        }
        compose.clear_status();
        Ok(())
    }

    async fn complaints(&self) -> Result<()> {
        let store = &self.services.complaints;
        store.fetch_complaints().await;
        check(store.error())?;

        let list = store.complaints();
        if self.json {
            return print_json(&list);
        }
        for complaint in list {
            println!(
                "[{}] {} ({}) {}",
                complaint.issue_type,
                complaint.submitter_email,
                complaint.extracted_at.format("%Y-%m-%d"),
                complaint.summary
            );
        }
        Ok(())
    }

    async fn suggest(&self, message_id: MessageId) -> Result<()> {
        let store = &self.services.suggestions;
        store.fetch_reply_suggestions(Some(message_id)).await;
        check(store.error())?;

        let suggestions = store.suggestions();
        if self.json {
            return print_json(&suggestions);
        }
        if suggestions.is_empty() {
            info!(message_id, "No suggestions returned");
            println!("No suggestions for message {}.", message_id);
        }
        for (index, suggestion) in suggestions.iter().enumerate() {
            println!("{}. {}", index + 1, suggestion);
        }
        Ok(())
    }
}

/// Turn a store error into a command failure
fn check(error: Option<String>) -> Result<()> {
    match error {
        Some(message) => Err(anyhow!(message)),
        None => Ok(()),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
