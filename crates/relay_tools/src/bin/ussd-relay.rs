#![forbid(unsafe_code)]

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use relay_engines::clock::SystemClock;
use relay_engines::http_transport::UreqTransport;
use relay_engines::intent_parser::KeywordIntentParser;
use relay_engines::push_dispatch::{PushDispatcher, PushDispatcherConfig};
use relay_os::capabilities::VoiceCapabilities;
use relay_os::remote_trigger::PushIntentSubmitter;
use relay_os::voice_session::{VoiceSession, VoiceSessionConfig};
use relay_storage::config_store::{ConfigStatus, ConfigStore};
use relay_storage::contacts::ContactBook;
use relay_storage::kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
use relay_storage::paths::{default_config_dir, default_session_dir};
use relay_tools::config_cli::{execute_config_command, ConfigCommand};
use relay_tools::console::{ConsoleCapture, ConsoleSpeech};
use relay_tools::contacts_cli::{execute_contacts_command, ContactKind, ContactsCommand};
use relay_tools::trigger_cli::{execute_trigger_command, report_voice_outcome, TriggerForm};
use tracing::debug;
use tracing_subscriber::EnvFilter;

type Submitter =
    PushIntentSubmitter<FileKeyValueStore, Arc<dyn KeyValueStore>, UreqTransport, SystemClock>;

#[derive(Debug, Parser)]
#[command(
    name = "ussd-relay",
    version,
    about = "Trigger mobile-money USSD sessions on a paired phone"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Manage the stored push credential and device token.
    #[command(subcommand)]
    Config(ConfigAction),
    /// Send a trigger from typed-in details.
    #[command(subcommand)]
    Trigger(TriggerAction),
    /// Run one spoken-command turn on the console.
    Voice,
    /// Manage the named recipients voice commands can use.
    #[command(subcommand)]
    Contacts(ContactsAction),
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Save {
        /// Service-account key file downloaded from the cloud console.
        #[arg(long)]
        credential: PathBuf,
        #[arg(long)]
        device_token: String,
        /// Encrypt at rest under a passphrase.
        #[arg(long)]
        encrypt: bool,
    },
    Status,
    Unlock,
    Clear,
}

#[derive(Debug, Subcommand)]
enum TriggerAction {
    SendMoney {
        #[arg(long)]
        amount: String,
        /// Phone number or saved contact name.
        #[arg(long)]
        to: String,
    },
    Pochi {
        #[arg(long)]
        amount: String,
        #[arg(long)]
        to: String,
    },
    Till {
        #[arg(long)]
        amount: String,
        #[arg(long)]
        till: String,
    },
    Paybill {
        #[arg(long)]
        amount: String,
        #[arg(long)]
        business: String,
        #[arg(long)]
        account: String,
    },
    Withdraw {
        #[arg(long)]
        amount: String,
        #[arg(long)]
        agent: String,
        #[arg(long)]
        store: String,
    },
}

#[derive(Debug, Subcommand)]
enum ContactsAction {
    Add {
        name: String,
        #[arg(long, value_enum, default_value = "phone")]
        kind: ContactKind,
        /// Phone, till, business or agent number.
        #[arg(long)]
        number: String,
        /// Paybill account number or agent store number.
        #[arg(long)]
        extra: Option<String>,
    },
    Ls,
    /// Print the phone number a name or number resolves to.
    Find { text: String },
}

fn main() -> ExitCode {
    init_tracing();
    match run(Cli::parse()) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{output}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(2)
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("USSD_RELAY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<String> {
    let config_dir = default_config_dir();
    debug!(dir = %config_dir.display(), "using config dir");
    let submitter = open_submitter(config_dir.clone());
    let contacts = ContactBook::new(FileKeyValueStore::new(config_dir));

    let output = match cli.command {
        Command::Config(action) => run_config(submitter.store(), action)?,
        Command::Trigger(action) => {
            ensure_unlocked(submitter.store(), true)?;
            execute_trigger_command(&submitter, &contacts, trigger_form(action))
                .map_err(anyhow::Error::msg)?
        }
        Command::Voice => {
            ensure_unlocked(submitter.store(), false)?;
            run_voice(submitter, contacts)?
        }
        Command::Contacts(action) => {
            execute_contacts_command(&contacts, contacts_command(action))
                .map_err(anyhow::Error::msg)?
        }
    };
    Ok(output)
}

fn open_submitter(config_dir: PathBuf) -> Submitter {
    let session: Arc<dyn KeyValueStore> = match default_session_dir() {
        Some(dir) => Arc::new(FileKeyValueStore::new(dir)),
        None => Arc::new(MemoryKeyValueStore::new()),
    };
    let store = ConfigStore::new(FileKeyValueStore::new(config_dir), session);
    let dispatcher = PushDispatcher::production(PushDispatcherConfig::from_env());
    PushIntentSubmitter::new(store, dispatcher)
}

fn run_config<D, S>(store: &ConfigStore<D, S>, action: ConfigAction) -> anyhow::Result<String>
where
    D: KeyValueStore,
    S: KeyValueStore,
{
    let output = match action {
        ConfigAction::Save {
            credential,
            device_token,
            encrypt,
        } => {
            let credential_json = fs::read_to_string(&credential)
                .with_context(|| format!("failed to read {}", credential.display()))?;
            let passphrase = if encrypt {
                Some(read_passphrase("Passphrase for the push config:", true)?)
            } else {
                None
            };
            execute_config_command(
                store,
                ConfigCommand::Save {
                    credential_json: &credential_json,
                    device_token: &device_token,
                    passphrase: passphrase.as_deref(),
                },
            )
        }
        ConfigAction::Status => execute_config_command(store, ConfigCommand::Status),
        ConfigAction::Unlock => {
            let passphrase = read_passphrase("Passphrase:", true)?;
            execute_config_command(
                store,
                ConfigCommand::Unlock {
                    passphrase: &passphrase,
                },
            )
        }
        ConfigAction::Clear => execute_config_command(store, ConfigCommand::Clear),
    };
    output.map_err(anyhow::Error::msg)
}

fn ensure_unlocked<D, S>(store: &ConfigStore<D, S>, stdin_allowed: bool) -> anyhow::Result<()>
where
    D: KeyValueStore,
    S: KeyValueStore,
{
    if store.status() != ConfigStatus::EncryptedLocked {
        return Ok(());
    }
    let passphrase = read_passphrase("Passphrase to unlock the push config:", stdin_allowed)?;
    if !store.unlock(&passphrase) {
        bail!("unlock failed: wrong passphrase or unreadable config");
    }
    Ok(())
}

fn read_passphrase(prompt: &str, stdin_allowed: bool) -> anyhow::Result<String> {
    let passphrase = if io::stdin().is_terminal() {
        rpassword::prompt_password(prompt).context("failed to read passphrase")?
    } else if stdin_allowed {
        let mut input = String::new();
        io::stdin()
            .read_to_string(&mut input)
            .context("failed to read passphrase from stdin")?;
        input.trim_end_matches(['\r', '\n']).to_string()
    } else {
        bail!("push config is locked. run: ussd-relay config unlock");
    };
    if passphrase.is_empty() {
        bail!("passphrase must not be empty");
    }
    Ok(passphrase)
}

fn run_voice(
    submitter: Submitter,
    contacts: ContactBook<FileKeyValueStore>,
) -> anyhow::Result<String> {
    let parser = KeywordIntentParser::new().context("failed to build intent parser")?;
    let caps = VoiceCapabilities {
        capture: Arc::new(ConsoleCapture::new(
            io::BufReader::new(io::stdin()),
            io::stderr(),
        )),
        speech: Arc::new(ConsoleSpeech::new(io::stdout())),
        parser: Arc::new(parser),
        contacts: Arc::new(contacts),
        submitter: Arc::new(submitter),
    };
    let session = VoiceSession::new(VoiceSessionConfig::from_env(), caps);
    let outcome = session.start();
    report_voice_outcome(&outcome).map_err(anyhow::Error::msg)
}

fn trigger_form(action: TriggerAction) -> TriggerForm {
    match action {
        TriggerAction::SendMoney { amount, to } => TriggerForm::SendMoney { amount, to },
        TriggerAction::Pochi { amount, to } => TriggerForm::Pochi { amount, to },
        TriggerAction::Till { amount, till } => TriggerForm::Till { amount, till },
        TriggerAction::Paybill {
            amount,
            business,
            account,
        } => TriggerForm::Paybill {
            amount,
            business,
            account,
        },
        TriggerAction::Withdraw {
            amount,
            agent,
            store,
        } => TriggerForm::Withdraw {
            amount,
            agent,
            store,
        },
    }
}

fn contacts_command(action: ContactsAction) -> ContactsCommand {
    match action {
        ContactsAction::Add {
            name,
            kind,
            number,
            extra,
        } => ContactsCommand::Add {
            name,
            kind,
            number,
            extra,
        },
        ContactsAction::Ls => ContactsCommand::Ls,
        ContactsAction::Find { text } => ContactsCommand::Find { text },
    }
}
