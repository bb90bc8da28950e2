use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

use kyber_wallet_sync::api::{ExplorerClient, KyberClient};
use kyber_wallet_sync::config::{self, Config, NetworkDescriptor};
use kyber_wallet_sync::coordinators::{
    HistorySyncTask, NotificationSyncTask, PollOutcome, RateCoordinator, SyncService,
    TokenSyncTask,
};
use kyber_wallet_sync::db::{StorageManager, WalletStore};
use kyber_wallet_sync::events::EventBus;
use kyber_wallet_sync::models::Contact;
use kyber_wallet_sync::utils::{format_rate, format_units, short_address};
use kyber_wallet_sync::web3::{ens, parse_address, RpcClient, Web3Service};

#[derive(Parser)]
#[command(name = "kyber-sync", version, about = "KyberSwap wallet data sync")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every sync coordinator until Ctrl+C
    Run,
    /// Poll rates once and print the table
    Rates,
    /// Sync the token catalog once and list it
    Tokens,
    /// Read an ETH or ERC-20 balance
    Balance {
        /// Owner address or ENS name
        #[arg(long)]
        owner: String,
        /// Token contract, ETH when omitted
        #[arg(long)]
        token: Option<String>,
    },
    /// Resolve an ENS name
    Resolve { name: String },
    /// Manage the wallet's address book
    Contacts {
        #[command(subcommand)]
        action: ContactsCommand,
    },
}

#[derive(Subcommand)]
enum ContactsCommand {
    List,
    Add { address: String, name: String },
    Remove { address: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment variables
    dotenv().ok();

    // Initialize logging
    init_logger();

    let cli = Cli::parse();

    // Load configuration
    let config = config::load_config()?;
    let network = config.network().context("Failed to resolve network descriptor")?;
    info!(
        "Environment {} (chain {})",
        config.environment,
        network.chain_id()
    );

    match cli.command {
        Command::Run => run(&config, &network).await,
        Command::Rates => rates(&config, &network).await,
        Command::Tokens => tokens(&config, &network).await,
        Command::Balance { owner, token } => balance(&network, &owner, token.as_deref()).await,
        Command::Resolve { name } => resolve(&network, &name).await,
        Command::Contacts { action } => contacts(&config, &network, action).await,
    }
}

fn init_logger() {
    env_logger::init_from_env(env_logger::Env::default().filter_or("RUST_LOG", "info"));
}

async fn open_storage(config: &Config, network: &NetworkDescriptor, events: EventBus) -> Result<Arc<StorageManager>> {
    let storage = StorageManager::open(&config.data_dir, network.chain_id(), events)
        .await
        .with_context(|| format!("Failed to open stores in {}", config.data_dir.display()))?
        .with_seed_tokens(network.tokens.clone());
    Ok(Arc::new(storage))
}

async fn open_wallet(config: &Config, storage: &StorageManager) -> Result<WalletStore> {
    let address = config
        .wallet_address
        .as_deref()
        .context("WALLET_ADDRESS must be set for this command")?;
    let wallet = storage
        .switch_wallet(address)
        .await
        .with_context(|| format!("Failed to open wallet {}", address))?;
    Ok(wallet)
}

fn web3_service(network: &NetworkDescriptor) -> Result<Web3Service> {
    let transport = Arc::new(RpcClient::new(&network.endpoint));
    Ok(Web3Service::new(transport, network)?)
}

async fn run(config: &Config, network: &NetworkDescriptor) -> Result<()> {
    info!("Starting wallet sync...");

    let events = EventBus::new();
    let storage = open_storage(config, network, events.clone()).await?;
    if config.wallet_address.is_some() {
        open_wallet(config, &storage).await?;
    } else {
        warn!("WALLET_ADDRESS not set, token and history sync will idle");
    }

    let kyber = Arc::new(KyberClient::new(network)?);
    let explorer = Arc::new(ExplorerClient::new(network)?);

    let service = SyncService {
        rates: RateCoordinator::new(kyber.clone(), events.clone(), config.rate_interval()),
        tokens: TokenSyncTask::new(kyber.clone(), storage.clone())
            .coordinator(config.token_sync_interval()),
        notifications: NotificationSyncTask::new(kyber, storage.clone())
            .coordinator(config.notification_interval()),
        history: HistorySyncTask::new(explorer, storage.clone())
            .coordinator(config.history_interval()),
    };

    // Log every event until shutdown
    let mut rx = events.subscribe();
    let event_log = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => info!("Event: {:?}", event),
                Err(RecvError::Lagged(skipped)) => warn!("Event log lagged, {} events skipped", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    service.resume_all();

    // Wait for Ctrl+C signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    // Fetches still in flight are discarded once paused
    service.pause_all();
    event_log.abort();
    let _ = tokio::time::timeout(Duration::from_secs(5), storage.close()).await;

    info!("Shutting down...");
    Ok(())
}

async fn rates(config: &Config, network: &NetworkDescriptor) -> Result<()> {
    let kyber = Arc::new(KyberClient::new(network)?);
    let rates = RateCoordinator::new(kyber, EventBus::new(), config.rate_interval());

    if rates.poll_once().await != PollOutcome::Applied {
        anyhow::bail!("Rate poll failed, see log for details");
    }

    let table = rates.snapshot().await;
    let mut pairs: Vec<_> = table.rates().collect();
    pairs.sort_by(|a, b| (&a.source, &a.dest).cmp(&(&b.source, &b.dest)));
    for rate in pairs {
        println!("{:>6} -> {:<6} {}", rate.source, rate.dest, format_rate(rate.rate));
    }

    let mut usd: Vec<_> = table.usd_rates().collect();
    usd.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    for rate in usd {
        println!("{:>6} ${} ({:+.2}%)", rate.symbol, format_rate(rate.price_usd), rate.change_24h);
    }
    Ok(())
}

async fn tokens(config: &Config, network: &NetworkDescriptor) -> Result<()> {
    let storage = open_storage(config, network, EventBus::new()).await?;
    let wallet = open_wallet(config, &storage).await?;

    let kyber = Arc::new(KyberClient::new(network)?);
    let sync = TokenSyncTask::new(kyber, storage.clone()).coordinator(config.token_sync_interval());
    if sync.poll_once().await != PollOutcome::Applied {
        warn!("Token sync failed, listing cached catalog");
    }

    for token in wallet.tokens().await? {
        let flags = match (token.is_custom, token.is_hidden) {
            (true, true) => " [custom, hidden]",
            (true, false) => " [custom]",
            (false, true) => " [hidden]",
            (false, false) => "",
        };
        println!("{:<8} {} {}{}", token.symbol, short_address(&token.address), token.name, flags);
    }

    storage.close().await;
    Ok(())
}

async fn balance(network: &NetworkDescriptor, owner: &str, token: Option<&str>) -> Result<()> {
    let web3 = web3_service(network)?;

    let owner = if ens::is_ens_name(owner) {
        web3.resolve_ens(owner)
            .await?
            .with_context(|| format!("{} does not resolve to an address", owner))?
    } else {
        parse_address(owner)?
    };
    let token = parse_address(token.unwrap_or(network.eth_address.as_str()))?;

    let (amount, decimals) = futures::try_join!(web3.token_balance(token, owner), web3.token_decimals(token))?;
    println!("{}", format_units(amount, decimals));
    Ok(())
}

async fn resolve(network: &NetworkDescriptor, name: &str) -> Result<()> {
    let web3 = web3_service(network)?;
    match web3.resolve_ens(name).await? {
        Some(address) => println!("{}", address),
        None => anyhow::bail!("{} has no address record", name),
    }
    Ok(())
}

async fn contacts(config: &Config, network: &NetworkDescriptor, action: ContactsCommand) -> Result<()> {
    let storage = open_storage(config, network, EventBus::new()).await?;
    let wallet = open_wallet(config, &storage).await?;

    match action {
        ContactsCommand::List => {
            for contact in wallet.contacts().await? {
                println!(
                    "{:<20} {} (last used {})",
                    contact.name,
                    contact.address,
                    contact.last_used.format("%Y-%m-%d %H:%M")
                );
            }
        }
        ContactsCommand::Add { address, name } => {
            wallet
                .upsert_contact(Contact::new(&address, &name))
                .await
                .with_context(|| format!("Failed to save contact {}", name))?;
            info!("Saved contact {} ({})", name, short_address(&address));
        }
        ContactsCommand::Remove { address } => {
            if !wallet.delete_contact(&address).await? {
                warn!("No contact with address {}", address);
            }
        }
    }

    storage.close().await;
    Ok(())
}
