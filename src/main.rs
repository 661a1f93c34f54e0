use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use spendbook::api::ItemUpdate;
use spendbook::callback::callback_routes;
use spendbook::{
    BudgetStore, CategoriesStore, CategoryId, Config, CustomerId, ItemId, ItemsStore,
    ResourceState, SessionManager, SessionSnapshot, SessionState, Summary,
};

#[derive(Parser)]
#[command(name = "spendbook", about = "Household budget tracker", version)]
struct Cli {
    /// Customer id for backend calls (defaults to the signed-in email)
    #[arg(long, global = true, env = "SPENDBOOK_CUSTOMER")]
    customer: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in through the hosted UI
    Login,
    /// Clear the local session
    Logout {
        /// Also print the provider sign-out URL
        #[arg(long)]
        provider: bool,
    },
    /// Show the signed-in profile
    Whoami,
    /// Monthly budget
    #[command(subcommand)]
    Budget(BudgetCommand),
    /// Spending categories
    #[command(subcommand)]
    Categories(CategoryCommand),
    /// Purchase line items
    #[command(subcommand)]
    Items(ItemCommand),
    /// Spending totals against the budget
    Summary,
}

#[derive(Subcommand)]
enum BudgetCommand {
    Get,
    Set { amount: f64 },
}

#[derive(Subcommand)]
enum CategoryCommand {
    List,
    Add { name: String },
    Rename { category_id: String, name: String },
    Remove { category_id: String },
}

#[derive(Subcommand)]
enum ItemCommand {
    List,
    Add {
        label: String,
        #[arg(long)]
        price: Option<f64>,
    },
    Edit {
        item_id: String,
        #[arg(long)]
        price: f64,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        created: Option<i64>,
    },
    Remove { item_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Login => login(&config).await?,
        Commands::Logout { provider } => {
            let manager = SessionManager::new(config.auth_client(), config.storage());
            manager.logout();
            println!("Signed out.");
            if provider {
                println!("{}", manager.logout_url());
            }
        }
        Commands::Whoami => {
            let session = session(&config)?;
            let profile = session.profile.context("session has no profile")?;
            println!("{}", profile.email);
            if let Some(name) = profile.name {
                println!("{name}");
            }
        }
        Commands::Budget(command) => {
            let customer = customer(cli.customer, &config)?;
            let store = BudgetStore::new(config.api_client()?);
            match command {
                BudgetCommand::Get => {
                    store.fetch(&customer).await;
                    println!("{}", loaded(store.state())?);
                }
                BudgetCommand::Set { amount } => {
                    store.save(&customer, amount).await?;
                    println!("Budget set to {amount}");
                }
            }
        }
        Commands::Categories(command) => {
            let customer = customer(cli.customer, &config)?;
            let store = CategoriesStore::new(config.api_client()?);
            match command {
                CategoryCommand::List => store.fetch(&customer).await,
                CategoryCommand::Add { name } => {
                    let id = store.add(&customer, &name).await?;
                    println!("Added {id}");
                }
                CategoryCommand::Rename { category_id, name } => {
                    store
                        .rename(&customer, &CategoryId::from(category_id), &name)
                        .await?;
                }
                CategoryCommand::Remove { category_id } => {
                    store.remove(&customer, &CategoryId::from(category_id)).await?;
                }
            }
            for category in loaded(store.state())? {
                println!("{}\t{}", category.category_id, category.name);
            }
        }
        Commands::Items(command) => {
            let customer = customer(cli.customer, &config)?;
            let store = ItemsStore::new(config.api_client()?);
            match command {
                ItemCommand::List => store.fetch(&customer).await,
                ItemCommand::Add { label, price } => {
                    let id = store.add(&customer, &label, price).await?;
                    println!("Added {id}");
                }
                ItemCommand::Edit {
                    item_id,
                    price,
                    category,
                    created,
                } => {
                    store
                        .edit(&ItemUpdate {
                            customer_id: customer.clone(),
                            item_id: ItemId::from(item_id),
                            category_id: category.map(CategoryId::from),
                            price,
                            created,
                        })
                        .await?;
                }
                ItemCommand::Remove { item_id } => {
                    store.remove(&customer, &ItemId::from(item_id)).await?;
                }
            }
            for item in loaded(store.state())? {
                let price = item.price.map_or_else(|| "-".to_owned(), |p| p.to_string());
                let category = item.category_id.map(|c| c.0).unwrap_or_default();
                println!("{}\t{}\t{price}\t{category}", item.item_id, item.id);
            }
        }
        Commands::Summary => {
            let customer = customer(cli.customer, &config)?;
            let api = config.api_client()?;
            let budget = BudgetStore::new(api.clone());
            let categories = CategoriesStore::new(api.clone());
            let items = ItemsStore::new(api);
            tokio::join!(
                budget.fetch(&customer),
                categories.fetch(&customer),
                items.fetch(&customer),
            );

            let summary = Summary::compute(
                loaded(budget.state())?,
                &loaded(items.state())?,
                &loaded(categories.state())?,
            );
            println!(
                "Budget {}  Spent {}  Remaining {}",
                summary.budget, summary.spent, summary.remaining
            );
            for total in &summary.by_category {
                println!("{}\t{}\t{}", total.name, total.total, total.count);
            }
            if summary.is_over_budget() {
                println!("Over budget");
            }
        }
    }

    Ok(())
}

async fn login(config: &Config) -> anyhow::Result<()> {
    let manager = Arc::new(SessionManager::new(config.auth_client(), config.storage()));
    if manager.restore_session() == SessionState::LoggedIn {
        println!("Already signed in.");
        return Ok(());
    }

    let redirect = config.oauth().redirect_uri();
    let host = redirect
        .host_str()
        .context("COGNITO_REDIRECT_URI has no host")?;
    let port = redirect
        .port_or_known_default()
        .context("COGNITO_REDIRECT_URI has no port")?;
    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("failed to bind {host}:{port}"))?;

    println!("Open this URL to sign in:\n\n  {}\n", manager.begin_login());

    let mut reader = manager.reader();
    let shutdown = async move {
        tokio::select! {
            _ = reader.wait_for(SessionSnapshot::is_authenticated) => {}
            _ = tokio::signal::ctrl_c() => {}
        }
    };
    axum::serve(listener, callback_routes(Arc::clone(&manager)))
        .with_graceful_shutdown(shutdown)
        .await?;

    match manager.snapshot().profile {
        Some(profile) => println!("Signed in as {}", profile.email),
        None => bail!("login was not completed"),
    }
    Ok(())
}

/// Restore the persisted session or fail with a hint.
fn session(config: &Config) -> anyhow::Result<SessionSnapshot> {
    let manager = SessionManager::new(config.auth_client(), config.storage());
    if manager.restore_session() != SessionState::LoggedIn {
        bail!("not signed in; run `spendbook login`");
    }
    Ok(manager.snapshot())
}

fn customer(flag: Option<String>, config: &Config) -> anyhow::Result<CustomerId> {
    if let Some(id) = flag.filter(|id| !id.is_empty()) {
        return Ok(CustomerId::from(id));
    }
    let profile = session(config)?.profile.context("session has no profile")?;
    if profile.email.is_empty() {
        bail!("signed-in profile has no email; pass --customer");
    }
    Ok(CustomerId::from(profile.email))
}

fn loaded<T>(state: ResourceState<T>) -> anyhow::Result<T> {
    match state.error {
        Some(error) => bail!(error),
        None => Ok(state.data),
    }
}
