//! Command line front end for the product catalog.

use std::io::{self, BufRead, Write};

use anyhow::{anyhow, Context};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use product_catalog::catalog::EMPTY_MESSAGE;
use product_catalog::config::{Backend, Settings};
use product_catalog::forms::MISSING_ID_MESSAGE;
use product_catalog::{
    logging, mock_data, Catalog, CatalogError, CreateController, EditController, FileMedium,
    LocalStore, Page, ProductForm, ProductId, ProductStore, Removal, RemoteStore,
};

#[derive(Debug, Parser)]
#[command(name = "catalog", about = "Product catalog", long_about = None)]
struct Cli {
    /// Store to use instead of the configured one
    #[arg(long, value_enum, global = true)]
    backend: Option<Backend>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the catalog
    List(ListArgs),
    /// Add a product
    Create(CreateArgs),
    /// Change fields of a product
    Edit(EditArgs),
    /// Remove a product
    Delete(DeleteArgs),
    /// Print the total value of all products
    Total,
    /// Add a handful of sample products
    Seed,
}

#[derive(Debug, Args)]
struct ListArgs {
    /// Only show products whose title, description or type contains this
    #[arg(long, default_value = "")]
    search: String,

    /// Order by price, cheapest first
    #[arg(long)]
    sort: bool,

    /// Print product cards as HTML
    #[arg(long)]
    html: bool,
}

#[derive(Debug, Args)]
struct CreateArgs {
    #[arg(long)]
    title: String,

    #[arg(long)]
    description: String,

    #[arg(long)]
    price: String,

    #[arg(long = "type")]
    product_type: String,
}

#[derive(Debug, Args)]
struct EditArgs {
    /// Product id, or an edit page link such as `/edit?id=3`
    target: Option<String>,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    description: Option<String>,

    #[arg(long)]
    price: Option<String>,

    #[arg(long = "type")]
    product_type: Option<String>,
}

#[derive(Debug, Args)]
struct DeleteArgs {
    id: String,

    /// Skip the confirmation prompt
    #[arg(long)]
    yes: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load().context("failed to load settings")?;
    if let Some(backend) = cli.backend {
        settings.backend = backend;
    }
    logging::init(&settings.log_level);

    let store = open_store(&settings);

    match cli.command {
        Command::List(args) => list(store, &settings, args).await,
        Command::Create(args) => create(store.as_ref(), &settings, args).await,
        Command::Edit(args) => edit(store.as_ref(), &settings, args).await,
        Command::Delete(args) => delete(store, args).await,
        Command::Total => {
            let mut catalog = Catalog::new(store);
            catalog.refresh().await.map_err(shown)?;
            println!("{}", catalog.total_label());
            Ok(())
        }
        Command::Seed => {
            for draft in mock_data::sample_drafts() {
                let product = store.create(draft).await.map_err(shown)?;
                println!("{}\t{}", product.id, product.title);
            }
            Ok(())
        }
    }
}

fn open_store(settings: &Settings) -> Box<dyn ProductStore> {
    match settings.backend {
        Backend::Local => Box::new(LocalStore::new(FileMedium::new(settings.local.dir.clone()))),
        Backend::Remote => Box::new(RemoteStore::new(settings.remote.base_url.clone())),
    }
}

/// Error carrying the message the user should see.
fn shown(error: CatalogError) -> anyhow::Error {
    anyhow!(error.user_message())
}

async fn list(
    store: Box<dyn ProductStore>,
    settings: &Settings,
    args: ListArgs,
) -> anyhow::Result<()> {
    let mut catalog = Catalog::new(store);
    catalog.refresh().await.map_err(shown)?;
    catalog.set_search_term(args.search);
    catalog.set_sort_by_price(args.sort);

    if args.html {
        print!("{}", catalog.render_html(&settings.image_root, Utc::now()));
        return Ok(());
    }

    let visible = catalog.visible();
    if visible.is_empty() {
        println!("{EMPTY_MESSAGE}");
    }
    for product in visible {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            product.id,
            product.title,
            product.product_type,
            product.formatted_price(),
            product.image_url_under(&settings.image_root),
        );
    }
    println!("{}", catalog.total_label());

    Ok(())
}

async fn create(
    store: &dyn ProductStore,
    settings: &Settings,
    args: CreateArgs,
) -> anyhow::Result<()> {
    let form = ProductForm {
        title: args.title,
        description: args.description,
        price: args.price,
        product_type: args.product_type,
    };
    let mut controller = CreateController::new(settings.notice_ttl());

    let submitted = controller.submit(store, &form).await.map_err(shown)?;
    println!(
        "Product created successfully! ({}) -> {}",
        submitted.product.id,
        submitted.next.href()
    );

    Ok(())
}

async fn edit(store: &dyn ProductStore, settings: &Settings, args: EditArgs) -> anyhow::Result<()> {
    let id = args
        .target
        .as_deref()
        .and_then(edit_target)
        .ok_or_else(|| anyhow!(MISSING_ID_MESSAGE))?;
    let mut controller = EditController::load(store, &id, settings.notice_ttl())
        .await
        .map_err(shown)?;

    let mut form = controller.form();
    if let Some(title) = args.title {
        form.title = title;
    }
    if let Some(description) = args.description {
        form.description = description;
    }
    if let Some(price) = args.price {
        form.price = price;
    }
    if let Some(product_type) = args.product_type {
        form.product_type = product_type;
    }

    let submitted = controller.submit(store, &form).await.map_err(shown)?;
    println!(
        "Product updated successfully! ({}) -> {}",
        submitted.product.id,
        submitted.next.href()
    );

    Ok(())
}

async fn delete(store: Box<dyn ProductStore>, args: DeleteArgs) -> anyhow::Result<()> {
    let mut catalog = Catalog::new(store);
    catalog.refresh().await.map_err(shown)?;

    let id = ProductId::new(args.id);
    let mut confirm = |prompt: &str| args.yes || ask(prompt);

    match catalog.remove_product(&id, &mut confirm).await.map_err(shown)? {
        Removal::Cancelled => println!("Nothing removed."),
        Removal::Removed { .. } => println!("{}", catalog.total_label()),
    }

    Ok(())
}

/// Accepts a bare id or an edit page link.
fn edit_target(raw: &str) -> Option<ProductId> {
    match raw.split_once('?') {
        Some((_, query)) => Page::edit_target(query),
        None if raw.trim().is_empty() => None,
        None => Some(ProductId::new(raw.trim())),
    }
}

fn ask(prompt: &str) -> bool {
    print!("{prompt} [y/N] ");
    let _ = io::stdout().flush();

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim(), "y" | "Y" | "yes")
}
