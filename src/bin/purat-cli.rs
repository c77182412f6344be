use anyhow::{anyhow, Result};
use bigdecimal::BigDecimal;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::error;

use purat::catalog;
use purat::checkout::{Checkout, Receipt};
use purat::config::Config;
use purat::khqr::{self, Currency, EncodingRequest};
use purat::order::{CustomerInfo, STORE_NAME};
use purat::storage::LocalStore;
use purat::store::Storefront;
use purat::supabase::SupabaseClient;
use purat::telegram::TelegramNotifier;

#[derive(Parser)]
#[command(author, version, about = "Purat Site storefront tools", long_about = None)]
struct Cli {
    #[arg(long, help = "Output only JSON without any formatting or messages")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a KHQR payment payload
    Qr {
        #[arg(long, env("KHQR_MERCHANT_ID"), help = "Bakong account id of the payee")]
        merchant_id: String,

        #[arg(long, env("KHQR_MERCHANT_NAME"), default_value = STORE_NAME)]
        merchant_name: String,

        #[arg(short, long, help = "Amount, rounded to two decimals")]
        amount: String,

        #[arg(short, long, default_value = "USD", help = "USD or KHR")]
        currency: String,
    },

    /// Check a KHQR payload's checksum and list its fields
    Verify {
        payload: String,
    },

    /// List catalog products
    Products {
        #[arg(long, default_value = catalog::ALL_CATEGORIES)]
        category: String,

        #[arg(long, default_value = "")]
        search: String,
    },

    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },

    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env("PURAT_PASSWORD"))]
        password: String,
    },

    /// Create an account
    Signup {
        #[arg(long)]
        email: String,

        #[arg(long, env("PURAT_PASSWORD"))]
        password: String,

        #[arg(long, help = "Display name")]
        name: String,
    },

    /// Sign out and clear the cart
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Switch between light and dark theme
    Theme,

    /// Pay for the cart and send the receipt
    Checkout {
        #[arg(long, help = "Customer name")]
        name: String,

        #[arg(long, help = "Telegram username")]
        username: String,

        #[arg(long, help = "Payment receipt image")]
        receipt: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Add one unit of a product
    Add { id: u32 },
    /// Remove a product line
    Remove { id: u32 },
    /// Show cart contents
    List,
    /// Empty the cart
    Clear,
}

fn open_store(config: &Config) -> Result<Storefront> {
    let auth = SupabaseClient::new(&config.supabase_url, &config.supabase_anon_key);
    let storage = LocalStore::open(&config.store_path)?;
    Ok(Storefront::open(auth, storage))
}

fn print_cart(store: &Storefront, as_json: bool) {
    if as_json {
        println!(
            "{}",
            json!({
                "items": store.cart_items(),
                "total": khqr::format_amount(&store.cart_total()),
            })
        );
        return;
    }

    if store.cart().is_empty() {
        println!("Cart is empty");
        return;
    }
    for item in store.cart_items() {
        println!(
            "{:>3}  {:<24} x{:<3} ${:.2}",
            item.product.id,
            item.product.name,
            item.quantity,
            item.subtotal()
        );
    }
    println!("Total: ${}", khqr::format_amount(&store.cart_total()));
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Qr { merchant_id, merchant_name, amount, currency } => {
            let amount = BigDecimal::from_str(&amount).map_err(|e| anyhow!("Invalid amount {}: {}", amount, e))?;
            let currency = Currency::from_str(&currency)?;
            let request = EncodingRequest::new(merchant_id, merchant_name, amount, currency)?;
            let payload = khqr::encode(&request);
            if cli.json {
                println!(
                    "{}",
                    json!({
                        "payload": payload,
                        "amount": request.formatted_amount(),
                        "currency": request.currency(),
                    })
                );
            } else {
                println!("{}", payload);
            }
        }

        Commands::Verify { payload } => {
            let fields = khqr::verify(&payload)?;
            if cli.json {
                let fields: Vec<_> = fields.iter().map(|f| json!({ "tag": f.tag, "value": f.value })).collect();
                println!("{}", json!({ "valid": true, "fields": fields }));
            } else {
                for field in fields {
                    println!("{}  {}", field.tag, field.value);
                }
                println!("Checksum OK");
            }
        }

        Commands::Products { category, search } => {
            let products = catalog::filter(&category, &search);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&products)?);
            } else if products.is_empty() {
                println!("No products found");
            } else {
                for p in products {
                    println!("{:>3}  {:<24} {:<12} ${:.2}  ★{}", p.id, p.name, p.category, p.price, p.rating);
                }
            }
        }

        Commands::Cart { action } => {
            let config = Config::from_env()?;
            let mut store = open_store(&config)?;
            match action {
                CartAction::Add { id } => store.add_to_cart(id)?,
                CartAction::Remove { id } => {
                    if !store.remove_from_cart(id)? {
                        return Err(anyhow!("Product {} is not in the cart", id));
                    }
                }
                CartAction::List => {}
                CartAction::Clear => store.clear_cart()?,
            }
            print_cart(&store, cli.json);
        }

        Commands::Login { email, password } => {
            let config = Config::from_env()?;
            let mut store = open_store(&config)?;
            let user = store.sign_in(&email, &password).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&user)?);
            } else {
                println!("Signed in as {} <{}>", user.name, user.email);
            }
        }

        Commands::Signup { email, password, name } => {
            let config = Config::from_env()?;
            let mut store = open_store(&config)?;
            match store.sign_up(&email, &password, &name).await? {
                Some(user) => println!("Signed in as {} <{}>", user.name, user.email),
                None => println!("Check {} to confirm your account", email),
            }
        }

        Commands::Logout => {
            let config = Config::from_env()?;
            let mut store = open_store(&config)?;
            store.logout().await?;
            println!("Signed out");
        }

        Commands::Whoami => {
            let config = Config::from_env()?;
            let store = open_store(&config)?;
            match store.user() {
                Some(user) if cli.json => println!("{}", serde_json::to_string_pretty(&user)?),
                Some(user) => println!("{} <{}>", user.name, user.email),
                None => println!("Not signed in"),
            }
        }

        Commands::Theme => {
            let config = Config::from_env()?;
            let mut store = open_store(&config)?;
            let theme = store.toggle_theme()?;
            println!("Theme: {}", theme.as_str());
        }

        Commands::Checkout { name, username, receipt } => {
            let config = Config::from_env()?;
            let mut store = open_store(&config)?;
            let mut checkout = Checkout::new(config.merchant()?);

            checkout.submit_info(CustomerInfo { name, username })?;
            let payload = checkout.payment_payload(&store)?;
            println!("Scan to pay ${}:", khqr::format_amount(&store.cart_total()));
            println!("{}", payload);

            let receipt = receipt.map(|path| Receipt::from_path(&path)).transpose()?;
            let (token, chat_id) = config.telegram()?;
            let notifier = TelegramNotifier::new(token, chat_id);
            let order = checkout.submit_payment(&mut store, receipt.as_ref(), &notifier).await?;

            println!("Order {} sent for verification. We will contact you via Telegram shortly.", order.id);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("{}", e);
        return Err(e);
    }
    Ok(())
}
