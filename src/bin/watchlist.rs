/// Manage per-user watchlists.
///
/// Usage:
///   cargo run --bin watchlist -- --user alice lists
///   cargo run --bin watchlist -- --user alice create "AI 概念股"
///   cargo run --bin watchlist -- --user alice add "AI 概念股" 2330
use anyhow::Result;
use clap::{Parser, Subcommand};
use stock_warroom::stock_db::get_connection;
use stock_warroom::watchlist::WatchlistStore;

#[derive(Parser, Debug)]
#[command(name = "watchlist")]
#[command(about = "Create, rename and edit named watchlists")]
struct Args {
    /// Owner of the lists
    #[arg(long)]
    user: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show all lists
    Lists,
    /// Create an empty list
    Create { name: String },
    /// Rename a list
    Rename { old: String, new: String },
    /// Delete a list and everything on it
    Delete { name: String },
    /// Add a stock to a list by symbol, short code or company name
    Add { list: String, symbol: String },
    /// Remove a symbol from a list
    Remove { list: String, symbol: String },
    /// Show the symbols on a list
    Show { list: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let store = WatchlistStore::new(get_connection().await?);
    let user = args.user.as_str();

    match args.command {
        Command::Lists => {
            let names = store.list_menus(user).await?;
            if names.is_empty() {
                println!("📭 {} has no lists", user);
            }
            for name in names {
                println!("📁 {}", name);
            }
        }
        Command::Create { name } => {
            let menu = store.create_menu(user, &name).await?;
            println!("✅ created '{}'", menu.name);
        }
        Command::Rename { old, new } => {
            store.rename_menu(user, &old, &new).await?;
            println!("✅ renamed '{}' -> '{}'", old, new.trim());
        }
        Command::Delete { name } => {
            store.delete_menu(user, &name).await?;
            println!("🗑️ deleted '{}'", name);
        }
        Command::Add { list, symbol } => {
            let symbol = store.resolve_symbol(&symbol).await?;
            if store.add_symbol(user, &list, &symbol).await? {
                println!("✅ {} added to '{}'", symbol, list);
            } else {
                println!("ℹ️ {} is already on '{}'", symbol, list);
            }
        }
        Command::Remove { list, symbol } => {
            if store.remove_symbol(user, &list, &symbol).await? {
                println!("🗑️ {} removed from '{}'", symbol.trim(), list);
            } else {
                println!("ℹ️ {} is not on '{}'", symbol.trim(), list);
            }
        }
        Command::Show { list } => {
            let items = store.list_items(user, &list).await?;
            println!("{:<10} {}", "symbol", "added");
            for item in &items {
                println!("{:<10} {}", item.symbol, item.added_date);
            }
            println!("({} symbols)", items.len());
        }
    }
    Ok(())
}
