/// Per-user named watchlists stored in `watchlist_menus` / `watchlist_items`.
///
/// Menu names are unique per user; deleting a menu cascades to its items.
/// Symbols typed by the user are resolved against `stock_info` before they
/// are stored.
use std::collections::HashMap;

use chrono::Local;
use sqlx::PgPool;
use thiserror::Error;

use crate::model::{WatchlistItem, WatchlistMenu};

pub const MAX_MENUS_PER_USER: i64 = 200;
pub const MAX_ITEMS_PER_MENU: i64 = 1000;

#[derive(Error, Debug)]
pub enum WatchlistError {
    #[error("list '{0}' already exists")]
    DuplicateName(String),

    #[error("list '{0}' not found")]
    NotFound(String),

    #[error("no listed stock matches '{0}'")]
    UnknownSymbol(String),

    #[error("list limit reached ({0})")]
    MenuLimit(i64),

    #[error("item limit reached ({0})")]
    ItemLimit(i64),

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, WatchlistError>;

fn clean(value: &str, what: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(WatchlistError::InvalidName(format!("{} must not be empty", what)));
    }
    Ok(trimmed.to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Case-insensitive lookup from full symbol, short code (the part before
/// `.`) or company name to the listed symbol.
///
/// A full symbol beats a short code, which beats a name.
#[derive(Debug, Default)]
pub struct SymbolMapping {
    keys: HashMap<String, (u8, String)>,
}

impl SymbolMapping {
    pub fn new<'a>(listings: impl IntoIterator<Item = (&'a str, Option<&'a str>)>) -> Self {
        let mut mapping = Self::default();
        for (symbol, name) in listings {
            let symbol = symbol.trim();
            if symbol.is_empty() {
                continue;
            }
            let short = symbol.split('.').next().unwrap_or(symbol);
            mapping.insert(symbol, 0, symbol);
            mapping.insert(short, 1, symbol);
            if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
                mapping.insert(name, 2, symbol);
            }
        }
        mapping
    }

    fn insert(&mut self, key: &str, priority: u8, symbol: &str) {
        let key = key.to_uppercase();
        match self.keys.get(&key) {
            Some((existing, _)) if *existing <= priority => {}
            _ => {
                self.keys.insert(key, (priority, symbol.to_string()));
            }
        }
    }

    pub fn resolve(&self, input: &str) -> Option<&str> {
        self.keys.get(&input.trim().to_uppercase()).map(|(_, s)| s.as_str())
    }
}

pub struct WatchlistStore {
    pool: PgPool,
    max_menus: i64,
    max_items: i64,
}

impl WatchlistStore {
    pub fn new(pool: PgPool) -> Self {
        Self::with_limits(pool, MAX_MENUS_PER_USER, MAX_ITEMS_PER_MENU)
    }

    pub fn with_limits(pool: PgPool, max_menus: i64, max_items: i64) -> Self {
        Self { pool, max_menus, max_items }
    }

    pub async fn list_menus(&self, username: &str) -> Result<Vec<String>> {
        let names = sqlx::query_scalar("SELECT name FROM watchlist_menus WHERE username = $1 ORDER BY name")
            .bind(username)
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }

    pub async fn find_menu(&self, username: &str, name: &str) -> Result<Option<WatchlistMenu>> {
        let menu = sqlx::query_as::<_, WatchlistMenu>(
            "SELECT id, name, username FROM watchlist_menus WHERE username = $1 AND name = $2",
        )
        .bind(username)
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(menu)
    }

    pub async fn create_menu(&self, username: &str, name: &str) -> Result<WatchlistMenu> {
        let name = clean(name, "list name")?;
        let mut tx = self.pool.begin().await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM watchlist_menus WHERE username = $1")
            .bind(username)
            .fetch_one(&mut *tx)
            .await?;
        if count >= self.max_menus {
            return Err(WatchlistError::MenuLimit(self.max_menus));
        }

        let menu = sqlx::query_as::<_, WatchlistMenu>(
            "INSERT INTO watchlist_menus (name, username) VALUES ($1, $2) RETURNING id, name, username",
        )
        .bind(&name)
        .bind(username)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                WatchlistError::DuplicateName(name.clone())
            } else {
                e.into()
            }
        })?;

        tx.commit().await?;
        Ok(menu)
    }

    pub async fn rename_menu(&self, username: &str, old_name: &str, new_name: &str) -> Result<()> {
        let old_name = old_name.trim();
        let new_name = clean(new_name, "list name")?;
        let mut tx = self.pool.begin().await?;

        let taken: Option<i32> =
            sqlx::query_scalar("SELECT id FROM watchlist_menus WHERE username = $1 AND name = $2")
                .bind(username)
                .bind(&new_name)
                .fetch_optional(&mut *tx)
                .await?;
        if taken.is_some() {
            return Err(WatchlistError::DuplicateName(new_name));
        }

        let updated = sqlx::query("UPDATE watchlist_menus SET name = $1 WHERE username = $2 AND name = $3")
            .bind(&new_name)
            .bind(username)
            .bind(old_name)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    WatchlistError::DuplicateName(new_name.clone())
                } else {
                    e.into()
                }
            })?
            .rows_affected();
        if updated == 0 {
            return Err(WatchlistError::NotFound(old_name.to_string()));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Removes the menu and, through the foreign key, all of its items.
    pub async fn delete_menu(&self, username: &str, name: &str) -> Result<()> {
        let name = name.trim();
        let deleted = sqlx::query("DELETE FROM watchlist_menus WHERE username = $1 AND name = $2")
            .bind(username)
            .bind(name)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(WatchlistError::NotFound(name.to_string()));
        }
        Ok(())
    }

    /// Load the symbol/name lookup from `stock_info`.
    pub async fn symbol_mapping(&self) -> Result<SymbolMapping> {
        let rows: Vec<(String, Option<String>)> = sqlx::query_as("SELECT symbol, name FROM stock_info")
            .fetch_all(&self.pool)
            .await?;
        Ok(SymbolMapping::new(rows.iter().map(|(s, n)| (s.as_str(), n.as_deref()))))
    }

    /// Listed symbol for a full symbol, short code or company name.
    pub async fn resolve_symbol(&self, input: &str) -> Result<String> {
        let input = clean(input, "symbol")?;
        let mapping = self.symbol_mapping().await?;
        mapping
            .resolve(&input)
            .map(str::to_string)
            .ok_or(WatchlistError::UnknownSymbol(input))
    }

    /// Resolves `input` to a listed symbol and adds it. Returns `false` when
    /// the symbol was already on the list.
    pub async fn add_symbol(&self, username: &str, menu: &str, input: &str) -> Result<bool> {
        let menu = menu.trim();
        let symbol = self.resolve_symbol(input).await?;
        let mut tx = self.pool.begin().await?;

        let menu_id: i32 =
            sqlx::query_scalar("SELECT id FROM watchlist_menus WHERE username = $1 AND name = $2")
                .bind(username)
                .bind(menu)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| WatchlistError::NotFound(menu.to_string()))?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM watchlist_items WHERE menu_id = $1")
            .bind(menu_id)
            .fetch_one(&mut *tx)
            .await?;
        if count >= self.max_items {
            return Err(WatchlistError::ItemLimit(self.max_items));
        }

        let inserted = sqlx::query(
            "INSERT INTO watchlist_items (menu_id, symbol, added_date) VALUES ($1, $2, $3)
             ON CONFLICT (menu_id, symbol) DO NOTHING",
        )
        .bind(menu_id)
        .bind(&symbol)
        .bind(Local::now().date_naive())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        Ok(inserted > 0)
    }

    /// Returns `false` when the symbol was not on the list.
    pub async fn remove_symbol(&self, username: &str, menu: &str, symbol: &str) -> Result<bool> {
        let removed = sqlx::query(
            "DELETE FROM watchlist_items
             WHERE symbol = $1
               AND menu_id = (SELECT id FROM watchlist_menus WHERE username = $2 AND name = $3)",
        )
        .bind(symbol.trim())
        .bind(username)
        .bind(menu.trim())
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(removed > 0)
    }

    pub async fn list_items(&self, username: &str, menu: &str) -> Result<Vec<WatchlistItem>> {
        let items = sqlx::query_as::<_, WatchlistItem>(
            "SELECT i.symbol, i.added_date
             FROM watchlist_items i
             JOIN watchlist_menus m ON i.menu_id = m.id
             WHERE m.username = $1 AND m.name = $2
             ORDER BY i.symbol",
        )
        .bind(username)
        .bind(menu.trim())
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }
}
