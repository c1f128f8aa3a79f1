//! SQLite persistence for accounts, positions, trades and watchlists.
//!
//! Money is stored as decimal text so balances survive a round trip exactly.
//! Timestamps are RFC 3339 text with microsecond precision, which keeps
//! lexical and chronological order identical.

use super::accounting::PositionChange;
use super::store::{
    AccountStore, Ledger, PositionStore, StoreError, StoreResult, TradeCommit, TradeStore, WatchlistStore,
};
use crate::types::{Account, Position, Trade, WatchlistItem};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// SQLite store for persistent trading data.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        info!("SQLite store initialized");
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing).
    pub fn new_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        debug!("In-memory SQLite store initialized");
        Ok(store)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Initialize database schema.
    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                user_id TEXT PRIMARY KEY,
                virtual_balance TEXT NOT NULL,
                total_invested TEXT NOT NULL,
                created_date TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS portfolio (
                user_id TEXT NOT NULL,
                stock_symbol TEXT NOT NULL,
                company_name TEXT NOT NULL,
                quantity INTEGER NOT NULL CHECK (quantity > 0),
                average_price TEXT NOT NULL,
                total_invested TEXT NOT NULL,
                current_price TEXT NOT NULL,
                current_value TEXT NOT NULL,
                unrealized_pnl TEXT NOT NULL,
                unrealized_pnl_percentage TEXT NOT NULL,
                created_date TEXT NOT NULL,
                updated_date TEXT NOT NULL,
                PRIMARY KEY (user_id, stock_symbol)
            );

            CREATE TABLE IF NOT EXISTS trades (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                stock_symbol TEXT NOT NULL,
                company_name TEXT NOT NULL,
                trade_type TEXT NOT NULL,
                quantity INTEGER NOT NULL,
                price TEXT NOT NULL,
                total_amount TEXT NOT NULL,
                order_type TEXT NOT NULL,
                trade_date TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_trades_user_date ON trades(user_id, trade_date DESC);

            CREATE TABLE IF NOT EXISTS watchlist (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                stock_symbol TEXT NOT NULL,
                company_name TEXT NOT NULL,
                added_price TEXT,
                current_price TEXT,
                alert_price TEXT,
                created_date TEXT NOT NULL
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_watchlist_user_symbol ON watchlist(user_id, stock_symbol);",
        )?;

        info!("SQLite schema initialized");
        Ok(())
    }
}

// ========== Column Codecs ==========

fn conversion_error(idx: usize, e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into())
}

fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn opt_decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| Decimal::from_str(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn parsed_at<T: FromStr<Err = String>>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: String| conversion_error(idx, e))
}

fn ts(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn opt_text(d: Option<Decimal>) -> Option<String> {
    d.map(|d| d.to_string())
}

// ========== Row Mapping ==========

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        user_id: row.get(0)?,
        cash_balance: decimal_at(row, 1)?,
        cumulative_invested: decimal_at(row, 2)?,
        created_at: timestamp_at(row, 3)?,
    })
}

const POSITION_COLUMNS: &str = "user_id, stock_symbol, company_name, quantity, average_price, total_invested,
    current_price, current_value, unrealized_pnl, unrealized_pnl_percentage, created_date, updated_date";

fn position_from_row(row: &Row<'_>) -> rusqlite::Result<Position> {
    Ok(Position {
        user_id: row.get(0)?,
        symbol: row.get(1)?,
        company_name: row.get(2)?,
        quantity: row.get(3)?,
        average_cost: decimal_at(row, 4)?,
        cost_basis_total: decimal_at(row, 5)?,
        last_price: decimal_at(row, 6)?,
        market_value: decimal_at(row, 7)?,
        unrealized_pnl: decimal_at(row, 8)?,
        unrealized_pnl_pct: decimal_at(row, 9)?,
        created_at: timestamp_at(row, 10)?,
        updated_at: timestamp_at(row, 11)?,
    })
}

fn trade_from_row(row: &Row<'_>) -> rusqlite::Result<Trade> {
    Ok(Trade {
        id: row.get(0)?,
        user_id: row.get(1)?,
        symbol: row.get(2)?,
        company_name: row.get(3)?,
        side: parsed_at(row, 4)?,
        quantity: row.get(5)?,
        price: decimal_at(row, 6)?,
        total_amount: decimal_at(row, 7)?,
        order_type: parsed_at(row, 8)?,
        trade_date: timestamp_at(row, 9)?,
    })
}

fn watchlist_from_row(row: &Row<'_>) -> rusqlite::Result<WatchlistItem> {
    Ok(WatchlistItem {
        id: row.get(0)?,
        user_id: row.get(1)?,
        symbol: row.get(2)?,
        company_name: row.get(3)?,
        added_price: opt_decimal_at(row, 4)?,
        current_price: opt_decimal_at(row, 5)?,
        alert_price: opt_decimal_at(row, 6)?,
        created_at: timestamp_at(row, 7)?,
    })
}

// ========== Statements ==========

fn upsert_account(conn: &Connection, account: &Account) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO users (user_id, virtual_balance, total_invested, created_date)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(user_id) DO UPDATE SET
            virtual_balance = excluded.virtual_balance,
            total_invested = excluded.total_invested",
        params![
            account.user_id,
            account.cash_balance.to_string(),
            account.cumulative_invested.to_string(),
            ts(&account.created_at),
        ],
    )?;
    Ok(())
}

fn upsert_position(conn: &Connection, p: &Position) -> rusqlite::Result<()> {
    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO portfolio ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            POSITION_COLUMNS
        ),
        params![
            p.user_id,
            p.symbol,
            p.company_name,
            p.quantity,
            p.average_cost.to_string(),
            p.cost_basis_total.to_string(),
            p.last_price.to_string(),
            p.market_value.to_string(),
            p.unrealized_pnl.to_string(),
            p.unrealized_pnl_pct.to_string(),
            ts(&p.created_at),
            ts(&p.updated_at),
        ],
    )?;
    Ok(())
}

fn remove_position(conn: &Connection, user_id: &str, symbol: &str) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM portfolio WHERE user_id = ?1 AND stock_symbol = ?2",
        params![user_id, symbol],
    )?;
    Ok(())
}

fn insert_trade_row(conn: &Connection, t: &Trade) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO trades (id, user_id, stock_symbol, company_name, trade_type, quantity, price,
            total_amount, order_type, trade_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            t.id,
            t.user_id,
            t.symbol,
            t.company_name,
            t.side.to_string(),
            t.quantity,
            t.price.to_string(),
            t.total_amount.to_string(),
            t.order_type.to_string(),
            ts(&t.trade_date),
        ],
    )?;
    Ok(())
}

// ========== Capabilities ==========

impl AccountStore for SqliteStore {
    fn load_account(&self, user_id: &str) -> StoreResult<Option<Account>> {
        let conn = self.lock()?;
        let account = conn
            .query_row(
                "SELECT user_id, virtual_balance, total_invested, created_date FROM users WHERE user_id = ?1",
                params![user_id],
                account_from_row,
            )
            .optional()?;
        Ok(account)
    }

    fn save_account(&self, account: &Account) -> StoreResult<()> {
        let conn = self.lock()?;
        upsert_account(&conn, account)?;
        Ok(())
    }
}

impl PositionStore for SqliteStore {
    fn find_position(&self, user_id: &str, symbol: &str) -> StoreResult<Option<Position>> {
        let conn = self.lock()?;
        let position = conn
            .query_row(
                &format!(
                    "SELECT {} FROM portfolio WHERE user_id = ?1 AND stock_symbol = ?2",
                    POSITION_COLUMNS
                ),
                params![user_id, symbol],
                position_from_row,
            )
            .optional()?;
        Ok(position)
    }

    fn save_position(&self, position: &Position) -> StoreResult<()> {
        let conn = self.lock()?;
        upsert_position(&conn, position)?;
        Ok(())
    }

    fn delete_position(&self, user_id: &str, symbol: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        remove_position(&conn, user_id, symbol)?;
        Ok(())
    }

    fn list_positions(&self, user_id: &str) -> StoreResult<Vec<Position>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM portfolio WHERE user_id = ?1 ORDER BY stock_symbol",
            POSITION_COLUMNS
        ))?;
        let positions = stmt
            .query_map(params![user_id], position_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(positions)
    }
}

impl TradeStore for SqliteStore {
    fn insert_trade(&self, trade: &Trade) -> StoreResult<()> {
        let conn = self.lock()?;
        insert_trade_row(&conn, trade)?;
        Ok(())
    }

    fn list_trades(&self, user_id: &str) -> StoreResult<Vec<Trade>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, stock_symbol, company_name, trade_type, quantity, price, total_amount,
                order_type, trade_date
             FROM trades WHERE user_id = ?1
             ORDER BY trade_date DESC, rowid DESC",
        )?;
        let trades = stmt
            .query_map(params![user_id], trade_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(trades)
    }
}

impl Ledger for SqliteStore {
    fn commit(&self, commit: &TradeCommit) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        insert_trade_row(&tx, &commit.trade)?;
        upsert_account(&tx, &commit.account)?;
        match &commit.position {
            PositionChange::Upsert(position) => upsert_position(&tx, position)?,
            PositionChange::Close { user_id, symbol } => remove_position(&tx, user_id, symbol)?,
        }

        tx.commit()?;
        debug!("Committed trade {}", commit.trade.id);
        Ok(())
    }
}

impl WatchlistStore for SqliteStore {
    fn list_watchlist(&self, user_id: &str) -> StoreResult<Vec<WatchlistItem>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, stock_symbol, company_name, added_price, current_price, alert_price, created_date
             FROM watchlist WHERE user_id = ?1
             ORDER BY created_date, rowid",
        )?;
        let items = stmt
            .query_map(params![user_id], watchlist_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    fn find_watchlist_item(&self, user_id: &str, symbol: &str) -> StoreResult<Option<WatchlistItem>> {
        let conn = self.lock()?;
        let item = conn
            .query_row(
                "SELECT id, user_id, stock_symbol, company_name, added_price, current_price, alert_price, created_date
                 FROM watchlist WHERE user_id = ?1 AND stock_symbol = ?2",
                params![user_id, symbol],
                watchlist_from_row,
            )
            .optional()?;
        Ok(item)
    }

    fn add_watchlist_item(&self, item: &WatchlistItem) -> StoreResult<()> {
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT INTO watchlist (id, user_id, stock_symbol, company_name, added_price, current_price,
                alert_price, created_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                item.id,
                item.user_id,
                item.symbol,
                item.company_name,
                opt_text(item.added_price),
                opt_text(item.current_price),
                opt_text(item.alert_price),
                ts(&item.created_at),
            ],
        );
        match inserted {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => Err(
                StoreError::Duplicate(format!("{} watching {}", item.user_id, item.symbol)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    fn update_watchlist_prices(&self, updates: &[(String, Decimal)]) -> StoreResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut touched = 0;
        {
            let mut stmt = tx.prepare("UPDATE watchlist SET current_price = ?1 WHERE id = ?2")?;
            for (id, price) in updates {
                touched += stmt.execute(params![price.to_string(), id])?;
            }
        }
        tx.commit()?;
        Ok(touched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::accounting::{apply_buy, apply_sell};
    use crate::types::{OrderType, TradeType};
    use rust_decimal_macros::dec;

    fn buy(quantity: i64, price: Decimal) -> Trade {
        Trade::new("u1", "AAPL", "Apple Inc.", TradeType::Buy, quantity, price, OrderType::Market)
    }

    #[test]
    fn test_account_crud() {
        let store = SqliteStore::new_in_memory().unwrap();
        assert!(store.load_account("u1").unwrap().is_none());

        let mut account = Account::new("u1", dec!(10000));
        store.save_account(&account).unwrap();

        account.cash_balance = dec!(8499.99);
        store.save_account(&account).unwrap();

        let loaded = store.load_account("u1").unwrap().unwrap();
        assert_eq!(loaded.cash_balance, dec!(8499.99));
        assert_eq!(loaded.created_at.timestamp_micros(), account.created_at.timestamp_micros());
    }

    #[test]
    fn test_commit_buy_then_close() {
        let store = SqliteStore::new_in_memory().unwrap();
        let trade = buy(10, dec!(150));
        let position = apply_buy(None, &trade).unwrap();
        let mut account = Account::new("u1", dec!(10000));
        account.cash_balance = dec!(8500);

        store
            .commit(&TradeCommit {
                trade: trade.clone(),
                account: account.clone(),
                position: PositionChange::Upsert(position.clone()),
            })
            .unwrap();

        let loaded = store.find_position("u1", "AAPL").unwrap().unwrap();
        assert_eq!(loaded.average_cost, dec!(150));
        assert_eq!(loaded.cost_basis_total, dec!(1500));

        let sell = Trade::new("u1", "AAPL", "Apple Inc.", TradeType::Sell, 10, dec!(160), OrderType::Limit);
        store
            .commit(&TradeCommit {
                trade: sell.clone(),
                account,
                position: apply_sell(loaded, &sell),
            })
            .unwrap();

        assert!(store.find_position("u1", "AAPL").unwrap().is_none());
        let trades = store.list_trades("u1").unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].id, sell.id);
        assert_eq!(trades[0].side, TradeType::Sell);
        assert_eq!(trades[0].order_type, OrderType::Limit);
        assert_eq!(trades[1].total_amount, dec!(1500));
    }

    #[test]
    fn test_failed_commit_rolls_back() {
        let store = SqliteStore::new_in_memory().unwrap();
        let trade = buy(1, dec!(10));
        store.insert_trade(&trade).unwrap();

        // Duplicate trade id fails the insert, so nothing else may land
        let result = store.commit(&TradeCommit {
            trade: trade.clone(),
            account: Account::new("u1", dec!(5)),
            position: PositionChange::Upsert(apply_buy(None, &trade).unwrap()),
        });

        assert!(result.is_err());
        assert!(store.load_account("u1").unwrap().is_none());
        assert!(store.find_position("u1", "AAPL").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_decimal_is_an_error() {
        let store = SqliteStore::new_in_memory().unwrap();
        {
            let conn = store.lock().unwrap();
            conn.execute(
                "INSERT INTO users VALUES ('u1', 'not-a-number', '0', '2024-01-01T00:00:00Z')",
                [],
            )
            .unwrap();
        }
        assert!(matches!(store.load_account("u1"), Err(StoreError::Database(_))));
    }

    #[test]
    fn test_watchlist_roundtrip() {
        let store = SqliteStore::new_in_memory().unwrap();
        let item = WatchlistItem::new("u1", "msft", "Microsoft Corporation", None);
        store.add_watchlist_item(&item).unwrap();

        assert_eq!(store.update_watchlist_prices(&[(item.id.clone(), dec!(410.5))]).unwrap(), 1);

        let items = store.list_watchlist("u1").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].symbol, "MSFT");
        assert_eq!(items[0].added_price, None);
        assert_eq!(items[0].current_price, Some(dec!(410.5)));
    }

    #[test]
    fn test_watchlist_duplicate_symbol_is_rejected() {
        let store = SqliteStore::new_in_memory().unwrap();
        store
            .add_watchlist_item(&WatchlistItem::new("u1", "MSFT", "Microsoft Corporation", None))
            .unwrap();

        let again = store.add_watchlist_item(&WatchlistItem::new("u1", "msft", "Microsoft Corporation", None));
        assert!(matches!(again, Err(StoreError::Duplicate(_))));

        let found = store.find_watchlist_item("u1", "MSFT").unwrap().unwrap();
        assert_eq!(found.company_name, "Microsoft Corporation");
        assert!(store.find_watchlist_item("u2", "MSFT").unwrap().is_none());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");

        {
            let store = SqliteStore::new(&path).unwrap();
            store.save_account(&Account::new("u1", dec!(10000))).unwrap();
            store.save_position(&apply_buy(None, &buy(3, dec!(33.33))).unwrap()).unwrap();
        }

        let store = SqliteStore::new(&path).unwrap();
        assert_eq!(store.load_account("u1").unwrap().unwrap().cash_balance, dec!(10000));
        let positions = store.list_positions("u1").unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].cost_basis_total, dec!(99.99));
    }
}
