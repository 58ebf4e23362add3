//! Flat-file JSON store
//!
//! Every entity lives in its own JSON file under `<root>/data/`. Reads load
//! the whole file (falling back to an empty value when the file is missing
//! or unreadable); writes replace the whole file.
//!
//! Files:
//! - `linked_account.json` - customer ID and linked accounts
//! - `transactions.json` - raw transactions from the aggregator
//! - `transactions_clean.json` - categorized, normalized transactions
//! - `category_overrides.json` - transaction ID → category
//! - `category_rules.json` - user category rules
//! - `balances.json` - cached balances per account
//! - `pinned_transactions.json` - IDs whose category is frozen
//! - `deleted_defaults.json` - default rule IDs the user removed
//!
//! Default rules live at `<root>/default_category_rules.json`, seeded from
//! `<root>/example_default_category_rules.json` the first time they are read.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::{
    AccountData, BalanceEntry, CategoryRule, CleanTransaction, Stats, StoredTransaction,
};

pub const DATA_DIR: &str = "data";
pub const ACCOUNT_FILE: &str = "linked_account.json";
pub const TRANSACTIONS_FILE: &str = "transactions.json";
pub const CLEAN_TRANSACTIONS_FILE: &str = "transactions_clean.json";
pub const OVERRIDES_FILE: &str = "category_overrides.json";
pub const CATEGORY_RULES_FILE: &str = "category_rules.json";
pub const BALANCES_FILE: &str = "balances.json";
pub const PINNED_FILE: &str = "pinned_transactions.json";
pub const DELETED_DEFAULTS_FILE: &str = "deleted_defaults.json";
pub const DEFAULT_RULES_FILE: &str = "default_category_rules.json";
pub const EXAMPLE_DEFAULT_RULES_FILE: &str = "example_default_category_rules.json";

/// Transaction ID → manually assigned category
pub type Overrides = BTreeMap<String, String>;

/// Account ID → cached balance
pub type Balances = BTreeMap<String, BalanceEntry>;

/// JSON file store rooted at a server directory
pub struct JsonStore {
    root: PathBuf,
    data_dir: PathBuf,
    /// Serializes read-modify-write sequences across requests
    write_lock: Mutex<()>,
}

impl JsonStore {
    /// Open a store rooted at `root`, creating `<root>/data` if needed
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let data_dir = root.join(DATA_DIR);
        fs::create_dir_all(&data_dir)?;
        debug!("Opened JSON store at {}", data_dir.display());

        Ok(Self {
            root,
            data_dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Server root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the per-entity JSON files
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Acquire the store write lock
    ///
    /// Hold the guard for the duration of a load → mutate → save sequence.
    /// Never hold it across an `.await`.
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn data_file(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    fn read_json<T: DeserializeOwned + Default>(&self, path: &Path) -> T {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(_) => return T::default(),
        };
        match serde_json::from_str(&contents) {
            Ok(value) => value,
            Err(e) => {
                warn!("Ignoring unreadable {}: {}", path.display(), e);
                T::default()
            }
        }
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        let dir = path.parent().unwrap_or(&self.data_dir);
        fs::create_dir_all(dir)?;

        let tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.flush()?;
        }
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    // ── Accounts ────────────────────────────────────────────────────────────

    pub fn read_account_data(&self) -> AccountData {
        self.read_json(&self.data_file(ACCOUNT_FILE))
    }

    pub fn write_account_data(&self, data: &AccountData) -> Result<()> {
        self.write_json(&self.data_file(ACCOUNT_FILE), data)
    }

    // ── Transactions ────────────────────────────────────────────────────────

    pub fn load_transactions(&self) -> Vec<StoredTransaction> {
        self.read_json(&self.data_file(TRANSACTIONS_FILE))
    }

    pub fn save_transactions(&self, transactions: &[StoredTransaction]) -> Result<()> {
        self.write_json(&self.data_file(TRANSACTIONS_FILE), transactions)
    }

    pub fn load_clean_transactions(&self) -> Vec<CleanTransaction> {
        self.read_json(&self.data_file(CLEAN_TRANSACTIONS_FILE))
    }

    pub fn save_clean_transactions(&self, transactions: &[CleanTransaction]) -> Result<()> {
        self.write_json(&self.data_file(CLEAN_TRANSACTIONS_FILE), transactions)
    }

    // ── Overrides and pins ──────────────────────────────────────────────────

    pub fn load_overrides(&self) -> Overrides {
        self.read_json(&self.data_file(OVERRIDES_FILE))
    }

    pub fn save_overrides(&self, overrides: &Overrides) -> Result<()> {
        self.write_json(&self.data_file(OVERRIDES_FILE), overrides)
    }

    pub fn load_pinned(&self) -> BTreeSet<String> {
        self.read_json(&self.data_file(PINNED_FILE))
    }

    pub fn save_pinned(&self, pinned: &BTreeSet<String>) -> Result<()> {
        self.write_json(&self.data_file(PINNED_FILE), pinned)
    }

    // ── Category rules ──────────────────────────────────────────────────────

    pub fn load_category_rules(&self) -> Vec<CategoryRule> {
        self.read_json(&self.data_file(CATEGORY_RULES_FILE))
    }

    pub fn save_category_rules(&self, rules: &[CategoryRule]) -> Result<()> {
        self.write_json(&self.data_file(CATEGORY_RULES_FILE), rules)
    }

    pub fn load_deleted_defaults(&self) -> BTreeSet<String> {
        self.read_json(&self.data_file(DELETED_DEFAULTS_FILE))
    }

    pub fn save_deleted_defaults(&self, deleted: &BTreeSet<String>) -> Result<()> {
        self.write_json(&self.data_file(DELETED_DEFAULTS_FILE), deleted)
    }

    /// Load the project-level default rules
    ///
    /// Seeds `default_category_rules.json` from the example file when it does
    /// not exist yet. Returns an empty list when neither file exists.
    pub fn load_default_category_rules(&self) -> Result<Vec<CategoryRule>> {
        let defaults = self.root.join(DEFAULT_RULES_FILE);
        if !defaults.exists() {
            let example = self.root.join(EXAMPLE_DEFAULT_RULES_FILE);
            if !example.exists() {
                return Ok(Vec::new());
            }
            fs::copy(&example, &defaults)?;
            info!("Seeded {} from {}", DEFAULT_RULES_FILE, EXAMPLE_DEFAULT_RULES_FILE);
        }
        Ok(self.read_json(&defaults))
    }

    // ── Balances ────────────────────────────────────────────────────────────

    pub fn load_balances(&self) -> Balances {
        self.read_json(&self.data_file(BALANCES_FILE))
    }

    pub fn save_balances(&self, balances: &Balances) -> Result<()> {
        self.write_json(&self.data_file(BALANCES_FILE), balances)
    }

    /// Record counts across every file
    pub fn stats(&self) -> Result<Stats> {
        Ok(Stats {
            transactions: self.load_transactions().len(),
            clean_transactions: self.load_clean_transactions().len(),
            category_rules: self.load_category_rules().len(),
            default_rules: self.load_default_category_rules()?.len(),
            overrides: self.load_overrides().len(),
            accounts: self.read_account_data().accounts.len(),
        })
    }
}
