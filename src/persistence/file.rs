//! JSON file account store

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::{GameRecord, StoreData};
use crate::AccountId;
use crate::account::{Account, AccountBackend, BalanceUpdate};
use crate::error::PersistenceError;

/// Account store persisted as one JSON document
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    data: Mutex<StoreData>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        let data = match fs::read_to_string(&path) {
            Ok(json) => {
                let data: StoreData = serde_json::from_str(&json)?;
                log::info!(
                    "Loaded {} accounts from {}",
                    data.users.len(),
                    path.display()
                );
                data
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No account store at {}, starting fresh", path.display());
                StoreData::default()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    /// Run `f` on a copy of the table and commit it only if `f` succeeds
    /// and the document reaches disk
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut StoreData) -> Result<T, PersistenceError>,
    ) -> Result<T, PersistenceError> {
        let mut data = self.data.lock();
        let mut next = data.clone();
        let value = f(&mut next)?;
        write_atomic(&self.path, &next)?;
        *data = next;
        Ok(value)
    }
}

fn write_atomic(path: &Path, data: &StoreData) -> Result<(), PersistenceError> {
    let json = serde_json::to_vec_pretty(data)?;
    let tmp = path.with_extension("json.tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&json)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

impl AccountBackend for JsonFileStore {
    fn authenticate(&self, username: &str) -> Result<Account, PersistenceError> {
        if let Some(account) = self.data.lock().find(username) {
            return Ok(account);
        }
        self.mutate(|data| data.authenticate(username).map(|(account, _)| account))
    }

    fn get_account(&self, id: AccountId) -> Result<Account, PersistenceError> {
        self.data.lock().get_account(id)
    }

    fn adjust_balance(&self, update: &BalanceUpdate) -> Result<u64, PersistenceError> {
        self.mutate(|data| data.adjust_balance(update))
    }

    fn history(&self, id: AccountId, limit: usize) -> Result<Vec<GameRecord>, PersistenceError> {
        self.data.lock().history(id, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Outcome;

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");

        let id = {
            let store = JsonFileStore::open(&path).unwrap();
            let account = store.authenticate("hank").unwrap();
            store
                .adjust_balance(&BalanceUpdate::stake(account.id, 1, 100))
                .unwrap();
            store
                .adjust_balance(&BalanceUpdate::settlement(account.id, 1, Outcome::Win, 100, 3.0, 300))
                .unwrap();
            account.id
        };

        let store = JsonFileStore::open(&path).unwrap();
        let account = store.authenticate("hank").unwrap();
        assert_eq!(account.id, id);
        assert_eq!(account.balance, 1200);
        let history = store.history(id, 10).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].win_amount, 300);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_failed_update_not_committed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        let store = JsonFileStore::open(&path).unwrap();
        let account = store.authenticate("ivy").unwrap();

        assert!(store
            .adjust_balance(&BalanceUpdate::stake(account.id, 1, 5000))
            .is_err());

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get_account(account.id).unwrap().balance, 1000);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            JsonFileStore::open(&path),
            Err(PersistenceError::Serialization(_))
        ));
    }
}
