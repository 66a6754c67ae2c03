//! Persistent reconnect candidate store using heed (LMDB).
//!
//! Holds at most one device address, the last peer this node linked to.
//! Every operation runs in its own transaction and commits before
//! returning, so an interrupted write never exposes a partial value.

use std::{
   path::{Path, PathBuf},
   sync::Arc,
};

use bluer::Address;
use heed::{Database, Env, EnvOpenOptions, types::Str};
use log::{debug, info};
use thiserror::Error;

use crate::bluetooth::address::{self, AddressParseError};

/// Namespace holding the candidate record.
const NAMESPACE: &str = "bt_rec";
/// Fixed key of the single candidate record.
const CANDIDATE_KEY: &str = "candidate";

/// Errors that can occur in candidate store operations.
#[derive(Error, Debug)]
pub enum Error {
   #[error("Failed to create candidate store directory: {0}")]
   CreateDirectory(#[from] std::io::Error),

   #[error("Failed to open heed environment: {0}")]
   OpenEnvironment(heed::Error),

   #[error("Database transaction error: {0}")]
   Transaction(heed::Error),

   #[error("Database operation error: {0}")]
   DatabaseOperation(heed::Error),

   #[error("Could not find local data directory")]
   DataDirectoryNotFound,

   #[error("Stored candidate {value:?} is corrupt: {source}")]
   Corrupt {
      value: String,
      source: AddressParseError,
   },
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
struct Db {
   env: Env,
   /// Fixed key -> canonical address text
   records: Database<Str, Str>,
}

/// Thread-safe handle to the candidate store.
#[derive(Clone, Debug)]
pub struct CandidateStore {
   db: Arc<Db>,
}

impl CandidateStore {
   /// Open or create the store at the default location.
   pub fn open_default() -> Result<Self> {
      Self::open(Self::db_path()?)
   }

   /// Open or create the store in `path`.
   pub fn open(path: impl AsRef<Path>) -> Result<Self> {
      let path = path.as_ref();
      std::fs::create_dir_all(path)?;

      let env = unsafe {
         EnvOpenOptions::new()
            .map_size(1024 * 1024)
            .max_dbs(1)
            .open(path)
            .map_err(Error::OpenEnvironment)?
      };

      let mut wtxn = env.write_txn().map_err(Error::Transaction)?;
      let records = env
         .create_database(&mut wtxn, Some(NAMESPACE))
         .map_err(Error::DatabaseOperation)?;
      wtxn.commit().map_err(Error::Transaction)?;

      debug!("Opened candidate store at {}", path.display());
      Ok(Self {
         db: Arc::new(Db { env, records }),
      })
   }

   fn db_path() -> Result<PathBuf> {
      if let Ok(path) = std::env::var("A2DP_RECONNECT_DB_PATH") {
         return Ok(PathBuf::from(path));
      }

      // ~/.local/share/a2dp-reconnect/candidates.db
      let base = dirs::data_local_dir().ok_or(Error::DataDirectoryNotFound)?;
      Ok(base.join("a2dp-reconnect").join("candidates.db"))
   }

   /// Records `address` as the reconnect candidate, replacing any previous one.
   pub fn save_candidate(&self, address: Address) -> Result<()> {
      let key = address::encode(address);
      let mut wtxn = self.db.env.write_txn().map_err(Error::Transaction)?;

      self
         .db
         .records
         .put(&mut wtxn, CANDIDATE_KEY, key.as_str())
         .map_err(Error::DatabaseOperation)?;

      wtxn.commit().map_err(Error::Transaction)?;

      info!("Saved reconnect candidate: {key}");
      Ok(())
   }

   /// Erases the candidate. Succeeds when there is nothing to erase, and
   /// reports whether a record existed.
   pub fn remove_candidate(&self) -> Result<bool> {
      let mut wtxn = self.db.env.write_txn().map_err(Error::Transaction)?;

      let existed = self
         .db
         .records
         .delete(&mut wtxn, CANDIDATE_KEY)
         .map_err(Error::DatabaseOperation)?;

      if existed {
         wtxn.commit().map_err(Error::Transaction)?;
         info!("Removed reconnect candidate");
      } else {
         wtxn.abort();
      }
      Ok(existed)
   }

   /// Loads the candidate, `None` when none is stored.
   pub fn load_candidate(&self) -> Result<Option<Address>> {
      let rtxn = self.db.env.read_txn().map_err(Error::Transaction)?;

      let Some(value) = self
         .db
         .records
         .get(&rtxn, CANDIDATE_KEY)
         .map_err(Error::DatabaseOperation)?
      else {
         return Ok(None);
      };

      address::decode(value)
         .map(Some)
         .map_err(|source| Error::Corrupt {
            value: value.to_owned(),
            source,
         })
   }

   #[cfg(test)]
   pub(crate) fn raw_value(&self) -> Option<String> {
      let rtxn = self.db.env.read_txn().unwrap();
      self
         .db
         .records
         .get(&rtxn, CANDIDATE_KEY)
         .unwrap()
         .map(str::to_owned)
   }

   #[cfg(test)]
   pub(crate) fn put_raw(&self, value: &str) {
      let mut wtxn = self.db.env.write_txn().unwrap();
      self.db.records.put(&mut wtxn, CANDIDATE_KEY, value).unwrap();
      wtxn.commit().unwrap();
   }
}
