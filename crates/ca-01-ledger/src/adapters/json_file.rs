//! File-backed ledger store.
//!
//! One JSON document per auction holds the ledger and its full audit trail.
//! A commit writes a temporary file and renames it over the previous one, so
//! a crash leaves either the old or the new document, never a mix.

use crate::domain::audit::{AuditQuery, AuditRecord};
use crate::domain::errors::LedgerError;
use crate::domain::ledger::AuctionLedger;
use crate::ports::outbound::LedgerStore;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shared_types::AuctionId;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

const EXTENSION: &str = "ledger.json";

#[derive(Serialize, Deserialize)]
struct Document {
    ledger: AuctionLedger,
    audit: Vec<AuditRecord>,
}

pub struct JsonFileLedgerStore {
    dir: PathBuf,
    /// Serializes read-modify-write of documents.
    write_lock: Mutex<()>,
}

impl JsonFileLedgerStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn path_for(&self, auction_id: &AuctionId) -> Result<PathBuf, LedgerError> {
        let id = auction_id.as_str();
        let safe = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !safe {
            return Err(LedgerError::Io(format!("unsafe auction id for file store: {id:?}")));
        }
        Ok(self.dir.join(format!("{id}.{EXTENSION}")))
    }

    fn read_document(path: &Path) -> Result<Option<Document>, LedgerError> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_document(path: &Path, document: &Document) -> Result<(), LedgerError> {
        let bytes = serde_json::to_vec(document)?;
        let tmp = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl LedgerStore for JsonFileLedgerStore {
    fn load(&self, auction_id: &AuctionId) -> Result<Option<AuctionLedger>, LedgerError> {
        let path = self.path_for(auction_id)?;
        Ok(Self::read_document(&path)?.map(|doc| doc.ledger))
    }

    fn commit(&self, ledger: &AuctionLedger, audit: &[AuditRecord]) -> Result<(), LedgerError> {
        let path = self.path_for(ledger.id())?;
        let _guard = self.write_lock.lock();

        let mut records = Self::read_document(&path)?
            .map(|doc| doc.audit)
            .unwrap_or_default();
        records.extend_from_slice(audit);

        let document = Document {
            ledger: ledger.clone(),
            audit: records,
        };
        Self::write_document(&path, &document).map_err(|e| LedgerError::CommitFailed {
            auction_id: ledger.id().to_string(),
            reason: e.to_string(),
        })?;

        debug!(auction_id = %ledger.id(), audit = audit.len(), "Ledger committed to disk");
        Ok(())
    }

    fn audit_records(&self, query: &AuditQuery) -> Result<Vec<AuditRecord>, LedgerError> {
        let ids = match &query.auction_id {
            Some(id) => vec![id.clone()],
            None => self.auction_ids()?,
        };

        let mut records = Vec::new();
        for id in ids {
            if let Some(doc) = Self::read_document(&self.path_for(&id)?)? {
                records.extend(doc.audit.into_iter().filter(|r| query.matches(r)));
            }
        }
        Ok(records)
    }

    fn auction_ids(&self) -> Result<Vec<AuctionId>, LedgerError> {
        let suffix = format!(".{EXTENSION}");
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if let Some(id) = name.strip_suffix(&suffix) {
                ids.push(AuctionId::new(id));
            }
        }
        ids.sort();
        Ok(ids)
    }
}
