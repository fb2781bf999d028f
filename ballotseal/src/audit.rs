use crate::*;
use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// Who asked for an election private key, and why
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Justification {
    pub admin_id: String,
    pub reason: String,
}

impl Justification {
    pub fn new(admin_id: &str, reason: &str) -> Self {
        Justification {
            admin_id: admin_id.to_owned(),
            reason: reason.to_owned(),
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.admin_id.trim().is_empty() {
            return Err(Error::MissingJustification("adminId"));
        }
        if self.reason.trim().is_empty() {
            return Err(Error::MissingJustification("reason"));
        }
        Ok(())
    }
}

/// The record handed to an `Auditor` before key material is released
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KeyReleaseRequest {
    pub election_id: String,
    pub admin_id: String,
    pub reason: String,
    pub share_indices: Vec<u8>,
    pub public_key_fingerprint: String,
    pub requested_at: DateTime<Utc>,
}

/// Compliance hook invoked synchronously before a reconstructed private key is released.
///
/// Returning an error vetoes the release.
pub trait Auditor {
    fn record_key_release(&self, request: &KeyReleaseRequest) -> Result<(), Error>;
}

impl<A: Auditor + ?Sized> Auditor for &A {
    fn record_key_release(&self, request: &KeyReleaseRequest) -> Result<(), Error> {
        (**self).record_key_release(request)
    }
}

impl<A: Auditor + ?Sized> Auditor for Box<A> {
    fn record_key_release(&self, request: &KeyReleaseRequest) -> Result<(), Error> {
        (**self).record_key_release(request)
    }
}

/// Writes each key release to the `ballotseal::audit` log target
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAuditor;

impl Auditor for LogAuditor {
    fn record_key_release(&self, request: &KeyReleaseRequest) -> Result<(), Error> {
        log::info!(
            target: "ballotseal::audit",
            "key release: election={} admin={} reason={:?} shares={:?} key={} at={}",
            request.election_id,
            request.admin_id,
            request.reason,
            request.share_indices,
            request.public_key_fingerprint,
            request.requested_at.to_rfc3339(),
        );
        Ok(())
    }
}

/// Keeps every key release in memory
#[derive(Debug, Default)]
pub struct MemoryAuditor {
    records: Mutex<Vec<KeyReleaseRequest>>,
}

impl MemoryAuditor {
    pub fn records(&self) -> Vec<KeyReleaseRequest> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Auditor for MemoryAuditor {
    fn record_key_release(&self, request: &KeyReleaseRequest) -> Result<(), Error> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| Error::AuditFailed("audit log lock poisoned".into()))?;
        records.push(request.clone());
        Ok(())
    }
}
