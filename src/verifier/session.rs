use std::{collections::BTreeMap, fmt::Debug, sync::Arc};

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::Error;

/// A pending presentation: what the Authorization Response is checked against.
#[derive(Debug, Clone)]
pub struct Session {
    pub uuid: Uuid,
    pub status: Status,
    /// `state` sent in the Authorization Request.
    pub state: Option<String>,
    /// `nonce` sent in the Authorization Request.
    pub nonce: Option<String>,
    pub callback_id: String,
}

impl Session {
    pub fn new(state: Option<String>, nonce: Option<String>, callback_id: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            status: Status::Initiated,
            state,
            nonce,
            callback_id: callback_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum Status {
    /// The Authorization Request was issued, waiting on the wallet's response.
    Initiated,
    /// Verifier has received the response and is now processing it.
    ReceivedResponse,
    /// Verifier has finished processing the response.
    Complete(Outcome),
}

#[derive(Debug, Clone)]
pub enum Outcome {
    /// An error occurred during response processing.
    Error { cause: Arc<Error> },
    /// The authorization response did not pass verification.
    Failure { reason: String },
    /// The authorization response is verified.
    Success,
}

impl From<Error> for Outcome {
    fn from(error: Error) -> Self {
        match error.reason() {
            Some(reason) => Self::Failure {
                reason: reason.to_string(),
            },
            None => Self::Error {
                cause: Arc::new(error),
            },
        }
    }
}

/// Storage interface for session information.
#[async_trait]
pub trait SessionStore: Debug {
    /// Store a new session.
    async fn initiate(&self, session: Session) -> Result<()>;

    /// Mark a session as having received its response, returning the session.
    ///
    /// Must check and update the status atomically: fails if the session is
    /// unknown or a response was already received.
    async fn begin_response(&self, uuid: Uuid) -> Result<Session>;

    /// Update the status of a session.
    async fn update_status(&self, uuid: Uuid, status: Status) -> Result<()>;

    /// Get a session from the store.
    async fn get_session(&self, uuid: Uuid) -> Result<Session>;

    /// Remove a session from the store.
    async fn remove_session(&self, uuid: Uuid) -> Result<()>;
}

/// A local in-memory store. Not for production use!
///
/// # Warning
/// This in-memory store should only be used for test purposes, it will not work for a distributed
/// deployment.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    store: Arc<Mutex<BTreeMap<Uuid, Session>>>,
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn initiate(&self, session: Session) -> Result<()> {
        self.store.lock().await.insert(session.uuid, session);

        Ok(())
    }

    async fn begin_response(&self, uuid: Uuid) -> Result<Session> {
        let mut store = self.store.lock().await;
        let Some(session) = store.get_mut(&uuid) else {
            bail!("session not found")
        };
        if session.status >= Status::ReceivedResponse {
            bail!("a response was already received for session {uuid}")
        }
        session.status = Status::ReceivedResponse;
        Ok(session.clone())
    }

    async fn update_status(&self, uuid: Uuid, status: Status) -> Result<()> {
        if let Some(session) = self.store.lock().await.get_mut(&uuid) {
            session.status = status;
            return Ok(());
        }
        bail!("session not found")
    }

    async fn get_session(&self, uuid: Uuid) -> Result<Session> {
        if let Some(session) = self.store.lock().await.get(&uuid) {
            return Ok(session.clone());
        }

        bail!("session not found")
    }

    async fn remove_session(&self, uuid: Uuid) -> Result<()> {
        if self.store.lock().await.remove(&uuid).is_some() {
            return Ok(());
        }

        bail!("session not found")
    }
}

impl PartialEq for Outcome {
    fn eq(&self, other: &Self) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }
}

impl Outcome {
    fn ordering(&self) -> u8 {
        match self {
            Outcome::Error { .. } => 0,
            Outcome::Failure { .. } => 1,
            Outcome::Success => 2,
        }
    }
}

impl PartialOrd for Outcome {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.ordering().partial_cmp(&other.ordering())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Reason, Step};

    #[tokio::test]
    async fn memory_store_lifecycle() {
        let store = MemoryStore::default();
        let session = Session::new(Some("state".into()), Some("nonce".into()), "callback");
        let uuid = session.uuid;

        store.initiate(session).await.unwrap();
        assert_eq!(store.get_session(uuid).await.unwrap().status, Status::Initiated);

        store
            .update_status(uuid, Status::ReceivedResponse)
            .await
            .unwrap();
        assert_eq!(
            store.get_session(uuid).await.unwrap().status,
            Status::ReceivedResponse
        );

        store.remove_session(uuid).await.unwrap();
        assert!(store.begin_response(uuid).await.is_err());
        assert!(store.get_session(uuid).await.is_err());
        assert!(store.update_status(uuid, Status::Initiated).await.is_err());
    }

    #[tokio::test]
    async fn response_is_accepted_once() {
        let store = MemoryStore::default();
        let session = Session::new(Some("state".into()), None, "callback");
        let uuid = session.uuid;
        store.initiate(session).await.unwrap();

        let session = store.begin_response(uuid).await.unwrap();
        assert_eq!(session.status, Status::ReceivedResponse);
        assert_eq!(session.state.as_deref(), Some("state"));
        assert!(store.begin_response(uuid).await.is_err());

        store
            .update_status(uuid, Status::Complete(Outcome::Success))
            .await
            .unwrap();
        assert!(store.begin_response(uuid).await.is_err());
    }

    #[test]
    fn outcome_from_error() {
        let rejection = Error::rejected(Step::StateCheck, Reason::NonceMismatch);
        assert!(matches!(
            Outcome::from(rejection),
            Outcome::Failure { reason } if reason == "nonce mismatch"
        ));
        assert!(matches!(
            Outcome::from(Error::MissingVpToken),
            Outcome::Error { .. }
        ));
    }

    #[test]
    fn status_ordering() {
        assert!(Status::Initiated < Status::ReceivedResponse);
        assert!(Status::ReceivedResponse < Status::Complete(Outcome::Success));
    }
}
