// ============================
// recruit-auth/src/storage/flat_file.rs
// ============================
//! Flat-file adapter: the whole credential set lives in one JSON snapshot.
//!
//! Every mutation happens under a single async mutex on a copy of the state.
//! The copy is written to a temp file and renamed into place, and only then
//! swapped in, so memory and disk agree even when a write fails.
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::{fs as tokio_fs, sync::Mutex};
use uuid::Uuid;

use super::{token_is_stale, Consumed, CredentialStore, PurgeReport, StoreError, TokenEffect};
use crate::models::{NewUser, SecretHash, Session, Token, User, UserId};

const SNAPSHOT_FILE: &str = "credentials.json";

/// On-disk layout
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    users: Vec<User>,
    tokens: Vec<Token>,
    sessions: Vec<Session>,
}

/// Indexed in-memory view of the snapshot
#[derive(Debug, Default, Clone)]
struct State {
    users: HashMap<UserId, User>,
    emails: HashMap<String, UserId>,
    tokens: HashMap<SecretHash, Token>,
    sessions: HashMap<SecretHash, Session>,
}

impl From<Snapshot> for State {
    fn from(snapshot: Snapshot) -> Self {
        let mut state = State::default();
        for user in snapshot.users {
            state.emails.insert(user.email.clone(), user.id);
            state.users.insert(user.id, user);
        }
        for token in snapshot.tokens {
            state.tokens.insert(token.token_hash.clone(), token);
        }
        for session in snapshot.sessions {
            state.sessions.insert(session.session_hash.clone(), session);
        }
        state
    }
}

impl State {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            users: self.users.values().cloned().collect(),
            tokens: self.tokens.values().cloned().collect(),
            sessions: self.sessions.values().cloned().collect(),
        }
    }

    fn revoke_sessions_of(&mut self, user_id: UserId) -> usize {
        let mut revoked = 0;
        for session in self.sessions.values_mut() {
            if session.user_id == user_id && !session.revoked {
                session.revoked = true;
                revoked += 1;
            }
        }
        revoked
    }
}

/// Flat-file implementation of [`CredentialStore`]
pub struct FlatFileStore {
    root: PathBuf,
    state: Mutex<State>,
}

impl FlatFileStore {
    /// Open (or create) a store rooted at `root`, loading any existing snapshot.
    pub fn new<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let path = root.join(SNAPSHOT_FILE);
        let snapshot = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str::<Snapshot>(&content)?
        } else {
            Snapshot::default()
        };

        tracing::debug!(
            path = %path.display(),
            users = snapshot.users.len(),
            "loaded credential snapshot"
        );

        Ok(Self {
            root,
            state: Mutex::new(State::from(snapshot)),
        })
    }

    fn snapshot_path(&self) -> PathBuf {
        self.root.join(SNAPSHOT_FILE)
    }

    /// Write the snapshot atomically. Callers hold the state lock.
    async fn persist(&self, state: &State) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(&state.snapshot())?;
        let tmp = self.root.join(format!("{SNAPSHOT_FILE}.tmp"));
        tokio_fs::write(&tmp, json).await?;
        tokio_fs::rename(&tmp, self.snapshot_path()).await?;
        Ok(())
    }

    /// Apply `change` to a copy of `state`, persist the copy, then swap it in.
    /// A failed change or write leaves `state` untouched.
    async fn commit<T, F>(&self, state: &mut State, change: F) -> Result<T, StoreError>
    where
        T: Send,
        F: FnOnce(&mut State) -> Result<T, StoreError> + Send,
    {
        let mut next = state.clone();
        let out = change(&mut next)?;
        self.persist(&next).await?;
        *state = next;
        Ok(out)
    }
}

#[async_trait]
impl CredentialStore for FlatFileStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut state = self.state.lock().await;
        self.commit(&mut state, |next| {
            if next.emails.contains_key(&new_user.email) {
                return Err(StoreError::DuplicateEmail);
            }
            let user = User {
                id: Uuid::new_v4(),
                email: new_user.email,
                name: new_user.name,
                password_hash: new_user.password_hash,
                email_verified: false,
                created_at: new_user.created_at,
                updated_at: new_user.created_at,
            };
            next.emails.insert(user.email.clone(), user.id);
            next.users.insert(user.id, user.clone());
            Ok(user)
        })
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .emails
            .get(email)
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn find_user_by_id(&self, user_id: UserId) -> Result<Option<User>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.users.get(&user_id).cloned())
    }

    async fn update_password(
        &self,
        user_id: UserId,
        new_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        self.commit(&mut state, |next| {
            let user = next.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
            user.password_hash = new_hash.to_string();
            user.updated_at = now;
            Ok(())
        })
        .await
    }

    async fn set_email_verified(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        self.commit(&mut state, |next| {
            let user = next.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
            user.email_verified = true;
            user.updated_at = now;
            Ok(())
        })
        .await
    }

    async fn create_token(&self, token: Token) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        self.commit(&mut state, |next| {
            next.tokens.insert(token.token_hash.clone(), token);
            Ok(())
        })
        .await
    }

    async fn find_token(&self, token_hash: &SecretHash) -> Result<Option<Token>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.tokens.get(token_hash).cloned())
    }

    async fn consume_token(
        &self,
        token_hash: &SecretHash,
        now: DateTime<Utc>,
        effect: TokenEffect,
    ) -> Result<Consumed, StoreError> {
        let mut state = self.state.lock().await;
        self.commit(&mut state, |next| {
            let token = next.tokens.get_mut(token_hash).ok_or(StoreError::NotFound)?;
            if token.purpose != effect.purpose() {
                return Err(StoreError::NotFound);
            }
            if token.consumed_at.is_some() {
                return Err(StoreError::TokenAlreadyUsed);
            }
            token.consumed_at = Some(now);
            let user_id = token.user_id;

            let user = next.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
            effect.apply(user, now);
            let sessions_revoked = if effect.revokes_sessions() {
                next.revoke_sessions_of(user_id)
            } else {
                0
            };
            Ok(Consumed {
                user_id,
                sessions_revoked,
            })
        })
        .await
    }

    async fn create_session(&self, session: Session) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        self.commit(&mut state, |next| {
            next.sessions.insert(session.session_hash.clone(), session);
            Ok(())
        })
        .await
    }

    async fn find_session(
        &self,
        session_hash: &SecretHash,
    ) -> Result<Option<Session>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.sessions.get(session_hash).cloned())
    }

    async fn revoke_session(&self, session_hash: &SecretHash) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if !matches!(state.sessions.get(session_hash), Some(session) if !session.revoked) {
            return Ok(());
        }
        self.commit(&mut state, |next| {
            if let Some(session) = next.sessions.get_mut(session_hash) {
                session.revoked = true;
            }
            Ok(())
        })
        .await
    }

    async fn revoke_all_sessions(&self, user_id: UserId) -> Result<usize, StoreError> {
        let mut state = self.state.lock().await;
        let active = state
            .sessions
            .values()
            .filter(|session| session.user_id == user_id && !session.revoked)
            .count();
        if active == 0 {
            return Ok(0);
        }
        self.commit(&mut state, |next| Ok(next.revoke_sessions_of(user_id)))
            .await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<PurgeReport, StoreError> {
        let mut state = self.state.lock().await;
        let report = PurgeReport {
            tokens: state
                .tokens
                .values()
                .filter(|token| token_is_stale(token, now))
                .count(),
            sessions: state
                .sessions
                .values()
                .filter(|session| !session.is_usable(now))
                .count(),
        };
        if report == PurgeReport::default() {
            return Ok(report);
        }
        self.commit(&mut state, |next| {
            next.tokens.retain(|_, token| !token_is_stale(token, now));
            next.sessions.retain(|_, session| session.is_usable(now));
            Ok(report)
        })
        .await
    }
}
