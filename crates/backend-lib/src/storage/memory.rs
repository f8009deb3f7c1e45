//! In-memory reference adapter.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use uuid::Uuid;

use super::{token_is_stale, Consumed, CredentialStore, PurgeReport, StoreError, TokenEffect};
use crate::models::{NewUser, SecretHash, Session, Token, User, UserId};

/// `DashMap`-backed store. Row atomicity comes from the shard lock held by
/// `entry`/`get_mut`, which is what makes token consumption a true CAS.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<UserId, User>,
    /// normalized email -> user id; its entry lock enforces uniqueness
    emails: DashMap<String, UserId>,
    tokens: DashMap<SecretHash, Token>,
    sessions: DashMap<SecretHash, Session>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokens held for a user, consumed or not
    pub fn tokens_for(&self, user_id: UserId) -> Vec<Token> {
        self.tokens
            .iter()
            .filter(|token| token.user_id == user_id)
            .map(|token| token.value().clone())
            .collect()
    }

    /// Sessions held for a user, revoked or not
    pub fn sessions_for(&self, user_id: UserId) -> Vec<Session> {
        self.sessions
            .iter()
            .filter(|session| session.user_id == user_id)
            .map(|session| session.value().clone())
            .collect()
    }

    fn revoke_sessions_of(&self, user_id: UserId) -> usize {
        let mut revoked = 0;
        for mut session in self.sessions.iter_mut() {
            if session.user_id == user_id && !session.revoked {
                session.revoked = true;
                revoked += 1;
            }
        }
        revoked
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        match self.emails.entry(new_user.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateEmail),
            Entry::Vacant(slot) => {
                let user = User {
                    id: Uuid::new_v4(),
                    email: new_user.email,
                    name: new_user.name,
                    password_hash: new_user.password_hash,
                    email_verified: false,
                    created_at: new_user.created_at,
                    updated_at: new_user.created_at,
                };
                self.users.insert(user.id, user.clone());
                slot.insert(user.id);
                Ok(user)
            },
        }
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let Some(user_id) = self.emails.get(email).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.users.get(&user_id).map(|user| user.clone()))
    }

    async fn find_user_by_id(&self, user_id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(&user_id).map(|user| user.clone()))
    }

    async fn update_password(
        &self,
        user_id: UserId,
        new_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut user = self.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        user.password_hash = new_hash.to_string();
        user.updated_at = now;
        Ok(())
    }

    async fn set_email_verified(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut user = self.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        user.email_verified = true;
        user.updated_at = now;
        Ok(())
    }

    async fn create_token(&self, token: Token) -> Result<(), StoreError> {
        self.tokens.insert(token.token_hash.clone(), token);
        Ok(())
    }

    async fn find_token(&self, token_hash: &SecretHash) -> Result<Option<Token>, StoreError> {
        Ok(self.tokens.get(token_hash).map(|token| token.clone()))
    }

    async fn consume_token(
        &self,
        token_hash: &SecretHash,
        now: DateTime<Utc>,
        effect: TokenEffect,
    ) -> Result<Consumed, StoreError> {
        // Lock order: token row, then user row, then session shards
        let mut token = self.tokens.get_mut(token_hash).ok_or(StoreError::NotFound)?;
        if token.purpose != effect.purpose() {
            return Err(StoreError::NotFound);
        }
        if token.consumed_at.is_some() {
            return Err(StoreError::TokenAlreadyUsed);
        }
        let user_id = token.user_id;
        {
            let mut user = self.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
            effect.apply(&mut user, now);
        }
        let sessions_revoked = if effect.revokes_sessions() {
            self.revoke_sessions_of(user_id)
        } else {
            0
        };
        token.consumed_at = Some(now);

        Ok(Consumed {
            user_id,
            sessions_revoked,
        })
    }

    async fn create_session(&self, session: Session) -> Result<(), StoreError> {
        self.sessions.insert(session.session_hash.clone(), session);
        Ok(())
    }

    async fn find_session(
        &self,
        session_hash: &SecretHash,
    ) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.get(session_hash).map(|session| session.clone()))
    }

    async fn revoke_session(&self, session_hash: &SecretHash) -> Result<(), StoreError> {
        if let Some(mut session) = self.sessions.get_mut(session_hash) {
            session.revoked = true;
        }
        Ok(())
    }

    async fn revoke_all_sessions(&self, user_id: UserId) -> Result<usize, StoreError> {
        Ok(self.revoke_sessions_of(user_id))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<PurgeReport, StoreError> {
        let tokens_before = self.tokens.len();
        self.tokens.retain(|_, token| !token_is_stale(token, now));
        let sessions_before = self.sessions.len();
        self.sessions.retain(|_, session| session.is_usable(now));

        Ok(PurgeReport {
            tokens: tokens_before.saturating_sub(self.tokens.len()),
            sessions: sessions_before.saturating_sub(self.sessions.len()),
        })
    }
}
