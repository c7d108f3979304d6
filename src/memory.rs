//! In-memory stand-in for the PostgreSQL stores, used by tests. Mirrors the
//! constraints the schema enforces: unique emails, conditional version
//! writes, join-based permission grants and token expiry.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::db::StoreError;
use crate::permissions::repo::PermissionRepo;
use crate::permissions::repo_types::{Permissions, REFERENCE_READ, REFERENCE_WRITE};
use crate::references::repo::ReferenceRepo;
use crate::references::repo_types::{NewReference, Reference};
use crate::tokens::repo::TokenRepo;
use crate::tokens::repo_types::{Token, TokenScope};
use crate::users::repo::UserRepo;
use crate::users::repo_types::{NewUser, User};

struct StoredToken {
    hash: Vec<u8>,
    user_id: i64,
    expiry: OffsetDateTime,
    scope: TokenScope,
}

struct Tables {
    users: BTreeMap<i64, User>,
    tokens: Vec<StoredToken>,
    permissions: BTreeMap<i64, String>,
    users_permissions: BTreeSet<(i64, i64)>,
    references: BTreeMap<i64, Reference>,
    next_user_id: i64,
    next_reference_id: i64,
}

pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let permissions = [(1, REFERENCE_READ), (2, REFERENCE_WRITE)]
            .into_iter()
            .map(|(id, code)| (id, code.to_string()))
            .collect();
        Self {
            tables: Mutex::new(Tables {
                users: BTreeMap::new(),
                tokens: Vec::new(),
                permissions,
                users_permissions: BTreeSet::new(),
                references: BTreeMap::new(),
                next_user_id: 1,
                next_reference_id: 1,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    pub async fn insert_user(&self, user: NewUser) -> User {
        UserRepo::insert(self, user).await.unwrap()
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let mut t = self.lock();
        if t.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let id = t.next_user_id;
        t.next_user_id += 1;
        let user = User {
            id,
            created_at: OffsetDateTime::now_utc(),
            name: user.name,
            email: user.email,
            password: user.password,
            activated: user.activated,
            version: 1,
        };
        t.users.insert(id, user.clone());
        Ok(user)
    }

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.lock()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::RecordNotFound)
    }

    async fn update(&self, user: &User) -> Result<i32, StoreError> {
        let mut t = self.lock();
        match t.users.get(&user.id) {
            Some(stored) if stored.version == user.version => {}
            _ => return Err(StoreError::EditConflict),
        }
        if t.users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(StoreError::DuplicateEmail);
        }
        let mut updated = user.clone();
        updated.version += 1;
        let version = updated.version;
        t.users.insert(user.id, updated);
        Ok(version)
    }

    async fn get_for_token(
        &self,
        scope: TokenScope,
        token_hash: &[u8],
        now: OffsetDateTime,
    ) -> Result<User, StoreError> {
        let t = self.lock();
        t.tokens
            .iter()
            .find(|tok| tok.hash == token_hash && tok.scope == scope && tok.expiry > now)
            .and_then(|tok| t.users.get(&tok.user_id))
            .cloned()
            .ok_or(StoreError::TokenNotFound)
    }
}

#[async_trait]
impl TokenRepo for MemoryStore {
    async fn insert(&self, token: &Token) -> Result<(), StoreError> {
        self.lock().tokens.push(StoredToken {
            hash: token.hash.clone(),
            user_id: token.user_id,
            expiry: token.expiry,
            scope: token.scope,
        });
        Ok(())
    }

    async fn delete_all_for_user(
        &self,
        scope: TokenScope,
        user_id: i64,
    ) -> Result<(), StoreError> {
        self.lock()
            .tokens
            .retain(|tok| !(tok.scope == scope && tok.user_id == user_id));
        Ok(())
    }
}

#[async_trait]
impl PermissionRepo for MemoryStore {
    async fn get_all_for_user(&self, user_id: i64) -> Result<Permissions, StoreError> {
        let t = self.lock();
        Ok(t.users_permissions
            .iter()
            .filter(|(uid, _)| *uid == user_id)
            .filter_map(|(_, pid)| t.permissions.get(pid).cloned())
            .collect())
    }

    async fn add_for_user(&self, user_id: i64, codes: &[&str]) -> Result<(), StoreError> {
        let mut t = self.lock();
        let ids: Vec<i64> = t
            .permissions
            .iter()
            .filter(|(_, code)| codes.contains(&code.as_str()))
            .map(|(id, _)| *id)
            .collect();
        for id in ids {
            t.users_permissions.insert((user_id, id));
        }
        Ok(())
    }
}

#[async_trait]
impl ReferenceRepo for MemoryStore {
    async fn insert(&self, reference: NewReference) -> Result<Reference, StoreError> {
        let mut t = self.lock();
        let id = t.next_reference_id;
        t.next_reference_id += 1;
        let reference = Reference {
            id,
            created_at: OffsetDateTime::now_utc(),
            name: reference.name,
            location: reference.location,
            version: 1,
        };
        t.references.insert(id, reference.clone());
        Ok(reference)
    }

    async fn get(&self, id: i64) -> Result<Reference, StoreError> {
        if id < 1 {
            return Err(StoreError::RecordNotFound);
        }
        self.lock()
            .references
            .get(&id)
            .cloned()
            .ok_or(StoreError::RecordNotFound)
    }

    async fn update(&self, reference: &Reference) -> Result<i32, StoreError> {
        let mut t = self.lock();
        match t.references.get_mut(&reference.id) {
            Some(stored) if stored.version == reference.version => {
                stored.name = reference.name.clone();
                stored.location = reference.location.clone();
                stored.version += 1;
                Ok(stored.version)
            }
            _ => Err(StoreError::EditConflict),
        }
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        if id < 1 {
            return Err(StoreError::RecordNotFound);
        }
        self.lock()
            .references
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::RecordNotFound)
    }
}
