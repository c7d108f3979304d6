use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use tracing::debug;

use super::repo::TokenRepo;
use super::repo_types::{Token, TokenScope};
use crate::db::StoreError;
use crate::users::repo::UserRepo;
use crate::users::repo_types::User;
use crate::validator::Validator;

/// Random bytes drawn per token.
const TOKEN_BYTES: usize = 16;

/// Length of the encoded plaintext (16 bytes, unpadded URL-safe base64).
pub const TOKEN_LEN: usize = 22;

pub fn hash_token(plaintext: &str) -> Vec<u8> {
    Sha256::digest(plaintext.as_bytes()).to_vec()
}

pub fn generate(user_id: i64, ttl: time::Duration, scope: TokenScope) -> Token {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let plaintext = Base64UrlUnpadded::encode_string(&bytes);
    let hash = hash_token(&plaintext);
    Token {
        plaintext,
        hash,
        user_id,
        expiry: OffsetDateTime::now_utc() + ttl,
        scope,
    }
}

/// Generates and persists a token. The returned value is the only place the
/// plaintext ever exists.
pub async fn issue(
    tokens: &dyn TokenRepo,
    user_id: i64,
    ttl: time::Duration,
    scope: TokenScope,
) -> Result<Token, StoreError> {
    let token = generate(user_id, ttl, scope);
    tokens.insert(&token).await?;
    debug!(user_id, scope = scope.as_str(), "token issued");
    Ok(token)
}

/// Resolves the owner of an unexpired token of `scope`. Wrong and expired
/// tokens both yield `TokenNotFound`.
pub async fn resolve(
    users: &dyn UserRepo,
    plaintext: &str,
    scope: TokenScope,
) -> Result<User, StoreError> {
    let hash = hash_token(plaintext);
    users
        .get_for_token(scope, &hash, OffsetDateTime::now_utc())
        .await
}

pub fn validate_plaintext(v: &mut Validator, plaintext: &str) {
    v.check(!plaintext.is_empty(), "token", "must be provided");
    v.check(plaintext.len() == TOKEN_LEN, "token", "must be 22 bytes long");
}
