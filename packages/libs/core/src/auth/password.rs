//! 비밀번호 해시
//!
//! Argon2id PHC 문자열로 저장합니다. 솔트는 호출마다 새로 뽑습니다.

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};

use crate::error::{Error, Result};

pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(Error::internal)?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(Error::internal)?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(Error::internal)?
        .to_string();
    Ok(phc)
}

/// 저장된 해시와 비교 (불일치는 `Ok(false)`)
pub fn verify_password(hash: &str, password: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(Error::internal)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(Error::internal(e)),
    }
}
