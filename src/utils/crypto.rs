use base64::{engine::general_purpose::STANDARD as Base64, Engine as _};
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

use crate::error::{AppError, AppResult};

const VERSION_PREFIX: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;
const PBKDF2_ITERATIONS: u32 = 120_000;

/// Encodes as `pbkdf2-sha256$<iterations>$<salt>$<hash>`, base64 parts.
pub fn hash_password(password: &str) -> AppResult<String> {
    if password.is_empty() {
        return Err(AppError::validation("la contraseña no puede estar vacía"));
    }

    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let key = derive_key(password.as_bytes(), &salt, PBKDF2_ITERATIONS);

    Ok(format!(
        "{VERSION_PREFIX}${PBKDF2_ITERATIONS}${}${}",
        Base64.encode(salt),
        Base64.encode(key)
    ))
}

pub fn verify_password(password: &str, encoded: &str) -> AppResult<bool> {
    let mut parts = encoded.split('$');
    let (Some(prefix), Some(iterations), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(AppError::other("formato de hash no soportado"));
    };

    if prefix != VERSION_PREFIX {
        return Err(AppError::other("formato de hash no soportado"));
    }

    let iterations: u32 = iterations
        .parse()
        .map_err(|_| AppError::other("iteraciones de hash inválidas"))?;
    let salt = Base64
        .decode(salt)
        .map_err(|_| AppError::other("sal de hash inválida"))?;
    let expected = Base64
        .decode(hash)
        .map_err(|_| AppError::other("hash inválido"))?;

    let actual = derive_key(password.as_bytes(), &salt, iterations);
    Ok(constant_time_eq(&actual, &expected))
}

fn derive_key(password: &[u8], salt: &[u8], iterations: u32) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut key);
    key
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
