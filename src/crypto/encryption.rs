//! AES-CBC encryption with PKCS#7 padding.
//!
//! Each call to `encrypt` generates a fresh random 16-byte IV and hands
//! it back next to the ciphertext.  CBC cannot decrypt without the exact
//! IV used at encryption time, so callers store the pair together.

use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;

use super::kdf::KeySize;
use super::keys::DerivedSecret;
use super::CryptoError;

/// Size of the AES block, and therefore of every IV, in bytes.
pub const IV_LEN: usize = 16;

/// Encrypt `plaintext` under `secret`.
///
/// Returns `(ciphertext, iv)`.
pub fn encrypt(
    secret: &DerivedSecret,
    plaintext: &[u8],
) -> Result<(Vec<u8>, [u8; IV_LEN]), CryptoError> {
    let mut iv = [0u8; IV_LEN];
    rand::rng().fill_bytes(&mut iv);

    let key = secret.as_bytes();
    let ciphertext = match secret.key_size() {
        KeySize::Aes128 => cbc::Encryptor::<Aes128>::new_from_slices(key, &iv)
            .map_err(|_| CryptoError::InvalidKeyLength(key.len()))?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        KeySize::Aes192 => cbc::Encryptor::<Aes192>::new_from_slices(key, &iv)
            .map_err(|_| CryptoError::InvalidKeyLength(key.len()))?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        KeySize::Aes256 => cbc::Encryptor::<Aes256>::new_from_slices(key, &iv)
            .map_err(|_| CryptoError::InvalidKeyLength(key.len()))?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
    };

    Ok((ciphertext, iv))
}

/// Decrypt data that was produced by `encrypt` with the given `iv`.
pub fn decrypt(secret: &DerivedSecret, ciphertext: &[u8], iv: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if iv.len() != IV_LEN {
        return Err(CryptoError::InvalidIv {
            expected: IV_LEN,
            actual: iv.len(),
        });
    }
    if ciphertext.is_empty() || ciphertext.len() % IV_LEN != 0 {
        return Err(CryptoError::IllegalBlockSize(ciphertext.len()));
    }

    let key = secret.as_bytes();
    let plaintext = match secret.key_size() {
        KeySize::Aes128 => cbc::Decryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(|_| CryptoError::InvalidKeyLength(key.len()))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        KeySize::Aes192 => cbc::Decryptor::<Aes192>::new_from_slices(key, iv)
            .map_err(|_| CryptoError::InvalidKeyLength(key.len()))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        KeySize::Aes256 => cbc::Decryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(|_| CryptoError::InvalidKeyLength(key.len()))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
    };

    plaintext.map_err(|_| CryptoError::BadPadding)
}

/// Decrypt a hex-encoded ciphertext, as stored in a `SecureEntry`.
pub fn decrypt_hex(
    secret: &DerivedSecret,
    cipher_hex: &str,
    iv: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let ciphertext = hex::decode(cipher_hex)?;
    decrypt(secret, &ciphertext, iv)
}
