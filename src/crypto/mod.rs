//! Asymmetric credential codec.
//!
//! Tokens are encrypted with RSA/OAEP (SHA-1) and carried as standard base64,
//! which matches the defaults of Node's `crypto.publicEncrypt` /
//! `crypto.privateDecrypt`. Key material is read either as full PEM or as the
//! bare base64 body stored in settings files.

use base64::{engine::general_purpose::STANDARD, Engine};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Invalid private key material: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid public key material: {0}")]
    InvalidPublicKey(String),

    #[error("RSA operation failed: {0}")]
    Rsa(#[from] rsa::Error),

    #[error("Decrypted payload is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Key encoding failed: {0}")]
    Encoding(String),
}

/// Parsed private half of a key pair
#[derive(Clone)]
pub struct PrivateKey(RsaPrivateKey);

/// Parsed public half of a key pair
#[derive(Clone)]
pub struct PublicKey(RsaPublicKey);

impl PrivateKey {
    pub fn from_material(material: &str) -> Result<Self, CryptoError> {
        let material = material.trim();
        if material.is_empty() {
            return Err(CryptoError::InvalidPrivateKey("empty key material".to_string()));
        }

        let key = if material.starts_with("-----BEGIN") {
            RsaPrivateKey::from_pkcs1_pem(material)
                .or_else(|_| RsaPrivateKey::from_pkcs8_pem(material))
                .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?
        } else {
            let der = decode_body(material)?;
            RsaPrivateKey::from_pkcs1_der(&der)
                .or_else(|_| RsaPrivateKey::from_pkcs8_der(&der))
                .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?
        };

        Ok(Self(key))
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.to_public_key())
    }

    /// Decrypt one base64 ciphertext into its UTF-8 plaintext
    pub fn decrypt(&self, data_base64: &str) -> Result<String, CryptoError> {
        let ciphertext = STANDARD.decode(data_base64.trim())?;
        let plaintext = self.0.decrypt(Oaep::new::<sha1::Sha1>(), &ciphertext)?;
        Ok(String::from_utf8(plaintext)?)
    }

    /// Bare base64 body of the PKCS#1 encoding, as stored in settings
    pub fn to_material(&self) -> Result<String, CryptoError> {
        let der = self
            .0
            .to_pkcs1_der()
            .map_err(|e| CryptoError::Encoding(e.to_string()))?;
        Ok(STANDARD.encode(der.as_bytes()))
    }
}

impl PublicKey {
    pub fn from_material(material: &str) -> Result<Self, CryptoError> {
        let material = material.trim();
        if material.is_empty() {
            return Err(CryptoError::InvalidPublicKey("empty key material".to_string()));
        }

        let key = if material.starts_with("-----BEGIN") {
            RsaPublicKey::from_public_key_pem(material)
                .or_else(|_| RsaPublicKey::from_pkcs1_pem(material))
                .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?
        } else {
            let der = decode_body(material)?;
            RsaPublicKey::from_public_key_der(&der)
                .or_else(|_| RsaPublicKey::from_pkcs1_der(&der))
                .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?
        };

        Ok(Self(key))
    }

    /// Encrypt plaintext into a base64 ciphertext
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let mut rng = rand::thread_rng();
        let ciphertext = self
            .0
            .encrypt(&mut rng, Oaep::new::<sha1::Sha1>(), plaintext.as_bytes())?;
        Ok(STANDARD.encode(ciphertext))
    }

    /// Bare base64 body of the SPKI encoding, as stored in settings
    pub fn to_material(&self) -> Result<String, CryptoError> {
        let der = self
            .0
            .to_public_key_der()
            .map_err(|e| CryptoError::Encoding(e.to_string()))?;
        Ok(STANDARD.encode(der.as_bytes()))
    }

    pub fn to_pem(&self) -> Result<String, CryptoError> {
        self.0
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::Encoding(e.to_string()))
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateKey([redacted])")
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PublicKey(..)")
    }
}

/// Decrypt `data_base64` with the given private key material
pub fn decrypt(data_base64: &str, private_key: &str) -> Result<String, CryptoError> {
    PrivateKey::from_material(private_key)?.decrypt(data_base64)
}

/// Encrypt `data` with the given public key material
pub fn encrypt(data: &str, public_key: &str) -> Result<String, CryptoError> {
    PublicKey::from_material(public_key)?.encrypt(data)
}

/// Generate a fresh key pair, returned as bare-body material
pub fn generate_key_pair(bits: usize) -> Result<(String, String), CryptoError> {
    let mut rng = rand::thread_rng();
    let private = PrivateKey(RsaPrivateKey::new(&mut rng, bits)?);
    let public = private.public_key();
    Ok((private.to_material()?, public.to_material()?))
}

fn decode_body(material: &str) -> Result<Vec<u8>, CryptoError> {
    let compact: String = material.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(STANDARD.decode(compact)?)
}
