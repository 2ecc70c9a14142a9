//! Per-organization LLM configuration storage
//!
//! Configurations live in a TTL cache under `llm-config:{org_id}`. The
//! provider secret (`apiKey`, or `llmApiKey` for compatible endpoints) is
//! encrypted before it reaches the cache and decrypted on the way out.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::config::{ConfigSource, ProviderConfig, ENCRYPTION_KEY};
use crate::error::Error;

pub const CACHE_KEY_PREFIX: &str = "llm-config:";
/// 24 hours
pub const CONFIG_TTL: Duration = Duration::from_secs(86400);

const NONCE_SIZE: usize = 12;

pub fn cache_key(org_id: &str) -> String
{   format!("{}{}", CACHE_KEY_PREFIX, org_id)
}

// ===== Cache =====

/// Key/value cache with per-entry expiry
#[async_trait]
pub trait Cache: Send + Sync
{   async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, Error>;

    async fn set(
      &self
    , key: &str
    , value: serde_json::Value
    , ttl: Duration
    ) -> Result<(), Error>;

    async fn invalidate(&self, key: &str) -> Result<(), Error>;
}

/// In-process cache; expired entries read as absent. They are dropped when
/// read and purged on every write.
#[derive(Default)]
pub struct MemoryCache
{   entries: RwLock<HashMap<String, (serde_json::Value, Instant)>>
}

impl MemoryCache
{   pub fn new() -> Self
    {   Self::default()
    }

    /// Entries held, expired or not
    pub async fn len(&self) -> usize
    {   self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool
    {   self.len().await == 0
    }
}

#[async_trait]
impl Cache for MemoryCache
{   async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, Error>
    {   {   let entries = self.entries.read().await;
            match entries.get(key)
            {   None => return Ok(None)
              , Some((value, expires_at)) if Instant::now() < *expires_at => {
                  return Ok(Some(value.clone()));
                }
              , Some(_) => {}
            }
        }
        debug!("Cache entry {} expired", key);
        self.entries.write().await.remove(key);
        Ok(None)
    }

    async fn set(
      &self
    , key: &str
    , value: serde_json::Value
    , ttl: Duration
    ) -> Result<(), Error>
    {   let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, (_, expires_at)| now < *expires_at);
        if entries.len() < before
        {   debug!("Purged {} expired cache entries", before - entries.len());
        }
        entries.insert(key.to_string(), (value, now + ttl));
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<(), Error>
    {   self.entries.write().await.remove(key);
        Ok(())
    }
}

// ===== Secret encryption =====

pub trait SecretCipher: Send + Sync
{   fn encrypt(&self, plaintext: &str) -> Result<String, Error>;
    fn decrypt(&self, payload: &str) -> Result<String, Error>;
}

/// AES-256-GCM keyed by the SHA-256 of a passphrase.
///
/// Payloads are `base64(nonce || ciphertext)` with a fresh random nonce per
/// encryption.
#[derive(Clone)]
pub struct AesGcmCipher
{   cipher: Aes256Gcm
}

impl AesGcmCipher
{   pub fn new(passphrase: &str) -> Result<Self, Error>
    {   if passphrase.is_empty()
        {   return Err(Error::MissingConfig(ENCRYPTION_KEY.to_string()));
        }
        let key = Sha256::digest(passphrase.as_bytes());
        let cipher = Aes256Gcm::new_from_slice(&key)
          .map_err(|e| Error::Crypto(e.to_string()))?;
        Ok(AesGcmCipher { cipher })
    }

    /// Read the passphrase from `LLM_ENCRYPTION_KEY`.
    pub async fn from_source(source: &dyn ConfigSource) -> Result<Self, Error>
    {   let passphrase = source.get_config(ENCRYPTION_KEY).await?
          .ok_or_else(|| Error::MissingConfig(ENCRYPTION_KEY.to_string()))?;
        Self::new(&passphrase)
    }
}

impl SecretCipher for AesGcmCipher
{   fn encrypt(&self, plaintext: &str) -> Result<String, Error>
    {   let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = self.cipher
          .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
          .map_err(|e| Error::Crypto(e.to_string()))?;

        let mut payload = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(payload))
    }

    fn decrypt(&self, payload: &str) -> Result<String, Error>
    {   let bytes = STANDARD.decode(payload)
          .map_err(|e| Error::Crypto(e.to_string()))?;
        if bytes.len() <= NONCE_SIZE
        {   return Err(Error::Crypto("payload too short".to_string()));
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_SIZE);

        let plaintext = self.cipher
          .decrypt(Nonce::from_slice(nonce), ciphertext)
          .map_err(|_| Error::Crypto("decryption failed".to_string()))?;
        String::from_utf8(plaintext).map_err(|e| Error::Crypto(e.to_string()))
    }
}

// ===== Repository =====

/// Configuration as persisted for one organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredLlmConfiguration
{   pub config: ProviderConfig
  , pub configured_at: DateTime<Utc>
}

#[async_trait]
pub trait ConfigurationStore: Send + Sync
{   async fn save(&self, org_id: &str, config: ProviderConfig) -> Result<(), Error>;

    async fn get(&self, org_id: &str) -> Result<Option<StoredLlmConfiguration>, Error>;

    async fn exists(&self, org_id: &str) -> Result<bool, Error>;
}

pub struct CachedConfigurationRepository
{   cache: Arc<dyn Cache>
  , cipher: Arc<dyn SecretCipher>
}

impl CachedConfigurationRepository
{   pub fn new(cache: Arc<dyn Cache>, cipher: Arc<dyn SecretCipher>) -> Self
    {   CachedConfigurationRepository { cache, cipher }
    }

    /// In-memory cache with AES-GCM keyed from `LLM_ENCRYPTION_KEY`
    pub async fn from_source(source: &dyn ConfigSource) -> Result<Self, Error>
    {   let cipher = AesGcmCipher::from_source(source).await?;
        Ok(Self::new(Arc::new(MemoryCache::new()), Arc::new(cipher)))
    }
}

#[async_trait]
impl ConfigurationStore for CachedConfigurationRepository
{   async fn save(&self, org_id: &str, mut config: ProviderConfig) -> Result<(), Error>
    {   let provider = config.provider();
        config.map_secret(|secret| self.cipher.encrypt(secret))?;

        let stored = StoredLlmConfiguration
        {   config
          , configured_at: Utc::now()
        };
        let key = cache_key(org_id);
        self.cache
          .set(&key, serde_json::to_value(&stored)?, CONFIG_TTL)
          .await
          .map_err(|e| {
            error!("Failed to save LLM configuration for {}: {}", org_id, e);
            e
          })?;

        info!("Saved {} LLM configuration for organization {}", provider, org_id);
        Ok(())
    }

    async fn get(&self, org_id: &str) -> Result<Option<StoredLlmConfiguration>, Error>
    {   let Some(value) = self.cache.get(&cache_key(org_id)).await? else {
          debug!("No LLM configuration cached for organization {}", org_id);
          return Ok(None);
        };

        let mut stored: StoredLlmConfiguration = serde_json::from_value(value)?;
        stored.config.map_secret(|secret| self.cipher.decrypt(secret))?;
        Ok(Some(stored))
    }

    async fn exists(&self, org_id: &str) -> Result<bool, Error>
    {   Ok(self.cache.get(&cache_key(org_id)).await?.is_some())
    }
}
