//! Process-lifetime cache of private keys, keyed by pair ID.
//!
//! Entries are never invalidated. The lock is only taken for the lookup and
//! the insert, never across the store round trip, so two concurrent misses
//! for one ID may both fetch; the first insert wins.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::crypto::envelope::{Opener, RsaOpener};
use crate::crypto::keys::private_key_from_pem;
use crate::error::Error;
use crate::pair::KeyPairId;
use crate::store::{ParameterName, ParameterStore};

#[derive(Default)]
pub struct PrivateKeyCache {
    openers: RwLock<HashMap<KeyPairId, Arc<dyn Opener>>>,
}

impl PrivateKeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &KeyPairId) -> bool {
        self.openers.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.openers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.openers.read().is_empty()
    }

    /// Seeds the cache with an opener obtained elsewhere.
    pub fn insert(&self, id: KeyPairId, opener: Arc<dyn Opener>) -> Arc<dyn Opener> {
        self.openers.write().entry(id).or_insert(opener).clone()
    }

    /// Returns the cached opener for `id`, fetching the private key from
    /// `/<namespace>/privateKey/<id>` on a miss.
    pub async fn get_or_fetch(
        &self,
        store: &dyn ParameterStore,
        namespace: &str,
        id: &KeyPairId,
    ) -> Result<Arc<dyn Opener>, Error> {
        let cached = self.openers.read().get(id).cloned();
        if let Some(opener) = cached {
            return Ok(opener);
        }

        let name = ParameterName::private_key(namespace, id)?;
        debug!(%id, %name, "private key cache miss");
        let parameter = store.get_parameter(&name, true).await?;
        let key = private_key_from_pem(&parameter.value)?;
        Ok(self.insert(id.clone(), Arc::new(RsaOpener::new(key))))
    }
}
