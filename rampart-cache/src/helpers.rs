//! Typed get/set over the string store.

use crate::error::{CacheError, CacheResult};
use rampart_store::SharedStore;
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;

/// Get a typed value from the store.
///
/// A missing key and an empty value are both misses.
pub async fn get<T: DeserializeOwned>(
    store: &dyn SharedStore,
    key: &str,
) -> CacheResult<Option<T>> {
    match store.get(key).await? {
        Some(json) if !json.is_empty() => {
            let value: T = serde_json::from_str(&json)
                .map_err(|e| CacheError::Deserialization(e.to_string()))?;
            Ok(Some(value))
        }
        _ => Ok(None),
    }
}

/// Set a typed value in the store.
pub async fn set<T: Serialize>(
    store: &dyn SharedStore,
    key: &str,
    value: &T,
    ttl: Option<Duration>,
) -> CacheResult<()> {
    let json = serde_json::to_string(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
    store.set(key, &json, ttl).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rampart_store::MemoryStore;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Greeting {
        text: String,
        translated: String,
    }

    #[tokio::test]
    async fn test_typed_roundtrip() {
        let store = MemoryStore::new();
        let value = Greeting {
            text: "hola".into(),
            translated: "hello".into(),
        };

        set(&store, "g", &value, None).await.unwrap();
        let loaded: Option<Greeting> = get(&store, "g").await.unwrap();
        assert_eq!(loaded, Some(value));
    }

    #[tokio::test]
    async fn test_empty_value_is_miss() {
        let store = MemoryStore::new();
        store.set("g", "", None).await.unwrap();

        let loaded: Option<Greeting> = get(&store, "g").await.unwrap();
        assert_eq!(loaded, None);
    }

    #[tokio::test]
    async fn test_undecodable_value() {
        let store = MemoryStore::new();
        store.set("g", "{not json", None).await.unwrap();

        let result: CacheResult<Option<Greeting>> = get(&store, "g").await;
        assert!(matches!(result, Err(CacheError::Deserialization(_))));
    }
}
