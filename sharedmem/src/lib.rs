// Copyright (C) 2023 QuerentAI LLC.
// This file is part of Querent.

// The Licensed Work is licensed under the Business Source License 1.1 (BSL 1.1).
// You may use this file in compliance with the BSL 1.1, subject to the following restrictions:
// 1. You may not use the Licensed Work for AI-related services, database services,
//    or any service or product offering that provides database, big data, or analytics
//    services to third parties unless explicitly authorized by QuerentAI LLC.
// 2. For more details, see the LICENSE file or visit https://mariadb.com/bsl11/.

// For inquiries about alternative licensing arrangements, please contact contact@querent.xyz.

// The Licensed Work is provided "AS IS", WITHOUT WARRANTY OF ANY KIND, express or implied,
// including but not limited to the warranties of merchantability, fitness for a particular purpose,
// and non-infringement. See the Business Source License for more details.

// This software includes code developed by QuerentAI LLC (https://querent.xyz).

//! An in-process implementation of [`stores::SharedMemoryStore`]: a small
//! typed coordination surface (key/value, lists, hashes, sets, counters)
//! for data actors share across instances, each entry optionally expiring
//! after a TTL that is checked lazily on read.

use std::{
	collections::HashMap,
	sync::RwLock,
	time::{Duration, Instant},
};

use async_trait::async_trait;
use serde_json::Value;
use stores::{SharedMemoryStore, StoreError};

#[derive(Clone, Debug)]
enum Slot {
	Value(Value),
	List(Vec<Value>),
	Hash(HashMap<String, Value>),
	Set(Vec<String>),
	Counter(i64),
}

struct Entry {
	slot: Slot,
	expires_at: Option<Instant>,
}

impl Entry {
	fn is_expired(&self) -> bool {
		self.expires_at.map(|deadline| Instant::now() >= deadline).unwrap_or(false)
	}
}

fn deadline(ttl_ms: Option<i64>) -> Option<Instant> {
	ttl_ms.map(|ms| Instant::now() + Duration::from_millis(ms.max(0) as u64))
}

/// In-memory implementation of [`SharedMemoryStore`].
#[derive(Default)]
pub struct MemorySharedMemoryStore {
	entries: RwLock<HashMap<String, Entry>>,
}

impl MemorySharedMemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	fn live<'a>(entries: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a Entry> {
		if entries.get(key).map(Entry::is_expired).unwrap_or(false) {
			entries.remove(key);
		}
		entries.get(key)
	}
}

#[async_trait]
impl SharedMemoryStore for MemorySharedMemoryStore {
	async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
		let mut entries = self.entries.write().unwrap();
		match Self::live(&mut entries, key) {
			Some(Entry { slot: Slot::Value(value), .. }) => Ok(Some(value.clone())),
			Some(_) =>
				Err(StoreError::InvalidArgument(format!("'{key}' does not hold a plain value"))),
			None => Ok(None),
		}
	}

	async fn set(&self, key: &str, value: Value, ttl_ms: Option<i64>) -> Result<(), StoreError> {
		let mut entries = self.entries.write().unwrap();
		entries.insert(key.to_string(), Entry { slot: Slot::Value(value), expires_at: deadline(ttl_ms) });
		Ok(())
	}

	async fn list_append(&self, key: &str, value: Value, ttl_ms: Option<i64>) -> Result<(), StoreError> {
		let mut entries = self.entries.write().unwrap();
		match Self::live(&mut entries, key) {
			Some(Entry { slot: Slot::List(_), .. }) => {},
			Some(_) =>
				return Err(StoreError::InvalidArgument(format!("'{key}' does not hold a list"))),
			None => {
				entries.insert(key.to_string(), Entry { slot: Slot::List(Vec::new()), expires_at: deadline(ttl_ms) });
			},
		}
		let entry = entries.get_mut(key).expect("just inserted or confirmed present");
		entry.expires_at = deadline(ttl_ms).or(entry.expires_at);
		if let Slot::List(list) = &mut entry.slot {
			list.push(value);
		}
		Ok(())
	}

	async fn list_get(&self, key: &str) -> Result<Vec<Value>, StoreError> {
		let mut entries = self.entries.write().unwrap();
		match Self::live(&mut entries, key) {
			Some(Entry { slot: Slot::List(list), .. }) => Ok(list.clone()),
			Some(_) =>
				Err(StoreError::InvalidArgument(format!("'{key}' does not hold a list"))),
			None => Ok(Vec::new()),
		}
	}

	async fn hash_set(&self, key: &str, field: &str, value: Value, ttl_ms: Option<i64>) -> Result<(), StoreError> {
		let mut entries = self.entries.write().unwrap();
		match Self::live(&mut entries, key) {
			Some(Entry { slot: Slot::Hash(_), .. }) => {},
			Some(_) =>
				return Err(StoreError::InvalidArgument(format!("'{key}' does not hold a hash"))),
			None => {
				entries
					.insert(key.to_string(), Entry { slot: Slot::Hash(HashMap::new()), expires_at: deadline(ttl_ms) });
			},
		}
		let entry = entries.get_mut(key).expect("just inserted or confirmed present");
		entry.expires_at = deadline(ttl_ms).or(entry.expires_at);
		if let Slot::Hash(hash) = &mut entry.slot {
			hash.insert(field.to_string(), value);
		}
		Ok(())
	}

	async fn hash_get_all(&self, key: &str) -> Result<Vec<(String, Value)>, StoreError> {
		let mut entries = self.entries.write().unwrap();
		match Self::live(&mut entries, key) {
			Some(Entry { slot: Slot::Hash(hash), .. }) =>
				Ok(hash.iter().map(|(field, value)| (field.clone(), value.clone())).collect()),
			Some(_) =>
				Err(StoreError::InvalidArgument(format!("'{key}' does not hold a hash"))),
			None => Ok(Vec::new()),
		}
	}

	async fn set_add(&self, key: &str, member: String, ttl_ms: Option<i64>) -> Result<(), StoreError> {
		let mut entries = self.entries.write().unwrap();
		match Self::live(&mut entries, key) {
			Some(Entry { slot: Slot::Set(_), .. }) => {},
			Some(_) =>
				return Err(StoreError::InvalidArgument(format!("'{key}' does not hold a set"))),
			None => {
				entries.insert(key.to_string(), Entry { slot: Slot::Set(Vec::new()), expires_at: deadline(ttl_ms) });
			},
		}
		let entry = entries.get_mut(key).expect("just inserted or confirmed present");
		entry.expires_at = deadline(ttl_ms).or(entry.expires_at);
		if let Slot::Set(set) = &mut entry.slot {
			if !set.contains(&member) {
				set.push(member);
			}
		}
		Ok(())
	}

	async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
		let mut entries = self.entries.write().unwrap();
		match Self::live(&mut entries, key) {
			Some(Entry { slot: Slot::Set(set), .. }) => Ok(set.clone()),
			Some(_) =>
				Err(StoreError::InvalidArgument(format!("'{key}' does not hold a set"))),
			None => Ok(Vec::new()),
		}
	}

	async fn incr(&self, key: &str, delta: i64, ttl_ms: Option<i64>) -> Result<i64, StoreError> {
		let mut entries = self.entries.write().unwrap();
		match Self::live(&mut entries, key) {
			Some(Entry { slot: Slot::Counter(_), .. }) => {},
			Some(_) =>
				return Err(StoreError::InvalidArgument(format!("'{key}' does not hold a counter"))),
			None => {
				entries.insert(key.to_string(), Entry { slot: Slot::Counter(0), expires_at: deadline(ttl_ms) });
			},
		}
		let entry = entries.get_mut(key).expect("just inserted or confirmed present");
		entry.expires_at = deadline(ttl_ms).or(entry.expires_at);
		if let Slot::Counter(counter) = &mut entry.slot {
			*counter += delta;
			Ok(*counter)
		} else {
			unreachable!()
		}
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[tokio::test]
	async fn test_set_and_get_roundtrip() {
		let store = MemorySharedMemoryStore::new();
		store.set("k", json!("v"), None).await.unwrap();
		assert_eq!(store.get("k").await.unwrap(), Some(json!("v")));
	}

	#[tokio::test]
	async fn test_value_expires_after_ttl() {
		let store = MemorySharedMemoryStore::new();
		store.set("k", json!(1), Some(10)).await.unwrap();
		tokio::time::sleep(Duration::from_millis(40)).await;
		assert_eq!(store.get("k").await.unwrap(), None);
	}

	#[tokio::test]
	async fn test_list_append_preserves_order() {
		let store = MemorySharedMemoryStore::new();
		store.list_append("log", json!("a"), None).await.unwrap();
		store.list_append("log", json!("b"), None).await.unwrap();
		assert_eq!(store.list_get("log").await.unwrap(), vec![json!("a"), json!("b")]);
	}

	#[tokio::test]
	async fn test_hash_set_updates_field() {
		let store = MemorySharedMemoryStore::new();
		store.hash_set("h", "name", json!("alice"), None).await.unwrap();
		store.hash_set("h", "age", json!(30), None).await.unwrap();
		let mut fields = store.hash_get_all("h").await.unwrap();
		fields.sort_by(|a, b| a.0.cmp(&b.0));
		assert_eq!(fields, vec![("age".to_string(), json!(30)), ("name".to_string(), json!("alice"))]);
	}

	#[tokio::test]
	async fn test_set_add_is_deduplicated() {
		let store = MemorySharedMemoryStore::new();
		store.set_add("s", "x".to_string(), None).await.unwrap();
		store.set_add("s", "x".to_string(), None).await.unwrap();
		assert_eq!(store.set_members("s").await.unwrap(), vec!["x".to_string()]);
	}

	#[tokio::test]
	async fn test_incr_accumulates() {
		let store = MemorySharedMemoryStore::new();
		assert_eq!(store.incr("c", 3, None).await.unwrap(), 3);
		assert_eq!(store.incr("c", -1, None).await.unwrap(), 2);
	}

	#[tokio::test]
	async fn test_type_mismatch_is_an_error() {
		let store = MemorySharedMemoryStore::new();
		store.set("k", json!(1), None).await.unwrap();
		assert!(store.incr("k", 1, None).await.is_err());
	}
}
