use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use procura_core::TenantId;

/// Tenant-partitioned key/value storage for read models.
///
/// Every read and write names the tenant; there is no way to list across
/// tenants. Contents can always be rebuilt from the event store.
pub trait TenantStore<K, V>: Send + Sync {
    fn get(&self, tenant_id: TenantId, key: &K) -> Option<V>;
    fn upsert(&self, tenant_id: TenantId, key: K, value: V);
    fn list(&self, tenant_id: TenantId) -> Vec<V>;

    /// Records of one tenant matching `predicate`.
    fn list_where(&self, tenant_id: TenantId, predicate: &dyn Fn(&V) -> bool) -> Vec<V> {
        self.list(tenant_id).into_iter().filter(|v| predicate(v)).collect()
    }

    /// Drop every record of a tenant (rebuild support).
    fn clear_tenant(&self, tenant_id: TenantId);
}

impl<K, V, S> TenantStore<K, V> for Arc<S>
where
    S: TenantStore<K, V> + ?Sized,
{
    fn get(&self, tenant_id: TenantId, key: &K) -> Option<V> {
        (**self).get(tenant_id, key)
    }

    fn upsert(&self, tenant_id: TenantId, key: K, value: V) {
        (**self).upsert(tenant_id, key, value)
    }

    fn list(&self, tenant_id: TenantId) -> Vec<V> {
        (**self).list(tenant_id)
    }

    fn list_where(&self, tenant_id: TenantId, predicate: &dyn Fn(&V) -> bool) -> Vec<V> {
        (**self).list_where(tenant_id, predicate)
    }

    fn clear_tenant(&self, tenant_id: TenantId) {
        (**self).clear_tenant(tenant_id)
    }
}

/// `RwLock<HashMap>` store keyed by `(tenant, key)`.
#[derive(Debug)]
pub struct InMemoryTenantStore<K, V> {
    inner: RwLock<HashMap<(TenantId, K), V>>,
}

impl<K, V> InMemoryTenantStore<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for InMemoryTenantStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> TenantStore<K, V> for InMemoryTenantStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, tenant_id: TenantId, key: &K) -> Option<V> {
        let map = self.inner.read().ok()?;
        map.get(&(tenant_id, key.clone())).cloned()
    }

    fn upsert(&self, tenant_id: TenantId, key: K, value: V) {
        if let Ok(mut map) = self.inner.write() {
            map.insert((tenant_id, key), value);
        }
    }

    fn list(&self, tenant_id: TenantId) -> Vec<V> {
        let Ok(map) = self.inner.read() else {
            return vec![];
        };
        map.iter()
            .filter(|((t, _), _)| *t == tenant_id)
            .map(|(_, v)| v.clone())
            .collect()
    }

    fn clear_tenant(&self, tenant_id: TenantId) {
        if let Ok(mut map) = self.inner.write() {
            map.retain(|(t, _), _| *t != tenant_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_partitioned_by_tenant() {
        let store: InMemoryTenantStore<u32, &'static str> = InMemoryTenantStore::new();
        let a = TenantId::new();
        let b = TenantId::new();

        store.upsert(a, 1, "rfq-a");
        store.upsert(b, 1, "rfq-b");

        assert_eq!(store.get(a, &1), Some("rfq-a"));
        assert_eq!(store.get(b, &1), Some("rfq-b"));
        assert_eq!(store.list(a), vec!["rfq-a"]);

        store.clear_tenant(a);
        assert!(store.list(a).is_empty());
        assert_eq!(store.list(b), vec!["rfq-b"]);
    }

    #[test]
    fn list_where_filters_within_tenant() {
        let store: InMemoryTenantStore<u32, u32> = InMemoryTenantStore::new();
        let t = TenantId::new();
        for n in 1..=4 {
            store.upsert(t, n, n * 10);
        }
        store.upsert(TenantId::new(), 9, 20);

        let mut found = store.list_where(t, &|v| *v >= 20);
        found.sort();
        assert_eq!(found, vec![20, 30, 40]);
    }
}
