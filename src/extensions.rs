use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use crate::error::{ModelError, ModelResult};

/// 扩展节点类型接口
///
/// Owns the shape of an extension payload. `decode` receives the raw object
/// read from markup and returns the normalized payload to keep in memory;
/// `encode` turns an in-memory payload back into the object to emit.
pub trait ExtensionKind: Send + Sync {
    fn decode(&self, id: &str, raw: Map<String, Value>) -> ModelResult<Map<String, Value>>;
    fn encode(&self, id: &str, payload: &Map<String, Value>) -> ModelResult<Map<String, Value>>;
}

/// Binds an extension id to a concrete serde type.
pub struct TypedExtension<T>(PhantomData<fn() -> T>);

impl<T> TypedExtension<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for TypedExtension<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TypedExtension<T>
where
    T: Serialize + DeserializeOwned,
{
    fn normalize(id: &str, raw: Map<String, Value>) -> ModelResult<Map<String, Value>> {
        let typed: T = serde_json::from_value(Value::Object(raw))
            .map_err(|e| ModelError::invalid(id, e.to_string()))?;
        match serde_json::to_value(&typed) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(ModelError::invalid(id, "extension payload must serialize to an object")),
            Err(e) => Err(ModelError::invalid(id, e.to_string())),
        }
    }
}

impl<T> ExtensionKind for TypedExtension<T>
where
    T: Serialize + DeserializeOwned,
{
    fn decode(&self, id: &str, raw: Map<String, Value>) -> ModelResult<Map<String, Value>> {
        Self::normalize(id, raw)
    }

    fn encode(&self, id: &str, payload: &Map<String, Value>) -> ModelResult<Map<String, Value>> {
        Self::normalize(id, payload.clone())
    }
}

/// Per-manager registry of extension kinds.
///
/// Encode and decode both consult the same instance. Registration and lookup
/// take `&self`; the map is internally synchronized.
#[derive(Default)]
pub struct ExtensionRegistry {
    kinds: DashMap<String, Arc<dyn ExtensionKind>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last registration for an id wins; the replaced kind is returned.
    pub fn register(&self, id: &str, kind: Arc<dyn ExtensionKind>) -> Option<Arc<dyn ExtensionKind>> {
        self.kinds.insert(id.to_string(), kind)
    }

    pub fn register_type<T>(&self, id: &str) -> Option<Arc<dyn ExtensionKind>>
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        self.register(id, Arc::new(TypedExtension::<T>::new()))
    }

    pub fn resolve(&self, id: &str) -> Option<Arc<dyn ExtensionKind>> {
        self.kinds.get(id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.kinds.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.kinds.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}
