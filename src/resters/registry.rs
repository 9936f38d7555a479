//! Registry of the resource clients available to the facade.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{
    BandStructureRester, ChargeDensityRester, DosRester, GrainBoundaryRester, MaterialsRester,
    PhononRester, Rester, ResterError, SubstratesRester, SurfacePropertiesRester, TasksRester,
    ThermoRester, XasRester,
};
use crate::client::{QuerySettings, ResourceClient, ResourceSpec, Session};

bitflags::bitflags! {
    /// Operations a resource supports
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ResterCapabilities: u32 {
        const SEARCH = 1 << 0;
        const GET_BY_ID = 1 << 1;
        const COUNT = 1 << 2;
    }
}

/// A rester the registry knows how to construct
pub trait BuiltinRester: Rester + Sized + 'static {
    /// Static description of the resource
    fn resource_spec() -> &'static ResourceSpec;

    /// Wrap a client created for [`BuiltinRester::resource_spec`]
    fn from_client(client: ResourceClient) -> Self;
}

type Constructor = fn(ResourceClient) -> Arc<dyn Rester>;

fn construct<R: BuiltinRester>(client: ResourceClient) -> Arc<dyn Rester> {
    Arc::new(R::from_client(client))
}

/// Every built-in resource with its constructor
fn builtin_table() -> [(&'static ResourceSpec, Constructor); 11] {
    [
        (ChargeDensityRester::resource_spec(), construct::<ChargeDensityRester>),
        (BandStructureRester::resource_spec(), construct::<BandStructureRester>),
        (DosRester::resource_spec(), construct::<DosRester>),
        (GrainBoundaryRester::resource_spec(), construct::<GrainBoundaryRester>),
        (MaterialsRester::resource_spec(), construct::<MaterialsRester>),
        (PhononRester::resource_spec(), construct::<PhononRester>),
        (SubstratesRester::resource_spec(), construct::<SubstratesRester>),
        (SurfacePropertiesRester::resource_spec(), construct::<SurfacePropertiesRester>),
        (TasksRester::resource_spec(), construct::<TasksRester>),
        (ThermoRester::resource_spec(), construct::<ThermoRester>),
        (XasRester::resource_spec(), construct::<XasRester>),
    ]
}

/// Registry for all resource clients
///
/// Resters are keyed by name and always iterated in alphabetical order.
#[derive(Debug, Clone, Default)]
pub struct ResterRegistry {
    resters: BTreeMap<String, Arc<dyn Rester>>,
}

impl ResterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create one rester per built-in resource, all sharing `session`
    pub fn builtin(session: Arc<Session>, settings: QuerySettings) -> Result<Self, ResterError> {
        let mut registry = Self::new();

        for (spec, constructor) in builtin_table() {
            let client = ResourceClient::new(spec, session.clone(), settings)?;
            registry.register(constructor(client));
        }

        tracing::debug!(resters = registry.len(), "registered resource clients");
        Ok(registry)
    }

    /// Register a rester, replacing any with the same name
    pub fn register(&mut self, rester: Arc<dyn Rester>) {
        self.resters.insert(rester.name().to_string(), rester);
    }

    /// Get a rester by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Rester>> {
        self.resters.get(name)
    }

    /// Get a rester by name, returning an error if not found
    pub fn get_required(&self, name: &str) -> Result<&Arc<dyn Rester>, ResterError> {
        self.get(name).ok_or_else(|| ResterError::Validation {
            resource: name.to_string(),
            message: format!(
                "unknown resource '{}' (available: {})",
                name,
                self.names().collect::<Vec<_>>().join(", ")
            ),
        })
    }

    /// Get a built-in rester with its concrete type
    pub fn typed<R: BuiltinRester>(&self) -> Option<Arc<R>> {
        let rester = self.get(&R::resource_spec().name())?.clone();
        rester.into_any().downcast::<R>().ok()
    }

    /// Like [`ResterRegistry::typed`], returning an error if missing
    pub fn typed_required<R: BuiltinRester>(&self) -> Result<Arc<R>, ResterError> {
        self.typed::<R>()
            .ok_or_else(|| ResterError::Config(format!("resource '{}' is not registered", R::resource_spec().name())))
    }

    /// All resters in alphabetical order
    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn Rester>> {
        self.resters.values()
    }

    /// All rester names in alphabetical order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.resters.keys().map(|s| s.as_str())
    }

    /// Resters that support a specific capability
    pub fn with_capability(&self, capability: ResterCapabilities) -> Vec<&Arc<dyn Rester>> {
        self.all()
            .filter(|r| r.capabilities().contains(capability))
            .collect()
    }

    /// Resters that support search
    pub fn searchable(&self) -> Vec<&Arc<dyn Rester>> {
        self.with_capability(ResterCapabilities::SEARCH)
    }

    /// Check if a rester exists
    pub fn has(&self, name: &str) -> bool {
        self.resters.contains_key(name)
    }

    /// Number of registered resters
    pub fn len(&self) -> usize {
        self.resters.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.resters.is_empty()
    }
}
