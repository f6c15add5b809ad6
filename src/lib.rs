//! Reference-counted object model with a class registry and hierarchical
//! reference containers
//!
//! - `object`: `Object`, `Reference` and `ReferenceT` handles
//! - `heap`: allocation strategies objects are placed on
//! - `registry`: class metadata, factory lookup and dynamic libraries
//! - `container`: ordered reference collections with filtered search
//! - `list`: the intrusive list both the registry and containers build on

pub mod config;
pub mod container;
pub mod heap;
pub mod list;
pub mod logging;
pub mod object;
pub mod registry;

pub use config::{ConfigError, RuntimeConfig};
pub use container::{
    ContainerError, FilterMode, ReferenceContainer, ReferenceContainerFilter,
    ReferenceContainerFilterObjectName, ReferenceContainerFilterReferences,
};
pub use heap::{standard_heap, Heap, StandardHeap};
pub use object::{BasicObject, Object, ObjectBase, Reference, ReferenceT};
pub use registry::{ClassProperties, ClassRegistryDatabase, ClassRegistryItem};

/// Initialize with the configuration named by the environment
pub fn init() {
    init_with_config(&RuntimeConfig::from_env());
}

/// Apply `config` to the process-wide state
///
/// Installs the log subscriber (first call only), sets the lock timeout for
/// containers created afterwards and the library search of the global
/// class database.
pub fn init_with_config(config: &RuntimeConfig) {
    logging::init_with_config(config.log_config());
    container::set_default_timeout(config.container_timeout());
    ClassRegistryDatabase::instance().configure_libraries(config.library_search());
    logging::log_runtime_init();
}
