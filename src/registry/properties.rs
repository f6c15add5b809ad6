//! Per-class descriptive metadata

use once_cell::sync::OnceCell;

/// Immutable description of a registered class
///
/// `unique_id` reads as 0 until the owning database assigns one; it can be
/// set only once.
#[derive(Debug)]
pub struct ClassProperties {
    name: String,
    typeid_name: &'static str,
    version: String,
    size: usize,
    unique_id: OnceCell<u32>,
}

impl ClassProperties {
    pub fn new(
        name: impl Into<String>,
        typeid_name: &'static str,
        version: impl Into<String>,
        size: usize,
    ) -> Self {
        Self {
            name: name.into(),
            typeid_name,
            version: version.into(),
            size,
            unique_id: OnceCell::new(),
        }
    }

    /// Properties describing the Rust type `T`
    pub fn of<T: 'static>(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::new(
            name,
            core::any::type_name::<T>(),
            version,
            core::mem::size_of::<T>(),
        )
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Compiler-provided type name of the implementing type
    #[inline]
    pub fn typeid_name(&self) -> &'static str {
        self.typeid_name
    }

    #[inline]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn unique_id(&self) -> u32 {
        self.unique_id.get().copied().unwrap_or(0)
    }

    /// Returns false if an id was already assigned
    pub fn set_unique_id(&self, id: u32) -> bool {
        self.unique_id.set(id).is_ok()
    }
}
