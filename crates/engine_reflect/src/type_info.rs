//! Runtime type descriptors used by the reflection layer.
//!
//! A [`TypeInfo`] is the erased stand-in for a concrete Rust type: generic
//! code receives one instead of a type parameter and uses it to check that a
//! `&dyn Any` really is what a capability table expects.
//!
//! ## Stable Type Identity
//!
//! [`ReflectTypeId`] is derived from the type's **string name** using the
//! FNV-1a 64-bit hash algorithm. Unlike [`std::any::TypeId`], it is stable
//! across builds and compilers, so it can be written into serialized data.

use std::alloc::Layout;
use std::any::{Any, TypeId};
use std::fmt;

/// A stable identifier for a reflected type, derived from its name using the
/// FNV-1a 64-bit hash algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReflectTypeId(pub u64);

impl ReflectTypeId {
    /// FNV-1a 64-bit offset basis.
    const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

    /// FNV-1a 64-bit prime.
    const FNV_PRIME: u64 = 0x0100_0000_01b3;

    /// Compute the [`ReflectTypeId`] of a type name.
    ///
    /// # Algorithm (FNV-1a 64-bit)
    ///
    /// ```text
    /// hash = 0xcbf29ce484222325
    /// for each byte in name.as_bytes():
    ///     hash = hash XOR byte
    ///     hash = hash * 0x00000100000001b3
    /// return hash
    /// ```
    #[must_use]
    pub const fn from_name(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash = Self::FNV_OFFSET_BASIS;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u64;
            hash = hash.wrapping_mul(Self::FNV_PRIME);
            i += 1;
        }
        Self(hash)
    }
}

/// Describes a concrete type that is handled through `dyn Any`.
#[derive(Clone, Copy)]
pub struct TypeInfo {
    /// Stable, name-derived identifier.
    pub id: ReflectTypeId,
    /// The name the type was registered under.
    pub name: &'static str,
    /// Compiler identity, used for downcast checks.
    pub type_id: TypeId,
    /// Size and alignment of one instance.
    pub layout: Layout,
}

impl TypeInfo {
    /// Describe `T` under its compiler-provided name.
    #[must_use]
    pub fn of<T: Any>() -> Self {
        Self::named::<T>(std::any::type_name::<T>())
    }

    /// Describe `T` under an explicit name.
    ///
    /// Use this when the identifier must survive renames or refactors of the
    /// Rust path, e.g. for types whose ids end up in saved data.
    #[must_use]
    pub fn named<T: Any>(name: &'static str) -> Self {
        Self {
            id: ReflectTypeId::from_name(name),
            name,
            type_id: TypeId::of::<T>(),
            layout: Layout::new::<T>(),
        }
    }

    /// Returns `true` if this descriptor was built for `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for TypeInfo {}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("size", &self.layout.size())
            .finish()
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
