//! A minimal serialization driver built on reflection.
//!
//! [`DictionaryDriver`] saves any dictionary whose values are in-memory
//! references, without knowing the container type. Keys are written as-is;
//! values go through a [`ReferenceMap`] and are written as stable ids. The
//! saved form is a MessagePack record holding the stable type ids of the key
//! and value types followed by a list of `{ key, target }` entries. Restoring
//! refuses data saved from a dictionary with different key or value types.
//!
//! Restoring reverses the translation and inserts through whichever
//! capability the target dictionary offers, in the order move, copy,
//! default-then-assign.

use std::any::{Any, type_name};
use std::fmt::Debug;
use std::hash::Hash;

use engine_data::ReferenceMap;
use engine_reflect::{DictionaryView, ReflectError, ReflectTypeId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DriverError;

/// One saved dictionary entry.
#[derive(Debug, Serialize, Deserialize)]
struct SavedEntry<K, I> {
    key: K,
    target: I,
}

/// A saved dictionary: stable type ids, then the entries.
#[derive(Debug, Serialize, Deserialize)]
struct SavedDictionary<K, I> {
    key_type: u64,
    value_type: u64,
    entries: Vec<SavedEntry<K, I>>,
}

/// Saves and restores reference-valued dictionaries through a
/// [`DictionaryView`].
#[derive(Debug, Clone, Copy)]
pub struct DictionaryDriver<'v> {
    view: &'v DictionaryView,
}

impl<'v> DictionaryDriver<'v> {
    /// Drive dictionaries described by `view`.
    #[must_use]
    pub fn new(view: &'v DictionaryView) -> Self {
        Self { view }
    }

    fn check_types<K: Any, R: Any>(&self) -> Result<(), ReflectError> {
        let (key_type, value_type) = (self.view.key_type(), self.view.value_type());
        if !key_type.is::<K>() {
            return Err(ReflectError::TypeMismatch {
                expected: key_type.name,
                found: type_name::<K>(),
            });
        }
        if !value_type.is::<R>() {
            return Err(ReflectError::TypeMismatch {
                expected: value_type.name,
                found: type_name::<R>(),
            });
        }
        Ok(())
    }

    /// Encode every entry of `instance`, translating values to ids.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Reflect`] if the view is not bound to `K` and
    /// `R`, [`DriverError::Reference`] if a value has no id in `refs`, or
    /// [`DriverError::Encode`] if MessagePack encoding fails.
    pub fn save<K, R, I>(
        &self,
        instance: &dyn Any,
        refs: &ReferenceMap<R, I>,
    ) -> Result<Vec<u8>, DriverError>
    where
        K: Any + Serialize,
        R: Any + Eq + Hash + Clone + Debug,
        I: Eq + Hash + Clone + Serialize,
    {
        self.check_types::<K, R>()?;

        let mut entries = Vec::with_capacity(self.view.length(instance));
        let mut cursor = self.view.begin(instance);
        while !cursor.is_null() {
            entries.push(SavedEntry {
                key: cursor.try_key::<K>()?,
                target: refs.try_get_id(cursor.try_value::<R>()?)?,
            });
            cursor.advance();
        }

        debug!(entries = entries.len(), "dictionary saved");
        Ok(rmp_serde::to_vec(&SavedDictionary {
            key_type: self.view.key_type().id.0,
            value_type: self.view.value_type().id.0,
            entries,
        })?)
    }

    /// Decode entries from `bytes` into `instance`, translating ids back to
    /// references. Returns the number of entries restored.
    ///
    /// Existing entries under the same key are overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Decode`] on malformed input,
    /// [`DriverError::Reference`] if an id has no live reference,
    /// [`DriverError::NotInsertable`] if the dictionary cannot grow,
    /// [`DriverError::SavedTypeMismatch`] if the data was saved from a
    /// dictionary with other key or value types, and [`DriverError::Reflect`]
    /// if the view is not bound to `K` and `R`.
    pub fn restore<K, R, I>(
        &self,
        instance: &mut dyn Any,
        bytes: &[u8],
        refs: &ReferenceMap<R, I>,
    ) -> Result<usize, DriverError>
    where
        K: Any + DeserializeOwned,
        R: Any + Eq + Hash + Clone,
        I: Eq + Hash + Clone + Debug + DeserializeOwned,
    {
        self.check_types::<K, R>()?;
        if !(self.view.has_insert_move() || self.view.has_insert_copy() || self.view.has_insert_default()) {
            return Err(DriverError::NotInsertable(self.view.value_type().name));
        }

        let saved: SavedDictionary<K, I> = rmp_serde::from_slice(bytes)?;
        for (saved_id, expected) in [
            (saved.key_type, self.view.key_type()),
            (saved.value_type, self.view.value_type()),
        ] {
            if ReflectTypeId(saved_id) != expected.id {
                return Err(DriverError::SavedTypeMismatch {
                    expected: expected.name,
                    found: saved_id,
                });
            }
        }

        for entry in &saved.entries {
            let reference = refs.try_get_ref(&entry.target)?;
            self.put(instance, &entry.key, reference);
        }

        debug!(entries = saved.entries.len(), "dictionary restored");
        Ok(saved.entries.len())
    }

    fn put<K: Any, R: Any>(&self, instance: &mut dyn Any, key: &K, value: R) {
        if self.view.has_insert_move() {
            self.view.insert_move(instance, key, Box::new(value));
        } else if self.view.has_insert_copy() {
            self.view.insert_copy(instance, key, &value);
        } else if self.view.insert_default(instance, key) {
            let mut cursor = self.view.find_mut(instance, key);
            *cursor.value_as_mut::<R>() = value;
        }
    }
}
