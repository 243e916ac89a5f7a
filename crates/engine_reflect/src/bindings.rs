//! Capability tables for the standard mapping-like types.
//!
//! Each binding chooses its own cursor state:
//!
//! | type              | cursor state                  | insert | erase |
//! |-------------------|-------------------------------|--------|-------|
//! | `HashMap<K, V>`   | found key, or key snapshot    | yes    | yes   |
//! | `BTreeMap<K, V>`  | current key                   | yes    | yes   |
//! | `Vec<(K, V)>`     | slot index                    | yes    | yes   |
//! | `[(K, V); N]`     | slot index                    | no     | no    |
//!
//! The `*_view` functions return the table with every capability that needs
//! no bounds on `V`. Insert-default and insert-copy need `V: Default` and
//! `V: Clone`, so they are exposed as separate functions that callers add
//! with [`DictionaryView::with_insert_default`] and
//! [`DictionaryView::with_insert_copy`]. The [`Dictionary`] impls do that
//! for the common case.

use std::any::{Any, type_name};
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::ops::Bound;

use crate::dictionary::{CursorHandle, DictionaryOps, DictionaryView};
use crate::type_info::TypeInfo;

/// A concrete type that can describe itself as a dictionary.
pub trait Dictionary: Any {
    /// Build the capability table for `Self`.
    fn dictionary_view() -> DictionaryView;
}

fn downcast<T: Any>(instance: &dyn Any) -> &T {
    match instance.downcast_ref::<T>() {
        Some(instance) => instance,
        None => panic!("dictionary view for `{}` used on another type", type_name::<T>()),
    }
}

fn downcast_mut<T: Any>(instance: &mut dyn Any) -> &mut T {
    match instance.downcast_mut::<T>() {
        Some(instance) => instance,
        None => panic!("dictionary view for `{}` used on another type", type_name::<T>()),
    }
}

fn downcast_key<K: Any>(key: &dyn Any) -> &K {
    match key.downcast_ref::<K>() {
        Some(key) => key,
        None => panic!("dictionary key is not a `{}`", type_name::<K>()),
    }
}

fn downcast_value<V: Any>(value: &dyn Any) -> &V {
    match value.downcast_ref::<V>() {
        Some(value) => value,
        None => panic!("dictionary value is not a `{}`", type_name::<V>()),
    }
}

fn unbox_value<V: Any>(value: Box<dyn Any>) -> V {
    match value.downcast::<V>() {
        Ok(value) => *value,
        Err(_) => panic!("dictionary value is not a `{}`", type_name::<V>()),
    }
}

fn release<S: Any>(handle: CursorHandle) {
    drop(handle.into_state::<S>());
}

// -- HashMap --

/// Cursor state for hashed maps.
///
/// A cursor from `find` holds only the found key. The key list is
/// snapshotted when a walk starts, or on the first advance from a found key.
enum HashCursor<K> {
    Found(K),
    Walking { keys: Vec<K>, pos: usize },
}

impl<K> HashCursor<K> {
    fn current(&self) -> &K {
        match self {
            Self::Found(key) => key,
            Self::Walking { keys, pos } => &keys[*pos],
        }
    }
}

fn hash_map_length<K: Eq + Hash + 'static, V: 'static>(instance: &dyn Any) -> usize {
    downcast::<HashMap<K, V>>(instance).len()
}

fn hash_map_begin<K, V>(instance: &dyn Any) -> Option<CursorHandle>
where
    K: Eq + Hash + Clone + 'static,
    V: 'static,
{
    let map = downcast::<HashMap<K, V>>(instance);
    if map.is_empty() {
        return None;
    }
    Some(CursorHandle::new(HashCursor::Walking {
        keys: map.keys().cloned().collect::<Vec<K>>(),
        pos: 0,
    }))
}

fn hash_map_find<K, V>(instance: &dyn Any, key: &dyn Any) -> Option<CursorHandle>
where
    K: Eq + Hash + Clone + 'static,
    V: 'static,
{
    let map = downcast::<HashMap<K, V>>(instance);
    let (found, _) = map.get_key_value(downcast_key::<K>(key))?;
    Some(CursorHandle::new(HashCursor::Found(found.clone())))
}

fn hash_map_advance<K, V>(instance: &dyn Any, handle: &mut CursorHandle) -> bool
where
    K: Eq + Hash + Clone + 'static,
    V: 'static,
{
    let state = handle.state_mut::<HashCursor<K>>();
    if let HashCursor::Found(key) = &*state {
        // Iteration order is stable while the map is unchanged, so the walk
        // continues from the found key's position.
        let keys: Vec<K> = downcast::<HashMap<K, V>>(instance).keys().cloned().collect();
        let Some(pos) = keys.iter().position(|k| *k == *key) else {
            return false;
        };
        *state = HashCursor::Walking { keys, pos };
    }
    match state {
        HashCursor::Walking { keys, pos } => {
            *pos += 1;
            *pos < keys.len()
        }
        HashCursor::Found(_) => false,
    }
}

fn hash_map_entry<'a, K, V>(instance: &'a dyn Any, handle: &CursorHandle) -> (&'a K, &'a V)
where
    K: Eq + Hash + 'static,
    V: 'static,
{
    let map = downcast::<HashMap<K, V>>(instance);
    let key = handle.state::<HashCursor<K>>().current();
    match map.get_key_value(key) {
        Some(entry) => entry,
        None => panic!("cursor key is no longer in the map"),
    }
}

fn hash_map_key<'a, K, V>(instance: &'a dyn Any, handle: &CursorHandle) -> &'a dyn Any
where
    K: Eq + Hash + 'static,
    V: 'static,
{
    hash_map_entry::<K, V>(instance, handle).0
}

fn hash_map_value<'a, K, V>(instance: &'a dyn Any, handle: &CursorHandle) -> &'a dyn Any
where
    K: Eq + Hash + 'static,
    V: 'static,
{
    hash_map_entry::<K, V>(instance, handle).1
}

fn hash_map_value_mut<'a, K, V>(instance: &'a mut dyn Any, handle: &CursorHandle) -> &'a mut dyn Any
where
    K: Eq + Hash + 'static,
    V: 'static,
{
    let map = downcast_mut::<HashMap<K, V>>(instance);
    let key = handle.state::<HashCursor<K>>().current();
    match map.get_mut(key) {
        Some(value) => value,
        None => panic!("cursor key is no longer in the map"),
    }
}

/// Insert-default operation for `HashMap<K, V>`.
pub fn hash_map_insert_default<K, V>(instance: &mut dyn Any, key: &dyn Any)
where
    K: Eq + Hash + Clone + 'static,
    V: Default + 'static,
{
    let key = downcast_key::<K>(key).clone();
    downcast_mut::<HashMap<K, V>>(instance).insert(key, V::default());
}

/// Insert-copy operation for `HashMap<K, V>`.
pub fn hash_map_insert_copy<K, V>(instance: &mut dyn Any, key: &dyn Any, value: &dyn Any)
where
    K: Eq + Hash + Clone + 'static,
    V: Clone + 'static,
{
    let key = downcast_key::<K>(key).clone();
    let value = downcast_value::<V>(value).clone();
    downcast_mut::<HashMap<K, V>>(instance).insert(key, value);
}

fn hash_map_insert_move<K, V>(instance: &mut dyn Any, key: &dyn Any, value: Box<dyn Any>)
where
    K: Eq + Hash + Clone + 'static,
    V: 'static,
{
    let key = downcast_key::<K>(key).clone();
    let value = unbox_value::<V>(value);
    downcast_mut::<HashMap<K, V>>(instance).insert(key, value);
}

fn hash_map_erase<K, V>(instance: &mut dyn Any, handle: &CursorHandle)
where
    K: Eq + Hash + 'static,
    V: 'static,
{
    let key = handle.state::<HashCursor<K>>().current();
    downcast_mut::<HashMap<K, V>>(instance).remove(key);
}

/// Capability table for `HashMap<K, V>` with insert-move and erase.
#[must_use]
pub fn hash_map_view<K, V>() -> DictionaryView
where
    K: Eq + Hash + Clone + 'static,
    V: 'static,
{
    DictionaryView::new(
        TypeInfo::of::<K>(),
        TypeInfo::of::<V>(),
        DictionaryOps {
            length: hash_map_length::<K, V>,
            begin: hash_map_begin::<K, V>,
            find: hash_map_find::<K, V>,
            advance: hash_map_advance::<K, V>,
            stop: release::<HashCursor<K>>,
            key: hash_map_key::<K, V>,
            value: hash_map_value::<K, V>,
            value_mut: hash_map_value_mut::<K, V>,
        },
    )
    .with_insert_move(hash_map_insert_move::<K, V>)
    .with_erase(hash_map_erase::<K, V>)
}

impl<K, V> Dictionary for HashMap<K, V>
where
    K: Eq + Hash + Clone + 'static,
    V: Default + Clone + 'static,
{
    fn dictionary_view() -> DictionaryView {
        hash_map_view::<K, V>()
            .with_insert_default(hash_map_insert_default::<K, V>)
            .with_insert_copy(hash_map_insert_copy::<K, V>)
    }
}

// -- BTreeMap --

/// Cursor state for ordered maps: a copy of the current key. Advancing
/// looks up the next key in order, so no snapshot is needed.
struct CurrentKey<K>(K);

fn btree_map_length<K: Ord + 'static, V: 'static>(instance: &dyn Any) -> usize {
    downcast::<BTreeMap<K, V>>(instance).len()
}

fn btree_map_begin<K: Ord + Clone + 'static, V: 'static>(instance: &dyn Any) -> Option<CursorHandle> {
    let map = downcast::<BTreeMap<K, V>>(instance);
    let first = map.keys().next()?;
    Some(CursorHandle::new(CurrentKey(first.clone())))
}

fn btree_map_find<K: Ord + Clone + 'static, V: 'static>(
    instance: &dyn Any,
    key: &dyn Any,
) -> Option<CursorHandle> {
    let map = downcast::<BTreeMap<K, V>>(instance);
    let (key, _) = map.get_key_value(downcast_key::<K>(key))?;
    Some(CursorHandle::new(CurrentKey(key.clone())))
}

fn btree_map_advance<K: Ord + Clone + 'static, V: 'static>(
    instance: &dyn Any,
    handle: &mut CursorHandle,
) -> bool {
    let map = downcast::<BTreeMap<K, V>>(instance);
    let current = handle.state_mut::<CurrentKey<K>>();
    let next = map
        .range::<K, _>((Bound::Excluded(&current.0), Bound::Unbounded))
        .next()
        .map(|(key, _)| key.clone());
    match next {
        Some(key) => {
            current.0 = key;
            true
        }
        None => false,
    }
}

fn btree_map_entry<'a, K: Ord + 'static, V: 'static>(
    instance: &'a dyn Any,
    handle: &CursorHandle,
) -> (&'a K, &'a V) {
    let map = downcast::<BTreeMap<K, V>>(instance);
    match map.get_key_value(&handle.state::<CurrentKey<K>>().0) {
        Some(entry) => entry,
        None => panic!("cursor key is no longer in the map"),
    }
}

fn btree_map_key<'a, K: Ord + 'static, V: 'static>(
    instance: &'a dyn Any,
    handle: &CursorHandle,
) -> &'a dyn Any {
    btree_map_entry::<K, V>(instance, handle).0
}

fn btree_map_value<'a, K: Ord + 'static, V: 'static>(
    instance: &'a dyn Any,
    handle: &CursorHandle,
) -> &'a dyn Any {
    btree_map_entry::<K, V>(instance, handle).1
}

fn btree_map_value_mut<'a, K: Ord + 'static, V: 'static>(
    instance: &'a mut dyn Any,
    handle: &CursorHandle,
) -> &'a mut dyn Any {
    let map = downcast_mut::<BTreeMap<K, V>>(instance);
    match map.get_mut(&handle.state::<CurrentKey<K>>().0) {
        Some(value) => value,
        None => panic!("cursor key is no longer in the map"),
    }
}

/// Insert-default operation for `BTreeMap<K, V>`.
pub fn btree_map_insert_default<K, V>(instance: &mut dyn Any, key: &dyn Any)
where
    K: Ord + Clone + 'static,
    V: Default + 'static,
{
    let key = downcast_key::<K>(key).clone();
    downcast_mut::<BTreeMap<K, V>>(instance).insert(key, V::default());
}

/// Insert-copy operation for `BTreeMap<K, V>`.
pub fn btree_map_insert_copy<K, V>(instance: &mut dyn Any, key: &dyn Any, value: &dyn Any)
where
    K: Ord + Clone + 'static,
    V: Clone + 'static,
{
    let key = downcast_key::<K>(key).clone();
    let value = downcast_value::<V>(value).clone();
    downcast_mut::<BTreeMap<K, V>>(instance).insert(key, value);
}

fn btree_map_insert_move<K: Ord + Clone + 'static, V: 'static>(
    instance: &mut dyn Any,
    key: &dyn Any,
    value: Box<dyn Any>,
) {
    let key = downcast_key::<K>(key).clone();
    let value = unbox_value::<V>(value);
    downcast_mut::<BTreeMap<K, V>>(instance).insert(key, value);
}

fn btree_map_erase<K: Ord + 'static, V: 'static>(instance: &mut dyn Any, handle: &CursorHandle) {
    let key = &handle.state::<CurrentKey<K>>().0;
    downcast_mut::<BTreeMap<K, V>>(instance).remove(key);
}

/// Capability table for `BTreeMap<K, V>` with insert-move and erase.
#[must_use]
pub fn btree_map_view<K, V>() -> DictionaryView
where
    K: Ord + Clone + 'static,
    V: 'static,
{
    DictionaryView::new(
        TypeInfo::of::<K>(),
        TypeInfo::of::<V>(),
        DictionaryOps {
            length: btree_map_length::<K, V>,
            begin: btree_map_begin::<K, V>,
            find: btree_map_find::<K, V>,
            advance: btree_map_advance::<K, V>,
            stop: release::<CurrentKey<K>>,
            key: btree_map_key::<K, V>,
            value: btree_map_value::<K, V>,
            value_mut: btree_map_value_mut::<K, V>,
        },
    )
    .with_insert_move(btree_map_insert_move::<K, V>)
    .with_erase(btree_map_erase::<K, V>)
}

impl<K, V> Dictionary for BTreeMap<K, V>
where
    K: Ord + Clone + 'static,
    V: Default + Clone + 'static,
{
    fn dictionary_view() -> DictionaryView {
        btree_map_view::<K, V>()
            .with_insert_default(btree_map_insert_default::<K, V>)
            .with_insert_copy(btree_map_insert_copy::<K, V>)
    }
}

// -- Slices: `Vec<(K, V)>` and `[(K, V); N]` --

/// Cursor state for slice-backed tables.
struct Slot(usize);

fn slice_of<C, K, V>(instance: &dyn Any) -> &[(K, V)]
where
    C: AsRef<[(K, V)]> + 'static,
{
    downcast::<C>(instance).as_ref()
}

fn slice_length<C, K, V>(instance: &dyn Any) -> usize
where
    C: AsRef<[(K, V)]> + 'static,
{
    slice_of::<C, K, V>(instance).len()
}

fn slice_begin<C, K, V>(instance: &dyn Any) -> Option<CursorHandle>
where
    C: AsRef<[(K, V)]> + 'static,
{
    if slice_of::<C, K, V>(instance).is_empty() {
        return None;
    }
    Some(CursorHandle::new(Slot(0)))
}

fn slice_find<C, K, V>(instance: &dyn Any, key: &dyn Any) -> Option<CursorHandle>
where
    C: AsRef<[(K, V)]> + 'static,
    K: PartialEq + 'static,
{
    let key = downcast_key::<K>(key);
    slice_of::<C, K, V>(instance)
        .iter()
        .position(|(k, _)| k == key)
        .map(|slot| CursorHandle::new(Slot(slot)))
}

fn slice_advance<C, K, V>(instance: &dyn Any, handle: &mut CursorHandle) -> bool
where
    C: AsRef<[(K, V)]> + 'static,
{
    let len = slice_of::<C, K, V>(instance).len();
    let slot = handle.state_mut::<Slot>();
    slot.0 += 1;
    slot.0 < len
}

fn slice_key<'a, C, K, V>(instance: &'a dyn Any, handle: &CursorHandle) -> &'a dyn Any
where
    C: AsRef<[(K, V)]> + 'static,
    K: 'static,
    V: 'static,
{
    &slice_of::<C, K, V>(instance)[handle.state::<Slot>().0].0
}

fn slice_value<'a, C, K, V>(instance: &'a dyn Any, handle: &CursorHandle) -> &'a dyn Any
where
    C: AsRef<[(K, V)]> + 'static,
    K: 'static,
    V: 'static,
{
    &slice_of::<C, K, V>(instance)[handle.state::<Slot>().0].1
}

fn slice_value_mut<'a, C, K, V>(instance: &'a mut dyn Any, handle: &CursorHandle) -> &'a mut dyn Any
where
    C: AsMut<[(K, V)]> + 'static,
    K: 'static,
    V: 'static,
{
    &mut downcast_mut::<C>(instance).as_mut()[handle.state::<Slot>().0].1
}

fn slice_ops<C, K, V>() -> DictionaryOps
where
    C: AsRef<[(K, V)]> + AsMut<[(K, V)]> + 'static,
    K: PartialEq + 'static,
    V: 'static,
{
    DictionaryOps {
        length: slice_length::<C, K, V>,
        begin: slice_begin::<C, K, V>,
        find: slice_find::<C, K, V>,
        advance: slice_advance::<C, K, V>,
        stop: release::<Slot>,
        key: slice_key::<C, K, V>,
        value: slice_value::<C, K, V>,
        value_mut: slice_value_mut::<C, K, V>,
    }
}

/// Replace the value under `key`, or append a new pair.
fn assoc_list_upsert<K: PartialEq + 'static, V: 'static>(list: &mut Vec<(K, V)>, key: K, value: V) {
    match list.iter_mut().find(|(k, _)| *k == key) {
        Some(entry) => entry.1 = value,
        None => list.push((key, value)),
    }
}

/// Insert-default operation for `Vec<(K, V)>`.
pub fn assoc_list_insert_default<K, V>(instance: &mut dyn Any, key: &dyn Any)
where
    K: PartialEq + Clone + 'static,
    V: Default + 'static,
{
    let key = downcast_key::<K>(key).clone();
    assoc_list_upsert(downcast_mut::<Vec<(K, V)>>(instance), key, V::default());
}

/// Insert-copy operation for `Vec<(K, V)>`.
pub fn assoc_list_insert_copy<K, V>(instance: &mut dyn Any, key: &dyn Any, value: &dyn Any)
where
    K: PartialEq + Clone + 'static,
    V: Clone + 'static,
{
    let key = downcast_key::<K>(key).clone();
    let value = downcast_value::<V>(value).clone();
    assoc_list_upsert(downcast_mut::<Vec<(K, V)>>(instance), key, value);
}

fn assoc_list_insert_move<K, V>(instance: &mut dyn Any, key: &dyn Any, value: Box<dyn Any>)
where
    K: PartialEq + Clone + 'static,
    V: 'static,
{
    let key = downcast_key::<K>(key).clone();
    let value = unbox_value::<V>(value);
    assoc_list_upsert(downcast_mut::<Vec<(K, V)>>(instance), key, value);
}

fn assoc_list_erase<K: 'static, V: 'static>(instance: &mut dyn Any, handle: &CursorHandle) {
    downcast_mut::<Vec<(K, V)>>(instance).remove(handle.state::<Slot>().0);
}

/// Capability table for an association list `Vec<(K, V)>` with
/// insert-move and erase. Order of entries is insertion order.
#[must_use]
pub fn assoc_list_view<K, V>() -> DictionaryView
where
    K: PartialEq + Clone + 'static,
    V: 'static,
{
    DictionaryView::new(
        TypeInfo::of::<K>(),
        TypeInfo::of::<V>(),
        slice_ops::<Vec<(K, V)>, K, V>(),
    )
    .with_insert_move(assoc_list_insert_move::<K, V>)
    .with_erase(assoc_list_erase::<K, V>)
}

impl<K, V> Dictionary for Vec<(K, V)>
where
    K: PartialEq + Clone + 'static,
    V: Default + Clone + 'static,
{
    fn dictionary_view() -> DictionaryView {
        assoc_list_view::<K, V>()
            .with_insert_default(assoc_list_insert_default::<K, V>)
            .with_insert_copy(assoc_list_insert_copy::<K, V>)
    }
}

/// Capability table for a fixed-size table `[(K, V); N]`.
///
/// The size is part of the type, so neither insertion nor erasure is
/// offered.
#[must_use]
pub fn array_view<K, V, const N: usize>() -> DictionaryView
where
    K: PartialEq + 'static,
    V: 'static,
{
    DictionaryView::new(
        TypeInfo::of::<K>(),
        TypeInfo::of::<V>(),
        slice_ops::<[(K, V); N], K, V>(),
    )
}

impl<K, V, const N: usize> Dictionary for [(K, V); N]
where
    K: PartialEq + 'static,
    V: 'static,
{
    fn dictionary_view() -> DictionaryView {
        array_view::<K, V, N>()
    }
}
