//! Type-erased access to mapping-like values.
//!
//! A [`DictionaryView`] is a capability table bound once per concrete mapping
//! type. Generic code (typically a serialization driver) holds the view and a
//! `&dyn Any` and can then measure, walk, look up, insert into and erase from
//! the value without naming its type.
//!
//! ## Cursors
//!
//! Walking goes through cursors. A cursor owns an opaque [`CursorHandle`]
//! produced by the concrete binding and borrows the one instance it was
//! created on, so it can never be used against another value. The handle is
//! released through the table's `stop` operation exactly once: when
//! [`Cursor::advance`] runs off the end, when [`DictionaryView::erase`]
//! succeeds, or when the cursor is dropped.
//!
//! Mutable and const access use separate entry points ([`DictionaryView::begin_mut`]
//! vs [`DictionaryView::begin`]) and separate cursor types, so a const cursor
//! has no way to hand out `&mut` to a value.
//!
//! ## Capabilities
//!
//! Insertion and erasure are optional. The `has_*` probes report whether a
//! binding provides them, and the operations themselves return `false`
//! instead of failing when the capability is missing.

use std::any::{Any, type_name};
use std::fmt;

use crate::error::ReflectError;
use crate::type_info::TypeInfo;

/// Opaque iteration state owned by a cursor.
///
/// The state type is chosen by each binding (a key snapshot, a slot index,
/// ...). It is boxed and type-tagged so a binding can recover it, and it is
/// deliberately not `Clone`: copying a cursor re-finds its key instead.
pub struct CursorHandle(Box<dyn Any>);

impl CursorHandle {
    /// Wrap binding-specific cursor state.
    #[must_use]
    pub fn new<S: Any>(state: S) -> Self {
        Self(Box::new(state))
    }

    /// Borrow the state as `S`.
    ///
    /// # Panics
    ///
    /// Panics if the handle was created with a different state type.
    #[must_use]
    pub fn state<S: Any>(&self) -> &S {
        match self.0.downcast_ref::<S>() {
            Some(state) => state,
            None => panic!("cursor handle does not hold `{}`", type_name::<S>()),
        }
    }

    /// Mutably borrow the state as `S`.
    ///
    /// # Panics
    ///
    /// Panics if the handle was created with a different state type.
    #[must_use]
    pub fn state_mut<S: Any>(&mut self) -> &mut S {
        match self.0.downcast_mut::<S>() {
            Some(state) => state,
            None => panic!("cursor handle does not hold `{}`", type_name::<S>()),
        }
    }

    /// Unwrap the state as `S`.
    ///
    /// # Panics
    ///
    /// Panics if the handle was created with a different state type.
    #[must_use]
    pub fn into_state<S: Any>(self) -> S {
        match self.0.downcast::<S>() {
            Ok(state) => *state,
            Err(_) => panic!("cursor handle does not hold `{}`", type_name::<S>()),
        }
    }
}

impl fmt::Debug for CursorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CursorHandle(..)")
    }
}

/// Returns the number of entries in the instance.
pub type LengthFn = fn(&dyn Any) -> usize;
/// Creates a cursor on the first entry, or `None` when empty.
pub type BeginFn = fn(&dyn Any) -> Option<CursorHandle>;
/// Creates a cursor on the entry with the given key, or `None` on a miss.
pub type FindFn = fn(&dyn Any, &dyn Any) -> Option<CursorHandle>;
/// Moves the cursor to the next entry. Returns `false` when exhausted.
pub type AdvanceFn = fn(&dyn Any, &mut CursorHandle) -> bool;
/// Releases a cursor.
pub type StopFn = fn(CursorHandle);
/// Projects the key of the entry under the cursor.
pub type KeyFn = for<'a> fn(&'a dyn Any, &CursorHandle) -> &'a dyn Any;
/// Projects the value of the entry under the cursor.
pub type ValueFn = for<'a> fn(&'a dyn Any, &CursorHandle) -> &'a dyn Any;
/// Projects the value of the entry under the cursor, mutably.
pub type ValueMutFn = for<'a> fn(&'a mut dyn Any, &CursorHandle) -> &'a mut dyn Any;
/// Inserts a default-constructed value under a key.
pub type InsertDefaultFn = fn(&mut dyn Any, &dyn Any);
/// Inserts a clone of a value under a key.
pub type InsertCopyFn = fn(&mut dyn Any, &dyn Any, &dyn Any);
/// Inserts an owned value under a key.
pub type InsertMoveFn = fn(&mut dyn Any, &dyn Any, Box<dyn Any>);
/// Removes the entry under the cursor. The cursor is stopped afterwards.
pub type EraseFn = fn(&mut dyn Any, &CursorHandle);

/// The mandatory half of a dictionary capability table.
#[derive(Clone, Copy)]
pub struct DictionaryOps {
    /// Number of entries.
    pub length: LengthFn,
    /// Cursor on the first entry.
    pub begin: BeginFn,
    /// Cursor on the entry with a given key.
    pub find: FindFn,
    /// Step a cursor forward.
    pub advance: AdvanceFn,
    /// Release a cursor.
    pub stop: StopFn,
    /// Key projection.
    pub key: KeyFn,
    /// Const value projection.
    pub value: ValueFn,
    /// Mutable value projection.
    pub value_mut: ValueMutFn,
}

/// Type-erased description of how to operate on one concrete mapping type.
#[derive(Clone)]
pub struct DictionaryView {
    key_type: TypeInfo,
    value_type: TypeInfo,
    ops: DictionaryOps,
    insert_default: Option<InsertDefaultFn>,
    insert_copy: Option<InsertCopyFn>,
    insert_move: Option<InsertMoveFn>,
    erase: Option<EraseFn>,
}

impl DictionaryView {
    /// Create a view with only the mandatory operations.
    #[must_use]
    pub fn new(key_type: TypeInfo, value_type: TypeInfo, ops: DictionaryOps) -> Self {
        Self {
            key_type,
            value_type,
            ops,
            insert_default: None,
            insert_copy: None,
            insert_move: None,
            erase: None,
        }
    }

    /// Add the insert-default capability.
    ///
    /// # Panics
    ///
    /// Panics if the capability was already set.
    #[must_use]
    pub fn with_insert_default(mut self, insert_default: InsertDefaultFn) -> Self {
        assert!(self.insert_default.is_none(), "insert default already set");
        self.insert_default = Some(insert_default);
        self
    }

    /// Add the insert-by-copy capability.
    ///
    /// # Panics
    ///
    /// Panics if the capability was already set.
    #[must_use]
    pub fn with_insert_copy(mut self, insert_copy: InsertCopyFn) -> Self {
        assert!(self.insert_copy.is_none(), "insert copy already set");
        self.insert_copy = Some(insert_copy);
        self
    }

    /// Add the insert-by-move capability.
    ///
    /// # Panics
    ///
    /// Panics if the capability was already set.
    #[must_use]
    pub fn with_insert_move(mut self, insert_move: InsertMoveFn) -> Self {
        assert!(self.insert_move.is_none(), "insert move already set");
        self.insert_move = Some(insert_move);
        self
    }

    /// Add the erase capability.
    ///
    /// # Panics
    ///
    /// Panics if the capability was already set.
    #[must_use]
    pub fn with_erase(mut self, erase: EraseFn) -> Self {
        assert!(self.erase.is_none(), "erase already set");
        self.erase = Some(erase);
        self
    }

    /// Descriptor of the key type.
    #[must_use]
    pub fn key_type(&self) -> &TypeInfo {
        &self.key_type
    }

    /// Descriptor of the value type.
    #[must_use]
    pub fn value_type(&self) -> &TypeInfo {
        &self.value_type
    }

    /// The mandatory operations, for building a view with a different set
    /// of optional capabilities.
    #[must_use]
    pub fn ops(&self) -> &DictionaryOps {
        &self.ops
    }

    /// Number of entries in `instance`.
    #[must_use]
    pub fn length(&self, instance: &dyn Any) -> usize {
        (self.ops.length)(instance)
    }

    /// Const cursor on the first entry of `instance`. Null if it is empty.
    #[must_use]
    pub fn begin<'a>(&'a self, instance: &'a dyn Any) -> ConstCursor<'a> {
        ConstCursor {
            view: self,
            instance,
            handle: (self.ops.begin)(instance),
        }
    }

    /// Mutable cursor on the first entry of `instance`. Null if it is empty.
    #[must_use]
    pub fn begin_mut<'a>(&'a self, instance: &'a mut dyn Any) -> Cursor<'a> {
        let handle = (self.ops.begin)(&*instance);
        Cursor {
            view: self,
            instance,
            handle,
        }
    }

    /// Const cursor on the entry keyed by `key`. Null on a miss.
    #[must_use]
    pub fn find<'a>(&'a self, instance: &'a dyn Any, key: &dyn Any) -> ConstCursor<'a> {
        ConstCursor {
            view: self,
            instance,
            handle: (self.ops.find)(instance, key),
        }
    }

    /// Mutable cursor on the entry keyed by `key`. Null on a miss.
    #[must_use]
    pub fn find_mut<'a>(&'a self, instance: &'a mut dyn Any, key: &dyn Any) -> Cursor<'a> {
        let handle = (self.ops.find)(&*instance, key);
        Cursor {
            view: self,
            instance,
            handle,
        }
    }

    /// Iterate over `(key, value)` pairs of `instance`.
    #[must_use]
    pub fn entries<'a>(&'a self, instance: &'a dyn Any) -> Entries<'a> {
        Entries {
            cursor: self.begin(instance),
        }
    }

    /// Insert a default value under `key`. Returns `false` if unsupported.
    pub fn insert_default(&self, instance: &mut dyn Any, key: &dyn Any) -> bool {
        match self.insert_default {
            Some(insert_default) => {
                insert_default(instance, key);
                true
            }
            None => false,
        }
    }

    /// Insert a clone of `value` under `key`. Returns `false` if unsupported.
    pub fn insert_copy(&self, instance: &mut dyn Any, key: &dyn Any, value: &dyn Any) -> bool {
        match self.insert_copy {
            Some(insert_copy) => {
                insert_copy(instance, key, value);
                true
            }
            None => false,
        }
    }

    /// Move `value` into `instance` under `key`. Returns `false` if
    /// unsupported, in which case `value` is dropped.
    pub fn insert_move(&self, instance: &mut dyn Any, key: &dyn Any, value: Box<dyn Any>) -> bool {
        match self.insert_move {
            Some(insert_move) => {
                insert_move(instance, key, value);
                true
            }
            None => false,
        }
    }

    /// Erase the entry under `cursor` and stop the cursor.
    ///
    /// Returns `false`, leaving the cursor untouched, if the binding cannot
    /// erase.
    ///
    /// # Panics
    ///
    /// Panics if `cursor` is null.
    pub fn erase(&self, cursor: &mut Cursor<'_>) -> bool {
        assert!(!cursor.is_null(), "cannot erase through a null cursor");

        let Some(erase) = self.erase else {
            return false;
        };
        if let Some(handle) = cursor.handle.take() {
            erase(&mut *cursor.instance, &handle);
            (self.ops.stop)(handle);
        }
        true
    }

    /// Returns `true` if [`DictionaryView::insert_default`] is supported.
    #[must_use]
    pub fn has_insert_default(&self) -> bool {
        self.insert_default.is_some()
    }

    /// Returns `true` if [`DictionaryView::insert_copy`] is supported.
    #[must_use]
    pub fn has_insert_copy(&self) -> bool {
        self.insert_copy.is_some()
    }

    /// Returns `true` if [`DictionaryView::insert_move`] is supported.
    #[must_use]
    pub fn has_insert_move(&self) -> bool {
        self.insert_move.is_some()
    }

    /// Returns `true` if [`DictionaryView::erase`] is supported.
    #[must_use]
    pub fn has_erase(&self) -> bool {
        self.erase.is_some()
    }

    fn check<T: Any>(expected: &TypeInfo) -> Result<(), ReflectError> {
        if expected.is::<T>() {
            Ok(())
        } else {
            Err(ReflectError::TypeMismatch {
                expected: expected.name,
                found: type_name::<T>(),
            })
        }
    }
}

impl fmt::Debug for DictionaryView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DictionaryView")
            .field("key_type", &self.key_type)
            .field("value_type", &self.value_type)
            .field("insert_default", &self.has_insert_default())
            .field("insert_copy", &self.has_insert_copy())
            .field("insert_move", &self.has_insert_move())
            .field("erase", &self.has_erase())
            .finish()
    }
}

fn expect_handle<'h>(handle: &'h Option<CursorHandle>, op: &str) -> &'h CursorHandle {
    match handle {
        Some(handle) => handle,
        None => panic!("cannot {op} through a null cursor"),
    }
}

fn downcast_projection<'a, T: Any>(value: &'a dyn Any, expected: &TypeInfo) -> &'a T {
    match value.downcast_ref::<T>() {
        Some(value) => value,
        None => panic!("expected `{}`, asked for `{}`", expected.name, type_name::<T>()),
    }
}

/// A cursor with mutable access to the instance it walks.
pub struct Cursor<'a> {
    view: &'a DictionaryView,
    instance: &'a mut dyn Any,
    handle: Option<CursorHandle>,
}

impl<'a> Cursor<'a> {
    /// Returns `true` if the cursor missed, ran off the end, or was erased.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.handle.is_none()
    }

    /// Key of the current entry.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is null.
    #[must_use]
    pub fn key(&self) -> &dyn Any {
        let handle = expect_handle(&self.handle, "read a key");
        (self.view.ops.key)(&*self.instance, handle)
    }

    /// Value of the current entry.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is null.
    #[must_use]
    pub fn value(&self) -> &dyn Any {
        let handle = expect_handle(&self.handle, "read a value");
        (self.view.ops.value)(&*self.instance, handle)
    }

    /// Mutable value of the current entry.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is null.
    #[must_use]
    pub fn value_mut(&mut self) -> &mut dyn Any {
        let handle = expect_handle(&self.handle, "write a value");
        (self.view.ops.value_mut)(&mut *self.instance, handle)
    }

    /// Key of the current entry as a `K`.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is null or the key is not a `K`.
    #[must_use]
    pub fn key_as<K: Any>(&self) -> &K {
        downcast_projection(self.key(), &self.view.key_type)
    }

    /// Value of the current entry as a `V`.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is null or the value is not a `V`.
    #[must_use]
    pub fn value_as<V: Any>(&self) -> &V {
        downcast_projection(self.value(), &self.view.value_type)
    }

    /// Mutable value of the current entry as a `V`.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is null or the value is not a `V`.
    #[must_use]
    pub fn value_as_mut<V: Any>(&mut self) -> &mut V {
        let expected = self.view.value_type;
        match self.value_mut().downcast_mut::<V>() {
            Some(value) => value,
            None => panic!("expected `{}`, asked for `{}`", expected.name, type_name::<V>()),
        }
    }

    /// Checked form of [`Cursor::key_as`].
    ///
    /// # Errors
    ///
    /// Returns [`ReflectError::NullCursor`] or [`ReflectError::TypeMismatch`].
    pub fn try_key<K: Any>(&self) -> Result<&K, ReflectError> {
        DictionaryView::check::<K>(&self.view.key_type)?;
        if self.is_null() {
            return Err(ReflectError::NullCursor);
        }
        Ok(self.key_as())
    }

    /// Checked form of [`Cursor::value_as`].
    ///
    /// # Errors
    ///
    /// Returns [`ReflectError::NullCursor`] or [`ReflectError::TypeMismatch`].
    pub fn try_value<V: Any>(&self) -> Result<&V, ReflectError> {
        DictionaryView::check::<V>(&self.view.value_type)?;
        if self.is_null() {
            return Err(ReflectError::NullCursor);
        }
        Ok(self.value_as())
    }

    /// Step to the next entry.
    ///
    /// Returns `false` once the entries are exhausted, after which the
    /// cursor is stopped and null.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is already null.
    pub fn advance(&mut self) -> bool {
        let Some(handle) = self.handle.as_mut() else {
            panic!("cannot advance a null cursor");
        };
        if (self.view.ops.advance)(&*self.instance, handle) {
            return true;
        }
        if let Some(handle) = self.handle.take() {
            (self.view.ops.stop)(handle);
        }
        false
    }

    /// Erase the current entry through the cursor's own view.
    ///
    /// See [`DictionaryView::erase`].
    pub fn erase(&mut self) -> bool {
        let view = self.view;
        view.erase(self)
    }
}

impl Drop for Cursor<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            (self.view.ops.stop)(handle);
        }
    }
}

impl fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("view", self.view)
            .field("null", &self.is_null())
            .finish()
    }
}

/// A cursor with shared access to the instance it walks.
///
/// Projections borrow from the instance rather than the cursor, so keys and
/// values stay usable after the cursor moves on.
pub struct ConstCursor<'a> {
    view: &'a DictionaryView,
    instance: &'a dyn Any,
    handle: Option<CursorHandle>,
}

impl<'a> ConstCursor<'a> {
    /// Returns `true` if the cursor missed or ran off the end.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.handle.is_none()
    }

    /// Key of the current entry.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is null.
    #[must_use]
    pub fn key(&self) -> &'a dyn Any {
        let handle = expect_handle(&self.handle, "read a key");
        (self.view.ops.key)(self.instance, handle)
    }

    /// Value of the current entry.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is null.
    #[must_use]
    pub fn value(&self) -> &'a dyn Any {
        let handle = expect_handle(&self.handle, "read a value");
        (self.view.ops.value)(self.instance, handle)
    }

    /// Key of the current entry as a `K`.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is null or the key is not a `K`.
    #[must_use]
    pub fn key_as<K: Any>(&self) -> &'a K {
        downcast_projection(self.key(), &self.view.key_type)
    }

    /// Value of the current entry as a `V`.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is null or the value is not a `V`.
    #[must_use]
    pub fn value_as<V: Any>(&self) -> &'a V {
        downcast_projection(self.value(), &self.view.value_type)
    }

    /// Checked form of [`ConstCursor::key_as`].
    ///
    /// # Errors
    ///
    /// Returns [`ReflectError::NullCursor`] or [`ReflectError::TypeMismatch`].
    pub fn try_key<K: Any>(&self) -> Result<&'a K, ReflectError> {
        DictionaryView::check::<K>(&self.view.key_type)?;
        if self.is_null() {
            return Err(ReflectError::NullCursor);
        }
        Ok(self.key_as())
    }

    /// Checked form of [`ConstCursor::value_as`].
    ///
    /// # Errors
    ///
    /// Returns [`ReflectError::NullCursor`] or [`ReflectError::TypeMismatch`].
    pub fn try_value<V: Any>(&self) -> Result<&'a V, ReflectError> {
        DictionaryView::check::<V>(&self.view.value_type)?;
        if self.is_null() {
            return Err(ReflectError::NullCursor);
        }
        Ok(self.value_as())
    }

    /// Step to the next entry.
    ///
    /// Returns `false` once the entries are exhausted, after which the
    /// cursor is stopped and null.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is already null.
    pub fn advance(&mut self) -> bool {
        let Some(handle) = self.handle.as_mut() else {
            panic!("cannot advance a null cursor");
        };
        if (self.view.ops.advance)(self.instance, handle) {
            return true;
        }
        if let Some(handle) = self.handle.take() {
            (self.view.ops.stop)(handle);
        }
        false
    }
}

impl Clone for ConstCursor<'_> {
    /// Re-finds the current key on the same instance; handles are never
    /// duplicated.
    fn clone(&self) -> Self {
        if self.is_null() {
            return Self {
                view: self.view,
                instance: self.instance,
                handle: None,
            };
        }
        self.view.find(self.instance, self.key())
    }
}

impl Drop for ConstCursor<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            (self.view.ops.stop)(handle);
        }
    }
}

impl fmt::Debug for ConstCursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstCursor")
            .field("view", self.view)
            .field("null", &self.is_null())
            .finish()
    }
}

/// Iterator over the `(key, value)` pairs of a dictionary.
///
/// Created by [`DictionaryView::entries`].
#[derive(Debug)]
pub struct Entries<'a> {
    cursor: ConstCursor<'a>,
}

impl<'a> Iterator for Entries<'a> {
    type Item = (&'a dyn Any, &'a dyn Any);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.is_null() {
            return None;
        }
        let entry = (self.cursor.key(), self.cursor.value());
        self.cursor.advance();
        Some(entry)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    // A slot dictionary: key `n` sits in slot `n` and starts with value
    // `n * 10`. Cursor state is the slot index. Live handles are counted so
    // tests can check that every handle is stopped exactly once.
    struct Slots {
        keys: Vec<u32>,
        values: Vec<u32>,
    }

    thread_local! {
        static LIVE: Cell<i32> = const { Cell::new(0) };
    }

    fn live() -> i32 {
        LIVE.with(Cell::get)
    }

    fn slots(instance: &dyn Any) -> &Slots {
        instance.downcast_ref::<Slots>().unwrap()
    }

    fn open(slot: usize) -> CursorHandle {
        LIVE.with(|l| l.set(l.get() + 1));
        CursorHandle::new(slot)
    }

    fn length(instance: &dyn Any) -> usize {
        slots(instance).keys.len()
    }

    fn begin(instance: &dyn Any) -> Option<CursorHandle> {
        (!slots(instance).keys.is_empty()).then(|| open(0))
    }

    fn find(instance: &dyn Any, key: &dyn Any) -> Option<CursorHandle> {
        let key = key.downcast_ref::<u32>().unwrap();
        slots(instance).keys.iter().position(|k| k == key).map(open)
    }

    fn advance(instance: &dyn Any, handle: &mut CursorHandle) -> bool {
        let slot = handle.state_mut::<usize>();
        *slot += 1;
        *slot < slots(instance).keys.len()
    }

    fn stop(handle: CursorHandle) {
        let _ = handle.into_state::<usize>();
        LIVE.with(|l| l.set(l.get() - 1));
    }

    fn key<'a>(instance: &'a dyn Any, handle: &CursorHandle) -> &'a dyn Any {
        &slots(instance).keys[*handle.state::<usize>()]
    }

    fn value<'a>(instance: &'a dyn Any, handle: &CursorHandle) -> &'a dyn Any {
        &slots(instance).values[*handle.state::<usize>()]
    }

    fn value_mut<'a>(instance: &'a mut dyn Any, handle: &CursorHandle) -> &'a mut dyn Any {
        let instance = instance.downcast_mut::<Slots>().unwrap();
        &mut instance.values[*handle.state::<usize>()]
    }

    fn counter_view() -> DictionaryView {
        DictionaryView::new(
            TypeInfo::of::<u32>(),
            TypeInfo::of::<u32>(),
            DictionaryOps {
                length,
                begin,
                find,
                advance,
                stop,
                key,
                value,
                value_mut,
            },
        )
    }

    fn make_counter(len: u32) -> Slots {
        Slots {
            keys: (0..len).collect(),
            values: (0..len).map(|n| n * 10).collect(),
        }
    }

    #[test]
    fn test_capabilities_absent_by_default() {
        let view = counter_view();
        assert!(!view.has_insert_default());
        assert!(!view.has_insert_copy());
        assert!(!view.has_insert_move());
        assert!(!view.has_erase());

        let mut instance = make_counter(2);
        assert!(!view.insert_default(&mut instance, &5u32));
        assert!(!view.insert_copy(&mut instance, &5u32, &1u32));
        assert!(!view.insert_move(&mut instance, &5u32, Box::new(1u32)));
    }

    #[test]
    fn test_erase_without_capability_keeps_cursor() {
        let view = counter_view();
        let mut instance = make_counter(2);
        let mut cursor = view.begin_mut(&mut instance);
        assert!(!view.erase(&mut cursor));
        assert!(!cursor.is_null());
        drop(cursor);
        assert_eq!(live(), 0);
    }

    #[test]
    fn test_exhausted_cursor_is_stopped() {
        let view = counter_view();
        let instance = make_counter(3);
        let mut cursor = view.begin(&instance);
        let mut visited = 1;
        while cursor.advance() {
            visited += 1;
        }
        assert_eq!(visited, 3);
        assert!(cursor.is_null());
        assert_eq!(live(), 0);
    }

    #[test]
    fn test_drop_stops_live_cursor() {
        let view = counter_view();
        let instance = make_counter(3);
        {
            let _cursor = view.find(&instance, &1u32);
            assert_eq!(live(), 1);
        }
        assert_eq!(live(), 0);
    }

    #[test]
    fn test_clone_refinds_instead_of_sharing() {
        let view = counter_view();
        let instance = make_counter(4);
        let mut original = view.find(&instance, &1u32);
        let copy = original.clone();
        assert_eq!(live(), 2);

        assert!(original.advance());
        assert_eq!(*original.key_as::<u32>(), 2);
        assert_eq!(*copy.key_as::<u32>(), 1);

        drop(original);
        drop(copy);
        assert_eq!(live(), 0);
    }

    #[test]
    fn test_mutable_cursor_writes_through() {
        let view = counter_view();
        let mut instance = make_counter(2);
        {
            let mut cursor = view.find_mut(&mut instance, &1u32);
            *cursor.value_as_mut::<u32>() = 99;
        }
        assert_eq!(instance.values, vec![0, 99]);
        assert_eq!(instance.keys, vec![0, 1]);
    }

    #[test]
    fn test_try_accessors_report_mismatch_and_null() {
        let view = counter_view();
        let instance = make_counter(1);
        let cursor = view.begin(&instance);
        assert_eq!(cursor.try_key::<u32>(), Ok(&0));
        assert!(matches!(
            cursor.try_value::<i64>(),
            Err(ReflectError::TypeMismatch { .. })
        ));

        let miss = view.find(&instance, &7u32);
        assert_eq!(miss.try_key::<u32>(), Err(ReflectError::NullCursor));
    }

    #[test]
    #[should_panic(expected = "null cursor")]
    fn test_key_on_null_cursor_panics() {
        let view = counter_view();
        let instance = make_counter(0);
        let cursor = view.begin(&instance);
        let _ = cursor.key();
    }

    #[test]
    #[should_panic(expected = "cannot advance a null cursor")]
    fn test_advance_on_null_cursor_panics() {
        let view = counter_view();
        let instance = make_counter(0);
        let mut cursor = view.begin(&instance);
        cursor.advance();
    }

    #[test]
    #[should_panic(expected = "already set")]
    fn test_setting_capability_twice_panics() {
        fn erase(_: &mut dyn Any, _: &CursorHandle) {}
        let _ = counter_view().with_erase(erase).with_erase(erase);
    }

    #[test]
    fn test_entries_visits_every_pair() {
        let view = counter_view();
        let instance = make_counter(3);
        let keys: Vec<u32> = view
            .entries(&instance)
            .map(|(k, _)| *k.downcast_ref::<u32>().unwrap())
            .collect();
        assert_eq!(keys, vec![0, 1, 2]);
        assert_eq!(live(), 0);
    }
}
