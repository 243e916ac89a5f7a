//! Mapping between in-memory references and their serialized identifiers.
//!
//! When a reference graph is written out, every reference (an entity handle,
//! an asset handle, ...) has to be replaced by an identifier that means
//! something in the saved data, and the reverse has to happen on load. A
//! [`ReferenceMap`] answers both questions, in one of two modes:
//!
//! - **Table mode** ([`ReferenceMap::new`]): explicit pairs are added with
//!   [`ReferenceMap::add`] and kept in two hash maps that are always
//!   inverses of each other.
//! - **Function mode** ([`ReferenceMap::with_functions`]): two caller
//!   supplied lookups compute the counterpart on the fly, e.g. deriving an
//!   id directly from a reference's own stable fields. Nothing is stored.
//!
//! ```rust
//! use engine_data::ReferenceMap;
//!
//! let mut map = ReferenceMap::<u32, String>::new();
//! map.add(7, "player".to_string());
//! assert_eq!(map.get_id(&7), "player");
//! assert_eq!(map.get_ref(&"player".to_string()), 7);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::ReferenceMapError;

/// Computes the identifier of a reference, or `None` if it has none.
pub type SerializeFn<R, I> = Arc<dyn Fn(&R) -> Option<I> + Send + Sync>;

/// Resolves an identifier back to a reference, or `None` if it is unknown.
pub type DeserializeFn<R, I> = Arc<dyn Fn(&I) -> Option<R> + Send + Sync>;

/// Explicit two-way storage of reference/identifier pairs.
#[derive(Debug, Clone)]
pub struct ReferenceTable<R, I> {
    ref_to_id: HashMap<R, I>,
    id_to_ref: HashMap<I, R>,
}

impl<R, I> ReferenceTable<R, I>
where
    R: Eq + Hash + Clone,
    I: Eq + Hash + Clone,
{
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ref_to_id: HashMap::new(),
            id_to_ref: HashMap::new(),
        }
    }

    /// Add a pair.
    ///
    /// Adding a reference or id that is already present replaces the old
    /// pair (last write wins) and drops its stale reverse entry, so the two
    /// directions stay inverses.
    pub fn add(&mut self, reference: R, id: I) {
        if let Some(old_id) = self.ref_to_id.remove(&reference) {
            warn!("reference added twice; replacing its previous id");
            self.id_to_ref.remove(&old_id);
        }
        if let Some(old_ref) = self.id_to_ref.remove(&id) {
            warn!("id added twice; replacing its previous reference");
            self.ref_to_id.remove(&old_ref);
        }
        self.ref_to_id.insert(reference.clone(), id.clone());
        self.id_to_ref.insert(id, reference);
    }

    /// Returns `true` if `reference` has an id.
    #[must_use]
    pub fn has_ref(&self, reference: &R) -> bool {
        self.ref_to_id.contains_key(reference)
    }

    /// Returns `true` if `id` has a reference.
    #[must_use]
    pub fn has_id(&self, id: &I) -> bool {
        self.id_to_ref.contains_key(id)
    }

    /// The reference mapped to `id`.
    #[must_use]
    pub fn get_ref(&self, id: &I) -> Option<&R> {
        self.id_to_ref.get(id)
    }

    /// The id mapped to `reference`.
    #[must_use]
    pub fn get_id(&self, reference: &R) -> Option<&I> {
        self.ref_to_id.get(reference)
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ref_to_id.len()
    }

    /// Returns `true` if the table holds no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ref_to_id.is_empty()
    }

    /// Iterate over all `(reference, id)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&R, &I)> {
        self.ref_to_id.iter()
    }

    /// Remove every pair.
    pub fn clear(&mut self) {
        self.ref_to_id.clear();
        self.id_to_ref.clear();
    }
}

impl<R, I> Default for ReferenceTable<R, I>
where
    R: Eq + Hash + Clone,
    I: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Caller-supplied lookups used in function mode.
#[derive(Clone)]
pub struct ReferenceFunctions<R, I> {
    serialize: SerializeFn<R, I>,
    deserialize: DeserializeFn<R, I>,
}

impl<R, I> ReferenceFunctions<R, I> {
    /// Bundle a serialize and a deserialize lookup.
    pub fn new(
        serialize: impl Fn(&R) -> Option<I> + Send + Sync + 'static,
        deserialize: impl Fn(&I) -> Option<R> + Send + Sync + 'static,
    ) -> Self {
        Self {
            serialize: Arc::new(serialize),
            deserialize: Arc::new(deserialize),
        }
    }

    /// Bundle lookups that are already shared elsewhere.
    #[must_use]
    pub fn from_shared(serialize: SerializeFn<R, I>, deserialize: DeserializeFn<R, I>) -> Self {
        Self {
            serialize,
            deserialize,
        }
    }

    /// Run the serialize lookup.
    #[must_use]
    pub fn serialize(&self, reference: &R) -> Option<I> {
        (self.serialize)(reference)
    }

    /// Run the deserialize lookup.
    #[must_use]
    pub fn deserialize(&self, id: &I) -> Option<R> {
        (self.deserialize)(id)
    }
}

impl<R, I> fmt::Debug for ReferenceFunctions<R, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ReferenceFunctions(..)")
    }
}

/// A bidirectional reference/identifier map, backed either by a table or
/// by a pair of lookup functions.
#[derive(Debug, Clone)]
pub enum ReferenceMap<R, I> {
    /// Explicit pairs.
    Table(ReferenceTable<R, I>),
    /// Computed on demand; never stores pairs.
    Functions(ReferenceFunctions<R, I>),
}

impl<R, I> ReferenceMap<R, I>
where
    R: Eq + Hash + Clone,
    I: Eq + Hash + Clone,
{
    /// Create an empty table-mode map.
    #[must_use]
    pub fn new() -> Self {
        Self::Table(ReferenceTable::new())
    }

    /// Create a function-mode map.
    pub fn with_functions(
        serialize: impl Fn(&R) -> Option<I> + Send + Sync + 'static,
        deserialize: impl Fn(&I) -> Option<R> + Send + Sync + 'static,
    ) -> Self {
        Self::Functions(ReferenceFunctions::new(serialize, deserialize))
    }

    /// Returns `true` in function mode.
    #[must_use]
    pub fn is_function_bound(&self) -> bool {
        matches!(self, Self::Functions(_))
    }

    /// The backing table, or `None` in function mode.
    ///
    /// Adding through the returned table cannot fail, which makes it the
    /// preferred path when the caller already knows the mode.
    #[must_use]
    pub fn table_mut(&mut self) -> Option<&mut ReferenceTable<R, I>> {
        match self {
            Self::Table(table) => Some(table),
            Self::Functions(_) => None,
        }
    }

    /// Add a reference/id pair.
    ///
    /// # Panics
    ///
    /// Panics if the map is in function mode.
    pub fn add(&mut self, reference: R, id: I) {
        match self.table_mut() {
            Some(table) => table.add(reference, id),
            None => panic!("cannot add pairs to a function-bound reference map"),
        }
    }

    /// Checked form of [`ReferenceMap::add`].
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceMapError::FunctionBound`] in function mode.
    pub fn try_add(&mut self, reference: R, id: I) -> Result<(), ReferenceMapError> {
        let table = self.table_mut().ok_or(ReferenceMapError::FunctionBound)?;
        table.add(reference, id);
        Ok(())
    }

    /// Returns `true` if `reference` has an id.
    #[must_use]
    pub fn has_ref(&self, reference: &R) -> bool {
        match self {
            Self::Table(table) => table.has_ref(reference),
            Self::Functions(functions) => functions.serialize(reference).is_some(),
        }
    }

    /// Returns `true` if `id` has a reference.
    #[must_use]
    pub fn has_id(&self, id: &I) -> bool {
        match self {
            Self::Table(table) => table.has_id(id),
            Self::Functions(functions) => functions.deserialize(id).is_some(),
        }
    }

    /// Look up the reference of `id`, if any.
    #[must_use]
    pub fn lookup_ref(&self, id: &I) -> Option<R> {
        match self {
            Self::Table(table) => table.get_ref(id).cloned(),
            Self::Functions(functions) => functions.deserialize(id),
        }
    }

    /// Look up the id of `reference`, if any.
    #[must_use]
    pub fn lookup_id(&self, reference: &R) -> Option<I> {
        match self {
            Self::Table(table) => table.get_id(reference).cloned(),
            Self::Functions(functions) => functions.serialize(reference),
        }
    }

    /// The reference of `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not mapped. Check with [`ReferenceMap::has_id`]
    /// first unless its presence is guaranteed.
    #[must_use]
    pub fn get_ref(&self, id: &I) -> R {
        match self.lookup_ref(id) {
            Some(reference) => reference,
            None => panic!("no reference is mapped to the requested id"),
        }
    }

    /// The id of `reference`.
    ///
    /// # Panics
    ///
    /// Panics if `reference` is not mapped. Check with
    /// [`ReferenceMap::has_ref`] first unless its presence is guaranteed.
    #[must_use]
    pub fn get_id(&self, reference: &R) -> I {
        match self.lookup_id(reference) {
            Some(id) => id,
            None => panic!("no id is mapped to the requested reference"),
        }
    }

    /// Checked form of [`ReferenceMap::get_ref`].
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceMapError::MissingId`] if `id` is not mapped.
    pub fn try_get_ref(&self, id: &I) -> Result<R, ReferenceMapError>
    where
        I: fmt::Debug,
    {
        self.lookup_ref(id)
            .ok_or_else(|| ReferenceMapError::MissingId(format!("{id:?}")))
    }

    /// Checked form of [`ReferenceMap::get_id`].
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceMapError::MissingReference`] if `reference` is not
    /// mapped.
    pub fn try_get_id(&self, reference: &R) -> Result<I, ReferenceMapError>
    where
        R: fmt::Debug,
    {
        self.lookup_id(reference)
            .ok_or_else(|| ReferenceMapError::MissingReference(format!("{reference:?}")))
    }

    /// Drop every pair and any function bindings, returning to an empty
    /// table-mode map.
    pub fn clear(&mut self) {
        debug!(
            function_bound = self.is_function_bound(),
            pairs = self.size(),
            "clearing reference map"
        );
        *self = Self::new();
    }

    /// Number of stored pairs. Always 0 in function mode.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Self::Table(table) => table.len(),
            Self::Functions(_) => 0,
        }
    }
}

impl<R, I> Default for ReferenceMap<R, I>
where
    R: Eq + Hash + Clone,
    I: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_pairs_are_inverse() {
        let mut map = ReferenceMap::<u64, String>::new();
        map.add(1, "a".to_string());
        map.add(2, "b".to_string());

        for (reference, id) in [(1u64, "a"), (2, "b")] {
            let id = id.to_string();
            assert!(map.has_ref(&reference));
            assert!(map.has_id(&id));
            assert_eq!(map.get_ref(&id), reference);
            assert_eq!(map.get_id(&reference), id);
        }
        assert_eq!(map.size(), 2);
    }

    #[test]
    fn test_missing_keys_are_not_present() {
        let map = ReferenceMap::<u64, u32>::new();
        assert!(!map.has_ref(&1));
        assert!(!map.has_id(&1));
        assert_eq!(map.lookup_id(&1), None);
    }

    #[test]
    fn test_clear_empties_table() {
        let mut map = ReferenceMap::<u64, u32>::new();
        map.add(10, 100);
        map.clear();
        assert_eq!(map.size(), 0);
        assert!(!map.has_ref(&10));
        assert!(!map.has_id(&100));
    }

    #[test]
    fn test_duplicate_add_keeps_directions_inverse() {
        let mut table = ReferenceTable::<u64, u32>::new();
        table.add(1, 100);
        table.add(1, 200);
        assert_eq!(table.get_id(&1), Some(&200));
        assert!(!table.has_id(&100));
        assert_eq!(table.len(), 1);

        table.add(2, 200);
        assert_eq!(table.get_ref(&200), Some(&2));
        assert!(!table.has_ref(&1));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_table_iter_visits_every_pair() {
        let mut table = ReferenceTable::<u64, char>::new();
        table.add(1, 'a');
        table.add(2, 'b');
        table.add(1, 'c');

        let mut pairs: Vec<(u64, char)> = table.iter().map(|(r, i)| (*r, *i)).collect();
        pairs.sort_unstable();
        assert_eq!(pairs, vec![(1, 'c'), (2, 'b')]);
    }

    #[test]
    fn test_shared_lookups_back_several_maps() {
        let serialize: SerializeFn<u32, String> = Arc::new(|r: &u32| Some(format!("e{r}")));
        let deserialize: DeserializeFn<u32, String> =
            Arc::new(|i: &String| -> Option<u32> { i.strip_prefix('e')?.parse().ok() });

        let scene = ReferenceMap::Functions(ReferenceFunctions::from_shared(
            Arc::clone(&serialize),
            Arc::clone(&deserialize),
        ));
        let prefab = ReferenceMap::Functions(ReferenceFunctions::from_shared(serialize, deserialize));

        assert_eq!(scene.get_id(&3), "e3");
        assert_eq!(prefab.get_ref(&"e3".to_string()), 3);
        assert!(!prefab.has_id(&"x".to_string()));
    }

    #[test]
    fn test_function_mode_uses_lookup_success() {
        // Ids are derived from the reference itself: even references only.
        let map = ReferenceMap::<u64, u64>::with_functions(
            |r| (r % 2 == 0).then_some(r / 2),
            |i| Some(i * 2),
        );
        assert!(map.is_function_bound());
        assert!(map.has_ref(&4));
        assert!(!map.has_ref(&3));
        assert!(map.has_id(&9));
        assert_eq!(map.get_id(&4), 2);
        assert_eq!(map.get_ref(&9), 18);
        assert_eq!(map.size(), 0);
    }

    #[test]
    fn test_try_add_in_function_mode_fails() {
        let mut map = ReferenceMap::<u64, u64>::with_functions(|r| Some(*r), |i| Some(*i));
        assert_eq!(map.try_add(1, 1), Err(ReferenceMapError::FunctionBound));
        assert!(map.table_mut().is_none());
    }

    #[test]
    fn test_clear_drops_function_bindings() {
        let mut map = ReferenceMap::<u64, u64>::with_functions(|r| Some(*r), |i| Some(*i));
        assert!(map.has_ref(&5));
        map.clear();
        assert!(!map.is_function_bound());
        assert!(!map.has_ref(&5));
        map.add(5, 6);
        assert_eq!(map.size(), 1);
    }

    #[test]
    #[should_panic(expected = "function-bound")]
    fn test_add_in_function_mode_panics() {
        let mut map = ReferenceMap::<u64, u64>::with_functions(|r| Some(*r), |i| Some(*i));
        map.add(1, 1);
    }

    #[test]
    #[should_panic(expected = "no id is mapped")]
    fn test_get_id_on_absent_reference_panics() {
        let map = ReferenceMap::<u64, u64>::new();
        let _ = map.get_id(&3);
    }

    #[test]
    fn test_try_get_reports_missing_key() {
        let map = ReferenceMap::<u64, String>::new();
        assert_eq!(
            map.try_get_ref(&"ghost".to_string()),
            Err(ReferenceMapError::MissingId("\"ghost\"".to_string()))
        );
        assert_eq!(
            map.try_get_id(&42),
            Err(ReferenceMapError::MissingReference("42".to_string()))
        );
    }
}
