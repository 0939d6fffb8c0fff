use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use rand::RngCore;

use crate::SimError;

/// A type-safe key used to fetch values from the value store.
///
/// # Construction
///
/// A key can be constructed only by calling [`State::insert`]. The state assigns a new numerical
/// ID to the inserted value.
/// Additionally, the key holds a unique hash for the state object.
/// This prevents from using the key with a different instance of [`State`] object.
/// Such operation will panic:
///
/// ```should_panic
/// # use simcore::{Key, State};
/// let mut state_1 = State::default();
/// let mut state_2 = State::default();
/// let id = state_1.insert(1);
/// let _ = state_2.remove(id);
/// ```
///
/// # Type Safety
///
/// These keys are type-safe in a sense that a key used to insert a value of type `T` cannot be
/// used to access a value of another type `U`. An attempt to do so will result in a compile error.
///
/// ```compile_fail
/// # use simcore::{Key, State};
/// let mut state = State::default();
/// let id = state.insert(String::from("1"));
/// let _: Option<i32> = state.remove(id);  // Error!
/// ```
pub struct Key<V> {
    id: usize,
    state_hash: u64,
    _marker: PhantomData<V>,
}

impl<V> Clone for Key<V> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            state_hash: self.state_hash,
            _marker: PhantomData,
        }
    }
}
impl<V> Copy for Key<V> {}

impl<V> PartialEq for Key<V> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.state_hash == other.state_hash
    }
}
impl<V> Eq for Key<V> {}

impl<V> fmt::Debug for Key<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key<{}>({})", type_name::<V>(), self.id)
    }
}

/// State of a simulation: a store of arbitrary values addressed by typed keys.
///
/// Resources, registries, and recorders shared between components live here, so they are only
/// ever mutated from within the event loop.
pub struct State {
    store: HashMap<TypeId, HashMap<usize, Box<dyn Any>>>,
    next_id: usize,
    state_hash: u64,
}

impl Default for State {
    fn default() -> Self {
        Self {
            store: HashMap::new(),
            next_id: 0,
            state_hash: rand::thread_rng().next_u64(),
        }
    }
}

impl State {
    fn assert_hash<V: 'static>(&self, key: Key<V>) {
        assert_eq!(
            key.state_hash, self.state_hash,
            "State hash of the key does not match the hash of the state"
        );
    }

    /// Inserts an arbitrary value to the value store. Learn more in the documentation for [`Key`].
    #[must_use = "Discarding key results in leaking inserted value"]
    pub fn insert<V: 'static>(&mut self, value: V) -> Key<V> {
        let id = self.next_id;
        self.next_id += 1;
        self.store
            .entry(TypeId::of::<V>())
            .or_default()
            .insert(id, Box::new(value));
        Key {
            id,
            state_hash: self.state_hash,
            _marker: PhantomData,
        }
    }

    /// Removes a value of type `V` from the value store. Learn more in the documentation for [`Key`].
    pub fn remove<V: 'static>(&mut self, key: Key<V>) -> Option<V> {
        self.assert_hash(key);
        self.store
            .get_mut(&TypeId::of::<V>())
            .and_then(|m| m.remove(&key.id))
            .and_then(|v| v.downcast::<V>().ok())
            .map(|v| *v)
    }

    /// Gets a immutable reference to a value of a type `V` from the value store.
    #[must_use]
    pub fn get<V: 'static>(&self, key: Key<V>) -> Option<&V> {
        self.assert_hash(key);
        self.store
            .get(&TypeId::of::<V>())
            .and_then(|m| m.get(&key.id))
            .and_then(|v| v.downcast_ref::<V>())
    }

    /// Gets a mutable reference to a value of a type `V` from the value store.
    #[must_use]
    pub fn get_mut<V: 'static>(&mut self, key: Key<V>) -> Option<&mut V> {
        self.assert_hash(key);
        self.store
            .get_mut(&TypeId::of::<V>())
            .and_then(|m| m.get_mut(&key.id))
            .and_then(|v| v.downcast_mut::<V>())
    }

    /// Like [`State::get_mut`] but reports a missing value as an error.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::MissingState`] naming the type if nothing is stored under `key`.
    pub fn fetch_mut<V: 'static>(&mut self, key: Key<V>) -> Result<&mut V, SimError> {
        self.get_mut(key)
            .ok_or_else(|| SimError::MissingState(type_name::<V>()))
    }

    /// Like [`State::get`] but reports a missing value as an error.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::MissingState`] naming the type if nothing is stored under `key`.
    pub fn fetch<V: 'static>(&self, key: Key<V>) -> Result<&V, SimError> {
        self.get(key)
            .ok_or_else(|| SimError::MissingState(type_name::<V>()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_add_remove_key_values() {
        let mut state = State::default();

        let id = state.insert(1);
        assert_eq!(state.remove(id), Some(1));
        assert_eq!(state.remove(id), None);

        let id = state.insert("string_slice");
        assert_eq!(state.remove(id), Some("string_slice"));
        assert_eq!(state.remove(id), None);

        let id = state.insert(vec![String::from("S")]);
        assert_eq!(state.remove(id), Some(vec![String::from("S")]));
        assert_eq!(state.remove(id), None);
    }

    #[test]
    fn test_get_and_fetch() {
        let mut state = State::default();
        let id = state.insert(7_u32);
        assert_eq!(state.get(id), Some(&7));
        *state.fetch_mut(id).unwrap() += 1;
        assert_eq!(state.fetch(id), Ok(&8));
        state.remove(id);
        assert_eq!(
            state.fetch_mut(id),
            Err(SimError::MissingState(type_name::<u32>()))
        );
    }

    #[test]
    #[should_panic]
    fn test_foreign_key() {
        let mut state_1 = State::default();
        let state_2 = State::default();
        let id = state_1.insert(1);
        let _ = state_2.get(id);
    }
}
