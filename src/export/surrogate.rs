//! Surrogate integer ids for descriptor strings.

use std::collections::HashMap;

use crate::sheet::{split_descriptors, SeparatorPolicy};

/// Assigns integer ids to descriptor strings (reasons, genres, styles) in
/// first-seen order starting from 1.
///
/// Rebuilt for every export run. Given identical input row order the
/// assignment is fully reproducible within a run; no stability across
/// separate runs is promised.
#[derive(Debug, Default)]
pub struct SurrogateRegistry {
    ids: HashMap<String, i64>,
    order: Vec<String>,
}

impl SurrogateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `description`, assigning the next id to first
    /// sightings.
    pub fn add(&mut self, description: &str) -> i64 {
        if let Some(id) = self.ids.get(description) {
            return *id;
        }
        let id = self.ids.values().copied().max().unwrap_or(0) + 1;
        self.ids.insert(description.to_string(), id);
        self.order.push(description.to_string());
        id
    }

    /// Splits a raw cell and registers every descriptor, returning their ids
    /// in cell order.
    pub fn split_and_add(&mut self, cell: &str, policy: &SeparatorPolicy) -> Vec<i64> {
        split_descriptors(cell, policy)
            .iter()
            .map(|description| self.add(description))
            .collect()
    }

    /// (description, id) pairs in first-seen order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, i64)> {
        self.order
            .iter()
            .map(move |description| (description.as_str(), self.ids[description]))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
