//! The lead store - the ordered, owning collection of lead entities.
//!
//! Insertion order is newest-first for new entries. Every mutation updates
//! the in-memory sequence first and then rewrites the durable collection
//! (write-then-persist), giving read-after-write consistency within the
//! process.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::lead::{Lead, LeadId};
use crate::error::{OutdialError, Result};
use crate::store::Storage;

/// Owning collection of [`Lead`] entities backed by durable storage.
pub struct LeadStore {
    leads: Vec<Lead>,
    storage: Arc<dyn Storage>,
}

impl LeadStore {
    /// Load the persisted collection.
    pub async fn load(storage: Arc<dyn Storage>) -> Result<Self> {
        let leads = storage.load_leads().await?;
        tracing::debug!(count = leads.len(), "Lead store loaded");
        Ok(Self { leads, storage })
    }

    pub fn all(&self) -> &[Lead] {
        &self.leads
    }

    pub fn len(&self) -> usize {
        self.leads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }

    pub fn get(&self, id: LeadId) -> Option<&Lead> {
        self.leads.iter().find(|lead| lead.id == id)
    }

    /// Substring search over name and phone.
    pub fn search(&self, term: &str) -> Vec<Lead> {
        self.leads
            .iter()
            .filter(|lead| lead.matches(term))
            .cloned()
            .collect()
    }

    /// Reduce a selection to the ids present in the store, in store order.
    pub fn in_store_order(&self, selection: &HashSet<LeadId>) -> Vec<LeadId> {
        self.leads
            .iter()
            .map(|lead| lead.id)
            .filter(|id| selection.contains(id))
            .collect()
    }

    /// Prepend a batch of new leads, preserving the batch's internal order.
    pub async fn insert_front(&mut self, leads: Vec<Lead>) -> Result<()> {
        self.leads.splice(0..0, leads);
        self.storage.save_leads(&self.leads).await
    }

    /// Remove a lead. Returns whether it existed.
    pub async fn remove(&mut self, id: LeadId) -> Result<bool> {
        let before = self.leads.len();
        self.leads.retain(|lead| lead.id != id);
        let removed = self.leads.len() != before;
        if removed {
            self.storage.save_leads(&self.leads).await?;
        }
        Ok(removed)
    }

    /// Apply a mutation to one lead and persist. Returns the updated lead.
    pub async fn update(
        &mut self,
        id: LeadId,
        mutate: impl FnOnce(&mut Lead),
    ) -> Result<Lead> {
        let index = self
            .leads
            .iter()
            .position(|lead| lead.id == id)
            .ok_or(OutdialError::LeadNotFound(id))?;
        mutate(&mut self.leads[index]);
        let updated = self.leads[index].clone();
        self.storage.save_leads(&self.leads).await?;
        Ok(updated)
    }
}
