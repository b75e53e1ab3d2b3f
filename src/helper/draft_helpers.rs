use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::forms::wizard::{StepForm, Wizard};

/// In-progress wizards kept between requests, one per (account, form).
/// Drafts are lost on restart.
#[derive(Default)]
pub struct DraftStore {
    drafts: RwLock<HashMap<(String, String), Value>>,
}

fn key(owner: &str, form: &str) -> (String, String) {
    (owner.to_lowercase(), form.to_string())
}

impl DraftStore {
    pub fn load<F: StepForm>(&self, owner: &str) -> Option<Wizard<F>> {
        let drafts = self.drafts.read().unwrap_or_else(|poisoned| {
            log::error!("RwLock for drafts was poisoned! Using stale data.");
            poisoned.into_inner()
        });
        let value = drafts.get(&key(owner, F::NAME))?.clone();
        match serde_json::from_value(value) {
            Ok(wizard) => Some(wizard),
            Err(e) => {
                log::warn!("Dropping unreadable '{}' draft for {}: {}", F::NAME, owner, e);
                None
            }
        }
    }

    pub fn save<F: StepForm>(&self, owner: &str, wizard: &Wizard<F>) {
        let value = match serde_json::to_value(wizard) {
            Ok(value) => value,
            Err(e) => {
                log::error!("Could not store '{}' draft for {}: {}", F::NAME, owner, e);
                return;
            }
        };
        let mut drafts = self.drafts.write().unwrap_or_else(|poisoned| {
            log::error!("RwLock for drafts was poisoned during save! Recovering lock.");
            poisoned.into_inner()
        });
        drafts.insert(key(owner, F::NAME), value);
    }

    pub fn discard(&self, owner: &str, form: &str) {
        let mut drafts = self.drafts.write().unwrap_or_else(|poisoned| {
            log::error!("RwLock for drafts was poisoned during discard! Recovering lock.");
            poisoned.into_inner()
        });
        drafts.remove(&key(owner, form));
    }
}
