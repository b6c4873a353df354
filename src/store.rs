//! Preference store: owns user state and the draft, applies actions and
//! persists after every change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregator::{self, Action, Navigation};
use crate::api::{AlertBackend, Session};
use crate::db::{KeyValueStore, ACTIVE_ALERT_KEY, SESSION_KEY, USER_PREFERENCES_KEY};
use crate::error::{NaaradError, Result};
use crate::payload::{to_api_payload, CreateAlertRequest};
use crate::preferences::{Alert, UserPreferences};

/// Alert being edited plus where the wizard was
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub alert: Alert,
    #[serde(default)]
    pub navigation: Navigation,
}

/// Outcome of saving the draft through the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedAlert {
    pub alert: Alert,
    pub message: Option<String>,
    /// Backend copy deleted because this save superseded it
    pub replaced_remote_id: Option<String>,
}

pub struct PreferenceStore<S: KeyValueStore> {
    kv: S,
    user: UserPreferences,
    draft: Option<Draft>,
}

impl<S: KeyValueStore> PreferenceStore<S> {
    /// Read persisted state, falling back to empty defaults
    pub fn load(kv: S) -> Result<Self> {
        let user = match kv.get(USER_PREFERENCES_KEY)? {
            Some(json) => serde_json::from_str(&json)?,
            None => UserPreferences::default(),
        };
        let draft = match kv.get(ACTIVE_ALERT_KEY)? {
            Some(json) => Some(serde_json::from_str(&json)?),
            None => None,
        };
        Ok(Self { kv, user, draft })
    }

    pub fn user(&self) -> &UserPreferences {
        &self.user
    }

    pub fn active_alert(&self) -> Option<&Alert> {
        self.draft.as_ref().map(|d| &d.alert)
    }

    pub fn navigation(&self) -> Option<&Navigation> {
        self.draft.as_ref().map(|d| &d.navigation)
    }

    pub fn kv(&self) -> &S {
        &self.kv
    }

    /// Apply an action to the draft and persist
    pub fn dispatch(&mut self, action: Action) -> Result<&Alert> {
        let draft = self.draft.as_mut().ok_or(NaaradError::NoActiveAlert)?;
        tracing::trace!(?action, "dispatch");
        let (alert, navigation) = aggregator::reduce(&draft.alert, &draft.navigation, action);
        draft.alert = alert;
        draft.navigation = navigation;
        self.persist()?;
        Ok(&self.draft.as_ref().ok_or(NaaradError::NoActiveAlert)?.alert)
    }

    /// Begin editing a fresh alert, replacing any unsaved draft
    pub fn start_new_alert(&mut self, now: DateTime<Utc>) -> Result<&Alert> {
        let alert = Alert::new_draft(now, self.user.alerts.len());
        tracing::debug!(id = %alert.id, "started new alert");
        self.set_draft(alert)
    }

    /// Copy a saved alert into the draft slot
    pub fn select_alert_for_editing(&mut self, id: &str) -> Result<&Alert> {
        let alert = self
            .user
            .find_alert(id)
            .cloned()
            .ok_or_else(|| NaaradError::AlertNotFound(id.to_string()))?;
        self.set_draft(alert)
    }

    fn set_draft(&mut self, alert: Alert) -> Result<&Alert> {
        self.draft = Some(Draft {
            alert,
            navigation: Navigation::default(),
        });
        self.persist()?;
        Ok(&self.draft.as_ref().ok_or(NaaradError::NoActiveAlert)?.alert)
    }

    /// Merge the draft into the saved alerts and clear it.
    ///
    /// An alert already in the list is replaced in place; anything else is
    /// appended under a new permanent id.
    pub fn save_active_alert(&mut self, now: DateTime<Utc>) -> Result<Alert> {
        let mut alert = self
            .draft
            .as_ref()
            .map(|d| d.alert.clone())
            .ok_or(NaaradError::NoActiveAlert)?;

        match self.user.alerts.iter().position(|a| a.id == alert.id) {
            Some(index) => self.user.alerts[index] = alert.clone(),
            None => {
                alert.id = Alert::permanent_id(now);
                self.user.alerts.push(alert.clone());
            }
        }

        self.draft = None;
        self.persist()?;
        tracing::info!(id = %alert.id, name = %alert.name, "saved alert");
        Ok(alert)
    }

    /// Create the draft on the backend, then save it locally.
    ///
    /// Nothing local changes when the backend refuses. Once the new copy
    /// exists, the copy from the previous save of the same alert is deleted.
    pub fn submit_active_alert<B: AlertBackend + ?Sized>(
        &mut self,
        backend: &B,
        session: &Session,
        now: DateTime<Utc>,
    ) -> Result<SubmittedAlert> {
        let draft = self.active_alert().ok_or(NaaradError::NoActiveAlert)?;
        let previous = draft.remote_alert_id.clone();
        let request = CreateAlertRequest::new(to_api_payload(draft), session.user_id.as_str());
        let created = backend.create_alert(&request)?;

        if let Some(draft) = self.draft.as_mut() {
            draft.alert.remote_alert_id = created.alert_id.clone();
        }
        let alert = self.save_active_alert(now)?;

        let mut replaced_remote_id = None;
        if let Some(old) = previous.filter(|old| created.alert_id.as_ref() != Some(old)) {
            match backend.delete_alert(&session.user_id, &old) {
                Ok(_) => replaced_remote_id = Some(old),
                Err(e) => {
                    tracing::warn!(remote_id = %old, error = %e, "previous backend alert not deleted")
                }
            }
        }

        Ok(SubmittedAlert {
            alert,
            message: created.message,
            replaced_remote_id,
        })
    }

    /// Drop the draft without saving
    pub fn discard_draft(&mut self) -> Result<()> {
        self.draft = None;
        self.persist()
    }

    /// Delete on the backend first when a copy is known, then locally
    pub fn delete_alert_with_backend<B: AlertBackend + ?Sized>(
        &mut self,
        id: &str,
        backend: &B,
        session: &Session,
    ) -> Result<bool> {
        let remote_id = match self.user.find_alert(id) {
            Some(alert) => alert.remote_alert_id.clone(),
            None => return Ok(false),
        };
        if let Some(remote_id) = remote_id {
            backend.delete_alert(&session.user_id, &remote_id)?;
        }
        self.delete_alert(id)
    }

    pub fn delete_alert(&mut self, id: &str) -> Result<bool> {
        let before = self.user.alerts.len();
        self.user.alerts.retain(|a| a.id != id);
        let removed = self.user.alerts.len() != before;
        if removed {
            self.persist()?;
        }
        Ok(removed)
    }

    /// Edit a saved alert in place
    pub fn update_alert<F>(&mut self, id: &str, update: F) -> Result<()>
    where
        F: FnOnce(&mut Alert),
    {
        let alert = self
            .user
            .alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| NaaradError::AlertNotFound(id.to_string()))?;
        update(alert);
        self.persist()
    }

    pub fn update_user<F>(&mut self, update: F) -> Result<()>
    where
        F: FnOnce(&mut UserPreferences),
    {
        update(&mut self.user);
        self.persist()
    }

    /// Reset to defaults and forget the session
    pub fn logout(&mut self) -> Result<()> {
        self.user = UserPreferences::default();
        self.draft = None;
        self.kv.delete(SESSION_KEY)?;
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        self.kv
            .put(USER_PREFERENCES_KEY, &serde_json::to_string(&self.user)?)?;
        match &self.draft {
            Some(draft) => self.kv.put(ACTIVE_ALERT_KEY, &serde_json::to_string(draft)?),
            None => self.kv.delete(ACTIVE_ALERT_KEY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::CreatedAlert;
    use crate::db::MemoryStore;
    use crate::taxonomy::{CategoryId, CategoryKey};
    use chrono::TimeZone;
    use std::cell::RefCell;

    /// Backend double that records calls and hands out ids in order
    #[derive(Default)]
    struct FakeBackend {
        fail_create: bool,
        next_id: RefCell<u32>,
        created: RefCell<Vec<CreateAlertRequest>>,
        deleted: RefCell<Vec<(String, String)>>,
    }

    impl FakeBackend {
        fn failing() -> Self {
            Self {
                fail_create: true,
                ..Self::default()
            }
        }
    }

    impl AlertBackend for FakeBackend {
        fn create_alert(&self, request: &CreateAlertRequest) -> Result<CreatedAlert> {
            if self.fail_create {
                return Err(NaaradError::ApiError("Failed to create alert".into()));
            }
            self.created.borrow_mut().push(request.clone());
            let mut next = self.next_id.borrow_mut();
            *next += 1;
            Ok(CreatedAlert {
                alert_id: Some(format!("b{}", next)),
                message: Some("created".into()),
            })
        }

        fn delete_alert(&self, user_id: &str, alert_id: &str) -> Result<String> {
            self.deleted
                .borrow_mut()
                .push((user_id.to_string(), alert_id.to_string()));
            Ok("deleted".into())
        }
    }

    fn session() -> Session {
        Session {
            user_id: "42".into(),
            token: None,
        }
    }

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn test_dispatch_requires_draft() {
        let mut store = PreferenceStore::load(MemoryStore::new()).unwrap();
        let err = store
            .dispatch(Action::SelectMainCategory(CategoryId::News))
            .unwrap_err();
        assert!(matches!(err, NaaradError::NoActiveAlert));
    }

    #[test]
    fn test_every_dispatch_is_persisted() {
        let kv = MemoryStore::new();
        let mut store = PreferenceStore::load(&kv).unwrap();
        store.start_new_alert(at(1_000)).unwrap();
        store
            .dispatch(Action::SelectMainCategory(CategoryId::Sports))
            .unwrap();
        store
            .dispatch(Action::ToggleTag {
                category: CategoryKey::Sports,
                tag_id: "cricket_ipl".into(),
            })
            .unwrap();

        let reloaded = PreferenceStore::load(&kv).unwrap();
        let draft = reloaded.active_alert().unwrap();
        assert_eq!(draft.id, "new-1000");
        assert_eq!(draft.sports().selected_tags, vec!["cricket_ipl"]);
        assert_eq!(
            reloaded.navigation().unwrap().main,
            Some(CategoryId::Sports)
        );
    }

    #[test]
    fn test_save_appends_then_replaces() {
        let kv = MemoryStore::new();
        let mut store = PreferenceStore::load(&kv).unwrap();
        store.start_new_alert(at(1_000)).unwrap();
        let saved = store.save_active_alert(at(2_000)).unwrap();
        assert_eq!(saved.id, "alert-2000");
        assert_eq!(saved.name, "New Alert 1");
        assert!(store.active_alert().is_none());
        assert!(kv.get(ACTIVE_ALERT_KEY).unwrap().is_none());

        store.select_alert_for_editing("alert-2000").unwrap();
        store.dispatch(Action::Rename("Cricket".into())).unwrap();
        let resaved = store.save_active_alert(at(3_000)).unwrap();
        assert_eq!(resaved.id, "alert-2000");
        assert_eq!(store.user().alerts.len(), 1);
        assert_eq!(store.user().alerts[0].name, "Cricket");

        store.start_new_alert(at(4_000)).unwrap();
        assert_eq!(store.active_alert().unwrap().name, "New Alert 2");
    }

    #[test]
    fn test_save_without_draft_fails() {
        let mut store = PreferenceStore::load(MemoryStore::new()).unwrap();
        assert!(matches!(
            store.save_active_alert(at(1)),
            Err(NaaradError::NoActiveAlert)
        ));
        assert!(matches!(
            store.select_alert_for_editing("alert-9"),
            Err(NaaradError::AlertNotFound(_))
        ));
    }

    #[test]
    fn test_delete_update_and_logout() {
        let kv = MemoryStore::new();
        kv.put(SESSION_KEY, "{\"user_id\":\"7\"}").unwrap();
        let mut store = PreferenceStore::load(&kv).unwrap();
        store.start_new_alert(at(1)).unwrap();
        store.save_active_alert(at(2)).unwrap();
        store.start_new_alert(at(3)).unwrap();
        store.save_active_alert(at(4)).unwrap();

        store
            .update_alert("alert-2", |a| a.is_active = false)
            .unwrap();
        assert!(!store.user().alerts[0].is_active);

        assert!(store.delete_alert("alert-4").unwrap());
        assert!(!store.delete_alert("alert-4").unwrap());
        assert_eq!(store.user().alerts.len(), 1);

        store
            .update_user(|u| {
                u.email = "a@b.co".into();
                u.is_whats_app_confirmed = true;
            })
            .unwrap();
        store.start_new_alert(at(5)).unwrap();
        store.logout().unwrap();

        let reloaded = PreferenceStore::load(&kv).unwrap();
        assert_eq!(reloaded.user(), &UserPreferences::default());
        assert!(reloaded.active_alert().is_none());
        assert!(kv.get(SESSION_KEY).unwrap().is_none());
    }

    #[test]
    fn test_failed_submit_keeps_draft() {
        let kv = MemoryStore::new();
        let mut store = PreferenceStore::load(&kv).unwrap();
        store.start_new_alert(at(1)).unwrap();
        store
            .dispatch(Action::AddCustomInterestTag("Local bakeries".into()))
            .unwrap();

        let err = store
            .submit_active_alert(&FakeBackend::failing(), &session(), at(2))
            .unwrap_err();
        assert!(matches!(err, NaaradError::ApiError(_)));
        assert_eq!(store.active_alert().unwrap().id, "new-1");
        assert!(store.user().alerts.is_empty());

        let reloaded = PreferenceStore::load(&kv).unwrap();
        assert!(reloaded.active_alert().is_some());
        assert!(reloaded.user().alerts.is_empty());
    }

    #[test]
    fn test_resubmit_replaces_backend_copy() {
        let backend = FakeBackend::default();
        let mut store = PreferenceStore::load(MemoryStore::new()).unwrap();
        store.start_new_alert(at(1)).unwrap();
        store
            .dispatch(Action::AddCustomInterestTag("Board games".into()))
            .unwrap();

        let first = store.submit_active_alert(&backend, &session(), at(2)).unwrap();
        assert_eq!(first.alert.id, "alert-2");
        assert_eq!(first.alert.remote_alert_id.as_deref(), Some("b1"));
        assert_eq!(first.replaced_remote_id, None);
        assert_eq!(backend.created.borrow()[0].user_id, "42");
        assert!(backend.deleted.borrow().is_empty());

        store.select_alert_for_editing("alert-2").unwrap();
        store.dispatch(Action::Rename("Games".into())).unwrap();
        let second = store.submit_active_alert(&backend, &session(), at(3)).unwrap();
        assert_eq!(second.alert.id, "alert-2");
        assert_eq!(second.replaced_remote_id.as_deref(), Some("b1"));
        assert_eq!(
            *backend.deleted.borrow(),
            vec![("42".to_string(), "b1".to_string())]
        );

        let alerts = &store.user().alerts;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].remote_alert_id.as_deref(), Some("b2"));
    }

    #[test]
    fn test_local_delete_removes_backend_copy() {
        let backend = FakeBackend::default();
        let mut store = PreferenceStore::load(MemoryStore::new()).unwrap();
        store.start_new_alert(at(1)).unwrap();
        store.submit_active_alert(&backend, &session(), at(2)).unwrap();
        store.start_new_alert(at(3)).unwrap();
        store.save_active_alert(at(4)).unwrap();

        assert!(store
            .delete_alert_with_backend("alert-2", &backend, &session())
            .unwrap());
        // Never sent to the backend, so only removed locally
        assert!(store
            .delete_alert_with_backend("alert-4", &backend, &session())
            .unwrap());
        assert!(!store
            .delete_alert_with_backend("alert-9", &backend, &session())
            .unwrap());

        assert_eq!(
            *backend.deleted.borrow(),
            vec![("42".to_string(), "b1".to_string())]
        );
        assert!(store.user().alerts.is_empty());
    }

    #[test]
    fn test_discard_draft() {
        let kv = MemoryStore::new();
        let mut store = PreferenceStore::load(&kv).unwrap();
        store.start_new_alert(at(1)).unwrap();
        store.discard_draft().unwrap();
        assert!(store.active_alert().is_none());
        assert!(kv.get(ACTIVE_ALERT_KEY).unwrap().is_none());
    }
}
