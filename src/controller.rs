//!
//! src/controller.rs
//!
//! Application controller between whatever front end is attached and
//! the track store. Owns the current screen and the confirmation state
//! machine:
//!
//!   Idle --request--> Pending(action) --confirm--> Idle (committed)
//!                                     --cancel---> Idle (cancelled)
//!

use std::mem;

use tracing::{debug, info, warn};

use crate::errors::CatalogError;
use crate::form::{ListEntry, TrackForm};
use crate::persistent::TrackStore;
use crate::types::{SortKey, TrackId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    List,
    AddTrack,
    EditTrack(TrackId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    Delete(TrackId),
    Update(TrackId, TrackForm),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Confirmation {
    #[default]
    Idle,
    Pending(PendingAction),
}

/// What the front end should do after an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The store changed; redraw the list
    Refresh { id: TrackId },
    /// Ask the user the question, then call `confirm` or `cancel`
    AwaitingConfirmation(String),
    Cancelled,
    /// Nothing changed; show the message
    Notice(String),
}

pub struct AppController {
    store: TrackStore,
    screen: Screen,
    confirmation: Confirmation,
}

impl AppController {
    pub fn new(store: TrackStore) -> Self {
        Self {
            store,
            screen: Screen::List,
            confirmation: Confirmation::Idle,
        }
    }

    pub fn store(&self) -> &TrackStore {
        &self.store
    }

    #[cfg(test)]
    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn confirmation(&self) -> &Confirmation {
        &self.confirmation
    }

    /// Identifier of the track whose edit form is open
    pub fn edit_target(&self) -> Option<TrackId> {
        match self.screen {
            Screen::EditTrack(id) => Some(id),
            _ => None,
        }
    }

    pub fn entries(&self, sort: SortKey) -> Vec<ListEntry> {
        self.store
            .sorted(sort)
            .into_iter()
            .map(ListEntry::from_track)
            .collect()
    }

    pub fn open_add(&mut self) -> TrackForm {
        self.screen = Screen::AddTrack;
        TrackForm::default()
    }

    /// Opens the edit form pre-filled from `id`; stays on the list when
    /// there is no such track
    pub fn open_edit(&mut self, id: TrackId) -> Option<TrackForm> {
        let Some(track) = self.store.get(id) else {
            warn!(id = %id, "controller.edit.missing");
            return None;
        };
        let form = TrackForm::from_track(track);
        self.screen = Screen::EditTrack(id);
        debug!(id = %id, "controller.edit.open");
        Some(form)
    }

    pub fn close_form(&mut self) {
        self.screen = Screen::List;
    }

    pub fn submit_new(&mut self, form: TrackForm) -> Result<Outcome, CatalogError> {
        let id = self.store.add(form.into_fields(), None)?;
        self.screen = Screen::List;
        Ok(Outcome::Refresh { id })
    }

    /// Stages the open edit form for confirmation
    pub fn submit_edit(&mut self, form: TrackForm) -> Outcome {
        let Some(id) = self.edit_target() else {
            return Outcome::Notice("no track is being edited".to_string());
        };
        self.stage(PendingAction::Update(id, form))
    }

    /// Writes an edit straight through, keeping the identifier
    pub fn submit_edit_for(
        &mut self,
        id: TrackId,
        form: TrackForm,
    ) -> Result<Outcome, CatalogError> {
        match self.store.update(id, form.into_fields()) {
            Ok(()) => {
                self.screen = Screen::List;
                Ok(Outcome::Refresh { id })
            }
            Err(CatalogError::NotFound(id)) => {
                self.screen = Screen::List;
                Ok(Self::missing(id))
            }
            Err(e) => Err(e),
        }
    }

    pub fn request_delete(&mut self, id: TrackId) -> Outcome {
        if !self.store.contains(id) {
            return Self::missing(id);
        }
        self.stage(PendingAction::Delete(id))
    }

    pub fn delete_track(&mut self, id: TrackId) -> Result<Outcome, CatalogError> {
        match self.store.delete(id) {
            Ok(_) => {
                if self.edit_target() == Some(id) {
                    self.screen = Screen::List;
                }
                Ok(Outcome::Refresh { id })
            }
            Err(CatalogError::NotFound(id)) => Ok(Self::missing(id)),
            Err(e) => Err(e),
        }
    }

    /// Commits the pending action. The machine is idle again afterwards,
    /// whether or not the commit succeeded.
    pub fn confirm(&mut self) -> Result<Outcome, CatalogError> {
        match mem::take(&mut self.confirmation) {
            Confirmation::Idle => Ok(Outcome::Notice("nothing to confirm".to_string())),
            Confirmation::Pending(action) => {
                info!(action = ?action_name(&action), "controller.confirm");
                match action {
                    PendingAction::Delete(id) => self.delete_track(id),
                    PendingAction::Update(id, form) => self.submit_edit_for(id, form),
                }
            }
        }
    }

    pub fn cancel(&mut self) -> Outcome {
        match mem::take(&mut self.confirmation) {
            Confirmation::Idle => Outcome::Notice("nothing to cancel".to_string()),
            Confirmation::Pending(action) => {
                info!(action = ?action_name(&action), "controller.cancel");
                Outcome::Cancelled
            }
        }
    }

    fn stage(&mut self, action: PendingAction) -> Outcome {
        let question = match &action {
            PendingAction::Delete(id) => format!("delete {}?", self.describe(*id)),
            PendingAction::Update(id, _) => format!("save changes to {}?", self.describe(*id)),
        };
        if let Confirmation::Pending(replaced) = &self.confirmation {
            debug!(replaced = ?action_name(replaced), "controller.pending.replaced");
        }
        self.confirmation = Confirmation::Pending(action);
        Outcome::AwaitingConfirmation(question)
    }

    fn describe(&self, id: TrackId) -> String {
        match self.store.get(id) {
            Some(track) => format!("\"{} - {}\"", track.fields.record, track.fields.track),
            None => format!("track {id}"),
        }
    }

    fn missing(id: TrackId) -> Outcome {
        warn!(id = %id, "controller.track.missing");
        Outcome::Notice(format!("track {id} no longer exists"))
    }
}

fn action_name(action: &PendingAction) -> (&'static str, TrackId) {
    match action {
        PendingAction::Delete(id) => ("delete", *id),
        PendingAction::Update(id, _) => ("update", *id),
    }
}
