use tokio::sync::RwLock;

use crate::models::SavedChoice;

/// In-memory list of suggestions the user kept, in the order they were saved
#[derive(Default)]
pub struct SavedChoiceStore {
    choices: RwLock<Vec<SavedChoice>>,
}

impl SavedChoiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the choice; returns `false` if the id is already saved
    pub async fn add(&self, choice: SavedChoice) -> bool {
        let mut choices = self.choices.write().await;
        if choices.iter().any(|c| c.id == choice.id) {
            return false;
        }
        choices.push(choice);
        true
    }

    /// Returns whether a choice with this id was removed
    pub async fn remove(&self, id: &str) -> bool {
        let mut choices = self.choices.write().await;
        let before = choices.len();
        choices.retain(|c| c.id != id);
        choices.len() != before
    }

    pub async fn all(&self) -> Vec<SavedChoice> {
        self.choices.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.choices.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.choices.read().await.is_empty()
    }
}
