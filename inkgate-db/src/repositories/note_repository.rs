use anyhow::Result;
use inkgate_core::Note;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory notebook backing the MCP tools.
#[derive(Default)]
pub struct NoteRepository {
    notes: RwLock<HashMap<String, Note>>,
}

impl NoteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, title: String, content: String) -> Result<Note> {
        let note = Note::new(title, content);
        self.notes
            .write()
            .await
            .insert(note.id.clone(), note.clone());
        Ok(note)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Note>> {
        Ok(self.notes.read().await.get(id).cloned())
    }

    /// Oldest first.
    pub async fn list(&self) -> Result<Vec<Note>> {
        let mut notes: Vec<Note> = self.notes.read().await.values().cloned().collect();
        notes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(notes)
    }

    pub async fn update(
        &self,
        id: &str,
        title: Option<String>,
        content: Option<String>,
    ) -> Result<Option<Note>> {
        let mut notes = self.notes.write().await;
        Ok(notes.get_mut(id).map(|note| {
            note.update(title, content);
            note.clone()
        }))
    }
}
