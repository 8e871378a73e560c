use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn new(title: String, content: String) -> Self {
        let now = Utc::now();
        let suffix: u64 = rand::thread_rng().gen();
        Self {
            id: format!("note_{:016x}", suffix),
            title,
            content,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn update(&mut self, title: Option<String>, content: Option<String>) {
        if let Some(title) = title {
            self.title = title;
        }
        if let Some(content) = content {
            self.content = content;
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_note() {
        let note = Note::new("Groceries".to_string(), "eggs".to_string());
        assert!(note.id.starts_with("note_"));
        assert_eq!(note.id.len(), "note_".len() + 16);
        assert_eq!(note.created_at, note.updated_at);
    }

    #[test]
    fn test_partial_update_keeps_other_fields() {
        let mut note = Note::new("Groceries".to_string(), "eggs".to_string());
        note.update(None, Some("eggs, milk".to_string()));

        assert_eq!(note.title, "Groceries");
        assert_eq!(note.content, "eggs, milk");
        assert!(note.updated_at >= note.created_at);
    }
}
