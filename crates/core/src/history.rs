use crate::models::{Answer, Confidence};
use crate::PersistenceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Bot,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: MessageRole::User,
            content: content.into(),
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    pub fn bot(answer: &Answer, query: &str, namespace: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: MessageRole::Bot,
            content: answer.answer.clone(),
            timestamp: Utc::now(),
            metadata: Some(MessageMetadata {
                confidence: Some(answer.confidence),
                sources: answer.sources.clone(),
                query: Some(query.to_string()),
                namespace: Some(namespace.to_string()),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: Uuid,
    pub title: String,
    pub namespace: String,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosted_url: Option<String>,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

impl Conversation {
    pub fn new(namespace: &str, filename: &str) -> Self {
        let now = Utc::now();
        let title = filename
            .strip_suffix(".pdf")
            .or_else(|| filename.strip_suffix(".PDF"))
            .unwrap_or(filename)
            .to_string();
        Self {
            id: Uuid::new_v4(),
            title,
            namespace: namespace.to_string(),
            filename: filename.to_string(),
            hosted_url: None,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            is_active: true,
        }
    }
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn find_or_create(
        &self,
        namespace: &str,
        filename: &str,
    ) -> Result<Conversation, PersistenceError>;

    async fn save(&self, conversation: &Conversation) -> Result<(), PersistenceError>;

    async fn append_message(
        &self,
        namespace: &str,
        filename: &str,
        message: Message,
    ) -> Result<(), PersistenceError> {
        let mut conversation = self.find_or_create(namespace, filename).await?;
        conversation.messages.push(message);
        conversation.updated_at = Utc::now();
        self.save(&conversation).await
    }
}

pub struct JsonConversationStore {
    root: PathBuf,
}

impl JsonConversationStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, namespace: &str) -> Result<PathBuf, PersistenceError> {
        let valid = !namespace.is_empty()
            && namespace
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
        if !valid {
            return Err(PersistenceError::PersistenceFailed(format!(
                "namespace {namespace:?} cannot be used as a file name"
            )));
        }
        Ok(self.root.join(format!("{namespace}.json")))
    }
}

#[async_trait]
impl ConversationStore for JsonConversationStore {
    async fn find_or_create(
        &self,
        namespace: &str,
        filename: &str,
    ) -> Result<Conversation, PersistenceError> {
        let path = self.path_for(namespace)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                let conversation = Conversation::new(namespace, filename);
                self.save(&conversation).await?;
                Ok(conversation)
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn save(&self, conversation: &Conversation) -> Result<(), PersistenceError> {
        let path = self.path_for(&conversation.namespace)?;
        tokio::fs::create_dir_all(&self.root).await?;
        let encoded = serde_json::to_vec_pretty(conversation)?;
        tokio::fs::write(&path, encoded).await?;
        Ok(())
    }
}

/// Saves a question and its answer. Failures are logged and swallowed so
/// history never blocks the answer itself.
pub async fn record_exchange<S>(
    store: &S,
    namespace: &str,
    filename: &str,
    query: &str,
    answer: &Answer,
) where
    S: ConversationStore + ?Sized,
{
    let messages = [Message::user(query), Message::bot(answer, query, namespace)];
    for message in messages {
        if let Err(error) = store.append_message(namespace, filename, message).await {
            warn!(namespace, %error, "failed to save chat history");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn answer() -> Answer {
        Answer {
            answer: "Chlorophyll.".to_string(),
            confidence: Confidence::Medium,
            sources: vec!["biology.pdf".to_string()],
        }
    }

    #[tokio::test]
    async fn exchanges_are_appended_to_one_conversation() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = JsonConversationStore::new(dir.path());

        record_exchange(&store, "biology_1", "biology.pdf", "What absorbs light?", &answer()).await;
        record_exchange(&store, "biology_1", "biology.pdf", "And then?", &answer()).await;

        let conversation = store.find_or_create("biology_1", "biology.pdf").await?;
        assert_eq!(conversation.title, "biology");
        assert_eq!(conversation.messages.len(), 4);
        assert_eq!(conversation.messages[0].role, MessageRole::User);
        assert_eq!(conversation.messages[1].role, MessageRole::Bot);
        let metadata = conversation.messages[1].metadata.clone().unwrap_or_default();
        assert_eq!(metadata.confidence, Some(Confidence::Medium));
        assert_eq!(metadata.query.as_deref(), Some("What absorbs light?"));
        Ok(())
    }

    #[tokio::test]
    async fn path_like_namespaces_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = JsonConversationStore::new(dir.path());

        let result = store.find_or_create("../escape", "x.pdf").await;
        assert!(matches!(result, Err(PersistenceError::PersistenceFailed(_))));
        Ok(())
    }

    #[tokio::test]
    async fn persistence_failures_do_not_propagate() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file")?;
        let store = JsonConversationStore::new(blocker.join("history"));

        record_exchange(&store, "biology_1", "biology.pdf", "q", &answer()).await;
        Ok(())
    }
}
