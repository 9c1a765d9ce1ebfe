//! 多会话隔离：每个会话一个编排器，同一会话上的操作串行执行

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::error::AnalysisError;
use crate::generator::chat::ChatAssistant;
use crate::generator::orchestrator::StagedOrchestrator;

/// 单个会话的全部状态
pub struct Session {
    pub orchestrator: StagedOrchestrator,
    pub chat: ChatAssistant,
}

/// 会话注册表
///
/// 同一会话正在执行操作时，新的请求直接返回 `SessionBusy`，不排队。
#[derive(Default, Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<Mutex<Session>>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册新会话，返回会话ID
    pub async fn create(&self, orchestrator: StagedOrchestrator) -> Uuid {
        let id = Uuid::new_v4();
        let session = Session {
            orchestrator,
            chat: ChatAssistant::new(),
        };
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(session)));
        debug!(session = %id, "session created");
        id
    }

    /// 独占获取会话
    pub async fn acquire(&self, id: Uuid) -> Result<OwnedMutexGuard<Session>, AnalysisError> {
        let session = self
            .sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AnalysisError::UnknownSession(id.to_string()))?;

        session
            .try_lock_owned()
            .map_err(|_| AnalysisError::SessionBusy(id.to_string()))
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BudgetConfig, LLMConfig};
    use crate::llm::client::LLMClient;
    use crate::llm::client::testing::{Scripted, ScriptedTransport};

    fn orchestrator(transport: &Arc<ScriptedTransport>) -> StagedOrchestrator {
        let mut orchestrator = StagedOrchestrator::new(
            LLMClient::with_transport(transport.clone()),
            LLMConfig::default(),
            BudgetConfig::default(),
        );
        orchestrator.set_credentials("deepseek", "test");
        orchestrator
    }

    #[tokio::test]
    async fn test_busy_session_is_rejected() {
        let transport = ScriptedTransport::new(vec![]);
        let registry = SessionRegistry::new();
        let id = registry.create(orchestrator(&transport)).await;

        let guard = registry.acquire(id).await.unwrap();
        assert!(matches!(
            registry.acquire(id).await,
            Err(AnalysisError::SessionBusy(_))
        ));

        drop(guard);
        assert!(registry.acquire(id).await.is_ok());
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let transport = ScriptedTransport::new(vec![Scripted::content(
            r#"{"name":"ACME Corp","countryOrRegion":"China","industry":"AI","isHighTech":true,"shortDescription":"AI startup"}"#,
        )]);
        let registry = SessionRegistry::new();
        let first = registry.create(orchestrator(&transport)).await;
        let second = registry.create(orchestrator(&transport)).await;

        {
            let mut session = registry.acquire(first).await.unwrap();
            session
                .orchestrator
                .start_staged_analysis("ACME Corp")
                .await
                .unwrap();
        }

        // 另一个会话不受影响，且可以同时持有
        let a = registry.acquire(first).await.unwrap();
        let b = registry.acquire(second).await.unwrap();
        assert!(a.orchestrator.company_profile().is_some());
        assert!(b.orchestrator.company_profile().is_none());
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let registry = SessionRegistry::new();
        let id = Uuid::new_v4();

        assert!(matches!(
            registry.acquire(id).await,
            Err(AnalysisError::UnknownSession(_))
        ));
        assert!(!registry.remove(id).await);
        assert!(registry.is_empty().await);
    }
}
