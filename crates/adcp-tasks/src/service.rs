// SPDX-License-Identifier: MIT OR Apache-2.0
//! Task lifecycle service.
//!
//! Tasks live in memory for the synchronous protocol surface (`tasks/get`,
//! `tasks/cancel`) and are mirrored into the store for durability. State
//! changes emit protocol webhooks when the task carries a push config.

use crate::webhook::WebhookSender;
use adcp_core::task::{webhook_payload, PushNotificationConfig, Task, TaskState, TaskStatus};
use adcp_store::models::TaskRow;
use adcp_store::Store;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// Owns protocol tasks and their webhook notifications.
pub struct TaskService {
    store: Arc<dyn Store>,
    webhooks: WebhookSender,
    tasks: RwLock<HashMap<String, Task>>,
    counter: AtomicU64,
}

impl TaskService {
    /// New service over a store and webhook sender.
    pub fn new(store: Arc<dyn Store>, webhooks: WebhookSender) -> Self {
        Self {
            store,
            webhooks,
            tasks: RwLock::new(HashMap::new()),
            counter: AtomicU64::new(0),
        }
    }

    /// The webhook sender, shared with the schedulers.
    #[must_use]
    pub fn webhooks(&self) -> &WebhookSender {
        &self.webhooks
    }

    /// Create a `working` task and persist it.
    pub async fn create_task(
        &self,
        tenant_id: &str,
        context_id: Option<String>,
        skills_requested: Vec<String>,
        invocation_type: &str,
        push_notification_config: Option<PushNotificationConfig>,
    ) -> Task {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let task_id = format!("task_{seq}");
        let context_id = context_id.unwrap_or_else(|| format!("ctx_{task_id}"));

        let mut task = Task::working(&task_id, &context_id);
        task.metadata = Some(serde_json::json!({
            "invocation_type": invocation_type,
            "skills_requested": skills_requested,
        }));

        self.tasks.write().await.insert(task_id.clone(), task.clone());

        let now = Utc::now();
        let row = TaskRow {
            tenant_id: tenant_id.to_string(),
            task_id,
            context_id,
            state: TaskState::Working,
            skills_requested,
            invocation_type: invocation_type.to_string(),
            push_notification_config,
            created_at: now,
            updated_at: now,
        };
        if let Err(err) = self.store.save_task(row).await {
            warn!(error = %err, "failed to persist task");
        }

        task
    }

    /// Store the final shape of a task (artifacts included).
    pub async fn finalize(&self, tenant_id: &str, task: &Task) {
        self.tasks
            .write()
            .await
            .insert(task.id.clone(), task.clone());
        if let Err(err) = self
            .store
            .update_task_state(tenant_id, &task.id, task.status.state)
            .await
        {
            warn!(error = %err, task_id = %task.id, "failed to persist task state");
        }
    }

    /// `tasks/get`.
    pub async fn get(&self, task_id: &str) -> Option<Task> {
        self.tasks.read().await.get(task_id).cloned()
    }

    /// `tasks/cancel`: transitions in-memory state to `canceled`.
    /// Already-dispatched adapter operations are not forcibly aborted.
    pub async fn cancel(&self, tenant_id: &str, task_id: &str) -> Option<Task> {
        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(task_id)?;
        task.status = TaskStatus::now(TaskState::Canceled);
        let snapshot = task.clone();
        drop(tasks);

        if let Err(err) = self
            .store
            .update_task_state(tenant_id, task_id, TaskState::Canceled)
            .await
        {
            warn!(error = %err, task_id, "failed to persist cancellation");
        }
        Some(snapshot)
    }

    /// Emit the protocol webhook for a task state change, when the task
    /// carries a push config. Failures never propagate.
    pub async fn notify(
        &self,
        task: &Task,
        config: Option<&PushNotificationConfig>,
        result: Option<Value>,
        task_type: Option<&str>,
    ) {
        let Some(config) = config else { return };
        let payload = webhook_payload(&task.id, &task.context_id, task.status.state, result);
        self.webhooks.send(config, &payload, task_type).await;
    }
}
