use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub item_id: String,
    pub owner_id: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// 进程内的条目集合，按所有者隔离
#[derive(Debug, Clone, Default)]
pub struct ItemStore {
    items: Arc<RwLock<Vec<Item>>>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn list(&self, owner_id: &str) -> Vec<Item> {
        let items = self.items.read().await;
        items
            .iter()
            .filter(|i| i.owner_id == owner_id)
            .cloned()
            .collect()
    }

    pub async fn find(&self, owner_id: &str, item_id: &str) -> Option<Item> {
        let items = self.items.read().await;
        items
            .iter()
            .find(|i| i.owner_id == owner_id && i.item_id == item_id)
            .cloned()
    }

    pub async fn create(&self, owner_id: &str, req: CreateItemRequest) -> Item {
        let item = Item {
            item_id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            name: req.name,
            description: req.description,
            created_at: Utc::now(),
        };
        self.items.write().await.push(item.clone());
        item
    }

    /// 删除成功返回被删除的条目
    pub async fn remove(&self, owner_id: &str, item_id: &str) -> Option<Item> {
        let mut items = self.items.write().await;
        let index = items
            .iter()
            .position(|i| i.owner_id == owner_id && i.item_id == item_id)?;
        Some(items.remove(index))
    }
}
