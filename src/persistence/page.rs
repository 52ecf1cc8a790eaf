use serde::Serialize;

/// One window of query results together with the total match count
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<K> {
    pub items: Vec<K>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

impl<K> Page<K> {
    pub fn has_next(&self) -> bool {
        self.offset.saturating_add(self.items.len() as u64) < self.total
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
