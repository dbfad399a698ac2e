use indexmap::IndexMap;

use crate::models::{canonical_key, ReferenceDrug};

/// 参考药品索引: 规范化名称 -> 药品
///
/// 构建后只读。重复名称按后写覆盖处理 (保留首次出现的位置),
/// 这是一个已知的简化。
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    drugs: IndexMap<String, ReferenceDrug>,
    duplicates: usize,
    skipped: usize,
}

impl ReferenceIndex {
    pub fn build(drugs: impl IntoIterator<Item = ReferenceDrug>) -> Self {
        let mut index = Self::default();
        for drug in drugs {
            let key = drug.key();
            if key.is_empty() {
                index.skipped += 1;
                continue;
            }
            if let Some(previous) = index.drugs.insert(key, drug) {
                tracing::debug!("Duplicate reference drug '{}', keeping last entry", previous.name);
                index.duplicates += 1;
            }
        }
        index
    }

    /// 精确匹配 (忽略大小写和首尾空白)
    pub fn lookup(&self, drug_name: &str) -> Option<&ReferenceDrug> {
        self.drugs.get(&canonical_key(drug_name))
    }

    pub fn len(&self) -> usize {
        self.drugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drugs.is_empty()
    }

    /// 按目录顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &ReferenceDrug> {
        self.drugs.values()
    }

    pub fn duplicate_count(&self) -> usize {
        self.duplicates
    }

    /// 没有名称而被跳过的条目数
    pub fn skipped_count(&self) -> usize {
        self.skipped
    }
}
