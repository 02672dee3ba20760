use crate::models::{LandedCostItem, TagTable};

/// 选出标签等于 `tag` 的明细，保持原顺序
pub fn select_by_tag<'a>(
    items: &'a [LandedCostItem],
    tags: &TagTable,
    tag: &str,
) -> Vec<&'a LandedCostItem> {
    items
        .iter()
        .filter(|item| tags.get(&item.item_code).is_some_and(|t| t == tag))
        .collect()
}
