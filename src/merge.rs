use crate::document::{Document, Mapping};

/// Merge `update` on top of `base`, returning a new document.
pub fn merge(base: &Document, update: &Document) -> Document {
    match (base, update) {
        (Document::Object(base_map), Document::Object(update_map)) => {
            Document::Object(merge_mappings(base_map, update_map))
        }
        (_, update) => update.clone(),
    }
}

/// Mapping form of [`merge`]. Keys only in `base` keep their position; new
/// keys from `update` are appended in update order.
pub fn merge_mappings(base: &Mapping, update: &Mapping) -> Mapping {
    let mut merged = base.clone();

    for (key, update_value) in update {
        let value = match (merged.get(key), update_value) {
            (Some(Document::Object(base_nested)), Document::Object(update_nested)) => {
                Document::Object(merge_mappings(base_nested, update_nested))
            }
            _ => update_value.clone(),
        };
        merged.insert(key.clone(), value);
    }

    merged
}
