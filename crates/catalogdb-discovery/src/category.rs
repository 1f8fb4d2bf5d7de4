//! Category tree helpers over parent pointers.
//!
//! All traversals are iterative or guarded by a visited set, so a corrupted
//! parent chain cannot loop forever.

use std::collections::{HashMap, HashSet, VecDeque};

use catalogdb_core::traits::CatalogStore;
use catalogdb_core::types::{Category, CategoryId, CategoryNode};
use catalogdb_core::{Error, Result};

/// `root` plus every category below it, breadth-first.
pub fn descendant_category_ids(store: &dyn CatalogStore, root: &CategoryId) -> Result<Vec<CategoryId>> {
    let mut out = vec![root.clone()];
    let mut visited: HashSet<CategoryId> = HashSet::from([root.clone()]);
    let mut queue = VecDeque::from([root.clone()]);
    while let Some(current) = queue.pop_front() {
        for child in store.child_categories(&current).map_err(Error::from_store)? {
            if visited.insert(child.id.clone()) {
                out.push(child.id.clone());
                queue.push_back(child.id);
            }
        }
    }
    Ok(out)
}

/// True when making `new_parent` the parent of `id` would close a loop.
pub fn would_create_cycle(store: &dyn CatalogStore, id: &str, new_parent: &str) -> Result<bool> {
    let mut visited = HashSet::new();
    let mut current = Some(new_parent.to_string());
    while let Some(cid) = current {
        if cid == id { return Ok(true); }
        if !visited.insert(cid.clone()) { return Ok(false); }
        current = store.get_category(&cid).map_err(Error::from_store)?.and_then(|c| c.parent_id);
    }
    Ok(false)
}

/// Nest categories under their parents, keeping input order at each level.
/// A category whose parent is not in `categories` is dropped with its subtree.
pub fn build_category_tree(categories: Vec<Category>) -> Vec<CategoryNode> {
    let known: HashSet<CategoryId> = categories.iter().map(|c| c.id.clone()).collect();
    let mut children: HashMap<CategoryId, Vec<Category>> = HashMap::new();
    let mut roots = Vec::new();
    for category in categories {
        match &category.parent_id {
            None => roots.push(category),
            Some(parent) if known.contains(parent) => children.entry(parent.clone()).or_default().push(category),
            Some(_) => {}
        }
    }
    let mut visited = HashSet::new();
    roots.into_iter().filter_map(|root| attach_children(root, &mut children, &mut visited)).collect()
}

fn attach_children(
    category: Category,
    children: &mut HashMap<CategoryId, Vec<Category>>,
    visited: &mut HashSet<CategoryId>,
) -> Option<CategoryNode> {
    if !visited.insert(category.id.clone()) { return None; }
    let kids = children.remove(&category.id).unwrap_or_default();
    let subcategories = kids.into_iter().filter_map(|c| attach_children(c, children, visited)).collect();
    Some(CategoryNode { category, subcategories })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn cat(id: &str, parent: Option<&str>) -> Category {
        Category {
            id: id.into(),
            name: id.into(),
            description: None,
            parent_id: parent.map(Into::into),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn tree_nests_and_drops_orphans() {
        let tree = build_category_tree(vec![
            cat("root", None),
            cat("a", Some("root")),
            cat("b", Some("a")),
            cat("orphan", Some("inactive-parent")),
            cat("other", None),
        ]);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].category.id, "root");
        assert_eq!(tree[0].subcategories[0].category.id, "a");
        assert_eq!(tree[0].subcategories[0].subcategories[0].category.id, "b");
        assert_eq!(tree[1].category.id, "other");
        assert!(tree[1].subcategories.is_empty());
    }

    #[test]
    fn cyclic_parents_never_reach_a_root() {
        let tree = build_category_tree(vec![cat("x", Some("y")), cat("y", Some("x"))]);
        assert!(tree.is_empty());
    }
}
