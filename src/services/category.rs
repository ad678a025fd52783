use crate::{
    error::{AppError, AppResult},
    models::{category, post, Category, CategoryModel},
    services::cache::CacheService,
    services::retry::read_with_retry,
    utils::slugify,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, Statement, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

const CACHE_KEY_CATEGORY_TREE: &str = "categories:tree";
const CACHE_TTL_CATEGORIES: u64 = 300; // 5 minutes

/// A category with its computed children and published-post count. Counts
/// are per category, not rolled up to ancestors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryNode {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<i32>,
    pub order_index: i32,
    pub post_count: i64,
    pub children: Vec<CategoryNode>,
}

impl utoipa::ToSchema for CategoryNode {
    fn name() -> std::borrow::Cow<'static, str> {
        "CategoryNode".into()
    }
}

impl utoipa::PartialSchema for CategoryNode {
    fn schema() -> utoipa::openapi::RefOr<utoipa::openapi::schema::Schema> {
        use utoipa::openapi::schema::{ObjectBuilder, Schema, Type};
        utoipa::openapi::RefOr::T(Schema::Object(
            ObjectBuilder::new()
                .schema_type(Type::Object)
                .property("id", i32::schema())
                .property("name", String::schema())
                .property("slug", String::schema())
                .property("parent_id", Option::<i32>::schema())
                .property("order_index", i32::schema())
                .property("post_count", i64::schema())
                .property(
                    "children",
                    utoipa::openapi::schema::ArrayBuilder::new()
                        .items(utoipa::openapi::Ref::from_schema_name("CategoryNode"))
                        .build(),
                )
                .required("id")
                .required("name")
                .required("slug")
                .required("order_index")
                .required("post_count")
                .required("children")
                .build(),
        ))
    }
}

impl From<CategoryModel> for CategoryNode {
    fn from(c: CategoryModel) -> Self {
        Self {
            id: c.id,
            name: c.name,
            slug: c.slug,
            parent_id: c.parent_id,
            order_index: c.order_index,
            post_count: 0,
            children: Vec::new(),
        }
    }
}

/// Assemble a forest from a flat, already-ordered category list.
///
/// Relative input order is preserved among roots and among siblings. A
/// `parent_id` that matches no record in the list demotes that record to
/// root. Stored parent cycles (including self-references) are broken by
/// demoting the first member of the cycle in input order; the remaining
/// members keep their parent links, so no record is ever dropped or
/// duplicated.
pub fn build_tree(
    records: Vec<CategoryModel>,
    counts: &HashMap<i32, i64>,
) -> Vec<CategoryNode> {
    let known: HashSet<i32> = records.iter().map(|c| c.id).collect();
    let parent_of: HashMap<i32, Option<i32>> =
        records.iter().map(|c| (c.id, c.parent_id)).collect();

    let mut demoted: HashSet<i32> = HashSet::new();
    for rec in &records {
        let mut cur = rec.parent_id;
        let mut hops = 0;
        while let Some(pid) = cur {
            if pid == rec.id {
                demoted.insert(rec.id);
                break;
            }
            if !known.contains(&pid) || demoted.contains(&pid) {
                break;
            }
            cur = parent_of.get(&pid).copied().flatten();
            // Chain longer than the record count means we are orbiting a
            // cycle this record is not part of; a later iteration demotes
            // the cycle itself.
            hops += 1;
            if hops > records.len() {
                break;
            }
        }
    }

    let mut children_map: HashMap<Option<i32>, Vec<i32>> = HashMap::new();
    for rec in &records {
        let effective_parent = match rec.parent_id {
            Some(pid) if !demoted.contains(&rec.id) && known.contains(&pid) => Some(pid),
            _ => None,
        };
        children_map.entry(effective_parent).or_default().push(rec.id);
    }

    let mut nodes: HashMap<i32, CategoryNode> = records
        .into_iter()
        .map(|rec| {
            let mut node = CategoryNode::from(rec);
            node.post_count = counts.get(&node.id).copied().unwrap_or(0);
            (node.id, node)
        })
        .collect();

    fn attach_children(
        node_id: i32,
        nodes: &mut HashMap<i32, CategoryNode>,
        children_map: &HashMap<Option<i32>, Vec<i32>>,
    ) -> Option<CategoryNode> {
        let mut node = nodes.remove(&node_id)?;
        if let Some(child_ids) = children_map.get(&Some(node_id)) {
            for &child_id in child_ids {
                if nodes.contains_key(&child_id) {
                    if let Some(child) = attach_children(child_id, nodes, children_map) {
                        node.children.push(child);
                    }
                }
            }
        }
        Some(node)
    }

    let root_ids = children_map.get(&None).cloned().unwrap_or_default();
    root_ids
        .into_iter()
        .filter_map(|id| attach_children(id, &mut nodes, &children_map))
        .collect()
}

pub struct CategoryService {
    db: DatabaseConnection,
    cache: Option<CacheService>,
}

impl CategoryService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db, cache: None }
    }

    pub fn with_cache(mut self, cache: CacheService) -> Self {
        self.cache = Some(cache);
        self
    }

    /// The annotated category tree. Cached; rebuilt from two store reads
    /// (category list + one grouped count query). Either read failing fails
    /// the whole call — no partially annotated tree is ever returned.
    pub async fn tree(&self) -> AppResult<Vec<CategoryNode>> {
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get::<Vec<CategoryNode>>(CACHE_KEY_CATEGORY_TREE).await {
                return Ok(cached);
            }
        }

        let records = read_with_retry(|| self.fetch_all()).await?;
        let counts = read_with_retry(|| self.count_published_by_category()).await?;
        let tree = build_tree(records, &counts);

        if let Some(cache) = &self.cache {
            cache
                .set(CACHE_KEY_CATEGORY_TREE, &tree, CACHE_TTL_CATEGORIES)
                .await;
        }

        Ok(tree)
    }

    /// Flat list ordered by `order_index`, no annotation.
    pub async fn list(&self) -> AppResult<Vec<CategoryModel>> {
        read_with_retry(|| self.fetch_all()).await
    }

    async fn fetch_all(&self) -> AppResult<Vec<CategoryModel>> {
        let categories = Category::find()
            .order_by_asc(category::Column::OrderIndex)
            .all(&self.db)
            .await?;
        Ok(categories)
    }

    /// Published-post counts per category, one grouped query. Draft and
    /// private posts are excluded, as are scheduled posts not yet visible.
    async fn count_published_by_category(&self) -> AppResult<HashMap<i32, i64>> {
        let rows = self
            .db
            .query_all(Statement::from_sql_and_values(
                sea_orm::DatabaseBackend::Postgres,
                "SELECT category_id, COUNT(*) AS count FROM posts \
                    WHERE status = $1 AND category_id IS NOT NULL \
                    AND (published_at IS NULL OR published_at <= CURRENT_TIMESTAMP) \
                    GROUP BY category_id",
                vec![post::STATUS_PUBLISHED.into()],
            ))
            .await?;

        let mut counts = HashMap::new();
        for row in rows {
            let category_id: i32 = row.try_get_by_index(0)?;
            let count: i64 = row.try_get_by_index(1)?;
            counts.insert(category_id, count);
        }

        Ok(counts)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<CategoryModel> {
        Category::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Exact slug match first; falls back to matching by name for links
    /// minted before slugs existed.
    pub async fn get_by_slug_or_name(&self, key: &str) -> AppResult<CategoryModel> {
        let by_slug = Category::find()
            .filter(category::Column::Slug.eq(key))
            .one(&self.db)
            .await?;

        if let Some(found) = by_slug {
            return Ok(found);
        }

        Category::find()
            .filter(category::Column::Name.eq(key))
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn create(
        &self,
        name: &str,
        slug: Option<String>,
        parent_id: Option<i32>,
        order_index: i32,
    ) -> AppResult<CategoryModel> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation(
                "Category name cannot be empty".to_string(),
            ));
        }

        let slug = slugify(slug.as_deref().unwrap_or(name));
        if slug.is_empty() {
            return Err(AppError::Validation(
                "Category name does not yield a usable slug".to_string(),
            ));
        }

        if let Some(pid) = parent_id {
            Category::find_by_id(pid)
                .one(&self.db)
                .await?
                .ok_or_else(|| {
                    AppError::Validation("Parent category does not exist".to_string())
                })?;
        }

        self.ensure_slug_free(&slug, None).await?;

        let now = chrono::Utc::now().naive_utc();
        let new_category = category::ActiveModel {
            name: Set(name.to_string()),
            slug: Set(slug),
            parent_id: Set(parent_id),
            order_index: Set(order_index),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let created = new_category.insert(&self.db).await?;
        self.invalidate_tree_cache().await;
        Ok(created)
    }

    /// Rename a category. The slug is re-derived from the new name unless
    /// the caller pins one explicitly.
    pub async fn rename(
        &self,
        id: i32,
        name: &str,
        slug: Option<String>,
    ) -> AppResult<CategoryModel> {
        let existing = self.get_by_id(id).await?;

        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation(
                "Category name cannot be empty".to_string(),
            ));
        }

        let slug = slugify(slug.as_deref().unwrap_or(name));
        if slug.is_empty() {
            return Err(AppError::Validation(
                "Category name does not yield a usable slug".to_string(),
            ));
        }

        self.ensure_slug_free(&slug, Some(id)).await?;

        let mut active: category::ActiveModel = existing.into();
        active.name = Set(name.to_string());
        active.slug = Set(slug);
        active.updated_at = Set(chrono::Utc::now().naive_utc());

        let updated = active.update(&self.db).await?;
        self.invalidate_tree_cache().await;
        Ok(updated)
    }

    /// Move a category under a new parent (or to root with `None`). Rejects
    /// moves that would create a cycle by walking the proposed parent's
    /// ancestor chain.
    pub async fn reparent(&self, id: i32, new_parent_id: Option<i32>) -> AppResult<CategoryModel> {
        let existing = self.get_by_id(id).await?;

        if let Some(pid) = new_parent_id {
            if pid == id {
                return Err(AppError::Conflict(
                    "Category cannot be its own parent".to_string(),
                ));
            }

            let mut cursor = Some(pid);
            let mut hops = 0;
            while let Some(ancestor_id) = cursor {
                if ancestor_id == id {
                    return Err(AppError::Conflict(
                        "Category cannot be moved under its own descendant".to_string(),
                    ));
                }
                let ancestor = Category::find_by_id(ancestor_id).one(&self.db).await?;
                match ancestor {
                    Some(a) => cursor = a.parent_id,
                    None if ancestor_id == pid => return Err(AppError::NotFound),
                    None => cursor = None,
                }
                hops += 1;
                if hops > 100 {
                    // Stored cycle among ancestors; the tree builder demotes
                    // it, and it cannot contain `id` or we would have hit it.
                    break;
                }
            }
        }

        let mut active: category::ActiveModel = existing.into();
        active.parent_id = Set(new_parent_id);
        active.updated_at = Set(chrono::Utc::now().naive_utc());

        let updated = active.update(&self.db).await?;
        self.invalidate_tree_cache().await;
        Ok(updated)
    }

    /// Delete a category, refusing while it has children. The child check
    /// and the delete are a single conditional statement so a child added
    /// concurrently can never be orphaned by this call.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = self
            .db
            .execute(Statement::from_sql_and_values(
                sea_orm::DatabaseBackend::Postgres,
                "DELETE FROM categories WHERE id = $1 \
                    AND NOT EXISTS (SELECT 1 FROM categories c WHERE c.parent_id = $1)",
                vec![id.into()],
            ))
            .await?;

        if result.rows_affected() == 0 {
            return match Category::find_by_id(id).one(&self.db).await? {
                Some(_) => Err(AppError::Conflict(
                    "Category has child categories".to_string(),
                )),
                None => Err(AppError::NotFound),
            };
        }

        self.invalidate_tree_cache().await;
        Ok(())
    }

    /// Bulk-update sibling ordering inside one transaction: either every
    /// pair applies or none does.
    pub async fn reorder(&self, pairs: &[(i32, i32)]) -> AppResult<()> {
        let txn = self.db.begin().await?;
        let now = chrono::Utc::now().naive_utc();

        for &(id, order_index) in pairs {
            let existing = Category::find_by_id(id)
                .one(&txn)
                .await?
                .ok_or(AppError::NotFound)?;

            let mut active: category::ActiveModel = existing.into();
            active.order_index = Set(order_index);
            active.updated_at = Set(now);
            active.update(&txn).await?;
        }

        txn.commit().await?;
        self.invalidate_tree_cache().await;
        Ok(())
    }

    async fn ensure_slug_free(&self, slug: &str, exclude_id: Option<i32>) -> AppResult<()> {
        let mut query = Category::find().filter(category::Column::Slug.eq(slug));
        if let Some(id) = exclude_id {
            query = query.filter(category::Column::Id.ne(id));
        }
        if query.one(&self.db).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Category slug '{}' already exists",
                slug
            )));
        }
        Ok(())
    }

    async fn invalidate_tree_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate(CACHE_KEY_CATEGORY_TREE).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(id: i32, name: &str, parent_id: Option<i32>, order_index: i32) -> CategoryModel {
        let now = chrono::Utc::now().naive_utc();
        CategoryModel {
            id,
            name: name.to_string(),
            slug: slugify(name),
            parent_id,
            order_index,
            created_at: now,
            updated_at: now,
        }
    }

    fn collect_ids(nodes: &[CategoryNode], out: &mut Vec<i32>) {
        for node in nodes {
            out.push(node.id);
            collect_ids(&node.children, out);
        }
    }

    #[test]
    fn single_root_with_ordered_children() {
        let records = vec![
            cat(1, "Tech", None, 0),
            cat(2, "Web", Some(1), 1),
            cat(3, "AI", Some(1), 2),
        ];
        let tree = build_tree(records, &HashMap::new());

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].name, "Tech");
        let children: Vec<&str> = tree[0].children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(children, vec!["Web", "AI"]);
    }

    #[test]
    fn every_child_sits_under_its_parent_exactly_once() {
        let records = vec![
            cat(1, "Tech", None, 0),
            cat(2, "Web", Some(1), 1),
            cat(3, "AI", Some(1), 2),
            cat(4, "Life", None, 3),
            cat(5, "Rust", Some(2), 4),
        ];
        let tree = build_tree(records, &HashMap::new());

        let mut ids = Vec::new();
        collect_ids(&tree, &mut ids);
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);

        let tech = &tree[0];
        let web = &tech.children[0];
        assert_eq!(web.children[0].name, "Rust");
    }

    #[test]
    fn sibling_order_follows_input_order() {
        let records = vec![
            cat(10, "B", None, 5),
            cat(11, "A", None, 7),
            cat(12, "C", None, 9),
        ];
        let tree = build_tree(records, &HashMap::new());
        let names: Vec<&str> = tree.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
    }

    #[test]
    fn dangling_parent_becomes_root() {
        let records = vec![cat(1, "Tech", None, 0), cat(2, "Orphan", Some(99), 1)];
        let tree = build_tree(records, &HashMap::new());

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[1].name, "Orphan");
        assert!(tree[1].children.is_empty());
    }

    #[test]
    fn self_reference_becomes_root() {
        let records = vec![cat(1, "Loop", Some(1), 0), cat(2, "Other", None, 1)];
        let tree = build_tree(records, &HashMap::new());

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].name, "Loop");
        assert!(tree[0].children.is_empty());
    }

    #[test]
    fn two_node_cycle_is_broken_not_dropped() {
        // 1 -> 2 -> 1; the first member in input order is demoted to root
        // and keeps the other as its child.
        let records = vec![cat(1, "A", Some(2), 0), cat(2, "B", Some(1), 1)];
        let tree = build_tree(records, &HashMap::new());

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].name, "A");
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].name, "B");

        let mut ids = Vec::new();
        collect_ids(&tree, &mut ids);
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn counts_attach_per_category_without_rollup() {
        let records = vec![
            cat(1, "Tech", None, 0),
            cat(2, "Web", Some(1), 1),
            cat(3, "AI", Some(1), 2),
        ];
        let counts = HashMap::from([(2, 1i64)]);
        let tree = build_tree(records, &counts);

        let tech = &tree[0];
        assert_eq!(tech.post_count, 0);
        assert_eq!(tech.children[0].post_count, 1);
        assert_eq!(tech.children[1].post_count, 0);
    }

    #[test]
    fn counts_above_one_pass_through() {
        let records = vec![cat(1, "Tech", None, 0), cat(2, "Web", Some(1), 1)];
        let counts = HashMap::from([(1, 4i64), (2, 7i64)]);
        let tree = build_tree(records, &counts);

        assert_eq!(tree[0].post_count, 4);
        assert_eq!(tree[0].children[0].post_count, 7);
    }

    #[test]
    fn missing_count_defaults_to_zero() {
        let records = vec![cat(1, "Empty", None, 0)];
        let tree = build_tree(records, &HashMap::new());
        assert_eq!(tree[0].post_count, 0);
    }

    #[test]
    fn empty_input_is_empty_forest() {
        let tree = build_tree(Vec::new(), &HashMap::new());
        assert!(tree.is_empty());
    }

    #[test]
    fn cache_key_constant() {
        assert_eq!(CACHE_KEY_CATEGORY_TREE, "categories:tree");
    }
}
