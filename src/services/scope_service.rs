// src/services/scope_service.rs

use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::ScopeStore,
    models::scope::{child_path, NewScope, ScopeMoveOutcome, ScopeNode, ScopeTreeNode, ScopeType},
};

/// Alterações pedidas pela tela de edição de escopo.
#[derive(Debug, Clone)]
pub struct ScopeChanges {
    pub name: String,
    pub scope_type: ScopeType,
    pub parent_id: Option<Uuid>,
}

/// Árvore de escopos (holding > matriz > filial > obra > departamento).
///
/// O serviço não abre transação: quem chama entrega um `ScopeStore` já preso a
/// uma transação, para que o movimento (nó + descendentes) seja atômico.
#[derive(Clone, Default)]
pub struct ScopeService;

impl ScopeService {
    pub fn new() -> Self {
        Self
    }

    pub async fn list_scopes<S>(&self, store: &mut S, tenant_id: Uuid) -> Result<Vec<ScopeNode>, AppError>
    where
        S: ScopeStore + ?Sized,
    {
        store.list(tenant_id).await
    }

    pub async fn create_scope<S>(
        &self,
        store: &mut S,
        tenant_id: Uuid,
        name: &str,
        scope_type: ScopeType,
        parent_id: Option<Uuid>,
    ) -> Result<ScopeNode, AppError>
    where
        S: ScopeStore + ?Sized,
    {
        store.lock_tree(tenant_id).await?;

        let parent_path = parent_path(store, tenant_id, parent_id).await?;

        // O caminho contém o próprio id, que só existe depois do INSERT.
        let mut node = store
            .insert(
                tenant_id,
                &NewScope {
                    name: name.trim().to_string(),
                    scope_type,
                    parent_id,
                    path: String::new(),
                },
            )
            .await?;

        node.path = child_path(&parent_path, node.id);
        store.update(tenant_id, &node).await
    }

    /// Troca nome/tipo. O caminho não muda.
    pub async fn rename_scope<S>(
        &self,
        store: &mut S,
        tenant_id: Uuid,
        id: Uuid,
        name: &str,
        scope_type: ScopeType,
    ) -> Result<ScopeNode, AppError>
    where
        S: ScopeStore + ?Sized,
    {
        store.lock_tree(tenant_id).await?;

        let mut node = find_active(store, tenant_id, id).await?;

        node.name = name.trim().to_string();
        node.scope_type = scope_type;
        store.update(tenant_id, &node).await
    }

    /// Muda o pai de um escopo e reescreve o caminho de toda a subárvore.
    pub async fn move_scope<S>(
        &self,
        store: &mut S,
        tenant_id: Uuid,
        id: Uuid,
        new_parent_id: Option<Uuid>,
    ) -> Result<ScopeMoveOutcome, AppError>
    where
        S: ScopeStore + ?Sized,
    {
        // Sem o lock, dois movimentos cruzados passam pela checagem de ciclo.
        store.lock_tree(tenant_id).await?;

        let mut node = find_active(store, tenant_id, id).await?;

        if node.parent_id == new_parent_id {
            return Ok(ScopeMoveOutcome { node, rewritten_paths: 0 });
        }

        // Caminho vazio desliga a checagem de ciclo e o prefixo da cascata.
        if node.path.is_empty() {
            return Err(anyhow::anyhow!("Escopo {} sem caminho materializado", id).into());
        }

        let new_parent_path = parent_path(store, tenant_id, new_parent_id).await?;

        // O novo pai não pode ser o próprio nó nem alguém abaixo dele.
        if node.is_ancestor_or_self_of(&new_parent_path) {
            tracing::warn!("Movimento cíclico recusado: escopo {} para {:?}", id, new_parent_id);
            return Err(AppError::ScopeCycle);
        }

        let old_path = std::mem::take(&mut node.path);
        let new_path = child_path(&new_parent_path, node.id);

        node.parent_id = new_parent_id;
        node.path = new_path.clone();
        let node = store.update(tenant_id, &node).await?;

        let descendants = store.find_by_path_prefix(tenant_id, &old_path).await?;
        let mut rewritten_paths = 1;

        for mut descendant in descendants.into_iter().filter(|d| d.id != node.id) {
            let suffix = descendant.path[old_path.len()..].to_string();
            descendant.path = format!("{}{}", new_path, suffix);
            store.update(tenant_id, &descendant).await?;
            rewritten_paths += 1;
        }

        tracing::info!(
            "Escopo {} movido de '{}' para '{}' ({} caminhos reescritos)",
            node.id,
            old_path,
            new_path,
            rewritten_paths
        );

        Ok(ScopeMoveOutcome { node, rewritten_paths })
    }

    /// Edição completa. Pai igual ao atual vira só uma renomeação.
    pub async fn update_scope<S>(
        &self,
        store: &mut S,
        tenant_id: Uuid,
        id: Uuid,
        changes: ScopeChanges,
    ) -> Result<ScopeMoveOutcome, AppError>
    where
        S: ScopeStore + ?Sized,
    {
        store.lock_tree(tenant_id).await?;

        let current = find_active(store, tenant_id, id).await?;

        let renamed = self
            .rename_scope(store, tenant_id, id, &changes.name, changes.scope_type)
            .await?;

        if current.parent_id == changes.parent_id {
            return Ok(ScopeMoveOutcome { node: renamed, rewritten_paths: 0 });
        }

        self.move_scope(store, tenant_id, id, changes.parent_id).await
    }

    /// Desativa escopos sem filhos ativos.
    pub async fn delete_scope<S>(&self, store: &mut S, tenant_id: Uuid, id: Uuid) -> Result<(), AppError>
    where
        S: ScopeStore + ?Sized,
    {
        store.lock_tree(tenant_id).await?;

        find_active(store, tenant_id, id).await?;

        let children = store.find_children(tenant_id, Some(id)).await?;
        if !children.is_empty() {
            return Err(AppError::ScopeHasChildren);
        }

        store.delete(tenant_id, id).await
    }
}

// Escopo desativado conta como inexistente.
async fn find_active<S>(store: &mut S, tenant_id: Uuid, id: Uuid) -> Result<ScopeNode, AppError>
where
    S: ScopeStore + ?Sized,
{
    store
        .find_by_id(tenant_id, id)
        .await?
        .filter(|node| node.is_active)
        .ok_or(AppError::ScopeNotFound)
}

// Caminho do pai ("" para raiz). Pai inativo ou sem caminho não serve.
async fn parent_path<S>(store: &mut S, tenant_id: Uuid, parent_id: Option<Uuid>) -> Result<String, AppError>
where
    S: ScopeStore + ?Sized,
{
    let Some(parent_id) = parent_id else {
        return Ok(String::new());
    };

    let parent = store
        .find_by_id(tenant_id, parent_id)
        .await?
        .filter(|node| node.is_active)
        .ok_or(AppError::ParentScopeNotFound)?;

    if parent.path.is_empty() {
        return Err(anyhow::anyhow!("Escopo pai {} sem caminho materializado", parent_id).into());
    }
    Ok(parent.path)
}

/// Aninha uma lista em pré-ordem (ordenada por caminho) para exibição.
/// Nós cujo pai não está na lista sobem como raiz.
pub fn build_tree(nodes: &[ScopeNode]) -> Vec<ScopeTreeNode> {
    let known: HashMap<Uuid, &ScopeNode> = nodes.iter().map(|n| (n.id, n)).collect();

    let mut children_of: HashMap<Uuid, Vec<&ScopeNode>> = HashMap::new();
    let mut roots: Vec<&ScopeNode> = Vec::new();

    for node in nodes {
        match node.parent_id.filter(|parent| known.contains_key(parent)) {
            Some(parent) => children_of.entry(parent).or_default().push(node),
            None => roots.push(node),
        }
    }

    fn assemble(node: &ScopeNode, children_of: &HashMap<Uuid, Vec<&ScopeNode>>) -> ScopeTreeNode {
        ScopeTreeNode {
            id: node.id,
            name: node.name.clone(),
            scope_type: node.scope_type.clone(),
            depth: node.depth(),
            children: children_of
                .get(&node.id)
                .map(|kids| kids.iter().map(|kid| assemble(kid, children_of)).collect())
                .unwrap_or_default(),
        }
    }

    roots.into_iter().map(|root| assemble(root, &children_of)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    // Arena em memória: nós por id, com o mesmo contrato do Postgres.
    // `calls` guarda a ordem das operações para checar quando o lock acontece.
    #[derive(Default)]
    struct MemoryScopeStore {
        nodes: HashMap<Uuid, ScopeNode>,
        updates: usize,
        calls: Vec<&'static str>,
    }

    impl MemoryScopeStore {
        fn paths(&self) -> BTreeMap<Uuid, String> {
            self.nodes.iter().map(|(id, n)| (*id, n.path.clone())).collect()
        }

        fn path_of(&self, id: Uuid) -> &str {
            &self.nodes[&id].path
        }
    }

    #[async_trait]
    impl ScopeStore for MemoryScopeStore {
        async fn lock_tree(&mut self, _tenant_id: Uuid) -> Result<(), AppError> {
            self.calls.push("lock_tree");
            Ok(())
        }

        async fn find_by_id(&mut self, tenant_id: Uuid, id: Uuid) -> Result<Option<ScopeNode>, AppError> {
            self.calls.push("find_by_id");
            Ok(self.nodes.get(&id).filter(|n| n.tenant_id == tenant_id).cloned())
        }

        async fn find_children(
            &mut self,
            tenant_id: Uuid,
            parent_id: Option<Uuid>,
        ) -> Result<Vec<ScopeNode>, AppError> {
            self.calls.push("find_children");
            Ok(self
                .nodes
                .values()
                .filter(|n| n.tenant_id == tenant_id && n.parent_id == parent_id && n.is_active)
                .cloned()
                .collect())
        }

        async fn find_by_path_prefix(
            &mut self,
            tenant_id: Uuid,
            prefix: &str,
        ) -> Result<Vec<ScopeNode>, AppError> {
            self.calls.push("find_by_path_prefix");
            let mut found: Vec<ScopeNode> = self
                .nodes
                .values()
                .filter(|n| n.tenant_id == tenant_id && n.path.starts_with(prefix))
                .cloned()
                .collect();
            found.sort_by(|a, b| a.path.cmp(&b.path));
            Ok(found)
        }

        async fn insert(&mut self, tenant_id: Uuid, scope: &NewScope) -> Result<ScopeNode, AppError> {
            let node = ScopeNode {
                id: Uuid::new_v4(),
                tenant_id,
                name: scope.name.clone(),
                scope_type: scope.scope_type.clone(),
                parent_id: scope.parent_id,
                path: scope.path.clone(),
                is_active: true,
                created_at: None,
                updated_at: None,
            };
            self.nodes.insert(node.id, node.clone());
            Ok(node)
        }

        async fn update(&mut self, tenant_id: Uuid, node: &ScopeNode) -> Result<ScopeNode, AppError> {
            self.calls.push("update");
            match self.nodes.get_mut(&node.id) {
                Some(stored) if stored.tenant_id == tenant_id => {
                    *stored = node.clone();
                    self.updates += 1;
                    Ok(node.clone())
                }
                _ => Err(AppError::ScopeNotFound),
            }
        }

        async fn delete(&mut self, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
            self.calls.push("delete");
            match self.nodes.get_mut(&id) {
                Some(n) if n.tenant_id == tenant_id && n.is_active => {
                    n.is_active = false;
                    Ok(())
                }
                _ => Err(AppError::ScopeNotFound),
            }
        }

        async fn list(&mut self, tenant_id: Uuid) -> Result<Vec<ScopeNode>, AppError> {
            let mut all: Vec<ScopeNode> = self
                .nodes
                .values()
                .filter(|n| n.tenant_id == tenant_id && n.is_active)
                .cloned()
                .collect();
            all.sort_by(|a, b| a.path.cmp(&b.path));
            Ok(all)
        }
    }

    struct Fixture {
        service: ScopeService,
        store: MemoryScopeStore,
        tenant: Uuid,
    }

    impl Fixture {
        fn new() -> Self {
            Self { service: ScopeService::new(), store: MemoryScopeStore::default(), tenant: Uuid::new_v4() }
        }

        async fn add(&mut self, name: &str, scope_type: ScopeType, parent: Option<Uuid>) -> Uuid {
            self.service
                .create_scope(&mut self.store, self.tenant, name, scope_type, parent)
                .await
                .unwrap()
                .id
        }
    }

    #[tokio::test]
    async fn create_finalizes_path_with_generated_id() {
        let mut fx = Fixture::new();
        let holding = fx.add("Holding", ScopeType::Holding, None).await;
        let branch = fx.add("Filial Sul", ScopeType::Branch, Some(holding)).await;

        assert_eq!(fx.store.path_of(holding), format!("{}/", holding));
        assert_eq!(fx.store.path_of(branch), format!("{}/{}/", holding, branch));
        assert_eq!(fx.store.nodes[&branch].depth(), 2);
    }

    #[tokio::test]
    async fn create_under_unknown_parent_is_rejected() {
        let mut fx = Fixture::new();
        let result = fx
            .service
            .create_scope(&mut fx.store, fx.tenant, "Obra", ScopeType::Site, Some(Uuid::new_v4()))
            .await;
        assert!(matches!(result, Err(AppError::ParentScopeNotFound)));
        assert!(fx.store.nodes.is_empty());
    }

    #[tokio::test]
    async fn moving_middle_node_to_root_rewrites_its_subtree() {
        let mut fx = Fixture::new();
        let h = fx.add("H", ScopeType::Holding, None).await;
        let m = fx.add("M", ScopeType::Headquarters, Some(h)).await;
        let s = fx.add("S", ScopeType::Site, Some(m)).await;

        let outcome = fx.service.move_scope(&mut fx.store, fx.tenant, m, None).await.unwrap();

        assert_eq!(outcome.rewritten_paths, 2);
        assert_eq!(fx.store.path_of(m), format!("{}/", m));
        assert_eq!(fx.store.path_of(s), format!("{}/{}/", m, s));
        assert_eq!(fx.store.path_of(h), format!("{}/", h));
        assert_eq!(fx.store.nodes[&m].parent_id, None);
        assert_eq!(fx.store.nodes[&s].parent_id, Some(m));
    }

    #[tokio::test]
    async fn cascade_touches_exactly_the_subtree() {
        let mut fx = Fixture::new();
        let root = fx.add("Holding", ScopeType::Holding, None).await;
        let other = fx.add("Matriz", ScopeType::Headquarters, Some(root)).await;
        let branch = fx.add("Filial", ScopeType::Branch, Some(root)).await;
        let site_a = fx.add("Obra A", ScopeType::Site, Some(branch)).await;
        let site_b = fx.add("Obra B", ScopeType::Site, Some(branch)).await;
        let dept = fx.add("Engenharia", ScopeType::Department, Some(site_a)).await;

        let before = fx.store.paths();
        let outcome = fx.service.move_scope(&mut fx.store, fx.tenant, branch, Some(other)).await.unwrap();
        let after = fx.store.paths();

        let changed: Vec<Uuid> = before.keys().filter(|id| before[*id] != after[*id]).copied().collect();
        assert_eq!(changed.len(), 4);
        assert_eq!(outcome.rewritten_paths, 4);

        let new_branch_path = fx.store.path_of(branch).to_string();
        assert_eq!(new_branch_path, format!("{}/{}/{}/", root, other, branch));
        for id in [site_a, site_b, dept] {
            let path = fx.store.path_of(id);
            assert!(path.starts_with(&new_branch_path) && path.len() > new_branch_path.len());
        }
        assert_eq!(fx.store.path_of(dept), format!("{}{}/{}/", new_branch_path, site_a, dept));
    }

    #[tokio::test]
    async fn cyclic_moves_are_rejected_and_leave_tree_untouched() {
        let mut fx = Fixture::new();
        let h = fx.add("H", ScopeType::Holding, None).await;
        let m = fx.add("M", ScopeType::Headquarters, Some(h)).await;
        let s = fx.add("S", ScopeType::Site, Some(m)).await;

        let before = fx.store.paths();
        let updates_before = fx.store.updates;

        // Inclui mover o nó para baixo de si mesmo.
        for target in [h, m, s] {
            let result = fx.service.move_scope(&mut fx.store, fx.tenant, h, Some(target)).await;
            assert!(matches!(result, Err(AppError::ScopeCycle)), "alvo {:?}", target);
        }
        let result = fx.service.move_scope(&mut fx.store, fx.tenant, m, Some(s)).await;
        assert!(matches!(result, Err(AppError::ScopeCycle)));

        assert_eq!(fx.store.paths(), before);
        assert_eq!(fx.store.updates, updates_before);
    }

    #[tokio::test]
    async fn same_parent_is_a_rename_without_cascade() {
        let mut fx = Fixture::new();
        let h = fx.add("H", ScopeType::Holding, None).await;
        let m = fx.add("M", ScopeType::Headquarters, Some(h)).await;
        fx.add("S", ScopeType::Site, Some(m)).await;

        let before = fx.store.paths();
        let outcome = fx
            .service
            .update_scope(
                &mut fx.store,
                fx.tenant,
                m,
                ScopeChanges {
                    name: "Matriz SP".into(),
                    scope_type: ScopeType::Other("Regional".into()),
                    parent_id: Some(h),
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.rewritten_paths, 0);
        assert_eq!(outcome.node.name, "Matriz SP");
        assert_eq!(outcome.node.scope_type.label(), "OTHER:Regional");
        assert_eq!(fx.store.paths(), before);
    }

    #[tokio::test]
    async fn update_with_new_parent_renames_and_moves() {
        let mut fx = Fixture::new();
        let a = fx.add("A", ScopeType::Holding, None).await;
        let b = fx.add("B", ScopeType::Holding, None).await;
        let x = fx.add("X", ScopeType::Site, Some(a)).await;

        let outcome = fx
            .service
            .update_scope(
                &mut fx.store,
                fx.tenant,
                x,
                ScopeChanges { name: "X2".into(), scope_type: ScopeType::Site, parent_id: Some(b) },
            )
            .await
            .unwrap();

        assert_eq!(outcome.node.name, "X2");
        assert_eq!(outcome.rewritten_paths, 1);
        assert_eq!(fx.store.path_of(x), format!("{}/{}/", b, x));
    }

    #[tokio::test]
    async fn move_to_missing_parent_is_not_found() {
        let mut fx = Fixture::new();
        let h = fx.add("H", ScopeType::Holding, None).await;
        let result = fx.service.move_scope(&mut fx.store, fx.tenant, h, Some(Uuid::new_v4())).await;
        assert!(matches!(result, Err(AppError::ParentScopeNotFound)));

        let result = fx.service.move_scope(&mut fx.store, fx.tenant, Uuid::new_v4(), None).await;
        assert!(matches!(result, Err(AppError::ScopeNotFound)));
    }

    #[tokio::test]
    async fn delete_requires_no_active_children() {
        let mut fx = Fixture::new();
        let h = fx.add("H", ScopeType::Holding, None).await;
        let m = fx.add("M", ScopeType::Headquarters, Some(h)).await;

        let result = fx.service.delete_scope(&mut fx.store, fx.tenant, h).await;
        assert!(matches!(result, Err(AppError::ScopeHasChildren)));

        // Filho inativo não bloqueia a exclusão.
        fx.store.nodes.get_mut(&m).unwrap().is_active = false;
        fx.service.delete_scope(&mut fx.store, fx.tenant, h).await.unwrap();
        assert!(!fx.store.nodes[&h].is_active);
        assert!(fx.service.list_scopes(&mut fx.store, fx.tenant).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_keeps_rows_so_inactive_children_keep_their_parent() {
        let mut fx = Fixture::new();
        let h = fx.add("H", ScopeType::Holding, None).await;
        let m = fx.add("M", ScopeType::Headquarters, Some(h)).await;
        let s = fx.add("S", ScopeType::Site, Some(m)).await;

        fx.service.delete_scope(&mut fx.store, fx.tenant, s).await.unwrap();
        fx.service.delete_scope(&mut fx.store, fx.tenant, m).await.unwrap();

        // O filho inativo ainda aponta para uma linha existente.
        assert_eq!(fx.store.nodes[&s].parent_id, Some(m));
        assert!(fx.store.nodes.contains_key(&m));

        let again = fx.service.delete_scope(&mut fx.store, fx.tenant, m).await;
        assert!(matches!(again, Err(AppError::ScopeNotFound)));

        let renamed = fx.service.rename_scope(&mut fx.store, fx.tenant, m, "M2", ScopeType::Site).await;
        assert!(matches!(renamed, Err(AppError::ScopeNotFound)));

        let moved = fx.service.move_scope(&mut fx.store, fx.tenant, h, Some(m)).await;
        assert!(matches!(moved, Err(AppError::ParentScopeNotFound)));

        let created = fx
            .service
            .create_scope(&mut fx.store, fx.tenant, "Nova", ScopeType::Site, Some(m))
            .await;
        assert!(matches!(created, Err(AppError::ParentScopeNotFound)));
    }

    #[tokio::test]
    async fn tree_is_locked_before_any_read() {
        let mut fx = Fixture::new();
        let a = fx.add("A", ScopeType::Holding, None).await;
        let b = fx.add("B", ScopeType::Holding, None).await;
        let x = fx.add("X", ScopeType::Site, Some(a)).await;

        fx.store.calls.clear();
        fx.service.move_scope(&mut fx.store, fx.tenant, x, Some(b)).await.unwrap();
        assert_eq!(fx.store.calls.first(), Some(&"lock_tree"));

        fx.store.calls.clear();
        fx.service
            .update_scope(
                &mut fx.store,
                fx.tenant,
                x,
                ScopeChanges { name: "X".into(), scope_type: ScopeType::Site, parent_id: Some(a) },
            )
            .await
            .unwrap();
        assert_eq!(fx.store.calls.first(), Some(&"lock_tree"));

        fx.store.calls.clear();
        fx.add("Y", ScopeType::Site, Some(b)).await;
        assert_eq!(fx.store.calls.first(), Some(&"lock_tree"));

        fx.store.calls.clear();
        fx.service.delete_scope(&mut fx.store, fx.tenant, x).await.unwrap();
        assert_eq!(fx.store.calls.first(), Some(&"lock_tree"));
    }

    #[tokio::test]
    async fn crossed_moves_in_sequence_cannot_build_a_cycle() {
        // Com o lock, o segundo movimento enxerga o resultado do primeiro.
        let mut fx = Fixture::new();
        let root = fx.add("R", ScopeType::Holding, None).await;
        let a = fx.add("A", ScopeType::Branch, Some(root)).await;
        let b = fx.add("B", ScopeType::Branch, Some(root)).await;

        fx.service.move_scope(&mut fx.store, fx.tenant, a, Some(b)).await.unwrap();
        let result = fx.service.move_scope(&mut fx.store, fx.tenant, b, Some(a)).await;

        assert!(matches!(result, Err(AppError::ScopeCycle)));
        assert_eq!(fx.store.nodes[&b].parent_id, Some(root));
        assert_eq!(fx.store.path_of(a), format!("{}/{}/{}/", root, b, a));
    }

    #[tokio::test]
    async fn moving_a_node_without_path_is_an_error() {
        let mut fx = Fixture::new();
        let h = fx.add("H", ScopeType::Holding, None).await;
        let m = fx.add("M", ScopeType::Headquarters, Some(h)).await;
        let s = fx.add("S", ScopeType::Site, Some(m)).await;

        // Linha que ficou com o caminho vazio (INSERT sem o UPDATE final).
        fx.store.nodes.get_mut(&h).unwrap().path = String::new();
        let updates_before = fx.store.updates;

        let result = fx.service.move_scope(&mut fx.store, fx.tenant, h, Some(s)).await;
        assert!(matches!(result, Err(AppError::InternalServerError(_))));
        assert_eq!(fx.store.nodes[&h].parent_id, None);
        assert_eq!(fx.store.updates, updates_before);

        // Pai sem caminho também não serve de destino.
        let other = fx.add("O", ScopeType::Holding, None).await;
        let result = fx.service.move_scope(&mut fx.store, fx.tenant, other, Some(h)).await;
        assert!(matches!(result, Err(AppError::InternalServerError(_))));
        assert_eq!(fx.store.path_of(other), format!("{}/", other));
    }

    #[tokio::test]
    async fn other_tenants_cannot_see_scopes() {
        let mut fx = Fixture::new();
        let h = fx.add("H", ScopeType::Holding, None).await;
        let intruder = Uuid::new_v4();

        let result = fx.service.rename_scope(&mut fx.store, intruder, h, "X", ScopeType::Site).await;
        assert!(matches!(result, Err(AppError::ScopeNotFound)));
        assert!(fx.service.list_scopes(&mut fx.store, intruder).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listing_by_path_is_preorder_and_nests() {
        let mut fx = Fixture::new();
        let h = fx.add("H", ScopeType::Holding, None).await;
        let m = fx.add("M", ScopeType::Headquarters, Some(h)).await;
        let s = fx.add("S", ScopeType::Site, Some(m)).await;
        let other_root = fx.add("Outra", ScopeType::Holding, None).await;

        let listed = fx.service.list_scopes(&mut fx.store, fx.tenant).await.unwrap();
        let position = |id: Uuid| listed.iter().position(|n| n.id == id).unwrap();
        assert!(position(h) < position(m));
        assert!(position(m) < position(s));

        let tree = build_tree(&listed);
        assert_eq!(tree.len(), 2);
        let h_node = tree.iter().find(|n| n.id == h).unwrap();
        assert_eq!(h_node.children[0].id, m);
        assert_eq!(h_node.children[0].children[0].id, s);
        assert_eq!(h_node.children[0].children[0].depth, 3);
        assert!(tree.iter().any(|n| n.id == other_root && n.children.is_empty()));
    }
}
