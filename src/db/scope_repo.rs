// src/db/scope_repo.rs

use async_trait::async_trait;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::scope::{NewScope, ScopeNode},
};

/// Operações de armazenamento que a árvore de escopos consome.
/// Todas recebem o tenant: um escopo nunca enxerga outra construtora.
#[async_trait]
pub trait ScopeStore: Send {
    /// Serializa as escritas na árvore do tenant até o fim da transação.
    /// Deve vir antes de qualquer leitura que decida caminho ou ciclo.
    async fn lock_tree(&mut self, tenant_id: Uuid) -> Result<(), AppError>;

    /// Devolve também escopos inativos; quem chama decide o que fazer com eles.
    async fn find_by_id(&mut self, tenant_id: Uuid, id: Uuid) -> Result<Option<ScopeNode>, AppError>;

    /// Filhos ativos diretos (`parent_id = None` lista as raízes).
    async fn find_children(
        &mut self,
        tenant_id: Uuid,
        parent_id: Option<Uuid>,
    ) -> Result<Vec<ScopeNode>, AppError>;

    async fn find_by_path_prefix(
        &mut self,
        tenant_id: Uuid,
        prefix: &str,
    ) -> Result<Vec<ScopeNode>, AppError>;

    async fn insert(&mut self, tenant_id: Uuid, scope: &NewScope) -> Result<ScopeNode, AppError>;

    async fn update(&mut self, tenant_id: Uuid, node: &ScopeNode) -> Result<ScopeNode, AppError>;

    /// Desativa o escopo. A linha fica, para não quebrar `parent_id` de filhos inativos.
    async fn delete(&mut self, tenant_id: Uuid, id: Uuid) -> Result<(), AppError>;

    /// Todos os escopos ordenados por caminho (pré-ordem da árvore).
    async fn list(&mut self, tenant_id: Uuid) -> Result<Vec<ScopeNode>, AppError>;
}

const SCOPE_COLUMNS: &str =
    "id, tenant_id, name, scope_type, parent_id, path, is_active, created_at, updated_at";

/// Implementação Postgres presa a uma conexão (normalmente uma transação aberta).
pub struct PgScopeStore<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgScopeStore<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

// Escapa curingas do LIKE para o prefixo ser literal.
fn like_prefix(prefix: &str) -> String {
    let escaped = prefix
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("{}%", escaped)
}

#[async_trait]
impl ScopeStore for PgScopeStore<'_> {
    async fn lock_tree(&mut self, tenant_id: Uuid) -> Result<(), AppError> {
        // Lock de transação: liberado no COMMIT/ROLLBACK.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(format!("scopes:{}", tenant_id))
            .execute(&mut *self.conn)
            .await?;

        Ok(())
    }

    async fn find_by_id(&mut self, tenant_id: Uuid, id: Uuid) -> Result<Option<ScopeNode>, AppError> {
        let sql = format!("SELECT {} FROM scopes WHERE tenant_id = $1 AND id = $2", SCOPE_COLUMNS);
        let node = sqlx::query_as::<_, ScopeNode>(&sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(node)
    }

    async fn find_children(
        &mut self,
        tenant_id: Uuid,
        parent_id: Option<Uuid>,
    ) -> Result<Vec<ScopeNode>, AppError> {
        let sql = format!(
            r#"
            SELECT {} FROM scopes
            WHERE tenant_id = $1
              AND parent_id IS NOT DISTINCT FROM $2
              AND is_active = TRUE
            ORDER BY path ASC
            "#,
            SCOPE_COLUMNS
        );
        let children = sqlx::query_as::<_, ScopeNode>(&sql)
            .bind(tenant_id)
            .bind(parent_id)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(children)
    }

    async fn find_by_path_prefix(
        &mut self,
        tenant_id: Uuid,
        prefix: &str,
    ) -> Result<Vec<ScopeNode>, AppError> {
        let sql = format!(
            r#"
            SELECT {} FROM scopes
            WHERE tenant_id = $1 AND path LIKE $2
            ORDER BY path ASC
            FOR UPDATE
            "#,
            SCOPE_COLUMNS
        );
        let nodes = sqlx::query_as::<_, ScopeNode>(&sql)
            .bind(tenant_id)
            .bind(like_prefix(prefix))
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(nodes)
    }

    async fn insert(&mut self, tenant_id: Uuid, scope: &NewScope) -> Result<ScopeNode, AppError> {
        let sql = format!(
            r#"
            INSERT INTO scopes (tenant_id, name, scope_type, parent_id, path)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            SCOPE_COLUMNS
        );
        let node = sqlx::query_as::<_, ScopeNode>(&sql)
            .bind(tenant_id)
            .bind(&scope.name)
            .bind(scope.scope_type.label())
            .bind(scope.parent_id)
            .bind(&scope.path)
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(node)
    }

    async fn update(&mut self, tenant_id: Uuid, node: &ScopeNode) -> Result<ScopeNode, AppError> {
        let sql = format!(
            r#"
            UPDATE scopes
            SET name = $3, scope_type = $4, parent_id = $5, path = $6,
                is_active = $7, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING {}
            "#,
            SCOPE_COLUMNS
        );
        let updated = sqlx::query_as::<_, ScopeNode>(&sql)
            .bind(tenant_id)
            .bind(node.id)
            .bind(&node.name)
            .bind(node.scope_type.label())
            .bind(node.parent_id)
            .bind(&node.path)
            .bind(node.is_active)
            .fetch_optional(&mut *self.conn)
            .await?
            .ok_or(AppError::ScopeNotFound)?;

        Ok(updated)
    }

    async fn delete(&mut self, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE scopes
            SET is_active = FALSE, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2 AND is_active = TRUE
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::ScopeNotFound);
        }
        Ok(())
    }

    async fn list(&mut self, tenant_id: Uuid) -> Result<Vec<ScopeNode>, AppError> {
        let sql = format!(
            "SELECT {} FROM scopes WHERE tenant_id = $1 AND is_active = TRUE ORDER BY path ASC",
            SCOPE_COLUMNS
        );
        let nodes = sqlx::query_as::<_, ScopeNode>(&sql)
            .bind(tenant_id)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_prefix_is_literal() {
        assert_eq!(like_prefix("a1/b2/"), "a1/b2/%");
        assert_eq!(like_prefix("50%_off/"), "50\\%\\_off/%");
    }
}
