// src/models/scope.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ---
// 1. Tipo do Escopo
// ---
// Valores fora da lista chegam como "OTHER:<rótulo>" e são preservados.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScopeType {
    Holding,
    Headquarters, // Matriz
    Branch,       // Filial
    Site,         // Obra
    Department,
    Other(String),
}

impl ScopeType {
    pub fn from_label(label: &str) -> Self {
        let trimmed = label.trim();
        match trimmed.to_uppercase().as_str() {
            "HOLDING" => Self::Holding,
            "HEADQUARTERS" | "MATRIZ" => Self::Headquarters,
            "BRANCH" | "FILIAL" => Self::Branch,
            "SITE" | "OBRA" => Self::Site,
            "DEPARTMENT" | "DEPARTAMENTO" => Self::Department,
            _ => {
                // Aceita tanto "OTHER:Consórcio" quanto só "Consórcio".
                let custom = trimmed
                    .get(..6)
                    .filter(|prefix| prefix.eq_ignore_ascii_case("OTHER:"))
                    .map(|_| &trimmed[6..])
                    .unwrap_or(trimmed);
                Self::Other(custom.trim().to_string())
            }
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Holding => "HOLDING".to_string(),
            Self::Headquarters => "HEADQUARTERS".to_string(),
            Self::Branch => "BRANCH".to_string(),
            Self::Site => "SITE".to_string(),
            Self::Department => "DEPARTMENT".to_string(),
            Self::Other(custom) => format!("OTHER:{}", custom),
        }
    }
}

impl From<String> for ScopeType {
    fn from(value: String) -> Self {
        Self::from_label(&value)
    }
}

impl From<ScopeType> for String {
    fn from(value: ScopeType) -> Self {
        value.label()
    }
}

// ---
// 2. Nó da árvore (tabela 'scopes')
// ---
// `path` é um cache dos ancestrais ("<raiz>/<filho>/<id>/") reescrito em toda
// mudança estrutural. Nunca é editado fora do serviço de escopos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScopeNode {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "Obra Residencial Jardins")]
    pub name: String,
    #[sqlx(try_from = "String")]
    #[schema(value_type = String, example = "SITE")]
    pub scope_type: ScopeType,
    pub parent_id: Option<Uuid>,
    #[schema(example = "1f0c.../9a7e.../")]
    pub path: String,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ScopeNode {
    /// Quantidade de segmentos do caminho (raiz = 1).
    pub fn depth(&self) -> usize {
        self.path.split('/').filter(|segment| !segment.is_empty()).count()
    }

    pub fn is_ancestor_or_self_of(&self, other_path: &str) -> bool {
        !self.path.is_empty() && other_path.starts_with(&self.path)
    }
}

/// Caminho de um nó dado o caminho do pai ("" para raiz).
pub fn child_path(parent_path: &str, id: Uuid) -> String {
    format!("{}{}/", parent_path, id)
}

#[derive(Debug, Clone)]
pub struct NewScope {
    pub name: String,
    pub scope_type: ScopeType,
    pub parent_id: Option<Uuid>,
    pub path: String,
}

/// Resultado de um movimento: o nó atualizado e quantos caminhos foram reescritos
/// (o próprio nó + descendentes).
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScopeMoveOutcome {
    pub node: ScopeNode,
    pub rewritten_paths: usize,
}

/// Visão aninhada para a tela de escopos.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScopeTreeNode {
    pub id: Uuid,
    pub name: String,
    #[schema(value_type = String)]
    pub scope_type: ScopeType,
    pub depth: usize,
    #[schema(no_recursion)]
    pub children: Vec<ScopeTreeNode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_type_keeps_free_form_labels() {
        assert_eq!(ScopeType::from_label("obra"), ScopeType::Site);
        assert_eq!(
            ScopeType::from_label("OTHER:Consórcio"),
            ScopeType::Other("Consórcio".to_string())
        );
        assert_eq!(ScopeType::from_label("Consórcio").label(), "OTHER:Consórcio");
        assert_eq!(ScopeType::from_label("other:SPE").label(), "OTHER:SPE");
    }

    #[test]
    fn depth_counts_path_segments() {
        let id = Uuid::new_v4();
        let root = child_path("", id);
        let node = ScopeNode {
            id,
            tenant_id: Uuid::new_v4(),
            name: "Holding".into(),
            scope_type: ScopeType::Holding,
            parent_id: None,
            path: child_path(&root, Uuid::new_v4()),
            is_active: true,
            created_at: None,
            updated_at: None,
        };
        assert!(node.path.ends_with('/'));
        assert_eq!(node.depth(), 2);
    }
}
