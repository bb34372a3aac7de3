// [libs/domain/models/src/repository.rs]
/*!
 * =================================================================
 * APARATO: REPOSITORY ENTITY CONTRACT
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: IDENTIDAD INMUTABLE DE REPOSITORIOS VIGILADOS
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Repositorio del Forge bajo vigilancia del coordinador.
///
/// Se crea en la primera observación de un Pull Request y nunca muta:
/// la identidad `(owner, name)` es el ancla de todas las colas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Repository {
    /// Identificador opaco (UUID v4) asignado por el coordinador.
    pub id: String,
    /// Propietario (usuario u organización) en el Forge.
    pub owner: String,
    /// Nombre corto del repositorio.
    pub name: String,
    /// Identidad canónica `owner/name` (única en el sistema).
    pub full_name: String,
    /// Rama por defecto reportada por el Forge.
    pub default_branch: String,
    /// Instante de la primera observación.
    pub created_at: DateTime<Utc>,
}

impl Repository {
    /// Forja la entidad a partir de la identidad canónica del Forge.
    pub fn new(owner: &str, name: &str, default_branch: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner: owner.to_string(),
            name: name.to_string(),
            full_name: format!("{}/{}", owner, name),
            default_branch: default_branch.to_string(),
            created_at: Utc::now(),
        }
    }

    /// Descompone una identidad canónica `owner/name` en sus coordenadas.
    pub fn split_full_name(full_name: &str) -> Option<(&str, &str)> {
        let mut segments = full_name.splitn(2, '/');
        match (segments.next(), segments.next()) {
            (Some(owner), Some(name)) if !owner.is_empty() && !name.is_empty() => {
                Some((owner, name))
            }
            _ => None,
        }
    }
}
