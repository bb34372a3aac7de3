// [libs/domain/models/src/check.rs]
/*!
 * =================================================================
 * APARATO: CHECK CONTRACTS & SUITE GOVERNANCE
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: DEFINICIÓN DE CHECKS, SUITE CONFIGURADA Y SU VALIDEZ
 *
 * VISION:
 * 1. SUITE LEGALITY: Una configuración de suite sólo es válida con
 *    identificadores únicos, dependencias conocidas y grafo acíclico.
 *    La validación ocurre en la carga, antes de tocar el motor.
 * 2. POLYMORPHIC KINDS: 'forge_workflow' y 'local_script' comparten el
 *    mismo contrato de entidad; 'kind_config' transporta los parámetros
 *    específicos como JSON opaco para el estrato de ejecución.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use uuid::Uuid;

/// Naturaleza del ejecutor que materializa un check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    /// Workflow del Forge disparado por dispatch y sondeado hasta concluir.
    ForgeWorkflow,
    /// Script local ejecutado como proceso hijo con entorno inyectado.
    LocalScript,
}

impl CheckKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ForgeWorkflow => "forge_workflow",
            Self::LocalScript => "local_script",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "forge_workflow" => Some(Self::ForgeWorkflow),
            "local_script" => Some(Self::LocalScript),
            _ => None,
        }
    }
}

/// Estados terminales y transitorios de un check individual.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pending,
    Running,
    Passed,
    Failed,
    Cancelled,
    TimedOut,
}

impl CheckStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::TimedOut => "timed_out",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "passed" => Some(Self::Passed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            "timed_out" => Some(Self::TimedOut),
            _ => None,
        }
    }
}

/// Registro persistido de la ejecución de un check para una entrada.
/// Pertenece a su QueueEntry por cascada.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Check {
    pub id: String,
    /// Entrada de cola propietaria (cascada de borrado).
    pub entry_id: String,
    /// Nombre legible configurado por el operador.
    pub name: String,
    pub kind: CheckKind,
    /// Parámetros específicos del ejecutor (JSON opaco).
    pub kind_config: serde_json::Value,
    pub status: CheckStatus,
    /// Snapshot de la especificación vigente al momento de ejecutar.
    pub configuration: serde_json::Value,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Salida capturada (stdout/stderr recortados o conclusión del run).
    pub output: String,
}

impl Check {
    pub fn new(entry_id: &str, spec: &CheckSpec) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            entry_id: entry_id.to_string(),
            name: spec.name.clone(),
            kind: spec.kind,
            kind_config: spec.kind_config.clone(),
            status: CheckStatus::Pending,
            configuration: serde_json::to_value(spec).unwrap_or(serde_json::Value::Null),
            started_at: None,
            completed_at: None,
            output: String::new(),
        }
    }
}

/// Especificación de un check dentro de la suite configurada.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckSpec {
    /// Identificador estable dentro de la suite (referencia de dependencias).
    pub id: String,
    /// Nombre legible para comentarios y Dashboard.
    pub name: String,
    pub kind: CheckKind,
    /// Parámetros del ejecutor. ForgeWorkflow: {"workflow": "ci.yml"}.
    /// LocalScript: {"path": "./scripts/ci.sh"}.
    pub kind_config: serde_json::Value,
    /// Presupuesto de tiempo individual en segundos. None => defecto global.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    /// Checks que deben concluir 'passed' antes de admitir éste.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// Fallos de legalidad de una suite de checks.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckConfigurationError {
    #[error("[L2_SUITE_FAULT]: DUPLICATE_CHECK_ID -> {0}")]
    DuplicateId(String),

    #[error("[L2_SUITE_FAULT]: UNKNOWN_DEPENDENCY -> check '{check_id}' references '{dependency_id}'")]
    UnknownDependency {
        check_id: String,
        dependency_id: String,
    },

    #[error("[L2_SUITE_FAULT]: DEPENDENCY_CYCLE -> detected at check '{0}'")]
    DependencyCycle(String),
}

/// Suite de checks configurada para el pipeline de una entrada.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CheckConfiguration {
    /// Conjunto ordenado de especificaciones.
    #[serde(default)]
    pub checks: Vec<CheckSpec>,
    /// Primer resultado no-passed cancela a todos los pares restantes.
    #[serde(default)]
    pub fail_fast: bool,
}

impl CheckConfiguration {
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Certifica la legalidad estructural de la suite:
    /// identificadores únicos, dependencias conocidas y grafo acíclico.
    pub fn validate(&self) -> Result<(), CheckConfigurationError> {
        let mut known_identifiers: HashSet<&str> = HashSet::with_capacity(self.checks.len());
        for spec in &self.checks {
            if !known_identifiers.insert(spec.id.as_str()) {
                return Err(CheckConfigurationError::DuplicateId(spec.id.clone()));
            }
        }

        for spec in &self.checks {
            for dependency_id in &spec.dependencies {
                if !known_identifiers.contains(dependency_id.as_str()) {
                    return Err(CheckConfigurationError::UnknownDependency {
                        check_id: spec.id.clone(),
                        dependency_id: dependency_id.clone(),
                    });
                }
            }
        }

        // Detección de ciclos por recorrido en profundidad con pila de colores.
        let adjacency: HashMap<&str, &Vec<String>> = self
            .checks
            .iter()
            .map(|spec| (spec.id.as_str(), &spec.dependencies))
            .collect();

        #[derive(Clone, Copy, PartialEq)]
        enum VisitColor {
            White,
            Grey,
            Black,
        }

        fn visit<'a>(
            node: &'a str,
            adjacency: &HashMap<&'a str, &'a Vec<String>>,
            colors: &mut HashMap<&'a str, VisitColor>,
        ) -> Result<(), CheckConfigurationError> {
            match colors.get(node).copied().unwrap_or(VisitColor::White) {
                VisitColor::Black => return Ok(()),
                VisitColor::Grey => {
                    return Err(CheckConfigurationError::DependencyCycle(node.to_string()))
                }
                VisitColor::White => {}
            }
            colors.insert(node, VisitColor::Grey);
            if let Some(dependencies) = adjacency.get(node) {
                for dependency in dependencies.iter() {
                    visit(dependency.as_str(), adjacency, colors)?;
                }
            }
            colors.insert(node, VisitColor::Black);
            Ok(())
        }

        let mut colors: HashMap<&str, VisitColor> = HashMap::with_capacity(self.checks.len());
        for spec in &self.checks {
            visit(spec.id.as_str(), &adjacency, &mut colors)?;
        }

        Ok(())
    }
}
