//! Export resolution and realization
//!
//! Picks the one export of a [`LoadedUnit`] that stands for a module or
//! middleware, then turns it into a stored [`Instance`].

use crate::error::{KustoError, Result};
use crate::injector::unit::{Export, ExportTable, LoadedUnit, capitalize};
use crate::injector::Instance;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// What to do when a module table holds several factories and none of
/// them has a class-like (uppercase) name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    /// Treat as a resolution failure; the entry is omitted.
    #[default]
    Omit,
    /// Store the whole table as the module.
    KeepUnit,
}

/// Which registry an entry belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Module,
    Middleware,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Module => f.write_str("module"),
            EntryKind::Middleware => f.write_str("middleware"),
        }
    }
}

fn module_candidates(name: &str) -> [String; 5] {
    let capitalized = capitalize(name);
    let capitalized_service = format!("{capitalized}Service");
    [
        name.to_string(),
        format!("{name}Service"),
        format!("{name}Class"),
        capitalized,
        capitalized_service,
    ]
}

fn middleware_candidates(name: &str) -> [String; 4] {
    let capitalized = capitalize(name);
    let capitalized_middleware = format!("{capitalized}Middleware");
    [
        name.to_string(),
        format!("{name}Middleware"),
        capitalized,
        capitalized_middleware,
    ]
}

fn is_class_like(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

fn whole_unit(table: ExportTable) -> Export {
    Export::Object(Arc::new(table))
}

/// Select the export that represents module `name`.
///
/// Precedence: default export, exact name, conventional names
/// (`name`, `nameService`, `nameClass`, `Name`, `NameService`), the unit
/// itself when invocable, the single (or first class-like) factory of a
/// table, and finally the unit unmodified.
pub fn resolve_module(unit: LoadedUnit, name: &str, policy: AmbiguityPolicy) -> Result<Export> {
    let mut table = match unit {
        LoadedUnit::Direct(export) => return Ok(export),
        LoadedUnit::Table(table) => table,
    };

    if let Some(default) = table.default.take() {
        return Ok(default);
    }

    if let Some(export) = table.take(name) {
        return Ok(export);
    }

    for candidate in module_candidates(name) {
        if let Some(export) = table.take(&candidate) {
            return Ok(export);
        }
    }

    let factories: Vec<String> = table
        .named
        .iter()
        .filter(|(_, export)| export.is_factory())
        .map(|(key, _)| key.clone())
        .collect();

    let chosen = match factories.len() {
        0 => None,
        1 => factories.first().cloned(),
        _ => factories.iter().find(|key| is_class_like(key)).cloned(),
    };

    if chosen.is_none() && factories.len() > 1 {
        return match policy {
            AmbiguityPolicy::Omit => Err(KustoError::AmbiguousExport {
                name: name.to_string(),
                candidates: factories,
            }),
            AmbiguityPolicy::KeepUnit => {
                tracing::debug!(
                    "Module {} exports several factories ({}), keeping the whole unit",
                    name,
                    factories.join(", ")
                );
                Ok(whole_unit(table))
            }
        };
    }

    if let Some(key) = chosen
        && let Some(export) = table.take(&key)
    {
        return Ok(export);
    }

    tracing::debug!(
        "No specific export pattern found for {}, using the unit directly",
        name
    );
    Ok(whole_unit(table))
}

/// Select the export that represents middleware `name`.
///
/// Precedence: default export, exact name, the unit itself when invocable,
/// conventional names (`name`, `nameMiddleware`, `Name`, `NameMiddleware`)
/// holding a factory, and finally the unit unmodified.
pub fn resolve_middleware(unit: LoadedUnit, name: &str) -> Export {
    let mut table = match unit {
        LoadedUnit::Direct(export) => return export,
        LoadedUnit::Table(table) => table,
    };

    if let Some(default) = table.default.take() {
        return default;
    }

    if let Some(export) = table.take(name) {
        return export;
    }

    for candidate in middleware_candidates(name) {
        if table.get(&candidate).is_some_and(Export::is_factory)
            && let Some(export) = table.take(&candidate)
        {
            return export;
        }
    }

    tracing::debug!(
        "No specific export pattern found for middleware {}, using the unit directly",
        name
    );
    whole_unit(table)
}

/// Turn a resolved export into the stored instance.
///
/// Factories are invoked once with no arguments. Modules keep objects as
/// they are; anything else is stored unchanged with a warning.
pub async fn realize(export: Export, name: &str, kind: EntryKind) -> Result<Instance> {
    match (export, kind) {
        (Export::Factory(factory), _) => {
            factory
                .create()
                .await
                .map_err(|source| KustoError::RealizeFailed {
                    name: name.to_string(),
                    source,
                })
        }
        (Export::Object(instance), EntryKind::Module) => Ok(instance),
        (Export::Object(instance), EntryKind::Middleware) => {
            tracing::warn!("{} {} resolved to unexpected type: object", kind, name);
            Ok(instance)
        }
        (Export::Scalar(instance), _) => {
            tracing::warn!("{} {} resolved to unexpected type: scalar", kind, name);
            Ok(instance)
        }
    }
}
