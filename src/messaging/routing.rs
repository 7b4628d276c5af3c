//! # Routing Keys
//!
//! Routing keys have the shape `<namespace>.<surface>.<entity>.<action>`,
//! e.g. `user.api.paciente.create`. The first two segments are fixed by the
//! binding set; the third selects the entity and the fourth the action.
//!
//! Parsing never panics and never consults the namespace: anything that
//! reached the queue was matched by one of our bindings.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Action assumed when the routing key has no fourth segment
pub const UNKNOWN_ACTION: &str = "unknown";

/// Why a routing key could not be resolved to a route
///
/// The display strings are part of the wire contract; they are returned to
/// callers verbatim in the `error` field of the response envelope.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    #[error("Routing key inválido")]
    InvalidRoutingKey { routing_key: String },

    #[error("Entidad desconocida: {entity}")]
    UnknownEntity { entity: String },

    #[error("Acción desconocida: {action}")]
    UnknownAction { action: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Entity {
    Paciente,
    Medico,
    Cuidador,
    Usuario,
}

impl Entity {
    pub const ALL: [Entity; 4] = [
        Entity::Paciente,
        Entity::Medico,
        Entity::Cuidador,
        Entity::Usuario,
    ];

    /// Routing-key segment
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paciente => "paciente",
            Self::Medico => "medico",
            Self::Cuidador => "cuidador",
            Self::Usuario => "usuario",
        }
    }

    /// Human-readable name used in response messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::Paciente => "Paciente",
            Self::Medico => "Médico",
            Self::Cuidador => "Cuidador",
            Self::Usuario => "Usuario",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Entity {
    type Err = RoutingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paciente" => Ok(Self::Paciente),
            "medico" => Ok(Self::Medico),
            "cuidador" => Ok(Self::Cuidador),
            "usuario" => Ok(Self::Usuario),
            other => Err(RoutingError::UnknownEntity {
                entity: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    Create,
    Update,
    Delete,
    GetById,
    GetAll,
    GetByDocumentAndRole,
}

impl Action {
    /// Actions every CRUD entity supports
    pub const CRUD: [Action; 5] = [
        Action::Create,
        Action::Update,
        Action::Delete,
        Action::GetById,
        Action::GetAll,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::GetById => "getById",
            Self::GetAll => "getAll",
            Self::GetByDocumentAndRole => "getByDocumentAndRole",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = RoutingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "getById" => Ok(Self::GetById),
            "getAll" => Ok(Self::GetAll),
            "getByDocumentAndRole" => Ok(Self::GetByDocumentAndRole),
            other => Err(RoutingError::UnknownAction {
                action: other.to_string(),
            }),
        }
    }
}

/// A supported (entity, action) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Route {
    entity: Entity,
    action: Action,
}

impl Route {
    /// `None` when the entity does not support the action
    pub fn new(entity: Entity, action: Action) -> Option<Self> {
        Self::is_supported(entity, action).then_some(Self { entity, action })
    }

    pub fn is_supported(entity: Entity, action: Action) -> bool {
        match (entity, action) {
            (Entity::Usuario, Action::GetByDocumentAndRole) => true,
            (Entity::Usuario, _) | (_, Action::GetByDocumentAndRole) => false,
            (Entity::Paciente | Entity::Medico | Entity::Cuidador, _) => true,
        }
    }

    /// Every supported route, in a stable order
    pub fn all() -> Vec<Route> {
        let mut routes = Vec::new();
        for entity in Entity::ALL {
            for action in Action::CRUD.iter().copied().chain([Action::GetByDocumentAndRole]) {
                if let Some(route) = Route::new(entity, action) {
                    routes.push(route);
                }
            }
        }
        routes
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn action(&self) -> Action {
        self.action
    }

    /// Full routing key under `namespace` (`user.api` → `user.api.medico.getAll`)
    pub fn routing_key(&self, namespace: &str) -> String {
        format!("{namespace}.{}.{}", self.entity, self.action)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.entity, self.action)
    }
}

/// Resolve a routing key to a supported route
///
/// - fewer than 3 segments → [`RoutingError::InvalidRoutingKey`]
/// - unknown third segment → [`RoutingError::UnknownEntity`]
/// - missing fourth segment resolves to `"unknown"`; an unknown or
///   unsupported action → [`RoutingError::UnknownAction`]
pub fn parse_route(routing_key: &str) -> Result<Route, RoutingError> {
    let segments: Vec<&str> = routing_key.split('.').collect();
    if segments.len() < 3 {
        return Err(RoutingError::InvalidRoutingKey {
            routing_key: routing_key.to_string(),
        });
    }

    let entity: Entity = segments[2].parse()?;
    let action_segment = segments.get(3).copied().unwrap_or(UNKNOWN_ACTION);
    let unknown_action = || RoutingError::UnknownAction {
        action: action_segment.to_string(),
    };

    let action: Action = action_segment.parse().map_err(|_| unknown_action())?;
    Route::new(entity, action).ok_or_else(unknown_action)
}

/// Routing keys the consumer queue is bound with
pub fn binding_keys(namespace: &str) -> Vec<String> {
    Route::all()
        .iter()
        .map(|route| route.routing_key(namespace))
        .collect()
}
