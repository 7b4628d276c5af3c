//! # Dispatch Table
//!
//! Maps a routing key to the handler for its (entity, action).
//!
//! The table is built once from [`Route::all`] through an exhaustive `match`,
//! so adding an [`Entity`] or [`Action`] variant without a handler fails to
//! compile. Routing problems never raise: they become a terminal
//! `{success: false, error}` envelope and the delivery is acked.

use std::collections::HashMap;
use std::fmt;

use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::domain::ServiceScope;
use crate::handlers::resources::CrudResource;
use crate::handlers::{crud, usuario, Cuidadores, HandlerResult, Medicos, Pacientes};
use crate::messaging::{
    parse_route, Action, Entity, RequestEnvelope, ResponseEnvelope, Route, RoutingError,
};

/// A request handler bound to one route
pub type Handler =
    for<'a> fn(&'a ServiceScope, &'a RequestEnvelope) -> BoxFuture<'a, HandlerResult>;

fn create<'a, R: CrudResource>(
    scope: &'a ServiceScope,
    request: &'a RequestEnvelope,
) -> BoxFuture<'a, HandlerResult> {
    Box::pin(crud::create::<R>(scope, request))
}

fn update<'a, R: CrudResource>(
    scope: &'a ServiceScope,
    request: &'a RequestEnvelope,
) -> BoxFuture<'a, HandlerResult> {
    Box::pin(crud::update::<R>(scope, request))
}

fn delete<'a, R: CrudResource>(
    scope: &'a ServiceScope,
    request: &'a RequestEnvelope,
) -> BoxFuture<'a, HandlerResult> {
    Box::pin(crud::delete::<R>(scope, request))
}

fn get_by_id<'a, R: CrudResource>(
    scope: &'a ServiceScope,
    request: &'a RequestEnvelope,
) -> BoxFuture<'a, HandlerResult> {
    Box::pin(crud::get_by_id::<R>(scope, request))
}

fn get_all<'a, R: CrudResource>(
    scope: &'a ServiceScope,
    request: &'a RequestEnvelope,
) -> BoxFuture<'a, HandlerResult> {
    Box::pin(crud::get_all::<R>(scope, request))
}

fn usuario_by_document_and_role<'a>(
    scope: &'a ServiceScope,
    request: &'a RequestEnvelope,
) -> BoxFuture<'a, HandlerResult> {
    Box::pin(usuario::get_by_document_and_role(scope, request))
}

fn crud_handler<R: CrudResource>(action: Action) -> Option<Handler> {
    match action {
        Action::Create => Some(create::<R> as Handler),
        Action::Update => Some(update::<R> as Handler),
        Action::Delete => Some(delete::<R> as Handler),
        Action::GetById => Some(get_by_id::<R> as Handler),
        Action::GetAll => Some(get_all::<R> as Handler),
        Action::GetByDocumentAndRole => None,
    }
}

fn handler_for(route: Route) -> Option<Handler> {
    match route.entity() {
        Entity::Paciente => crud_handler::<Pacientes>(route.action()),
        Entity::Medico => crud_handler::<Medicos>(route.action()),
        Entity::Cuidador => crud_handler::<Cuidadores>(route.action()),
        Entity::Usuario => match route.action() {
            Action::GetByDocumentAndRole => Some(usuario_by_document_and_role as Handler),
            Action::Create
            | Action::Update
            | Action::Delete
            | Action::GetById
            | Action::GetAll => None,
        },
    }
}

/// Routing-key → handler table
#[derive(Clone)]
pub struct DispatchTable {
    handlers: HashMap<Route, Handler>,
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut routes: Vec<String> = self.handlers.keys().map(ToString::to_string).collect();
        routes.sort();
        f.debug_struct("DispatchTable").field("routes", &routes).finish()
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchTable {
    pub fn new() -> Self {
        let handlers = Route::all()
            .into_iter()
            .filter_map(|route| handler_for(route).map(|handler| (route, handler)))
            .collect();
        Self { handlers }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn contains(&self, route: Route) -> bool {
        self.handlers.contains_key(&route)
    }

    /// Resolve a routing key to its handler
    pub fn resolve(&self, routing_key: &str) -> Result<(Route, Handler), RoutingError> {
        let route = parse_route(routing_key)?;
        self.handlers
            .get(&route)
            .map(|handler| (route, *handler))
            .ok_or_else(|| RoutingError::UnknownAction {
                action: route.action().to_string(),
            })
    }

    /// Route, decode and run one request
    ///
    /// A routing failure is an `Ok` error envelope. A body that is not a JSON
    /// object is an `Err`, whatever the action.
    ///
    /// ```rust
    /// use user_service_rpc::domain::{InMemoryUserStore, ServiceProvider};
    /// use user_service_rpc::DispatchTable;
    ///
    /// # tokio_test::block_on(async {
    /// let scope = InMemoryUserStore::new().create_scope();
    /// let table = DispatchTable::new();
    ///
    /// let response = table.dispatch(&scope, "user.api.medico.getAll", b"{}").await.unwrap();
    /// assert_eq!(response.count(), Some(0));
    ///
    /// let response = table.dispatch(&scope, "user.api.turno.create", b"{}").await.unwrap();
    /// assert_eq!(response.error_message(), Some("Entidad desconocida: turno"));
    /// # });
    /// ```
    pub async fn dispatch(
        &self,
        scope: &ServiceScope,
        routing_key: &str,
        body: &[u8],
    ) -> HandlerResult {
        let (route, handler) = match self.resolve(routing_key) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(routing_key, error = %e, "Unroutable request");
                return Ok(ResponseEnvelope::error(e.to_string()));
            }
        };

        let request = RequestEnvelope::parse(body)?;
        debug!(route = %route, "Dispatching request");
        handler(scope, &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InMemoryUserStore, ServiceProvider};
    use crate::handlers::HandlerError;
    use crate::messaging::DecodeError;

    #[test]
    fn test_every_bound_route_has_a_handler() {
        let table = DispatchTable::new();
        assert_eq!(table.len(), 16);
        for route in Route::all() {
            assert!(table.contains(route), "missing handler for {route}");
        }
    }

    #[test]
    fn test_resolve_reports_routing_errors() {
        let table = DispatchTable::new();

        assert!(matches!(
            table.resolve("user.api"),
            Err(RoutingError::InvalidRoutingKey { .. })
        ));
        assert_eq!(
            table.resolve("user.api.admin.create").unwrap_err().to_string(),
            "Entidad desconocida: admin"
        );
        assert_eq!(
            table.resolve("user.api.paciente").unwrap_err().to_string(),
            "Acción desconocida: unknown"
        );
        assert_eq!(
            table.resolve("user.api.usuario.create").unwrap_err().to_string(),
            "Acción desconocida: create"
        );
    }

    #[tokio::test]
    async fn test_routing_error_wins_over_bad_body() {
        let scope = InMemoryUserStore::new().create_scope();
        let table = DispatchTable::new();

        let response = table
            .dispatch(&scope, "user.api.doctor.getAll", b"not json")
            .await
            .unwrap();
        assert!(!response.is_success());
        assert_eq!(response.error_message(), Some("Entidad desconocida: doctor"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_an_error_for_every_action() {
        let scope = InMemoryUserStore::new().create_scope();
        let table = DispatchTable::new();

        for route in Route::all() {
            let result = table
                .dispatch(&scope, &route.routing_key("user.api"), b"{\"Data\":")
                .await;
            assert!(
                matches!(result, Err(HandlerError::Decode(DecodeError::MalformedJson { .. }))),
                "{route} accepted a malformed body"
            );
        }
    }

    #[tokio::test]
    async fn test_get_all_on_empty_store() {
        let scope = InMemoryUserStore::new().create_scope();
        let table = DispatchTable::new();

        let response = table
            .dispatch(&scope, "user.api.cuidador.getAll", b"{}")
            .await
            .unwrap();
        assert!(response.is_success());
        assert_eq!(response.count(), Some(0));
    }
}
