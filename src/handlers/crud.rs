//! Generic create/update/delete/getById/getAll handlers.
//!
//! Instantiated once per [`CrudResource`] when the dispatch table is built.

use tracing::info;

use super::resources::CrudResource;
use super::{domain_failure, to_data, HandlerResult};
use crate::domain::ServiceScope;
use crate::messaging::{Action, RequestEnvelope, ResponseEnvelope};

fn not_found<R: CrudResource>() -> ResponseEnvelope {
    ResponseEnvelope::not_found(format!("{} no encontrado", R::ENTITY.label()))
}

/// `Data` → `create` → `{success, data, message: "<Entidad> creado exitosamente"}`
pub async fn create<R: CrudResource>(scope: &ServiceScope, request: &RequestEnvelope) -> HandlerResult {
    let input: R::Input = request.data()?;

    match R::service(scope).create(input).await {
        Ok(record) => {
            info!(entity = %R::ENTITY, id = %R::record_id(&record), "Entity created");
            Ok(ResponseEnvelope::ok_with_message(
                to_data(&record)?,
                format!("{} creado exitosamente", R::ENTITY.label()),
            ))
        }
        Err(e) => Ok(domain_failure(R::ENTITY, Action::Create, e)),
    }
}

/// `Id` + `Data` → `update`; a missing entity is a not-found envelope
pub async fn update<R: CrudResource>(scope: &ServiceScope, request: &RequestEnvelope) -> HandlerResult {
    let id = request.id()?;
    let input: R::Input = request.data()?;

    match R::service(scope).update(id, input).await {
        Ok(Some(record)) => {
            info!(entity = %R::ENTITY, id = %id, "Entity updated");
            Ok(ResponseEnvelope::ok_with_message(
                to_data(&record)?,
                format!("{} actualizado exitosamente", R::ENTITY.label()),
            ))
        }
        Ok(None) => Ok(not_found::<R>()),
        Err(e) => Ok(domain_failure(R::ENTITY, Action::Update, e)),
    }
}

/// `Id` → `delete`; a missing entity is a not-found envelope
pub async fn delete<R: CrudResource>(scope: &ServiceScope, request: &RequestEnvelope) -> HandlerResult {
    let id = request.id()?;

    match R::service(scope).delete(id).await {
        Ok(true) => {
            info!(entity = %R::ENTITY, id = %id, "Entity deleted");
            Ok(ResponseEnvelope::acknowledged(format!(
                "{} eliminado exitosamente",
                R::ENTITY.label()
            )))
        }
        Ok(false) => Ok(not_found::<R>()),
        Err(e) => Ok(domain_failure(R::ENTITY, Action::Delete, e)),
    }
}

/// `Id` → `get_by_id`; a miss is `{success: true, data: null}`
pub async fn get_by_id<R: CrudResource>(scope: &ServiceScope, request: &RequestEnvelope) -> HandlerResult {
    let id = request.id()?;

    match R::service(scope).get_by_id(id).await {
        Ok(record) => {
            info!(entity = %R::ENTITY, id = %id, found = record.is_some(), "Entity looked up");
            let data = record.as_ref().map(to_data).transpose()?;
            Ok(ResponseEnvelope::lookup(data))
        }
        Err(e) => Ok(domain_failure(R::ENTITY, Action::GetById, e)),
    }
}

/// `get_all` → `{success, data: [...], count}`
pub async fn get_all<R: CrudResource>(scope: &ServiceScope, _request: &RequestEnvelope) -> HandlerResult {
    match R::service(scope).get_all().await {
        Ok(records) => {
            info!(entity = %R::ENTITY, count = records.len(), "Entities listed");
            let items = records.iter().map(to_data).collect::<Result<Vec<_>, _>>()?;
            Ok(ResponseEnvelope::collection(items))
        }
        Err(e) => Ok(domain_failure(R::ENTITY, Action::GetAll, e)),
    }
}
