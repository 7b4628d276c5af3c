//! Cross-entity user lookup (`usuario.getByDocumentAndRole`).

use tracing::info;

use super::{domain_failure, to_data, HandlerResult};
use crate::domain::ServiceScope;
use crate::messaging::{Action, Entity, RequestEnvelope, ResponseEnvelope};

/// `NroDocumento` + `IdRol` → user projection
///
/// Both fields are required; an empty (or null) document number is a
/// validation failure, a miss is `{success: false, message}`.
pub async fn get_by_document_and_role(
    scope: &ServiceScope,
    request: &RequestEnvelope,
) -> HandlerResult {
    let nro_documento = request
        .nullable_string(RequestEnvelope::NRO_DOCUMENTO)?
        .unwrap_or_default();
    let id_rol = request.integer(RequestEnvelope::ID_ROL)?;

    if nro_documento.is_empty() {
        return Ok(ResponseEnvelope::error("Número de documento requerido"));
    }

    match scope
        .usuarios
        .get_by_document_and_role(nro_documento, id_rol)
        .await
    {
        Ok(Some(usuario)) => {
            info!(id_rol, id = %usuario.id_usuario, "Usuario found by document and role");
            Ok(ResponseEnvelope::ok(to_data(&usuario)?))
        }
        Ok(None) => {
            info!(id_rol, "Usuario not found by document and role");
            Ok(ResponseEnvelope::failure_message("Usuario no encontrado"))
        }
        Err(e) => Ok(domain_failure(Entity::Usuario, Action::GetByDocumentAndRole, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InMemoryUserStore, ServiceProvider};
    use crate::handlers::crud;
    use crate::handlers::{HandlerError, Medicos};
    use serde_json::json;

    fn request(body: serde_json::Value) -> RequestEnvelope {
        RequestEnvelope::parse(body.to_string().as_bytes()).unwrap()
    }

    #[tokio::test]
    async fn test_lookup_outcomes() {
        let scope = InMemoryUserStore::new().create_scope();
        crud::create::<Medicos>(
            &scope,
            &request(json!({ "Data": {
                "Nombre": "Luis",
                "Apellido": "Gómez",
                "NroDocumento": "555",
                "Email": "l@x.com",
                "FechaNacimiento": "1980-01-01"
            }})),
        )
        .await
        .unwrap();

        let hit = get_by_document_and_role(&scope, &request(json!({ "NroDocumento": "555", "IdRol": 2 })))
            .await
            .unwrap();
        assert!(hit.is_success());
        assert_eq!(hit.data().unwrap()["Email"], json!("l@x.com"));

        let miss = get_by_document_and_role(&scope, &request(json!({ "NroDocumento": "555", "IdRol": 3 })))
            .await
            .unwrap();
        assert!(!miss.is_success());
        assert_eq!(miss.message(), Some("Usuario no encontrado"));

        let empty = get_by_document_and_role(&scope, &request(json!({ "NroDocumento": "", "IdRol": 2 })))
            .await
            .unwrap();
        assert_eq!(empty.error_message(), Some("Número de documento requerido"));
    }

    #[tokio::test]
    async fn test_missing_fields_are_decode_errors() {
        let scope = InMemoryUserStore::new().create_scope();

        let no_role = get_by_document_and_role(&scope, &request(json!({ "NroDocumento": "1" }))).await;
        assert!(matches!(no_role, Err(HandlerError::Decode(_))));

        let text_role =
            get_by_document_and_role(&scope, &request(json!({ "NroDocumento": "1", "IdRol": "2" }))).await;
        assert!(matches!(text_role, Err(HandlerError::Decode(_))));
    }
}
