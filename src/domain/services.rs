//! # Domain Collaborator Interface
//!
//! The consumer never touches storage. Each delivery obtains a fresh
//! [`ServiceScope`] from the injected [`ServiceProvider`] and calls through the
//! traits below; whatever per-request state the domain layer needs lives in
//! that scope and is dropped with it.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::errors::DomainResult;
use super::models::{
    CreateCuidadorDto, CreateMedicoDto, CreatePacienteDto, CuidadorDto, MedicoDto, PacienteDto,
    UsuarioDto,
};

/// CRUD operations for one entity kind
///
/// Lookup misses are values, not errors: `get_by_id` and `update` return
/// `None`, `delete` returns `false`. Errors are reserved for rule violations
/// and storage failures.
#[async_trait]
pub trait EntityService: Send + Sync {
    /// Creation/update payload
    type Input: Send + 'static;
    /// Response record
    type Record: Send + 'static;

    async fn create(&self, input: Self::Input) -> DomainResult<Self::Record>;

    async fn get_by_id(&self, id: Uuid) -> DomainResult<Option<Self::Record>>;

    async fn get_all(&self) -> DomainResult<Vec<Self::Record>>;

    async fn update(&self, id: Uuid, input: Self::Input) -> DomainResult<Option<Self::Record>>;

    async fn delete(&self, id: Uuid) -> DomainResult<bool>;
}

/// Lookups over every user regardless of entity kind
#[async_trait]
pub trait UsuarioService: Send + Sync {
    async fn get_by_document_and_role(
        &self,
        nro_documento: &str,
        id_rol: i32,
    ) -> DomainResult<Option<UsuarioDto>>;
}

pub type PacienteService = dyn EntityService<Input = CreatePacienteDto, Record = PacienteDto>;
pub type MedicoService = dyn EntityService<Input = CreateMedicoDto, Record = MedicoDto>;
pub type CuidadorService = dyn EntityService<Input = CreateCuidadorDto, Record = CuidadorDto>;

/// Collaborator handles for a single delivery
#[derive(Clone)]
pub struct ServiceScope {
    pub pacientes: Arc<PacienteService>,
    pub medicos: Arc<MedicoService>,
    pub cuidadores: Arc<CuidadorService>,
    pub usuarios: Arc<dyn UsuarioService>,
}

impl fmt::Debug for ServiceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceScope").finish_non_exhaustive()
    }
}

/// Factory for per-delivery scopes
pub trait ServiceProvider: Send + Sync + 'static {
    fn create_scope(&self) -> ServiceScope;
}
