//! # Domain Collaborators
//!
//! Records, service traits and errors of the user domain as seen by the
//! consumer, plus an in-memory implementation of those services.

pub mod errors;
pub mod in_memory;
pub mod models;
pub mod services;

pub use errors::{DomainError, DomainResult};
pub use in_memory::InMemoryUserStore;
pub use models::{
    BaseUsuarioInput, CreateCuidadorDto, CreateMedicoDto, CreatePacienteDto, CuidadorDto,
    MedicoDto, PacienteDto, UsuarioDto,
};
pub use services::{
    CuidadorService, EntityService, MedicoService, PacienteService, ServiceProvider,
    ServiceScope, UsuarioService,
};
