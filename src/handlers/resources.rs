//! Marker types binding each CRUD entity to its records and service.

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{
    CreateCuidadorDto, CreateMedicoDto, CreatePacienteDto, CuidadorDto, EntityService, MedicoDto,
    PacienteDto, ServiceScope,
};
use crate::messaging::Entity;

/// An entity served by the generic CRUD handlers
pub trait CrudResource: Send + Sync + 'static {
    type Input: DeserializeOwned + Send + 'static;
    type Record: Serialize + Send + 'static;

    const ENTITY: Entity;

    fn service(scope: &ServiceScope) -> &dyn EntityService<Input = Self::Input, Record = Self::Record>;

    fn record_id(record: &Self::Record) -> Uuid;
}

#[derive(Debug)]
pub struct Pacientes;

#[derive(Debug)]
pub struct Medicos;

#[derive(Debug)]
pub struct Cuidadores;

impl CrudResource for Pacientes {
    type Input = CreatePacienteDto;
    type Record = PacienteDto;

    const ENTITY: Entity = Entity::Paciente;

    fn service(scope: &ServiceScope) -> &dyn EntityService<Input = Self::Input, Record = Self::Record> {
        scope.pacientes.as_ref()
    }

    fn record_id(record: &Self::Record) -> Uuid {
        record.usuario.id_usuario
    }
}

impl CrudResource for Medicos {
    type Input = CreateMedicoDto;
    type Record = MedicoDto;

    const ENTITY: Entity = Entity::Medico;

    fn service(scope: &ServiceScope) -> &dyn EntityService<Input = Self::Input, Record = Self::Record> {
        scope.medicos.as_ref()
    }

    fn record_id(record: &Self::Record) -> Uuid {
        record.usuario.id_usuario
    }
}

impl CrudResource for Cuidadores {
    type Input = CreateCuidadorDto;
    type Record = CuidadorDto;

    const ENTITY: Entity = Entity::Cuidador;

    fn service(scope: &ServiceScope) -> &dyn EntityService<Input = Self::Input, Record = Self::Record> {
        scope.cuidadores.as_ref()
    }

    fn record_id(record: &Self::Record) -> Uuid {
        record.usuario.id_usuario
    }
}
