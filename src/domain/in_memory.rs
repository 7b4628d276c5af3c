//! # In-Memory User Store
//!
//! Process-local implementation of the domain collaborators. Nothing is
//! persisted and passwords are discarded; the store exists so the consumer can
//! run without a database and so the request/reply path can be exercised end
//! to end in tests.
//!
//! Rules enforced:
//! - e-mail and document number are unique across all users
//! - doctors always get role [`ROL_MEDICO`]
//! - new users are `activo` with a registration timestamp
//! - patients get `FechaIngreso = today`; assigned doctor/caregiver must exist

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use super::errors::{DomainError, DomainResult};
use super::models::{
    BaseUsuarioInput, CreateCuidadorDto, CreateMedicoDto, CreatePacienteDto, CuidadorDto,
    MedicoDto, PacienteDto, UsuarioDto,
};
use super::services::{
    CuidadorService, EntityService, MedicoService, PacienteService, ServiceProvider,
    ServiceScope, UsuarioService,
};
use crate::constants::domain::{ESTADO_ACTIVO, ROL_MEDICO};

const DUPLICATE_USER: &str = "Ya existe un usuario con ese email o documento";

#[derive(Debug, Default)]
struct StoreState {
    pacientes: HashMap<Uuid, PacienteDto>,
    medicos: HashMap<Uuid, MedicoDto>,
    cuidadores: HashMap<Uuid, CuidadorDto>,
}

impl StoreState {
    fn usuarios(&self) -> impl Iterator<Item = &UsuarioDto> {
        self.pacientes
            .values()
            .map(|p| &p.usuario)
            .chain(self.medicos.values().map(|m| &m.usuario))
            .chain(self.cuidadores.values().map(|c| &c.usuario))
    }

    /// Reject `email`/`nro_documento` already used by a user other than `except`
    fn ensure_unique(
        &self,
        email: &str,
        nro_documento: Option<&str>,
        except: Option<Uuid>,
    ) -> DomainResult<()> {
        let taken = self.usuarios().any(|u| {
            Some(u.id_usuario) != except
                && (u.email.eq_ignore_ascii_case(email)
                    || nro_documento.is_some_and(|nro| u.nro_documento == nro))
        });

        if taken {
            Err(DomainError::conflict(DUPLICATE_USER))
        } else {
            Ok(())
        }
    }
}

fn require(value: &str, field: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        Err(DomainError::validation(format!("{field} es requerido")))
    } else {
        Ok(())
    }
}

fn validate_base(base: &BaseUsuarioInput) -> DomainResult<()> {
    require(&base.nombre, "Nombre")?;
    require(&base.apellido, "Apellido")?;
    require(&base.nro_documento, "NroDocumento")?;
    require(&base.email, "Email")?;
    if !base.email.contains('@') {
        return Err(DomainError::validation("Email inválido"));
    }
    Ok(())
}

fn new_usuario(id: Uuid, base: BaseUsuarioInput, id_rol: i32) -> UsuarioDto {
    UsuarioDto {
        id_usuario: id,
        nombre: base.nombre.trim().to_string(),
        apellido: base.apellido.trim().to_string(),
        id_tipo_documento: base.id_tipo_documento,
        nro_documento: base.nro_documento.trim().to_string(),
        email: base.email.trim().to_string(),
        telefono: base.telefono,
        id_rol,
        genero: base.genero,
        fecha_nacimiento: base.fecha_nacimiento,
        fecha_registro: Utc::now(),
        ultimo_acceso: None,
        estado: Some(ESTADO_ACTIVO.to_string()),
        foto_perfil: base.foto_perfil,
    }
}

/// Update keeps identity fields (document, document type, role) untouched
fn apply_base(usuario: &mut UsuarioDto, base: BaseUsuarioInput) {
    usuario.nombre = base.nombre.trim().to_string();
    usuario.apellido = base.apellido.trim().to_string();
    usuario.email = base.email.trim().to_string();
    usuario.telefono = base.telefono;
    usuario.genero = base.genero;
    usuario.fecha_nacimiento = base.fecha_nacimiento;
    usuario.foto_perfil = base.foto_perfil;
}

/// Per-entity storage hooks used by the generic service below
trait StoredEntity: Clone + Send + Sync + 'static {
    type Input: Send + 'static;

    fn table(state: &StoreState) -> &HashMap<Uuid, Self>;

    fn table_mut(state: &mut StoreState) -> &mut HashMap<Uuid, Self>;

    fn base(input: &Self::Input) -> &BaseUsuarioInput;

    fn usuario(&self) -> &UsuarioDto;

    fn create(id: Uuid, input: Self::Input) -> Self;

    fn update(&mut self, input: Self::Input);

    fn check_references(_input: &Self::Input, _state: &StoreState) -> DomainResult<()> {
        Ok(())
    }

    /// Fill derived fields from the rest of the store
    fn resolve(&self, _state: &StoreState) -> Self {
        self.clone()
    }
}

impl StoredEntity for PacienteDto {
    type Input = CreatePacienteDto;

    fn table(state: &StoreState) -> &HashMap<Uuid, Self> {
        &state.pacientes
    }

    fn table_mut(state: &mut StoreState) -> &mut HashMap<Uuid, Self> {
        &mut state.pacientes
    }

    fn base(input: &Self::Input) -> &BaseUsuarioInput {
        &input.usuario
    }

    fn usuario(&self) -> &UsuarioDto {
        &self.usuario
    }

    fn create(id: Uuid, input: Self::Input) -> Self {
        let id_rol = input.usuario.id_rol;
        Self {
            usuario: new_usuario(id, input.usuario, id_rol),
            diagnostico_inicial: input.diagnostico_inicial,
            fecha_ingreso: Some(Utc::now().date_naive()),
            observaciones_clinicas: input.observaciones_clinicas,
            foto_referencia: input.foto_referencia,
            id_cuidador: input.id_cuidador,
            nombre_cuidador: None,
            id_medico: input.id_medico,
            nombre_medico: None,
        }
    }

    fn update(&mut self, input: Self::Input) {
        apply_base(&mut self.usuario, input.usuario);
        self.diagnostico_inicial = input.diagnostico_inicial;
        self.observaciones_clinicas = input.observaciones_clinicas;
        self.foto_referencia = input.foto_referencia;
        self.id_cuidador = input.id_cuidador;
        self.id_medico = input.id_medico;
    }

    fn check_references(input: &Self::Input, state: &StoreState) -> DomainResult<()> {
        if let Some(id) = input.id_cuidador {
            if !state.cuidadores.contains_key(&id) {
                return Err(DomainError::validation(format!("Cuidador {id} no existe")));
            }
        }
        if let Some(id) = input.id_medico {
            if !state.medicos.contains_key(&id) {
                return Err(DomainError::validation(format!("Médico {id} no existe")));
            }
        }
        Ok(())
    }

    fn resolve(&self, state: &StoreState) -> Self {
        let mut resolved = self.clone();
        resolved.nombre_cuidador = self
            .id_cuidador
            .and_then(|id| state.cuidadores.get(&id))
            .map(|c| c.usuario.nombre_completo());
        resolved.nombre_medico = self
            .id_medico
            .and_then(|id| state.medicos.get(&id))
            .map(|m| m.usuario.nombre_completo());
        resolved
    }
}

impl StoredEntity for MedicoDto {
    type Input = CreateMedicoDto;

    fn table(state: &StoreState) -> &HashMap<Uuid, Self> {
        &state.medicos
    }

    fn table_mut(state: &mut StoreState) -> &mut HashMap<Uuid, Self> {
        &mut state.medicos
    }

    fn base(input: &Self::Input) -> &BaseUsuarioInput {
        &input.usuario
    }

    fn usuario(&self) -> &UsuarioDto {
        &self.usuario
    }

    fn create(id: Uuid, input: Self::Input) -> Self {
        Self {
            usuario: new_usuario(id, input.usuario, ROL_MEDICO),
            especialidad: input.especialidad,
            centro_medico: input.centro_medico,
            notificaciones_activadas: Some(input.notificaciones_activadas),
            firma_digital: None,
        }
    }

    fn update(&mut self, input: Self::Input) {
        apply_base(&mut self.usuario, input.usuario);
        self.especialidad = input.especialidad;
        self.centro_medico = input.centro_medico;
        self.notificaciones_activadas = Some(input.notificaciones_activadas);
    }
}

impl StoredEntity for CuidadorDto {
    type Input = CreateCuidadorDto;

    fn table(state: &StoreState) -> &HashMap<Uuid, Self> {
        &state.cuidadores
    }

    fn table_mut(state: &mut StoreState) -> &mut HashMap<Uuid, Self> {
        &mut state.cuidadores
    }

    fn base(input: &Self::Input) -> &BaseUsuarioInput {
        &input.usuario
    }

    fn usuario(&self) -> &UsuarioDto {
        &self.usuario
    }

    fn create(id: Uuid, input: Self::Input) -> Self {
        let id_rol = input.usuario.id_rol;
        Self {
            usuario: new_usuario(id, input.usuario, id_rol),
            relacion_con_paciente: input.relacion_con_paciente,
            direccion: input.direccion,
            notificaciones_activadas: Some(input.notificaciones_activadas),
        }
    }

    fn update(&mut self, input: Self::Input) {
        apply_base(&mut self.usuario, input.usuario);
        self.relacion_con_paciente = input.relacion_con_paciente;
        self.direccion = input.direccion;
        self.notificaciones_activadas = Some(input.notificaciones_activadas);
    }
}

struct InMemoryEntityService<E> {
    state: Arc<RwLock<StoreState>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> InMemoryEntityService<E> {
    fn new(state: Arc<RwLock<StoreState>>) -> Self {
        Self {
            state,
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<E: StoredEntity> EntityService for InMemoryEntityService<E> {
    type Input = E::Input;
    type Record = E;

    async fn create(&self, input: E::Input) -> DomainResult<E> {
        let base = E::base(&input);
        validate_base(base)?;

        let mut state = self.state.write();
        state.ensure_unique(base.email.trim(), Some(base.nro_documento.trim()), None)?;
        E::check_references(&input, &state)?;

        let id = Uuid::new_v4();
        let record = E::create(id, input);
        let resolved = record.resolve(&state);
        E::table_mut(&mut state).insert(id, record);
        Ok(resolved)
    }

    async fn get_by_id(&self, id: Uuid) -> DomainResult<Option<E>> {
        let state = self.state.read();
        Ok(E::table(&state).get(&id).map(|record| record.resolve(&state)))
    }

    async fn get_all(&self) -> DomainResult<Vec<E>> {
        let state = self.state.read();
        let mut records: Vec<E> = E::table(&state)
            .values()
            .map(|record| record.resolve(&state))
            .collect();
        records.sort_by(|a, b| {
            a.usuario()
                .fecha_registro
                .cmp(&b.usuario().fecha_registro)
                .then_with(|| a.usuario().id_usuario.cmp(&b.usuario().id_usuario))
        });
        Ok(records)
    }

    async fn update(&self, id: Uuid, input: E::Input) -> DomainResult<Option<E>> {
        let base = E::base(&input);
        validate_base(base)?;

        let mut state = self.state.write();
        if !E::table(&state).contains_key(&id) {
            return Ok(None);
        }
        state.ensure_unique(base.email.trim(), None, Some(id))?;
        E::check_references(&input, &state)?;

        let Some(record) = E::table_mut(&mut state).get_mut(&id) else {
            return Ok(None);
        };
        record.update(input);
        let updated = record.clone();
        Ok(Some(updated.resolve(&state)))
    }

    async fn delete(&self, id: Uuid) -> DomainResult<bool> {
        let mut state = self.state.write();
        Ok(E::table_mut(&mut state).remove(&id).is_some())
    }
}

struct InMemoryUsuarioService {
    state: Arc<RwLock<StoreState>>,
}

#[async_trait]
impl UsuarioService for InMemoryUsuarioService {
    async fn get_by_document_and_role(
        &self,
        nro_documento: &str,
        id_rol: i32,
    ) -> DomainResult<Option<UsuarioDto>> {
        let state = self.state.read();
        let found = state
            .usuarios()
            .find(|u| u.nro_documento == nro_documento && u.id_rol == id_rol)
            .cloned();
        Ok(found)
    }
}

/// Shared in-memory store; every scope it creates sees the same data
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total users across all entity kinds
    pub fn user_count(&self) -> usize {
        let state = self.state.read();
        state.pacientes.len() + state.medicos.len() + state.cuidadores.len()
    }

    pub fn pacientes(&self) -> Arc<PacienteService> {
        Arc::new(InMemoryEntityService::<PacienteDto>::new(self.state.clone()))
    }

    pub fn medicos(&self) -> Arc<MedicoService> {
        Arc::new(InMemoryEntityService::<MedicoDto>::new(self.state.clone()))
    }

    pub fn cuidadores(&self) -> Arc<CuidadorService> {
        Arc::new(InMemoryEntityService::<CuidadorDto>::new(self.state.clone()))
    }

    pub fn usuarios(&self) -> Arc<dyn UsuarioService> {
        Arc::new(InMemoryUsuarioService {
            state: self.state.clone(),
        })
    }
}

impl ServiceProvider for InMemoryUserStore {
    fn create_scope(&self) -> ServiceScope {
        ServiceScope {
            pacientes: self.pacientes(),
            medicos: self.medicos(),
            cuidadores: self.cuidadores(),
            usuarios: self.usuarios(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn base(nombre: &str, nro: &str, email: &str, id_rol: i32) -> BaseUsuarioInput {
        BaseUsuarioInput {
            nombre: nombre.to_string(),
            apellido: "Prueba".to_string(),
            id_tipo_documento: 1,
            nro_documento: nro.to_string(),
            email: email.to_string(),
            telefono: None,
            password: "secret".to_string(),
            id_rol,
            genero: None,
            fecha_nacimiento: NaiveDate::from_ymd_opt(1960, 5, 20).unwrap(),
            foto_perfil: None,
        }
    }

    fn medico(nro: &str, email: &str) -> CreateMedicoDto {
        CreateMedicoDto {
            usuario: base("Luis", nro, email, 7),
            especialidad: Some("Neurología".to_string()),
            centro_medico: None,
            notificaciones_activadas: true,
        }
    }

    fn paciente(nro: &str, email: &str) -> CreatePacienteDto {
        CreatePacienteDto {
            usuario: base("Ana", nro, email, 3),
            diagnostico_inicial: None,
            id_cuidador: None,
            id_medico: None,
            observaciones_clinicas: None,
            foto_referencia: None,
        }
    }

    #[tokio::test]
    async fn test_medico_role_is_forced() {
        let store = InMemoryUserStore::new();
        let created = store.medicos().create(medico("100", "l@x.com")).await.unwrap();

        assert_eq!(created.usuario.id_rol, ROL_MEDICO);
        assert_eq!(created.usuario.estado.as_deref(), Some(ESTADO_ACTIVO));
    }

    #[tokio::test]
    async fn test_duplicates_rejected_across_entities() {
        let store = InMemoryUserStore::new();
        store.medicos().create(medico("100", "l@x.com")).await.unwrap();

        let same_email = store.pacientes().create(paciente("200", "L@X.com")).await;
        assert_eq!(same_email, Err(DomainError::conflict(DUPLICATE_USER)));

        let same_document = store.pacientes().create(paciente("100", "a@x.com")).await;
        assert!(matches!(same_document, Err(DomainError::Conflict { .. })));
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn test_paciente_resolves_assigned_medico() {
        let store = InMemoryUserStore::new();
        let doctor = store.medicos().create(medico("100", "l@x.com")).await.unwrap();

        let mut input = paciente("200", "a@x.com");
        input.id_medico = Some(doctor.usuario.id_usuario);
        let created = store.pacientes().create(input).await.unwrap();

        assert_eq!(created.nombre_medico.as_deref(), Some("Luis Prueba"));
        assert!(created.fecha_ingreso.is_some());

        let mut dangling = paciente("300", "b@x.com");
        dangling.id_cuidador = Some(Uuid::new_v4());
        let result = store.pacientes().create(dangling).await;
        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_misses_are_values() {
        let store = InMemoryUserStore::new();
        let missing = Uuid::new_v4();

        assert_eq!(store.cuidadores().get_by_id(missing).await.unwrap(), None);
        assert!(!store.cuidadores().delete(missing).await.unwrap());
        let updated = store
            .medicos()
            .update(missing, medico("1", "z@x.com"))
            .await
            .unwrap();
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn test_update_keeps_identity_and_checks_email() {
        let store = InMemoryUserStore::new();
        let first = store.pacientes().create(paciente("1", "a@x.com")).await.unwrap();
        store.pacientes().create(paciente("2", "b@x.com")).await.unwrap();
        let id = first.usuario.id_usuario;

        let mut change = paciente("999", "a2@x.com");
        change.usuario.nombre = "Ana María".to_string();
        let updated = store.pacientes().update(id, change).await.unwrap().unwrap();
        assert_eq!(updated.usuario.nombre, "Ana María");
        assert_eq!(updated.usuario.nro_documento, "1");

        let clash = store.pacientes().update(id, paciente("1", "b@x.com")).await;
        assert!(matches!(clash, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_document_and_role_lookup() {
        let store = InMemoryUserStore::new();
        store.medicos().create(medico("555", "l@x.com")).await.unwrap();
        let usuarios = store.usuarios();

        let hit = usuarios.get_by_document_and_role("555", ROL_MEDICO).await.unwrap();
        assert_eq!(hit.map(|u| u.email), Some("l@x.com".to_string()));

        let wrong_role = usuarios.get_by_document_and_role("555", 3).await.unwrap();
        assert!(wrong_role.is_none());
    }

    #[tokio::test]
    async fn test_scopes_share_state() {
        let store = InMemoryUserStore::new();
        let first = store.create_scope();
        let second = store.create_scope();

        first.cuidadores.create(CreateCuidadorDto {
            usuario: base("Rosa", "10", "r@x.com", 4),
            relacion_con_paciente: Some("Hija".to_string()),
            direccion: None,
            notificaciones_activadas: false,
        })
        .await
        .unwrap();

        assert_eq!(second.cuidadores.get_all().await.unwrap().len(), 1);
    }
}
