//! # Domain Records
//!
//! Request inputs and response records exchanged with the domain services.
//! Field names follow the PascalCase JSON contract publishers already use
//! (`Nombre`, `NroDocumento`, `FechaNacimiento`, ...).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_true() -> bool {
    true
}

/// Fields shared by every user creation/update payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BaseUsuarioInput {
    pub nombre: String,
    pub apellido: String,
    #[serde(default)]
    pub id_tipo_documento: i32,
    pub nro_documento: String,
    pub email: String,
    #[serde(default)]
    pub telefono: Option<String>,
    /// Accepted for contract compatibility; hashing and storage belong to the domain layer
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub id_rol: i32,
    #[serde(default)]
    pub genero: Option<String>,
    pub fecha_nacimiento: NaiveDate,
    #[serde(default)]
    pub foto_perfil: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreatePacienteDto {
    #[serde(flatten)]
    pub usuario: BaseUsuarioInput,
    #[serde(default)]
    pub diagnostico_inicial: Option<String>,
    #[serde(default)]
    pub id_cuidador: Option<Uuid>,
    #[serde(default)]
    pub id_medico: Option<Uuid>,
    #[serde(default)]
    pub observaciones_clinicas: Option<String>,
    #[serde(default)]
    pub foto_referencia: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateMedicoDto {
    #[serde(flatten)]
    pub usuario: BaseUsuarioInput,
    #[serde(default)]
    pub especialidad: Option<String>,
    #[serde(default)]
    pub centro_medico: Option<String>,
    #[serde(default = "default_true")]
    pub notificaciones_activadas: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateCuidadorDto {
    #[serde(flatten)]
    pub usuario: BaseUsuarioInput,
    #[serde(default)]
    pub relacion_con_paciente: Option<String>,
    #[serde(default)]
    pub direccion: Option<String>,
    #[serde(default = "default_true")]
    pub notificaciones_activadas: bool,
}

/// User projection without credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UsuarioDto {
    pub id_usuario: Uuid,
    pub nombre: String,
    pub apellido: String,
    pub id_tipo_documento: i32,
    pub nro_documento: String,
    pub email: String,
    pub telefono: Option<String>,
    pub id_rol: i32,
    pub genero: Option<String>,
    pub fecha_nacimiento: NaiveDate,
    pub fecha_registro: DateTime<Utc>,
    pub ultimo_acceso: Option<DateTime<Utc>>,
    pub estado: Option<String>,
    pub foto_perfil: Option<String>,
}

impl UsuarioDto {
    /// Full display name (`Nombre Apellido`)
    pub fn nombre_completo(&self) -> String {
        format!("{} {}", self.nombre, self.apellido)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PacienteDto {
    #[serde(flatten)]
    pub usuario: UsuarioDto,
    pub diagnostico_inicial: Option<String>,
    pub fecha_ingreso: Option<NaiveDate>,
    pub observaciones_clinicas: Option<String>,
    pub foto_referencia: Option<String>,
    pub id_cuidador: Option<Uuid>,
    pub nombre_cuidador: Option<String>,
    pub id_medico: Option<Uuid>,
    pub nombre_medico: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MedicoDto {
    #[serde(flatten)]
    pub usuario: UsuarioDto,
    pub especialidad: Option<String>,
    pub centro_medico: Option<String>,
    pub notificaciones_activadas: Option<bool>,
    pub firma_digital: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CuidadorDto {
    #[serde(flatten)]
    pub usuario: UsuarioDto,
    pub relacion_con_paciente: Option<String>,
    pub direccion: Option<String>,
    pub notificaciones_activadas: Option<bool>,
}
