use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::roles::{Role, UnknownRole};
use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = usuarios)]
pub struct Usuario {
    pub id: i32,
    pub nombre_completo: String,
    pub correo: String,
    pub hashed_password: String,
    pub rol: String,
    pub activo: bool,
    pub fecha_creacion: NaiveDateTime,
}

impl Usuario {
    pub fn role(&self) -> Result<Role, UnknownRole> {
        self.rol.parse()
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = usuarios)]
pub struct NewUsuario {
    pub nombre_completo: String,
    pub correo: String,
    pub hashed_password: String,
    pub rol: String,
}

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Serialize)]
#[diesel(table_name = causas)]
pub struct Causa {
    pub id: i32,
    pub rit: String,
    pub representado: String,
    pub tribunal: String,
    pub abogado_responsable: String,
    pub fecha_ingreso: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Insertable)]
#[diesel(table_name = causas)]
pub struct NewCausa {
    pub rit: String,
    pub representado: String,
    pub tribunal: String,
    pub abogado_responsable: String,
    pub fecha_ingreso: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Associations, Serialize)]
#[diesel(table_name = checklist_tareas)]
#[diesel(belongs_to(Causa))]
pub struct ChecklistTarea {
    pub id: i32,
    pub causa_id: i32,
    pub tarea_nombre: String,
    pub completada: bool,
    pub comentarios: Option<String>,
    pub fecha_completada: Option<NaiveDate>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = checklist_tareas)]
pub struct NewChecklistTarea<'a> {
    pub causa_id: i32,
    pub tarea_nombre: &'a str,
    pub completada: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = password_reset_tokens)]
#[diesel(belongs_to(Usuario))]
pub struct PasswordResetToken {
    pub id: Uuid,
    pub usuario_id: i32,
    pub token_hash: String,
    pub expires_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = password_reset_tokens)]
pub struct NewPasswordResetToken {
    pub id: Uuid,
    pub usuario_id: i32,
    pub token_hash: String,
    pub expires_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = jobs)]
pub struct Job {
    pub id: Uuid,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub status: String,
    pub attempts: i32,
    pub run_after: NaiveDateTime,
    pub last_error: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = jobs)]
pub struct NewJob {
    pub id: Uuid,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub status: String,
    pub run_after: NaiveDateTime,
}
