//! Cases and their procedural checklists.
//!
//! Every case is created together with the same three seed tasks inside a
//! single transaction, so a case row never exists without its checklist.

use chrono::NaiveDate;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::Deserialize;

use crate::models::{Causa, ChecklistTarea, NewCausa, NewChecklistTarea};
use crate::schema::{causas, checklist_tareas};

pub const SEED_TASKS: [&str; 3] = [
    "Revisar patrocinio",
    "Contestación de demanda",
    "Verificar tramitación",
];

/// Case fields as received from a client or a spreadsheet row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CaseDraft {
    pub rit: String,
    pub representado: String,
    pub tribunal: String,
    pub abogado_responsable: String,
    pub fecha_ingreso: NaiveDate,
}

impl CaseDraft {
    pub fn validate(&self) -> Result<NewCausa, String> {
        let required = |field: &str, value: &str| -> Result<String, String> {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                Err(format!("el campo {field} no puede estar vacío"))
            } else {
                Ok(trimmed.to_string())
            }
        };

        Ok(NewCausa {
            rit: required("rit", &self.rit)?,
            representado: required("representado", &self.representado)?,
            tribunal: required("tribunal", &self.tribunal)?,
            abogado_responsable: required("abogado_responsable", &self.abogado_responsable)?
                .to_lowercase(),
            fecha_ingreso: self.fecha_ingreso,
        })
    }
}

/// Requested change to one checklist task.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskUpdate {
    pub completada: bool,
    #[serde(default)]
    pub comentarios: Option<String>,
    #[serde(default)]
    pub fecha_completada: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, AsChangeset)]
#[diesel(table_name = checklist_tareas, treat_none_as_null = true)]
pub struct TaskChangeset {
    pub completada: bool,
    pub comentarios: Option<String>,
    pub fecha_completada: Option<NaiveDate>,
}

impl TaskUpdate {
    /// A completed task always carries a completion date (the supplied one or
    /// `today`); an open task never does.
    pub fn resolve(&self, today: NaiveDate) -> TaskChangeset {
        let fecha_completada = if self.completada {
            Some(self.fecha_completada.unwrap_or(today))
        } else {
            None
        };
        TaskChangeset {
            completada: self.completada,
            comentarios: self.comentarios.clone(),
            fecha_completada,
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TaskFilter {
    pub abogado: Option<String>,
    pub causa_id: Option<i32>,
    pub completada: Option<bool>,
}

pub fn create_case(conn: &mut PgConnection, new_causa: &NewCausa) -> QueryResult<Causa> {
    conn.transaction(|conn| {
        let causa: Causa = diesel::insert_into(causas::table)
            .values(new_causa)
            .get_result(conn)?;
        seed_checklist(conn, causa.id)?;
        Ok(causa)
    })
}

pub fn seed_checklist(conn: &mut PgConnection, causa_id: i32) -> QueryResult<Vec<ChecklistTarea>> {
    let rows: Vec<NewChecklistTarea<'_>> = SEED_TASKS
        .iter()
        .map(|&name| NewChecklistTarea {
            causa_id,
            tarea_nombre: name,
            completada: false,
        })
        .collect();

    let mut tareas: Vec<ChecklistTarea> = diesel::insert_into(checklist_tareas::table)
        .values(&rows)
        .get_results(conn)?;
    tareas.sort_by_key(|tarea| tarea.id);
    Ok(tareas)
}

pub fn list_cases(conn: &mut PgConnection) -> QueryResult<Vec<Causa>> {
    causas::table.order(causas::id.asc()).load(conn)
}

pub fn get_case(conn: &mut PgConnection, causa_id: i32) -> QueryResult<Option<Causa>> {
    causas::table.find(causa_id).first(conn).optional()
}

pub fn list_cases_by_lawyer(conn: &mut PgConnection, abogado: &str) -> QueryResult<Vec<Causa>> {
    causas::table
        .filter(causas::abogado_responsable.eq(abogado))
        .order(causas::id.asc())
        .load(conn)
}

pub fn checklist_for_case(
    conn: &mut PgConnection,
    causa_id: i32,
) -> QueryResult<Vec<ChecklistTarea>> {
    checklist_tareas::table
        .filter(checklist_tareas::causa_id.eq(causa_id))
        .order(checklist_tareas::id.asc())
        .load(conn)
}

pub fn tasks_for_cases(
    conn: &mut PgConnection,
    causa_ids: &[i32],
) -> QueryResult<Vec<ChecklistTarea>> {
    if causa_ids.is_empty() {
        return Ok(Vec::new());
    }
    checklist_tareas::table
        .filter(checklist_tareas::causa_id.eq_any(causa_ids))
        .order(checklist_tareas::id.asc())
        .load(conn)
}

/// Fails with `NotFound` when the task id is unknown.
pub fn update_task(
    conn: &mut PgConnection,
    tarea_id: i32,
    update: &TaskUpdate,
    today: NaiveDate,
) -> QueryResult<ChecklistTarea> {
    diesel::update(checklist_tareas::table.find(tarea_id))
        .set(&update.resolve(today))
        .get_result(conn)
}

/// Fails with `NotFound` when the case has no task with that name.
pub fn update_task_by_name(
    conn: &mut PgConnection,
    causa_id: i32,
    tarea_nombre: &str,
    update: &TaskUpdate,
    today: NaiveDate,
) -> QueryResult<ChecklistTarea> {
    let tarea_id: i32 = checklist_tareas::table
        .filter(checklist_tareas::causa_id.eq(causa_id))
        .filter(checklist_tareas::tarea_nombre.eq(tarea_nombre))
        .order(checklist_tareas::id.asc())
        .select(checklist_tareas::id)
        .first(conn)?;
    update_task(conn, tarea_id, update, today)
}

pub fn filter_tasks(conn: &mut PgConnection, filter: &TaskFilter) -> QueryResult<Vec<ChecklistTarea>> {
    let mut query = checklist_tareas::table
        .inner_join(causas::table)
        .select(checklist_tareas::all_columns)
        .order(checklist_tareas::id.asc())
        .into_boxed();

    if let Some(abogado) = filter.abogado.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        query = query.filter(causas::abogado_responsable.eq(abogado.to_lowercase()));
    }
    if let Some(causa_id) = filter.causa_id {
        query = query.filter(checklist_tareas::causa_id.eq(causa_id));
    }
    if let Some(completada) = filter.completada {
        query = query.filter(checklist_tareas::completada.eq(completada));
    }

    query.load(conn)
}
