//! Weekly checklist compliance reports.
//!
//! Reports are recomputed from already-loaded rows on every call. A task
//! counts toward the week only when it is completed and its completion date
//! falls inside the week.

use std::collections::HashMap;

use serde::Serialize;

use crate::calendar::IsoWeek;
use crate::models::{Causa, ChecklistTarea, Usuario};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplianceStatus {
    Done,
    Partial,
    None,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeekProgress {
    pub total: usize,
    pub completed_this_week: usize,
}

impl WeekProgress {
    pub fn measure<'a>(tasks: impl IntoIterator<Item = &'a ChecklistTarea>, week: &IsoWeek) -> Self {
        tasks.into_iter().fold(Self::default(), |mut progress, task| {
            progress.total += 1;
            let done_this_week = task.completada
                && task.fecha_completada.is_some_and(|date| week.contains(date));
            if done_this_week {
                progress.completed_this_week += 1;
            }
            progress
        })
    }

    pub fn pending(&self) -> usize {
        self.total - self.completed_this_week
    }

    pub fn case_status(&self) -> ComplianceStatus {
        if self.total > 0 && self.completed_this_week == self.total {
            ComplianceStatus::Done
        } else if self.completed_this_week > 0 {
            ComplianceStatus::Partial
        } else {
            ComplianceStatus::None
        }
    }
}

/// Share of completed tasks, rounded to one decimal; zero when there are no
/// tasks at all.
pub fn completion_percentage(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = completed as f64 / total as f64 * 100.0;
    (raw * 10.0).round() / 10.0
}

pub fn lawyer_status(percentage: f64) -> ComplianceStatus {
    if percentage >= 100.0 {
        ComplianceStatus::Done
    } else if percentage >= 50.0 {
        ComplianceStatus::Partial
    } else {
        ComplianceStatus::None
    }
}

#[derive(Debug, Serialize)]
pub struct LawyerCaseRow {
    pub causa_id: i32,
    pub rit: String,
    pub representado: String,
    pub total_tareas: usize,
    pub completadas_semana: usize,
    pub pendientes: usize,
    pub estado: ComplianceStatus,
}

#[derive(Debug, Serialize)]
pub struct LawyerReport {
    pub abogado: String,
    pub semana: IsoWeek,
    pub causas: Vec<LawyerCaseRow>,
}

#[derive(Debug, Serialize)]
pub struct SupervisionDetail {
    pub causa_id: i32,
    pub rit: String,
    pub completadas: usize,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct LawyerSummary {
    pub abogado: String,
    pub correo: String,
    pub total_tareas: usize,
    pub completadas_semana: usize,
    pub porcentaje: f64,
    pub estado: ComplianceStatus,
    pub detalle: Vec<SupervisionDetail>,
}

#[derive(Debug, Serialize)]
pub struct SupervisionReport {
    pub semana: IsoWeek,
    pub resumen: Vec<LawyerSummary>,
}

fn tasks_by_case(tareas: &[ChecklistTarea]) -> HashMap<i32, Vec<&ChecklistTarea>> {
    let mut grouped: HashMap<i32, Vec<&ChecklistTarea>> = HashMap::new();
    for tarea in tareas {
        grouped.entry(tarea.causa_id).or_default().push(tarea);
    }
    grouped
}

fn progress_for(
    causa: &Causa,
    grouped: &HashMap<i32, Vec<&ChecklistTarea>>,
    week: &IsoWeek,
) -> WeekProgress {
    grouped
        .get(&causa.id)
        .map(|tasks| WeekProgress::measure(tasks.iter().copied(), week))
        .unwrap_or_default()
}

/// Per-case breakdown for the cases owned by `abogado`.
pub fn lawyer_report(
    abogado: &str,
    week: IsoWeek,
    causas: &[Causa],
    tareas: &[ChecklistTarea],
) -> LawyerReport {
    let grouped = tasks_by_case(tareas);
    let rows = causas
        .iter()
        .filter(|causa| causa.abogado_responsable == abogado)
        .map(|causa| {
            let progress = progress_for(causa, &grouped, &week);
            LawyerCaseRow {
                causa_id: causa.id,
                rit: causa.rit.clone(),
                representado: causa.representado.clone(),
                total_tareas: progress.total,
                completadas_semana: progress.completed_this_week,
                pendientes: progress.pending(),
                estado: progress.case_status(),
            }
        })
        .collect();

    LawyerReport {
        abogado: abogado.to_string(),
        semana: week,
        causas: rows,
    }
}

/// Firm-wide view: one summary per lawyer account, matched to cases by email.
pub fn supervision_report(
    week: IsoWeek,
    lawyers: &[Usuario],
    causas: &[Causa],
    tareas: &[ChecklistTarea],
) -> SupervisionReport {
    let grouped = tasks_by_case(tareas);
    let resumen = lawyers
        .iter()
        .map(|lawyer| {
            let mut totals = WeekProgress::default();
            let detalle: Vec<SupervisionDetail> = causas
                .iter()
                .filter(|causa| causa.abogado_responsable == lawyer.correo)
                .map(|causa| {
                    let progress = progress_for(causa, &grouped, &week);
                    totals.total += progress.total;
                    totals.completed_this_week += progress.completed_this_week;
                    SupervisionDetail {
                        causa_id: causa.id,
                        rit: causa.rit.clone(),
                        completadas: progress.completed_this_week,
                        total: progress.total,
                    }
                })
                .collect();

            let porcentaje = completion_percentage(totals.completed_this_week, totals.total);
            LawyerSummary {
                abogado: lawyer.nombre_completo.clone(),
                correo: lawyer.correo.clone(),
                total_tareas: totals.total,
                completadas_semana: totals.completed_this_week,
                porcentaje,
                estado: lawyer_status(porcentaje),
                detalle,
            }
        })
        .collect();

    SupervisionReport {
        semana: week,
        resumen,
    }
}
