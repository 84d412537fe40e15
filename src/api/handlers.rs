use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use crate::error::ClinicError;
use crate::export;
use crate::models::{AppointmentRequest, BillRequest, PatientInput};

type HandlerResult = Result<HttpResponse, ClinicError>;

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub search: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PidQuery {
    #[serde(default)]
    pub pid: String,
}

pub async fn create_patient(
    state: web::Data<AppState>,
    body: web::Json<PatientInput>,
) -> HandlerResult {
    let _write = state.writes.lock().await;
    let input = body.into_inner();
    let pid = input.pid.trim().to_string();
    state.registry.add(input).await?;
    Ok(HttpResponse::Created().json(json!({ "pid": pid })))
}

pub async fn list_patients(
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
) -> HandlerResult {
    let patients = state.registry.list(&query.search).await?;
    Ok(HttpResponse::Ok().json(patients))
}

pub async fn update_patient(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<PatientInput>,
) -> HandlerResult {
    let _write = state.writes.lock().await;
    let input = PatientInput {
        pid: path.into_inner(),
        ..body.into_inner()
    };
    let outcome = state.registry.update(input).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

pub async fn delete_patient(state: web::Data<AppState>, path: web::Path<String>) -> HandlerResult {
    let _write = state.writes.lock().await;
    let outcome = state.registry.delete(&path).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

pub async fn book_appointment(
    state: web::Data<AppState>,
    body: web::Json<AppointmentRequest>,
) -> HandlerResult {
    let _write = state.writes.lock().await;
    let appointment = state.scheduler.book(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(appointment))
}

pub async fn list_appointments(
    state: web::Data<AppState>,
    query: web::Query<PidQuery>,
) -> HandlerResult {
    let appointments = state.scheduler.list(&query.pid).await?;
    Ok(HttpResponse::Ok().json(appointments))
}

pub async fn delete_appointment(state: web::Data<AppState>, path: web::Path<i64>) -> HandlerResult {
    let _write = state.writes.lock().await;
    let outcome = state.scheduler.delete(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

pub async fn add_bill(state: web::Data<AppState>, body: web::Json<BillRequest>) -> HandlerResult {
    let _write = state.writes.lock().await;
    let request = body.into_inner();
    let bill = state.ledger.add(&request.pid, request.charges()).await?;
    Ok(HttpResponse::Created().json(bill))
}

pub async fn list_bills(state: web::Data<AppState>, query: web::Query<PidQuery>) -> HandlerResult {
    let bills = state.ledger.list(&query.pid).await?;
    Ok(HttpResponse::Ok().json(bills))
}

pub async fn get_bill(state: web::Data<AppState>, path: web::Path<i64>) -> HandlerResult {
    let statement = state.ledger.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(statement))
}

pub async fn export_bill(state: web::Data<AppState>, path: web::Path<i64>) -> HandlerResult {
    let statement = state.ledger.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", export::file_name(statement.bill.id)),
        ))
        .body(export::render(&statement)))
}

pub async fn roster(state: web::Data<AppState>) -> HandlerResult {
    let roster = state.scheduler.roster();
    Ok(HttpResponse::Ok().json(json!({
        "clinicians": roster.clinicians(),
        "departments": roster.departments(),
    })))
}
