mod common;

use anyhow::Result;
use axum::http::StatusCode;
use causas::auth::Role;
use common::{acquire_db_lock, body_to_json, TestApp};
use serde_json::json;

const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const VALID_SHEET: &[u8] = include_bytes!("fixtures/causas_validas.xlsx");
const MIXED_SHEET: &[u8] = include_bytes!("fixtures/causas_mixtas.xlsx");

#[tokio::test]
async fn clean_sheet_imports_every_row() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };

    let lawyer = app.user_with_token("a@x.com", Role::Lawyer).await?;
    let response = app
        .upload_file("/importar-causas", "causas.xlsx", XLSX, VALID_SHEET, &lawyer)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["creadas"], 1);
    assert!(body["mensaje"].is_string());

    let response = app.get("/causas", Some(&lawyer)).await?;
    let listed = body_to_json(response.into_body()).await?;
    assert_eq!(listed[0]["rit"], "C-10");
    assert_eq!(listed[0]["fecha_ingreso"], "2025-01-01");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn failed_rows_are_reported_and_the_rest_committed() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };

    let admin = app.user_with_token("admin@estudio.cl", Role::Admin).await?;
    let response = app
        .upload_file("/importar-causas", "causas.xlsx", XLSX, MIXED_SHEET, &admin)
        .await?;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_to_json(response.into_body()).await?;
    let details = &body["details"];
    assert_eq!(details["creadas"], 3);
    let errores = details["errores"].as_array().unwrap();
    assert_eq!(errores.len(), 2);
    // Row 3 passes parsing and fails on insert; row 4 never parses.
    assert!(errores[0].as_str().unwrap().starts_with("Fila 3: "));
    assert_eq!(errores[1], json!("Fila 4: fecha inválida `not a date`"));

    let creadas = details["creadas"].as_u64().unwrap() as usize;
    assert!(creadas + errores.len() <= 5);

    let response = app.get("/causas", Some(&admin)).await?;
    let listed = body_to_json(response.into_body()).await?;
    let rits: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|causa| causa["rit"].as_str().unwrap())
        .collect();
    assert_eq!(rits, ["C-1", "1234", "C-5"]);
    assert_eq!(listed[1]["abogado_responsable"], "b@x.com");
    assert_eq!(listed[1]["fecha_ingreso"], "2025-01-03");

    // The rolled-back row leaves no orphan tasks behind.
    let response = app.get("/tareas", Some(&admin)).await?;
    let tareas = body_to_json(response.into_body()).await?;
    assert_eq!(tareas.as_array().map(Vec::len), Some(9));

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn non_spreadsheet_uploads_are_rejected() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };

    let lawyer = app.user_with_token("a@x.com", Role::Lawyer).await?;

    let response = app
        .upload_file(
            "/importar-causas",
            "causas.csv",
            "text/csv",
            b"RIT,Representado\nC-1,X\n",
            &lawyer,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_to_json(response.into_body()).await?;
    assert!(body["error"].as_str().unwrap().contains("spreadsheet"));

    let response = app
        .upload_file(
            "/importar-causas",
            "causas.xlsx",
            XLSX,
            b"definitely not a zip archive",
            &lawyer,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.get("/causas", Some(&lawyer)).await?;
    let listed = body_to_json(response.into_body()).await?;
    assert_eq!(listed.as_array().map(Vec::len), Some(0));

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn supervisors_cannot_import() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };

    let supervisor = app.user_with_token("sup@estudio.cl", Role::Supervisor).await?;
    let response = app
        .upload_file("/importar-causas", "causas.xlsx", XLSX, b"", &supervisor)
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    app.cleanup().await?;
    Ok(())
}
