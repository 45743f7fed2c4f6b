mod common;

use anyhow::Result;
use axum::http::StatusCode;
use causas::{auth::Role, calendar};
use common::{acquire_db_lock, body_to_json, TestApp};
use serde_json::{json, Value};

fn case_payload(rit: &str, abogado: &str) -> Value {
    json!({
        "rit": rit,
        "representado": "X",
        "tribunal": "T",
        "abogado_responsable": abogado,
        "fecha_ingreso": "2025-01-01",
    })
}

#[tokio::test]
async fn created_case_gets_seeded_checklist() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };

    let lawyer = app.user_with_token("a@x.com", Role::Lawyer).await?;

    let response = app
        .post_json("/causas", &case_payload("C-1", "a@x.com"), Some(&lawyer))
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let causa = body_to_json(response.into_body()).await?;
    let causa_id = causa["id"].as_i64().unwrap();
    assert_eq!(causa["rit"], "C-1");
    assert_eq!(causa["fecha_ingreso"], "2025-01-01");

    let response = app
        .get(&format!("/causas/{causa_id}/checklist"), Some(&lawyer))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let tareas = body_to_json(response.into_body()).await?;
    let names: Vec<&str> = tareas
        .as_array()
        .unwrap()
        .iter()
        .map(|tarea| tarea["tarea_nombre"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        ["Revisar patrocinio", "Contestación de demanda", "Verificar tramitación"]
    );
    assert!(tareas
        .as_array()
        .unwrap()
        .iter()
        .all(|tarea| tarea["completada"] == false && tarea["fecha_completada"].is_null()));

    let response = app.get(&format!("/causas/{causa_id}"), Some(&lawyer)).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.get("/causas", Some(&lawyer)).await?;
    let listed = body_to_json(response.into_body()).await?;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn supervisors_read_but_cannot_write() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };

    let supervisor = app.user_with_token("sup@estudio.cl", Role::Supervisor).await?;

    let response = app
        .post_json("/causas", &case_payload("C-1", "a@x.com"), Some(&supervisor))
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .post_json("/causas", &case_payload("C-1", "a@x.com"), None)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.get("/causas", Some(&supervisor)).await?;
    assert_eq!(response.status(), StatusCode::OK);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn task_updates_follow_completion_rules() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };

    let admin = app.user_with_token("admin@estudio.cl", Role::Admin).await?;
    let response = app
        .post_json("/causas", &case_payload("C-7", "a@x.com"), Some(&admin))
        .await?;
    let causa_id = body_to_json(response.into_body()).await?["id"]
        .as_i64()
        .unwrap();
    let response = app
        .get(&format!("/causas/{causa_id}/checklist"), Some(&admin))
        .await?;
    let tarea_id = body_to_json(response.into_body()).await?[0]["id"]
        .as_i64()
        .unwrap();

    let response = app
        .put_json(
            &format!("/tareas/{tarea_id}"),
            &json!({ "completada": true, "comentarios": "ok" }),
            Some(&admin),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let tarea = body_to_json(response.into_body()).await?;
    assert_eq!(tarea["completada"], true);
    assert_eq!(tarea["comentarios"], "ok");
    assert_eq!(tarea["fecha_completada"], calendar::today().to_string());

    let response = app
        .put_json(
            &format!("/tareas/{tarea_id}"),
            &json!({ "completada": false, "fecha_completada": "2025-02-01" }),
            Some(&admin),
        )
        .await?;
    let tarea = body_to_json(response.into_body()).await?;
    assert_eq!(tarea["completada"], false);
    assert!(tarea["fecha_completada"].is_null());

    let response = app
        .put_json(
            &format!("/causas/{causa_id}/checklist/Verificar%20tramitaci%C3%B3n"),
            &json!({ "completada": true, "fecha_completada": "2025-02-01" }),
            Some(&admin),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let tarea = body_to_json(response.into_body()).await?;
    assert_eq!(tarea["tarea_nombre"], "Verificar tramitación");
    assert_eq!(tarea["fecha_completada"], "2025-02-01");

    let response = app
        .put_json("/tareas/99999", &json!({ "completada": true }), Some(&admin))
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .put_json(
            &format!("/causas/{causa_id}/checklist/Inexistente"),
            &json!({ "completada": true }),
            Some(&admin),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn missing_cases_are_not_found() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };

    let lawyer = app.user_with_token("a@x.com", Role::Lawyer).await?;

    let response = app.get("/causas/4242", Some(&lawyer)).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.get("/causas/4242/checklist", Some(&lawyer)).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let blank = case_payload("   ", "a@x.com");
    let response = app.post_json("/causas", &blank, Some(&lawyer)).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn malformed_bodies_get_the_uniform_error_shape() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };

    let lawyer = app.user_with_token("a@x.com", Role::Lawyer).await?;

    let mut payload = case_payload("C-1", "a@x.com");
    payload["fecha_ingreso"] = json!("mañana");
    let response = app.post_json("/causas", &payload, Some(&lawyer)).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_to_json(response.into_body()).await?;
    assert!(body["error"].as_str().unwrap().contains("fecha_ingreso"));

    let response = app
        .put_json("/tareas/1", &json!({ "completada": "sí" }), Some(&lawyer))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_to_json(response.into_body()).await?["error"].is_string());

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn tasks_can_be_filtered() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };

    let admin = app.user_with_token("admin@estudio.cl", Role::Admin).await?;
    for (rit, abogado) in [("C-1", "a@x.com"), ("C-2", "B@X.com")] {
        let response = app
            .post_json("/causas", &case_payload(rit, abogado), Some(&admin))
            .await?;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app.get("/tareas?abogado=b@x.com", Some(&admin)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let tareas = body_to_json(response.into_body()).await?;
    assert_eq!(tareas.as_array().map(Vec::len), Some(3));
    let first_id = tareas[0]["id"].as_i64().unwrap();

    app.put_json(
        &format!("/tareas/{first_id}"),
        &json!({ "completada": true }),
        Some(&admin),
    )
    .await?;

    let response = app.get("/tareas?completada=true", Some(&admin)).await?;
    let done = body_to_json(response.into_body()).await?;
    assert_eq!(done.as_array().map(Vec::len), Some(1));
    assert_eq!(done[0]["id"].as_i64(), Some(first_id));

    let response = app.get("/tareas?causa_id=1&completada=false", Some(&admin)).await?;
    let open = body_to_json(response.into_body()).await?;
    assert_eq!(open.as_array().map(Vec::len), Some(3));

    app.cleanup().await?;
    Ok(())
}
