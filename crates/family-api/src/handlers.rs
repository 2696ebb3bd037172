//! Request handlers for the people and network routes.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use family_core::{Person, PersonId};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::middleware::PersonBody;
use crate::routes::AppState;

fn known(person: Option<Person>, id: &PersonId) -> ApiResult<Person> {
    person.ok_or_else(|| ApiError::UnknownPerson(id.to_string()))
}

pub async fn list_people(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let people = state.store.list().await?;
    Ok(Json(json!({ "people": people })))
}

pub async fn get_person(
    State(state): State<AppState>,
    Path(id): Path<PersonId>,
) -> ApiResult<Json<Person>> {
    let person = known(state.store.get(&id).await?, &id)?;
    Ok(Json(person))
}

pub async fn children(
    State(state): State<AppState>,
    Path(id): Path<PersonId>,
) -> ApiResult<Json<Value>> {
    let person = known(state.store.children(&id).await?, &id)?;
    Ok(Json(json!({ "sons": person.sons, "daughters": person.daughters })))
}

pub async fn father(
    State(state): State<AppState>,
    Path(id): Path<PersonId>,
) -> ApiResult<Json<Value>> {
    let person = known(state.store.father(&id).await?, &id)?;
    Ok(Json(json!({ "father": person.father })))
}

pub async fn mother(
    State(state): State<AppState>,
    Path(id): Path<PersonId>,
) -> ApiResult<Json<Value>> {
    let person = known(state.store.mother(&id).await?, &id)?;
    Ok(Json(json!({ "mother": person.mother })))
}

pub async fn husband(
    State(state): State<AppState>,
    Path(id): Path<PersonId>,
) -> ApiResult<Json<Value>> {
    let person = known(state.store.partners(&id).await?, &id)?;
    if person.is_male() {
        return Err(ApiError::BadRequest(format!(
            "A male person '{}' can not have a husband",
            person.display_name()
        )));
    }
    let husbands: Vec<Person> = person.partners.into_iter().filter(Person::is_male).collect();
    Ok(Json(json!({ "husband": husbands })))
}

pub async fn wife(
    State(state): State<AppState>,
    Path(id): Path<PersonId>,
) -> ApiResult<Json<Value>> {
    let person = known(state.store.partners(&id).await?, &id)?;
    if person.is_female() {
        return Err(ApiError::BadRequest(format!(
            "A female person '{}' can not have a wife",
            person.display_name()
        )));
    }
    let wives: Vec<Person> = person
        .partners
        .into_iter()
        .filter(Person::is_female)
        .collect();
    Ok(Json(json!({ "wife": wives })))
}

pub async fn partners(
    State(state): State<AppState>,
    Path(id): Path<PersonId>,
) -> ApiResult<Json<Value>> {
    let person = known(state.store.partners(&id).await?, &id)?;
    Ok(Json(json!({ "partners": person.partners })))
}

pub async fn person_network(
    State(state): State<AppState>,
    Path(id): Path<PersonId>,
) -> ApiResult<Json<Value>> {
    let network = state.store.person_network(&id).await?;
    // The subject is always a node when it exists.
    if network.nodes.is_empty() {
        return Err(ApiError::UnknownPerson(id.to_string()));
    }
    Ok(Json(json!({ "data": network })))
}

pub async fn network(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let network = state.store.network().await?;
    Ok(Json(json!({ "data": network })))
}

pub async fn create_person(
    State(state): State<AppState>,
    PersonBody(person): PersonBody,
) -> ApiResult<Json<Person>> {
    let created = state.store.create(&person).await?;
    tracing::info!(
        id = %created.id.as_ref().map(PersonId::as_str).unwrap_or_default(),
        name = %created.display_name(),
        "Person created"
    );
    Ok(Json(created))
}

pub async fn search(
    State(state): State<AppState>,
    PersonBody(filter): PersonBody,
) -> ApiResult<Json<Value>> {
    let name = filter
        .name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::BadRequest("A name is required to search".to_string()))?;
    let people = state.store.find_by_name(&name).await?;
    Ok(Json(json!({ "people": people })))
}

pub async fn update_person(
    State(state): State<AppState>,
    Path(id): Path<PersonId>,
    PersonBody(patch): PersonBody,
) -> ApiResult<Json<Person>> {
    let updated = state.store.update(&id, &patch).await?;
    tracing::info!(id = %id, "Person updated");
    Ok(Json(updated))
}

pub async fn delete_person(
    State(state): State<AppState>,
    Path(id): Path<PersonId>,
) -> ApiResult<Json<Value>> {
    let detached = state.store.delete(&id).await?;
    tracing::info!(id = %id, detached, "Person deleted");
    Ok(Json(json!({
        "success": format!("Person with id {id} has been deleted")
    })))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Redirect to the provider's authorization endpoint with a fresh `state`.
pub async fn login(State(state): State<AppState>) -> ApiResult<Response> {
    let auth = state
        .auth
        .as_ref()
        .ok_or_else(|| ApiError::NotFound("Authentication is not configured".to_string()))?;
    let nonce = Uuid::new_v4().simple().to_string();
    let url = auth
        .authorization_url(&nonce)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Redirect::to(url.as_str()).into_response())
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound("No such route".to_string())
}
