//! OpenAPI document and Swagger UI page.

use axum::response::Html;
use axum::Json;
use serde_json::{json, Value};

const SWAGGER_UI: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <title>Family Tree API</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.onload = () => {
      window.ui = SwaggerUIBundle({ url: "/swagger/doc.json", dom_id: "#swagger-ui" });
    };
  </script>
</body>
</html>
"##;

pub async fn swagger_ui() -> Html<&'static str> {
    Html(SWAGGER_UI)
}

pub async fn openapi_json() -> Json<Value> {
    Json(openapi())
}

fn id_param() -> Value {
    json!([{
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "string" }
    }])
}

fn person_body() -> Value {
    json!({
        "required": true,
        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Person" } } }
    })
}

fn ok(description: &str, schema: Value) -> Value {
    json!({
        "200": {
            "description": description,
            "content": { "application/json": { "schema": schema } }
        },
        "400": { "$ref": "#/components/responses/Error" },
        "500": { "$ref": "#/components/responses/Error" },
        "503": { "$ref": "#/components/responses/Error" }
    })
}

fn person_ref() -> Value {
    json!({ "$ref": "#/components/schemas/Person" })
}

fn people(key: &str) -> Value {
    let mut properties = serde_json::Map::new();
    properties.insert(
        key.to_string(),
        json!({ "type": "array", "items": person_ref() }),
    );
    json!({ "type": "object", "properties": properties })
}

fn relation_get(summary: &str, schema: Value) -> Value {
    json!({
        "get": {
            "summary": summary,
            "parameters": id_param(),
            "responses": ok(summary, schema)
        }
    })
}

/// The OpenAPI 3 description of every route.
pub fn openapi() -> Value {
    let network = json!({ "$ref": "#/components/schemas/NetworkResponse" });
    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Family Tree API",
            "description": "Manage people and their family relationships.",
            "version": env!("CARGO_PKG_VERSION")
        },
        "paths": {
            "/people/": {
                "get": {
                    "summary": "List every person with their relationships",
                    "responses": ok("All people", people("people"))
                },
                "post": {
                    "summary": "Create a person",
                    "requestBody": person_body(),
                    "responses": ok("The created person", person_ref())
                }
            },
            "/people/search": {
                "post": {
                    "summary": "Find people by name",
                    "requestBody": person_body(),
                    "responses": ok("Matching people", people("people"))
                }
            },
            "/people/{id}": {
                "get": {
                    "summary": "Get a person",
                    "parameters": id_param(),
                    "responses": ok("The person", person_ref())
                },
                "patch": {
                    "summary": "Update the fields present in the body",
                    "parameters": id_param(),
                    "requestBody": person_body(),
                    "responses": ok("The updated person", person_ref())
                },
                "delete": {
                    "summary": "Delete a person and every relationship touching it",
                    "parameters": id_param(),
                    "responses": ok("Deletion message", json!({
                        "type": "object",
                        "properties": { "success": { "type": "string" } }
                    }))
                }
            },
            "/people/{id}/children": relation_get("Sons and daughters", json!({
                "type": "object",
                "properties": {
                    "sons": { "type": "array", "items": person_ref() },
                    "daughters": { "type": "array", "items": person_ref() }
                }
            })),
            "/people/{id}/father": relation_get("Father", json!({
                "type": "object",
                "properties": { "father": { "nullable": true, "allOf": [person_ref()] } }
            })),
            "/people/{id}/mother": relation_get("Mother", json!({
                "type": "object",
                "properties": { "mother": { "nullable": true, "allOf": [person_ref()] } }
            })),
            "/people/{id}/husband": relation_get("Male partners", people("husband")),
            "/people/{id}/wife": relation_get("Female partners", people("wife")),
            "/people/{id}/partners": relation_get("Partners", people("partners")),
            "/people/{id}/network": relation_get("Network around one person", network.clone()),
            "/network": {
                "get": {
                    "summary": "Network of the whole family graph",
                    "responses": ok("Nodes and links", network)
                }
            },
            "/auth/login": {
                "get": {
                    "summary": "Redirect to the identity provider",
                    "responses": {
                        "303": { "description": "Redirect to the authorization endpoint" },
                        "404": { "$ref": "#/components/responses/Error" }
                    }
                }
            },
            "/health": {
                "get": {
                    "summary": "Liveness probe",
                    "responses": { "200": { "description": "Service is up" } }
                }
            }
        },
        "components": {
            "schemas": {
                "Person": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string" },
                        "name": { "type": "string" },
                        "gender": { "type": "string", "example": "female" },
                        "deceased": { "type": "boolean" },
                        "deleted": { "type": "boolean" },
                        "father": person_ref(),
                        "mother": person_ref(),
                        "partners": { "type": "array", "items": person_ref() },
                        "sons": { "type": "array", "items": person_ref() },
                        "daughters": { "type": "array", "items": person_ref() }
                    }
                },
                "NetworkResponse": {
                    "type": "object",
                    "properties": {
                        "data": {
                            "type": "object",
                            "properties": {
                                "nodes": { "type": "array", "items": { "type": "object", "additionalProperties": { "type": "string" } } },
                                "links": { "type": "array", "items": { "type": "object", "additionalProperties": { "type": "string" } } }
                            }
                        }
                    }
                },
                "Error": {
                    "type": "object",
                    "properties": { "error": { "type": "string" } }
                }
            },
            "responses": {
                "Error": {
                    "description": "Error message",
                    "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Error" } } }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route() {
        let doc = openapi();
        let paths = doc["paths"].as_object().unwrap();
        for path in [
            "/people/",
            "/people/search",
            "/people/{id}",
            "/people/{id}/children",
            "/people/{id}/father",
            "/people/{id}/mother",
            "/people/{id}/husband",
            "/people/{id}/wife",
            "/people/{id}/partners",
            "/people/{id}/network",
            "/network",
        ] {
            assert!(paths.contains_key(path), "missing {path}");
        }
        assert!(doc["paths"]["/people/{id}"]["patch"].is_object());
    }
}
