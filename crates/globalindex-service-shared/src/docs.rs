//! API documentation: an OpenAPI 3.0 document and a Swagger UI page.

use axum::{
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    Json,
};
use once_cell::sync::Lazy;
use serde_json::{json, Value};

pub const API_TITLE: &str = "Global Index API";
pub const API_VERSION: &str = "1.0.0";
pub const API_DESCRIPTION: &str = "API documentation for the Global Index WebApp";

/// Where the Swagger UI page fetches the document from.
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

static OPENAPI_DOCUMENT: Lazy<Value> = Lazy::new(build_openapi_document);

/// The OpenAPI document describing every public route.
pub fn openapi_document() -> &'static Value {
    &OPENAPI_DOCUMENT
}

fn records_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "type": "array", "items": { "$ref": "#/components/schemas/Record" } }
            }
        }
    })
}

fn message_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": { "schema": { "$ref": "#/components/schemas/NotFound" } }
        }
    })
}

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": { "schema": { "$ref": "#/components/schemas/Error" } }
        }
    })
}

fn path_param(name: &str, description: &str) -> Value {
    json!({
        "name": name,
        "in": "path",
        "required": true,
        "description": description,
        "schema": { "type": "string" }
    })
}

fn build_openapi_document() -> Value {
    let country = path_param("country_id", "The ID of the country");
    let indicator = path_param("indicator_code", "The code for the indicator");

    json!({
        "openapi": "3.0.0",
        "info": {
            "title": API_TITLE,
            "version": API_VERSION,
            "description": API_DESCRIPTION
        },
        "paths": {
            "/": {
                "get": {
                    "description": "Welcome message",
                    "responses": {
                        "200": {
                            "description": "Returns a welcome message",
                            "content": { "text/plain": { "schema": { "type": "string" } } }
                        }
                    }
                }
            },
            "/records": {
                "get": {
                    "summary": "Get all country records",
                    "responses": {
                        "200": records_response("Returns every record; an empty dataset is an empty array"),
                        "500": error_response("Error fetching records")
                    }
                }
            },
            "/records/{country_id}": {
                "get": {
                    "summary": "Get records by country ID",
                    "parameters": [country.clone()],
                    "responses": {
                        "200": records_response("Returns records for the specified country"),
                        "404": message_response("Record not found"),
                        "500": error_response("Error fetching record")
                    }
                }
            },
            "/records/country/{country_id}": {
                "get": {
                    "summary": "Get records by country ID",
                    "parameters": [country.clone()],
                    "responses": {
                        "200": records_response("Returns records for the specified country"),
                        "404": message_response("Record not found"),
                        "500": error_response("Error fetching record")
                    }
                }
            },
            "/records/indicator/{indicator_code}": {
                "get": {
                    "summary": "Get records by indicator code",
                    "parameters": [indicator.clone()],
                    "responses": {
                        "200": records_response("Returns all records with the specified indicator code"),
                        "404": message_response("Indicator not found"),
                        "500": error_response("Error fetching indicator")
                    }
                }
            },
            "/records/country/{country_id}/{indicator_code}": {
                "get": {
                    "summary": "Get a specific indicator value for a country",
                    "parameters": [country, indicator],
                    "responses": {
                        "200": records_response("Returns the indicator values for the country"),
                        "404": message_response("Record not found"),
                        "500": error_response("Error fetching record")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Record": {
                    "type": "object",
                    "required": ["country_code", "indicator_code", "year", "value"],
                    "properties": {
                        "country_code": { "type": "string", "description": "The country code" },
                        "country_name": { "type": "string" },
                        "capital_city": { "type": "string" },
                        "indicator_code": { "type": "string", "description": "The indicator code" },
                        "indicator_name": { "type": "string" },
                        "year": { "type": "integer", "description": "The year of the record" },
                        "value": {
                            "type": "number",
                            "nullable": true,
                            "description": "The value of the indicator"
                        }
                    }
                },
                "NotFound": {
                    "type": "object",
                    "required": ["message"],
                    "properties": { "message": { "type": "string" } }
                },
                "Error": {
                    "type": "object",
                    "required": ["error"],
                    "properties": { "error": { "type": "string" } }
                }
            }
        }
    })
}

/// Handler for `GET /api-docs/openapi.json`.
pub async fn openapi_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(openapi_document()))
}

/// Handler for `GET /api-docs`: Swagger UI loaded from a CDN.
pub async fn swagger_ui_handler() -> impl IntoResponse {
    (
        [(header::CACHE_CONTROL, "no-cache")],
        Html(swagger_ui_page()),
    )
}

fn swagger_ui_page() -> String {
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <title>{title}</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js" crossorigin></script>
  <script>
    window.onload = () => {{
      window.ui = SwaggerUIBundle({{ url: "{spec}", dom_id: "#swagger-ui" }});
    }};
  </script>
</body>
</html>
"##,
        title = API_TITLE,
        spec = OPENAPI_PATH,
    )
}
