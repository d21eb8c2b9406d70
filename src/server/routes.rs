//! Route table for the HTTP API

use super::http::{Request, Response, Status};
use crate::export;
use crate::models::Question;
use crate::service::QueryService;
use serde_json::json;
use tracing::{debug, error};

pub async fn handle_request(service: &QueryService, request: &Request) -> Response {
    debug!(method = %request.method, path = %request.path, "Request");

    match (request.method.as_str(), request.path.as_str()) {
        ("OPTIONS", _) => Response::no_content(),
        ("GET", "/") | ("GET", "/status") => Response::json(Status::Ok, &service.status().await),
        ("POST", "/generate-sql") => match parse_question(request) {
            Ok(question) => Response::json(Status::Ok, &service.generate(&question)),
            Err(response) => response,
        },
        ("POST", "/execute-query") => match parse_question(request) {
            Ok(question) => execute(service, &question, request.query_param("format")).await,
            Err(response) => response,
        },
        ("GET", "/schema") => match service.schema().await {
            Ok(schema) => Response::json(Status::Ok, &schema),
            Err(e) => {
                error!("Schema introspection failed: {}", e);
                Response::error(Status::InternalServerError, &e.to_string())
            }
        },
        ("GET", "/rules") => Response::json(Status::Ok, &json!({ "rules": service.rules() })),
        (method, path) => Response::error(Status::NotFound, &format!("No route for {} {}", method, path)),
    }
}

async fn execute(service: &QueryService, question: &Question, format: Option<&str>) -> Response {
    let response = service.execute(question).await;

    if response.is_fatal() {
        return Response::json(Status::ServiceUnavailable, &response);
    }

    match (format, &response.results) {
        (Some(f), Some(outcome)) if f.eq_ignore_ascii_case("csv") => match export::to_csv(outcome) {
            Ok(body) => Response::csv(body),
            Err(e) => Response::error(Status::InternalServerError, &e.to_string()),
        },
        _ => Response::json(Status::Ok, &response),
    }
}

fn parse_question(request: &Request) -> Result<Question, Response> {
    if request.body.is_empty() {
        return Err(Response::error(Status::BadRequest, "Request body must be a JSON object with a 'question' field"));
    }
    serde_json::from_slice(&request.body)
        .map_err(|e| Response::error(Status::BadRequest, &format!("Invalid request body: {}", e)))
}
