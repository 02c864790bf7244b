use super::ProxyState;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

/// Fixed degraded payload returned when no provider succeeds. Callers get a
/// 200 with this body rather than a hard failure.
const STUB_BODY: &str =
    r#"{"weather":"unavailable","note":"all providers failed, returning stubbed response"}"#;

pub async fn handle_request(
    req: Request<Incoming>,
    state: ProxyState,
) -> Result<Response<BoxBody>, hyper::Error> {
    let path = req.uri().path().to_string();
    let response = match path.as_str() {
        "/weather" => handle_weather(&req, &state).await,

        "/health" => Response::builder()
            .status(StatusCode::OK)
            .body(full_body("alive"))
            .unwrap(),

        "/metrics" => Response::builder()
            .status(StatusCode::OK)
            .header("content-type", "text/plain; version=0.0.4; charset=utf-8")
            .body(full_body(state.metrics.render()))
            .unwrap(),

        "/breakers" => {
            let breakers: Vec<serde_json::Value> = state
                .breakers
                .snapshot()
                .into_iter()
                .map(|(name, circuit_state, failures)| {
                    serde_json::json!({
                        "provider": name,
                        "state": circuit_state.as_str(),
                        "consecutive_failures": failures,
                    })
                })
                .collect();
            let body = serde_json::to_string_pretty(&breakers).unwrap_or_default();
            Response::builder()
                .status(StatusCode::OK)
                .header("content-type", "application/json")
                .body(full_body(body))
                .unwrap()
        }

        _ => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(full_body(r#"{"error":"not found"}"#))
            .unwrap(),
    };

    metrics::counter!(
        "vane_http_requests_total",
        "path" => path,
        "status" => response.status().as_u16().to_string(),
    )
    .increment(1);

    Ok(response)
}

async fn handle_weather(req: &Request<Incoming>, state: &ProxyState) -> Response<BoxBody> {
    let city = query_param(req.uri().query(), "city");
    let Some(city) = city.filter(|c| !c.is_empty()) else {
        return Response::builder()
            .status(StatusCode::BAD_REQUEST)
            .header("content-type", "text/plain; charset=utf-8")
            .body(full_body("Missing ?city= parameter"))
            .unwrap();
    };

    match state.engine.fetch(&city).await {
        Ok(payload) => {
            let body = serde_json::to_string(&payload).unwrap_or_default();
            Response::builder()
                .status(StatusCode::OK)
                .header("content-type", "application/json")
                .body(full_body(body))
                .unwrap()
        }
        // Degraded success, never a hard failure to the caller.
        Err(_) => Response::builder()
            .status(StatusCode::OK)
            .header("content-type", "application/json")
            .body(full_body(STUB_BODY))
            .unwrap(),
    }
}

fn query_param(query: Option<&str>, key: &str) -> Option<String> {
    query?.split('&').find_map(|pair| {
        let mut parts = pair.splitn(2, '=');
        match (parts.next(), parts.next()) {
            (Some(k), Some(v)) if k == key => Some(v.to_string()),
            _ => None,
        }
    })
}
