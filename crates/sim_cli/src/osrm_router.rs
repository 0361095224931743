//! HTTP client for a running OSRM routing engine (spec §6.1; §9 open
//! question: the original's embedded `libosrm` engine cannot be expressed
//! as a pure-Rust dependency, so this talks to the same engine's HTTP
//! surface instead — grounded on the teacher's `osrm_spawn::client` blocking
//! `reqwest` client).

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::Url;
use serde::Deserialize;

use sim_core::geometry::{Leg, Pos, Route, Step};
use sim_core::routing::{RouteMode, RouteProvider, RouteResponse};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    routes: Option<Vec<OsrmRoute>>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    legs: Option<Vec<OsrmLeg>>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    steps: Vec<OsrmStep>,
}

#[derive(Debug, Deserialize)]
struct OsrmStep {
    distance: f64,
    duration: f64,
    geometry: OsrmGeometry,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

/// Thin blocking HTTP client against a running OSRM server's `/route/v1`
/// endpoint (spec §6.1, §6.5's `<osrm_map>` argument).
#[derive(Debug, Clone)]
pub struct OsrmHttpRouter {
    client: Client,
    endpoint: String,
}

impl OsrmHttpRouter {
    /// `endpoint` is the OSRM server base URL, e.g. `http://localhost:5000`.
    pub fn new(endpoint: &str) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build OSRM HTTP client");
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    fn request(
        &self,
        origin: Pos,
        destination: Pos,
        mode: RouteMode,
    ) -> Result<OsrmRouteResponse, String> {
        let coords = format!(
            "{},{};{},{}",
            origin.lon, origin.lat, destination.lon, destination.lat
        );
        let base = format!("{}/route/v1/driving/{}", self.endpoint, coords);
        let mut url = Url::parse(&base).map_err(|err| format!("invalid OSRM url: {err}"))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("alternatives", "false");
            match mode {
                RouteMode::TimeOnly => {
                    query.append_pair("steps", "false");
                    query.append_pair("overview", "false");
                }
                RouteMode::FullRoute => {
                    query.append_pair("steps", "true");
                    query.append_pair("geometries", "geojson");
                    query.append_pair("overview", "full");
                }
            }
        }

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| format!("OSRM request failed: {err}"))?;
        response
            .json::<OsrmRouteResponse>()
            .map_err(|err| format!("failed to parse OSRM response: {err}"))
    }
}

impl RouteProvider for OsrmHttpRouter {
    fn route(&self, origin: Pos, destination: Pos, mode: RouteMode) -> RouteResponse {
        let parsed = match self.request(origin, destination, mode) {
            Ok(resp) => resp,
            Err(message) => return RouteResponse::Error(message),
        };

        if parsed.code != "Ok" {
            return RouteResponse::Error(parsed.message.unwrap_or(parsed.code));
        }

        let Some(best) = parsed.routes.and_then(|routes| routes.into_iter().next()) else {
            return RouteResponse::Empty;
        };

        let route = match mode {
            RouteMode::TimeOnly => Route::time_only(
                best.distance.max(1.0),
                (best.duration * 1000.0).round().max(1.0) as u64,
            ),
            RouteMode::FullRoute => {
                let legs: Vec<Leg> = best
                    .legs
                    .unwrap_or_default()
                    .into_iter()
                    .map(|leg| {
                        let steps: Vec<Step> = leg
                            .steps
                            .into_iter()
                            .filter(|step| step.geometry.coordinates.len() >= 2)
                            .map(|step| {
                                let poses = step
                                    .geometry
                                    .coordinates
                                    .iter()
                                    .map(|c| Pos::new(c[0], c[1]))
                                    .collect();
                                Step::new(
                                    poses,
                                    step.distance.max(1.0),
                                    (step.duration * 1000.0).round().max(1.0) as u64,
                                )
                            })
                            .collect();
                        Leg::new(steps)
                    })
                    .filter(|leg| !leg.steps.is_empty())
                    .collect();

                if legs.is_empty() {
                    return RouteResponse::Empty;
                }
                Route::new(legs)
            }
        };

        RouteResponse::Ok(route)
    }
}
