use std::collections::HashMap;
use std::sync::Mutex;

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, put, web};

use rs_names_core::io;
use rs_names_core::model::compiled_chain::CompiledChain;
use serde::Deserialize;

/// Struct representing query parameters for the `/v1/generate` endpoint
#[derive(Deserialize)]
struct GenerateParams {
	chain: Option<String>,
	min_len: Option<usize>,
	nb_try: Option<usize>,
	count: Option<usize>,
}

#[derive(Deserialize)]
struct ChainQuery {
	names: Option<String>,
}

struct SharedData {
	chains: HashMap<String, CompiledChain>,
}

/// HTTP GET endpoint `/v1/generate`
///
/// Generates one or more names from a loaded chain based on query parameters.
/// Returns the generated names newline-separated in the response body.
#[get("/v1/generate")]
async fn get_generated(
	data: web::Data<Mutex<SharedData>>,
	query: web::Query<GenerateParams>,
) -> impl Responder {
	let min_len = query.min_len.unwrap_or(2);
	let nb_try = query.nb_try.unwrap_or(100);
	let count = query.count.unwrap_or(1).clamp(1, 1000);

	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Chain lock failed"),
	};

	let chain = match &query.chain {
		Some(name) => match shared_data.chains.get(name) {
			Some(chain) => chain,
			None => {
				return HttpResponse::BadRequest().body(format!("Chain '{}' is not loaded", name));
			}
		},
		None => match shared_data.chains.values().next() {
			Some(chain) => chain,
			None => return HttpResponse::BadRequest().body("No chain loaded"),
		},
	};

	let mut rng = rand::rng();
	let mut names = Vec::with_capacity(count);
	for _ in 0..count {
		match chain.generate(&mut rng, min_len, nb_try) {
			Ok(name) => names.push(name),
			Err(e) => return HttpResponse::InternalServerError().body(e),
		}
	}

	HttpResponse::Ok().body(names.join("\n"))
}

#[get("/v1/chains")]
async fn get_chains() -> impl Responder {
	match io::list_files("./chains", "json") {
		Ok(files) => HttpResponse::Ok().body(files.join("\n").replace(".json", "")),
		Err(_) => HttpResponse::InternalServerError().body("Failed to list chains"),
	}
}

#[get("/v1/loaded_chains")]
async fn get_loaded_chains(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Chain lock failed"),
	};
	let names: Vec<&str> = shared_data.chains.keys().map(String::as_str).collect();
	HttpResponse::Ok().body(names.join("\n"))
}

#[put("/v1/load_chains")]
async fn put_chains(
	data: web::Data<Mutex<SharedData>>,
	query: web::Query<ChainQuery>,
) -> impl Responder {
	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Chain lock failed"),
	};

	let query_names = match &query.names {
		Some(s) if !s.trim().is_empty() => s.trim(),
		_ => return HttpResponse::BadRequest().body("Missing or empty chain name"),
	};

	let chain_names: Vec<&str> = query_names
		.split(',')
		.map(|s| s.trim())
		.filter(|s| !s.is_empty())
		.collect();

	shared_data.chains.clear();
	for name in chain_names {
		let chain_path = format!("./chains/{}.json", name);
		let chain: CompiledChain = match io::read_json(&chain_path) {
			Ok(chain) => chain,
			Err(e) => {
				return HttpResponse::InternalServerError()
					.body(format!("Failed to load chain: {e}"));
			}
		};
		shared_data.chains.insert(name.to_owned(), chain);
	}

	HttpResponse::Ok().body("Chains loaded successfully")
}

/// Main entry point for the server.
///
/// Starts with an empty chain registry, wraps it in a `Mutex` for thread
/// safety, and starts an Actix-web HTTP server; chains are loaded from the
/// `./chains` directory through the `/v1/load_chains` endpoint.
///
/// # Notes
/// - The server binds to 127.0.0.1:5000.
/// - Currently, the chains directory is hardcoded and should be made configurable.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	let shared_data = SharedData {
		chains: HashMap::new(),
	};
	let shared_chains = web::Data::new(Mutex::new(shared_data));

	HttpServer::new(move || {
		App::new()
			.wrap(Cors::permissive())
			.app_data(shared_chains.clone())
			.service(get_generated)
			.service(get_chains)
			.service(put_chains)
			.service(get_loaded_chains)
	})
		.bind(("127.0.0.1", 5000))?
		.run()
		.await
}
