use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use actix_cors::Cors;
use serde::Serialize;
use serde_json::Value;
use siftx_core::Collection;
use tracing::debug;

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

fn not_ready() -> HttpResponse {
    HttpResponse::ServiceUnavailable().json(ErrorBody {
        error: "index not ready",
    })
}

pub struct RestApi;

impl RestApi {
    /// Serve the collection under `prefix`:
    ///
    /// - `GET {prefix}/schema.json` - schema introspection
    /// - `GET {prefix}/searchMeta.json` - query capabilities
    /// - `GET {prefix}/search.json?field=value&offset=n` - query execution
    /// - `GET {prefix}/{row}.json` - single item
    ///
    /// Queries issued before the background build completes get 503; an
    /// out-of-range row id answers JSON `null` with 200 (a compatibility
    /// contract, not an error status).
    pub async fn start(
        collection: Collection,
        address: &str,
        prefix: &str,
    ) -> std::io::Result<()> {
        let prefix = prefix.trim_end_matches('/').to_string();

        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .app_data(web::Data::new(collection.clone()))
                .service(
                    web::scope(&prefix)
                        .route("/schema.json", web::get().to(get_schema))
                        .route("/searchMeta.json", web::get().to(get_search_meta))
                        .route("/search.json", web::get().to(search))
                        .route("/{row}.json", web::get().to(get_item)),
                )
        })
        .bind(address)?
        .run()
        .await
    }
}

async fn get_schema(collection: web::Data<Collection>) -> ActixResult<HttpResponse> {
    match collection.describe_schema() {
        Some(doc) => Ok(HttpResponse::Ok().json(doc)),
        None => Ok(not_ready()),
    }
}

async fn get_search_meta(collection: web::Data<Collection>) -> ActixResult<HttpResponse> {
    match collection.describe_search() {
        Some(doc) => Ok(HttpResponse::Ok().json(doc)),
        None => Ok(not_ready()),
    }
}

async fn search(
    collection: web::Data<Collection>,
    query: web::Query<Vec<(String, String)>>,
) -> ActixResult<HttpResponse> {
    let pairs = query.into_inner();
    let offset = pairs
        .iter()
        .find(|(key, _)| key == "offset")
        .map_or(0, |(_, value)| value.parse::<usize>().unwrap_or(0));

    debug!(params = pairs.len(), offset, "search request");

    match collection.search(&pairs, offset) {
        Some(response) => Ok(HttpResponse::Ok().json(response)),
        None => Ok(not_ready()),
    }
}

async fn get_item(
    collection: web::Data<Collection>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    if !collection.ready() {
        return Ok(not_ready());
    }
    let item = path
        .into_inner()
        .parse::<usize>()
        .ok()
        .and_then(|row| collection.get_item(row));
    match item {
        Some(item) => Ok(HttpResponse::Ok().json(item)),
        // absent rows answer an empty success, never an error status
        None => Ok(HttpResponse::Ok().json(Value::Null)),
    }
}
