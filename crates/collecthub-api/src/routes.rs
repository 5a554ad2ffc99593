use crate::{collection_handlers as records, handlers, user_handlers as users, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use collecthub_core::{Book, CollectionModel, Movie, Pet, Quote, Recipe, Travel};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/ping", get(handlers::ping))
        .route("/health", get(handlers::health))
        // Users
        .route("/api/users", post(users::create_user).get(users::list_users))
        .route("/api/users/login", post(users::login))
        // Personality analysis
        .route(
            "/api/aipersonality/analysis",
            post(handlers::personality_analysis),
        );

    // Collections
    let router = collection_routes::<Book>(router);
    let router = collection_routes::<Recipe>(router);
    let router = collection_routes::<Movie>(router);
    let router = collection_routes::<Quote>(router);
    let router = collection_routes::<Pet>(router);
    let router = collection_routes::<Travel>(router);

    router
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// `/api/<collection>` create, list-by-user, get, update and delete.
fn collection_routes<M: CollectionModel>(router: Router<AppState>) -> Router<AppState> {
    let base = format!("/api/{}", M::COLLECTION);
    router
        .route(&base, post(records::create_record::<M>))
        .route(
            &format!("{}/user/{{user_id}}", base),
            get(records::list_by_user::<M>),
        )
        .route(
            &format!("{}/{{id}}", base),
            get(records::get_record::<M>)
                .put(records::update_record::<M>)
                .delete(records::delete_record::<M>),
        )
}
