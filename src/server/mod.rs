pub mod api;
pub mod error;
pub mod extract;
pub mod routes;

use axum::Router;
use std::error::Error;
use std::sync::Arc;
use tower_http::cors::{ Any, CorsLayer };

use crate::auth::{ AuthService, PasswordHasher, TokenService };
use crate::chat::ChatService;
use crate::cli::Args;
use crate::records::{ AppointmentService, EmergencyService };
use crate::store::Store;
use crate::triage::Predictor;

pub use error::ApiError;

/// Services shared by every handler. All of them are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub chat: Arc<ChatService>,
    pub appointments: Arc<AppointmentService>,
    pub emergencies: Arc<EmergencyService>,
    pub predictor: Arc<Predictor>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        tokens: Arc<TokenService>,
        hasher: PasswordHasher,
        predictor: Arc<Predictor>
    ) -> Self {
        Self {
            auth: Arc::new(AuthService::new(store.clone(), tokens, hasher)),
            chat: Arc::new(ChatService::new(store.clone())),
            appointments: Arc::new(AppointmentService::new(store.clone())),
            emergencies: Arc::new(EmergencyService::new(store)),
            predictor,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .merge(routes::auth::router())
        .merge(routes::appointments::router())
        .merge(routes::chat::router())
        .merge(routes::emergency::router())
        .merge(routes::predict::router())
        .layer(cors)
        .with_state(state)
}

pub struct Server {
    addr: String,
    state: AppState,
    args: Args,
}

impl Server {
    pub fn new(addr: String, state: AppState, args: Args) -> Self {
        Self { addr, state, args }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        api::start_http_server(&self.addr, router(self.state.clone()), &self.args).await
    }
}
