//! Test helpers for inbound HTTP components.

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpResponse, test, web};
use std::sync::Arc;

use crate::Trace;
use crate::domain::ports::{
    MockBranchCommand, MockBranchQuery, MockCounterCommand, MockCounterQuery, MockSyncQuery,
};
use crate::domain::{Error, UserId};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Actor written into the session by [`sign_in`].
pub const TEST_USER_ID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

/// Path the test apps mount [`sign_in`] on.
pub const SIGN_IN_PATH: &str = "/test/sign-in";

/// Session middleware with a throwaway key and a non-secure `session` cookie.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Handler standing in for the external login flow.
pub async fn sign_in(session: SessionContext) -> Result<HttpResponse, Error> {
    let id = UserId::new(TEST_USER_ID).map_err(|err| Error::internal(err.to_string()))?;
    session.persist_user(&id)?;
    Ok(HttpResponse::NoContent().finish())
}

/// Call [`SIGN_IN_PATH`] and return the session cookie it sets.
pub async fn session_cookie<S>(app: &S) -> Cookie<'static>
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let res = test::call_service(app, test::TestRequest::post().uri(SIGN_IN_PATH).to_request())
        .await;
    assert!(res.status().is_success(), "sign-in succeeds");
    res.response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie set")
        .into_owned()
}

/// Driving-port mocks; set expectations on the ports a test exercises.
#[derive(Default)]
pub struct MockPorts {
    pub branches: MockBranchCommand,
    pub branches_query: MockBranchQuery,
    pub counters: MockCounterCommand,
    pub counters_query: MockCounterQuery,
    pub sync: MockSyncQuery,
}

impl MockPorts {
    pub fn into_state(self) -> HttpState {
        HttpState {
            branches: Arc::new(self.branches),
            branches_query: Arc::new(self.branches_query),
            counters: Arc::new(self.counters),
            counters_query: Arc::new(self.counters_query),
            sync: Arc::new(self.sync),
        }
    }
}

/// The production API scope behind test sessions, plus [`SIGN_IN_PATH`].
pub fn test_app(
    state: HttpState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .wrap(test_session_middleware())
        .wrap(Trace)
        .route(SIGN_IN_PATH, web::post().to(sign_in))
        .service(web::scope("/api/v1").configure(super::configure))
}
