use crate::{
    application::{
        app::{AccountPage, Application},
        header::HeaderView,
    },
    domain::{errors::ExplorerError, models::AccountName},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;

pub fn router<A>(app: Arc<A>) -> Router
where
    A: Application + Send + Sync + 'static,
{
    Router::new()
        .route("/accounts/:name", get(get_account_page::<A>))
        .route("/header", get(get_header::<A>))
        .route("/header/menu-toggle", post(toggle_menu::<A>))
        .with_state(app)
        .layer(CorsLayer::permissive())
}

pub async fn start_server<A>(
    shutdown: broadcast::Sender<()>,
    app: Arc<A>,
    port: u16,
) -> anyhow::Result<()>
where
    A: Application + Send + Sync + 'static,
{
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    let server = axum::serve(listener, router(app));

    tracing::info!("API server started on port {}", port);

    let mut shutdown_rx = shutdown.subscribe();

    tokio::select! {
        _ = shutdown_rx.recv() => {
            tracing::warn!("API server received shutdown signal");
        }
        result = server => {
            if let Err(e) = result {
                tracing::error!("API server stopped unexpectedly: {:?}", e);
            }
        }
    }

    Ok(())
}

async fn get_account_page<A: Application>(
    State(app_state): State<Arc<A>>,
    Path(name): Path<String>,
) -> Result<Json<AccountPage>, StatusCode> {
    let name = AccountName::parse(&name).map_err(status_for)?;
    app_state
        .account_page(name)
        .await
        .map(Json)
        .map_err(status_for)
}

async fn get_header<A: Application>(State(app_state): State<Arc<A>>) -> Json<HeaderView> {
    Json(app_state.header().view().clone())
}

async fn toggle_menu<A: Application>(State(app_state): State<Arc<A>>) -> StatusCode {
    app_state.header().toggle_menu();
    StatusCode::NO_CONTENT
}

fn status_for(error: ExplorerError) -> StatusCode {
    tracing::warn!("Account request failed: {}", error);
    match error {
        ExplorerError::InvalidAccountName(_) => StatusCode::BAD_REQUEST,
        ExplorerError::Collaborator(_) => StatusCode::BAD_GATEWAY,
        ExplorerError::MissingTableKey(_) | ExplorerError::StreamClosed(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::header::Header;
    use crate::config::BrandingConfig;
    use crate::domain::errors::CollaboratorError;
    use crate::domain::models::{AccountRecord, EnrichedAccount, RawAccount};
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use chrono::Utc;
    use futures::StreamExt;
    use serde_json::{json, Map, Value};
    use tower::ServiceExt;

    struct StaticApp {
        page: Result<AccountPage, ExplorerError>,
        header: Header,
    }

    #[async_trait::async_trait]
    impl Application for StaticApp {
        async fn account_page(&self, _name: AccountName) -> Result<AccountPage, ExplorerError> {
            self.page.clone()
        }

        fn header(&self) -> &Header {
            &self.header
        }
    }

    fn page(name: &str) -> AccountPage {
        let name = AccountName::new(name);
        AccountPage {
            name: name.clone(),
            account: EnrichedAccount {
                account: AccountRecord::named(name.clone()),
                raw: RawAccount {
                    account_name: name,
                    ram_quota: 0,
                    ram_usage: 0,
                    details: Map::new(),
                },
                balance: 1.5,
                ram_price: 0.01,
                tokens: vec![],
            },
            contract_tables: None,
            actions_sent: Some(vec![]),
            actions_received: None,
            eos_price: Some(4.0),
            rendered_at: Utc::now(),
        }
    }

    fn app(page: Result<AccountPage, ExplorerError>) -> Arc<StaticApp> {
        Arc::new(StaticApp {
            page,
            header: Header::new(&BrandingConfig::default()),
        })
    }

    async fn send(app: Arc<StaticApp>, method: Method, uri: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = router(app).oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[test]
    fn errors_map_to_status_codes() {
        assert_eq!(
            status_for(ExplorerError::InvalidAccountName("Bob!".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(ExplorerError::Collaborator(CollaboratorError::RequestFailed {
                service: "chain rpc",
                message: "timed out".into(),
            })),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(ExplorerError::StreamClosed("account")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn account_page_is_served_as_json() {
        let (status, body) = send(app(Ok(page("alice"))), Method::GET, "/accounts/alice").await;

        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["name"], json!("alice"));
        assert_eq!(body["account"]["ramPrice"], json!(0.01));
        assert_eq!(body["actions_received"], Value::Null);
        assert_eq!(body["eos_price"], json!(4.0));
    }

    #[tokio::test]
    async fn invalid_account_name_is_a_bad_request() {
        let (status, _) = send(app(Ok(page("alice"))), Method::GET, "/accounts/BOB").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn collaborator_failure_is_a_bad_gateway() {
        let failure = ExplorerError::Collaborator(CollaboratorError::UnexpectedResponse {
            service: "account index",
            message: "missing field `name`".into(),
        });
        let (status, _) = send(app(Err(failure)), Method::GET, "/accounts/alice").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn header_exposes_branding() {
        let (status, body) = send(app(Ok(page("alice"))), Method::GET, "/header").await;

        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            body,
            json!({
                "logo_url": "assets/img/logo.svg",
                "logo_url_1": "assets/img/logo-1.svg",
                "app_name": "EOS Explorer"
            })
        );
    }

    #[tokio::test]
    async fn menu_toggle_notifies_listeners() {
        let app = app(Ok(page("alice")));
        let mut toggles = app.header().on_menu_toggle();

        let (status, body) = send(app.clone(), Method::POST, "/header/menu-toggle").await;

        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_empty());
        assert_eq!(toggles.next().await, Some(()));
    }
}
