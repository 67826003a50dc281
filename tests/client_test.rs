//! HTTP contract of the API client against a mock server.

use std::sync::Arc;

use cejamsys_console::{
    ApiClient, ApiError, Backend, ClientConfig, EntityId, ListQuery, MemoryTokenStore, Record,
    TokenStore, Tokens,
};
use mockito::{Matcher, Server};
use serde_json::json;

fn client_with(server: &Server, tokens: Option<Tokens>) -> (ApiClient, Arc<MemoryTokenStore>) {
    let store = Arc::new(match tokens {
        Some(tokens) => MemoryTokenStore::with_tokens(tokens),
        None => MemoryTokenStore::new(),
    });
    let client = ApiClient::new(ClientConfig::new(server.url()), store.clone()).unwrap();
    (client, store)
}

fn logged_in(server: &Server) -> (ApiClient, Arc<MemoryTokenStore>) {
    client_with(server, Some(Tokens::new("old-access", "refresh-1")))
}

const ME: &str = r#"{"id": 1, "username": "secretaria", "first_name": "Maria", "last_name": "Lima", "email": "", "is_superuser": false, "groups": ["Secretaria"]}"#;

mod requests {
    use super::*;

    #[test]
    fn bearer_token_is_sent() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/api/auth/me/")
            .match_header("authorization", "Bearer old-access")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(ME)
            .create();

        let (client, _) = logged_in(&server);
        let user = client.me().unwrap();
        assert_eq!(user.display_name(), "Maria Lima");
        assert!(user.in_group("Secretaria"));
        mock.assert();
    }

    #[test]
    fn static_token_overrides_stored_tokens() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/api/auth/me/")
            .match_header("authorization", "Bearer ci-token")
            .with_status(200)
            .with_body(ME)
            .create();

        let store = Arc::new(MemoryTokenStore::with_tokens(Tokens::new("old-access", "r")));
        let config = ClientConfig::new(server.url()).static_token(Some("ci-token".into()));
        let client = ApiClient::new(config, store).unwrap();
        client.me().unwrap();
        mock.assert();
    }

    #[test]
    fn json_body_is_sent_with_content_type() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/api/alunos/")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({"nome_completo": "Ana Souza"})))
            .with_status(201)
            .with_body(r#"{"id": 10, "nome_completo": "Ana Souza"}"#)
            .create();

        let (client, _) = logged_in(&server);
        let payload: Record = json!({"nome_completo": "Ana Souza"})
            .as_object()
            .unwrap()
            .clone();
        let created = client.create("/alunos", &payload).unwrap();
        assert_eq!(created["id"], 10);
        mock.assert();
    }

    #[test]
    fn list_sends_page_and_search() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/api/alunos/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "2".into()),
                Matcher::UrlEncoded("search".into(), "ana souza".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"count": 51, "next": null, "previous": "x", "results": [{"id": 51}]}"#)
            .create();

        let (client, _) = logged_in(&server);
        let query = ListQuery::page(2).search(Some("ana souza"));
        let page = client.list("/alunos/", &query).unwrap();
        assert_eq!(page.count, 51);
        assert_eq!(page.results.len(), 1);
        mock.assert();
    }

    #[test]
    fn no_content_is_success() {
        let mut server = Server::new();
        let mock = server
            .mock("DELETE", "/api/alunos/4/")
            .with_status(204)
            .create();

        let (client, _) = logged_in(&server);
        client.delete("/alunos", &EntityId::Int(4)).unwrap();
        mock.assert();
    }

    #[test]
    fn action_posts_to_item_route() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/api/contratos/3/emitir/")
            .with_status(200)
            .with_body(r#"{"status": "EMITIDO"}"#)
            .create();

        let (client, _) = logged_in(&server);
        let result = client
            .action("/contratos", &EntityId::Int(3), "emitir")
            .unwrap();
        assert_eq!(result.unwrap()["status"], "EMITIDO");
        mock.assert();
    }

    #[test]
    fn login_is_anonymous_and_persists_tokens() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/api/auth/token/")
            .match_header("authorization", Matcher::Missing)
            .match_body(Matcher::Json(json!({"username": "secretaria", "password": "s3nh@"})))
            .with_status(200)
            .with_body(r#"{"access": "a-1", "refresh": "r-1"}"#)
            .create();

        let (client, store) = client_with(&server, None);
        assert!(!client.is_authenticated());
        client.login("secretaria", "s3nh@").unwrap();
        assert_eq!(store.load(), Some(Tokens::new("a-1", "r-1")));
        assert!(client.is_authenticated());
        mock.assert();
    }
}

mod errors {
    use super::*;

    #[test]
    fn detail_message_is_surfaced() {
        let mut server = Server::new();
        server
            .mock("POST", "/api/alunos/")
            .with_status(400)
            .with_body(r#"{"detail": "Aluno ja matriculado nesta turma."}"#)
            .create();

        let (client, _) = logged_in(&server);
        let err = client.create("/alunos", &Record::new()).unwrap_err();
        assert!(matches!(err, ApiError::Http { status: 400, .. }));
        assert_eq!(err.to_string(), "Aluno ja matriculado nesta turma.");
    }

    #[test]
    fn error_field_message_is_surfaced() {
        let mut server = Server::new();
        server
            .mock("POST", "/api/contratos/3/emitir/")
            .with_status(409)
            .with_body(r#"{"error": "Contrato ja emitido."}"#)
            .create();

        let (client, _) = logged_in(&server);
        let err = client
            .action("/contratos", &EntityId::Int(3), "emitir")
            .unwrap_err();
        assert_eq!(err.to_string(), "Contrato ja emitido.");
        assert_eq!(err.status(), Some(409));
    }

    #[test]
    fn status_fallback_without_body() {
        let mut server = Server::new();
        server
            .mock("GET", "/api/dashboard/")
            .with_status(502)
            .with_body("<html>Bad gateway</html>")
            .create();

        let (client, _) = logged_in(&server);
        let err = client.dashboard().unwrap_err();
        assert_eq!(err.to_string(), "Request failed (502)");
    }

    #[test]
    fn non_json_success_body_is_an_error() {
        let mut server = Server::new();
        server
            .mock("GET", "/api/dashboard/")
            .with_status(200)
            .with_body("ok")
            .create();

        let (client, _) = logged_in(&server);
        let err = client.dashboard().unwrap_err();
        assert!(matches!(err, ApiError::InvalidJson { .. }), "{:?}", err);
    }

    #[test]
    fn unreachable_backend_is_a_connectivity_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let store = Arc::new(MemoryTokenStore::new());
        let client =
            ApiClient::new(ClientConfig::new(format!("http://127.0.0.1:{}", port)), store).unwrap();

        let err = client.dashboard().unwrap_err();
        assert!(err.is_connectivity(), "{:?}", err);
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().starts_with("cannot connect to backend"));
    }
}

mod refresh {
    use super::*;

    #[test]
    fn expired_access_is_refreshed_and_replayed_once() {
        let mut server = Server::new();
        let expired = server
            .mock("GET", "/api/dashboard/")
            .match_header("authorization", "Bearer old-access")
            .with_status(401)
            .with_body(r#"{"detail": "Token expirado."}"#)
            .expect(1)
            .create();
        let refresh = server
            .mock("POST", "/api/auth/token/refresh/")
            .match_header("authorization", Matcher::Missing)
            .match_body(Matcher::Json(json!({"refresh": "refresh-1"})))
            .with_status(200)
            .with_body(r#"{"access": "new-access"}"#)
            .expect(1)
            .create();
        let replay = server
            .mock("GET", "/api/dashboard/")
            .match_header("authorization", "Bearer new-access")
            .with_status(200)
            .with_body(r#"{"stats": {"total_alunos": 3}, "recent_activity": []}"#)
            .expect(1)
            .create();

        let (client, store) = logged_in(&server);
        let dashboard = client.dashboard().unwrap();
        assert_eq!(dashboard.stats["total_alunos"], 3);
        assert_eq!(store.load(), Some(Tokens::new("new-access", "refresh-1")));

        expired.assert();
        refresh.assert();
        replay.assert();
    }

    #[test]
    fn second_unauthorized_clears_tokens() {
        let mut server = Server::new();
        server
            .mock("GET", "/api/dashboard/")
            .match_header("authorization", "Bearer old-access")
            .with_status(401)
            .expect(1)
            .create();
        let refresh = server
            .mock("POST", "/api/auth/token/refresh/")
            .with_status(200)
            .with_body(r#"{"access": "new-access"}"#)
            .expect(1)
            .create();
        let replay = server
            .mock("GET", "/api/dashboard/")
            .match_header("authorization", "Bearer new-access")
            .with_status(401)
            .with_body(r#"{"detail": "Usuario inativo."}"#)
            .expect(1)
            .create();

        let (client, store) = logged_in(&server);
        let err = client.dashboard().unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized { .. }));
        assert_eq!(err.to_string(), "Usuario inativo.");
        assert_eq!(err.exit_code(), 4);
        assert_eq!(store.load(), None);

        refresh.assert();
        replay.assert();
    }

    #[test]
    fn failed_refresh_clears_tokens_and_reports_original_failure() {
        let mut server = Server::new();
        let expired = server
            .mock("GET", "/api/dashboard/")
            .with_status(401)
            .with_body(r#"{"detail": "Token expirado."}"#)
            .expect(1)
            .create();
        let refresh = server
            .mock("POST", "/api/auth/token/refresh/")
            .with_status(401)
            .with_body(r#"{"detail": "Refresh invalido."}"#)
            .expect(1)
            .create();

        let (client, store) = logged_in(&server);
        let err = client.dashboard().unwrap_err();
        assert_eq!(err.to_string(), "Token expirado.");
        assert_eq!(store.load(), None);

        expired.assert();
        refresh.assert();
    }

    #[test]
    fn missing_refresh_token_skips_refresh() {
        let mut server = Server::new();
        server
            .mock("GET", "/api/dashboard/")
            .with_status(401)
            .create();
        let refresh = server
            .mock("POST", "/api/auth/token/refresh/")
            .expect(0)
            .create();

        let (client, store) = client_with(&server, Some(Tokens::new("old-access", "")));
        let err = client.dashboard().unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized { .. }));
        assert_eq!(store.load(), None);
        refresh.assert();
    }
}
