use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::json;

use spendgate_access::{
    AccessStore, CompanyModuleSetting, ModuleType, PermissionRecord, RolePermissionDefault,
    SystemModule,
};
use spendgate_api::app::{build_app, default_menu};
use spendgate_api::middleware::{COMPANY_HEADER, ROLE_HEADER, USER_HEADER};
use spendgate_core::role::roles;
use spendgate_core::{CompanyId, ModuleId, PermissionId, PermissionKey, Role, UserId};
use spendgate_infra::InMemoryAccessStore;

struct TestServer {
    base_url: String,
    store: Arc<InMemoryAccessStore>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod; only the store behind it differs.
        let store = Arc::new(InMemoryAccessStore::new());
        let app = build_app(store.clone(), store.clone(), default_menu());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            store,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct Identity {
    user_id: UserId,
    role: &'static str,
    company_id: Option<CompanyId>,
}

impl Identity {
    fn new(role: &'static str, company_id: Option<CompanyId>) -> Self {
        Self {
            user_id: UserId::new(),
            role,
            company_id,
        }
    }
}

fn with_identity(req: reqwest::RequestBuilder, identity: &Identity) -> reqwest::RequestBuilder {
    let req = req
        .header(USER_HEADER, identity.user_id.to_string())
        .header(ROLE_HEADER, identity.role);
    match identity.company_id {
        Some(company_id) => req.header(COMPANY_HEADER, company_id.to_string()),
        None => req,
    }
}

struct Seeded {
    company_id: CompanyId,
    expenses: ModuleId,
    vendors: ModuleId,
    approve: PermissionId,
}

/// Expenses is a locked core module, vendors an add-on the company enabled.
/// Controllers get `expenses.approve` by role default.
async fn seed(store: &InMemoryAccessStore) -> Seeded {
    let company_id = CompanyId::new();
    let expenses = ModuleId::new();
    let vendors = ModuleId::new();
    let approve = PermissionId::new();

    store.seed_modules(vec![
        SystemModule {
            id: expenses,
            name: "expenses".to_string(),
            module_type: ModuleType::Core,
            category: Some("spend".to_string()),
            allowed_roles: None,
        },
        SystemModule {
            id: vendors,
            name: "vendors".to_string(),
            module_type: ModuleType::AddOn,
            category: Some("spend".to_string()),
            allowed_roles: None,
        },
    ]);
    store.seed_permissions(vec![PermissionRecord {
        id: approve,
        key: PermissionKey::new("expenses.approve"),
        name: "Approve expenses".to_string(),
        category: Some("expenses".to_string()),
        module_id: Some(expenses),
    }]);
    store.seed_role_defaults(vec![RolePermissionDefault {
        role: Role::new(roles::CONTROLLER),
        permission_id: approve,
        module_id: Some(expenses),
        is_default: true,
    }]);
    for (module_id, locked) in [(expenses, true), (vendors, false)] {
        store
            .upsert_company_module_setting(CompanyModuleSetting {
                company_id,
                module_id,
                is_enabled: true,
                is_locked_by_system: locked,
            })
            .await
            .unwrap();
    }

    Seeded {
        company_id,
        expenses,
        vendors,
        approve,
    }
}

#[tokio::test]
async fn requests_without_identity_headers_are_unauthorized() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(server.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(server.url("/whoami"))
        .header(USER_HEADER, "not-a-uuid")
        .header(ROLE_HEADER, "user")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn whoami_echoes_the_resolved_identity() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let identity = Identity::new(roles::CONTROLLER, Some(CompanyId::new()));

    let res = with_identity(client.get(server.url("/whoami")), &identity)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["user_id"], json!(identity.user_id.to_string()));
    assert_eq!(body["role"], json!("controller"));
    assert_eq!(
        body["company_id"],
        json!(identity.company_id.unwrap().to_string())
    );
}

#[tokio::test]
async fn permission_check_reflects_role_defaults_and_fails_closed() {
    let server = TestServer::spawn().await;
    let seeded = seed(&server.store).await;
    let client = reqwest::Client::new();

    let controller = Identity::new(roles::CONTROLLER, Some(seeded.company_id));
    let res = with_identity(
        client.get(server.url("/access/permissions/check?key=expenses.approve")),
        &controller,
    )
    .send()
    .await
    .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["granted"], json!(true));
    assert_eq!(body["source"], json!("role_default"));

    // Unknown key is an ordinary denial, not an error.
    let res = with_identity(
        client.get(server.url("/access/permissions/check?key=no.such.key")),
        &controller,
    )
    .send()
    .await
    .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["granted"], json!(false));
    assert_eq!(body["source"], json!("fail_closed"));
}

#[tokio::test]
async fn batch_check_reports_fold_results() {
    let server = TestServer::spawn().await;
    let seeded = seed(&server.store).await;
    let client = reqwest::Client::new();
    let controller = Identity::new(roles::CONTROLLER, Some(seeded.company_id));

    let res = with_identity(
        client.post(server.url("/access/permissions/check")),
        &controller,
    )
    .json(&json!({ "keys": ["expenses.approve", "vendors.merge"] }))
    .send()
    .await
    .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["has_any"], json!(true));
    assert_eq!(body["has_all"], json!(false));
    assert_eq!(body["decisions"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn module_list_reflects_company_enablement() {
    let server = TestServer::spawn().await;
    let seeded = seed(&server.store).await;
    let client = reqwest::Client::new();
    let user = Identity::new(roles::USER, Some(seeded.company_id));

    let res = with_identity(client.get(server.url("/access/modules")), &user)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: serde_json::Value = res.json().await.unwrap();
    let names: Vec<&str> = body["modules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"expenses"));
    assert!(names.contains(&"vendors"));

    // Disabling vendors for the company takes effect on the next read.
    server
        .store
        .upsert_company_module_setting(CompanyModuleSetting {
            company_id: seeded.company_id,
            module_id: seeded.vendors,
            is_enabled: false,
            is_locked_by_system: false,
        })
        .await
        .unwrap();

    let res = with_identity(client.get(server.url("/access/modules")), &user)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    let names: Vec<&str> = body["modules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"expenses"));
    assert!(!names.contains(&"vendors"));
}

#[tokio::test]
async fn invalid_module_type_filter_is_a_bad_request() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let user = Identity::new(roles::USER, None);

    let res = with_identity(
        client.get(server.url("/access/modules?module_type=bogus")),
        &user,
    )
    .send()
    .await
    .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn company_module_check_is_scoped_to_the_callers_company() {
    let server = TestServer::spawn().await;
    let seeded = seed(&server.store).await;
    let client = reqwest::Client::new();

    let own = Identity::new(roles::USER, Some(seeded.company_id));
    let res = with_identity(
        client.get(server.url(&format!(
            "/access/companies/{}/modules/vendors",
            seeded.company_id
        ))),
        &own,
    )
    .send()
    .await
    .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["has_access"], json!(true));

    // A different company's modules are off-limits to non-super-admins.
    let foreign = Identity::new(roles::ADMIN, Some(CompanyId::new()));
    let res = with_identity(
        client.get(server.url(&format!(
            "/access/companies/{}/modules/vendors",
            seeded.company_id
        ))),
        &foreign,
    )
    .send()
    .await
    .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let platform = Identity::new(roles::SUPER_ADMIN, None);
    let res = with_identity(
        client.get(server.url(&format!(
            "/access/companies/{}/modules/vendors",
            seeded.company_id
        ))),
        &platform,
    )
    .send()
    .await
    .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn menu_preferences_shape_display_and_editable_views() {
    let server = TestServer::spawn().await;
    let seeded = seed(&server.store).await;
    let client = reqwest::Client::new();
    let user = Identity::new(roles::USER, Some(seeded.company_id));

    // Legacy bare-id entries are accepted alongside the object shape.
    let res = with_identity(client.put(server.url("/menu/preferences")), &user)
        .json(&json!({
            "preferences": [
                "settings",
                { "item_id": "dashboard", "is_hidden": true },
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = with_identity(client.get(server.url("/menu")), &user)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    let ids: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids[0], "settings");
    assert!(!ids.contains(&"dashboard"));

    // Editable mode shows the hidden item, flagged.
    let res = with_identity(client.get(server.url("/menu?mode=editable")), &user)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    let dashboard = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|i| i["id"] == "dashboard")
        .expect("dashboard present in editable view");
    assert_eq!(dashboard["is_hidden"], json!(true));
}

#[tokio::test]
async fn admin_grant_mutation_is_visible_on_the_next_check() {
    let server = TestServer::spawn().await;
    let seeded = seed(&server.store).await;
    let client = reqwest::Client::new();

    let admin = Identity::new(roles::ADMIN, Some(seeded.company_id));
    let controller = Identity::new(roles::CONTROLLER, Some(seeded.company_id));

    // Warm the cache with the role-default grant.
    let res = with_identity(
        client.get(server.url("/access/permissions/check?key=expenses.approve")),
        &controller,
    )
    .send()
    .await
    .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["granted"], json!(true));

    let res = with_identity(client.post(server.url("/admin/grants")), &admin)
        .json(&json!({
            "user_id": controller.user_id.to_string(),
            "permission_id": seeded.approve.to_string(),
            "company_id": seeded.company_id.to_string(),
            "is_granted": false,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = with_identity(
        client.get(server.url("/access/permissions/check?key=expenses.approve")),
        &controller,
    )
    .send()
    .await
    .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["granted"], json!(false));
    assert_eq!(body["source"], json!("explicit_deny"));
}

#[tokio::test]
async fn admin_mutations_are_role_and_company_gated() {
    let server = TestServer::spawn().await;
    let seeded = seed(&server.store).await;
    let client = reqwest::Client::new();

    let grant_body = json!({
        "user_id": UserId::new().to_string(),
        "permission_id": seeded.approve.to_string(),
        "company_id": seeded.company_id.to_string(),
        "is_granted": true,
    });

    // Plain users cannot mutate.
    let user = Identity::new(roles::USER, Some(seeded.company_id));
    let res = with_identity(client.post(server.url("/admin/grants")), &user)
        .json(&grant_body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Admins cannot reach into another company.
    let foreign_admin = Identity::new(roles::ADMIN, Some(CompanyId::new()));
    let res = with_identity(client.post(server.url("/admin/grants")), &foreign_admin)
        .json(&grant_body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Locking a module is reserved for super-admins.
    let admin = Identity::new(roles::ADMIN, Some(seeded.company_id));
    let res = with_identity(client.post(server.url("/admin/company-modules")), &admin)
        .json(&json!({
            "company_id": seeded.company_id.to_string(),
            "module_id": seeded.expenses.to_string(),
            "is_enabled": true,
            "is_locked_by_system": true,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let platform = Identity::new(roles::SUPER_ADMIN, None);
    let res = with_identity(client.post(server.url("/admin/company-modules")), &platform)
        .json(&json!({
            "company_id": seeded.company_id.to_string(),
            "module_id": seeded.expenses.to_string(),
            "is_enabled": true,
            "is_locked_by_system": true,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
}
