use chimera_core::prelude::*;
use chimera_http::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ==================== 数据模型 ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct User {
    id: String,
    name: String,
    email: String,
}

// ==================== 服务层 ====================

struct UserService {
    users: Vec<User>,
}

impl UserService {
    fn new() -> Self {
        Self {
            users: vec![
                User {
                    id: "1".to_string(),
                    name: "Alice".to_string(),
                    email: "alice@example.com".to_string(),
                },
                User {
                    id: "2".to_string(),
                    name: "Bob".to_string(),
                    email: "bob@example.com".to_string(),
                },
            ],
        }
    }

    fn find(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }
}

// ==================== 控制器 ====================

struct UserController {
    service: Arc<UserService>,
}

#[async_trait]
impl Controller for UserController {
    fn actions() -> &'static [&'static str] {
        &["index", "show"]
    }

    async fn call(
        &self,
        action: &str,
        _request: Request,
        params: Vec<String>,
    ) -> HttpResult<HandlerOutput> {
        match action {
            "index" => Ok(serde_json::to_value(&self.service.users)?.into()),
            "show" => {
                let id = params.first().map(String::as_str).unwrap_or_default();
                let user = self
                    .service
                    .find(id)
                    .ok_or_else(|| HttpError::not_found(format!("User {} not found", id)))?;
                Ok(serde_json::to_value(user)?.into())
            }
            other => Err(HttpError::not_found(format!("Unknown action {}", other))),
        }
    }
}

// ==================== 路由 ====================

fn routes(router: &mut Router) {
    router.get("/", |_req: Request| async {
        json!({
            "message": "Welcome to Chimera HTTP!",
            "version": "1.0.0"
        })
    });

    router.get("/users/:id", |_req: Request, id: String| async move {
        json!({
            "user_id": id,
            "status": "active"
        })
    });

    router.post("/login", |req: Request| async move {
        let email = req.input_str("email").unwrap_or_default();
        json!({
            "success": true,
            "message": format!("Logged in as {}", email)
        })
    });

    router.group(
        GroupAttributes::new()
            .prefix("api")
            .middleware(MiddlewareUnit::new(CorsMiddleware::new())),
        |api| {
            api.get("/users", controller::<UserController>("index"));
            api.get("/users/:id", controller::<UserController>("show"));
            api.post("/profile", |req: Request| async move {
                json!({ "profile": req.all() })
            })
            .middleware([
                MiddlewareUnit::new(TrimStrings::new()),
                MiddlewareUnit::new(ConvertEmptyStringsToNull),
            ]);
        },
    );
}

#[tokio::main]
async fn main() -> ApplicationResult<()> {
    let config_file = if std::path::Path::new("demos/http-demo/application.toml").exists() {
        "demos/http-demo/application.toml"
    } else {
        "application.toml"
    };

    let context = ChimeraApplication::new("HttpDemo")
        .config_file(config_file)
        .env_prefix("HTTP_DEMO_")
        .logging(LoggingConfig::from_env())
        .plugin(chimera_http::HttpPlugin)
        .initializer(|ctx| {
            ctx.register_instance(UserService::new());
            ctx.register_singleton(|ctx| {
                Ok(UserController {
                    service: ctx.make::<UserService>()?,
                })
            });
            Ok(())
        })
        .run()
        .await?;

    let mut kernel = Kernel::new(context);
    kernel
        .prepend_middleware(MiddlewareUnit::new(RequestLoggingMiddleware))
        .push_middleware(MiddlewareUnit::new(RequestIdMiddleware));
    routes(kernel.router_mut());

    for route in kernel.router().routes() {
        tracing::info!(method = %route.method(), path = %route.path(), "Route registered");
    }

    HttpServer::from_kernel(Arc::new(kernel))?.run().await
}
