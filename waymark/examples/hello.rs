use waymark::prelude::*;
use waymark::observability::TracingConfig;

#[derive(Debug, Serialize, JsonSchema)]
struct Greeting {
    message: String,
    excited: bool,
}

#[derive(Default)]
struct Greeter {
    salutation: String,
}

#[derive(Injectable)]
struct Hello {
    greeter: Arc<Greeter>,
}

#[endpoint]
impl Hello {
    /// Greets `name`.
    #[get]
    async fn greet(&self, name: String, #[param(default = false)] excited: bool) -> Json<Greeting> {
        let name = if name.is_empty() { "world" } else { &name };
        let mut message = format!("{}, {name}", self.greeter.salutation);
        if excited {
            message.push('!');
        }
        Json(Greeting { message, excited })
    }
}

// GET /api/hello?name=waymark&excited=true
#[tokio::main]
async fn main() -> std::io::Result<()> {
    load_dotenv();
    let config = WaymarkConfig::from_env().map_err(std::io::Error::other)?;

    Waymark::new()
        .with_tracing(TracingConfig::new().format(config.log_format))
        .with_config(config)
        .services(|s| {
            s.add_singleton(Greeter {
                salutation: "Hello".to_string(),
            });
        })
        .with_introspection(true)
        .openapi("hello", "0.1.0")
        .discover()
        .map_err(std::io::Error::other)?
        .serve()
        .await
}
