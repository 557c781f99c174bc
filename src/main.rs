use clap::Parser;
use saverx_chat_proxy::cors::CorsPolicy;
use saverx_chat_proxy::io_struct::{DEFAULT_MAX_INPUT_ITEMS, DEFAULT_MODEL};
use saverx_chat_proxy::relay_state::{DEFAULT_UPSTREAM_URL, RelayConfig};
use saverx_chat_proxy::server;

#[derive(Parser, Debug)]
#[command(name = "saverx-chat-proxy")]
#[command(about = "SaveRx chat relay - forwards browser chat requests to an upstream completions API")]
struct CliArgs {
    /// Host address to bind the relay
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the relay
    #[arg(long, default_value_t = 8787)]
    port: u16,

    /// Upstream completions endpoint
    #[arg(long, default_value = DEFAULT_UPSTREAM_URL)]
    upstream_url: String,

    /// Model identifier sent with every upstream request
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Upstream API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Conversation items kept per upstream request, system preamble included
    #[arg(long, default_value_t = DEFAULT_MAX_INPUT_ITEMS)]
    max_input_items: usize,

    /// Additional origin allowed to read responses (exact match, repeatable)
    #[arg(long = "allowed-origin")]
    allowed_origins: Vec<String>,

    /// Overall upstream request timeout in seconds; no deadline when unset
    #[arg(long)]
    request_timeout_secs: Option<u64>,

    /// Maximum inbound request body size in bytes
    #[arg(long, default_value_t = 1024 * 1024)]
    max_payload_size: usize,

    /// Log level
    #[arg(long, default_value = "info", value_parser = ["trace", "debug", "info", "warn", "error"])]
    log_level: String,
}

impl CliArgs {
    fn to_relay_config(&self) -> RelayConfig {
        RelayConfig {
            host: self.host.clone(),
            port: self.port,
            upstream_url: self.upstream_url.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone().filter(|key| !key.is_empty()),
            max_input_items: self.max_input_items,
            cors: CorsPolicy::default().with_extra_origins(self.allowed_origins.clone()),
            request_timeout_secs: self.request_timeout_secs,
            max_payload_size: self.max_payload_size,
            log_level: self.log_level.parse().unwrap_or(log::LevelFilter::Info),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let relay_config = args.to_relay_config();
    actix_web::rt::System::new().block_on(server::startup(relay_config))
}
