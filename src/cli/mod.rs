use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Server Args ---
    /// Host address and port for the HTTP server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:5000")]
    pub server_addr: String,

    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,

    // --- Store Args ---
    /// Document store type (memory, redis)
    #[arg(long, env = "STORE_TYPE", default_value = "memory")]
    pub store_type: String,

    /// Document store host endpoint (e.g., redis://127.0.0.1:6379)
    #[arg(long, env = "STORE_HOST", default_value = "redis://127.0.0.1:6379")]
    pub store_host: String,

    /// Prefix for Redis document keys.
    #[arg(long, env = "STORE_PREFIX", default_value = "healthdesk:")]
    pub store_prefix: String,

    // --- Auth Args ---
    /// Secret used to sign access tokens. Without it the server cannot issue tokens.
    #[arg(long, env = "JWT_SECRET_KEY")]
    pub jwt_secret: Option<String>,

    /// Lifetime of issued access tokens, in hours.
    #[arg(long, env = "TOKEN_TTL_HOURS", default_value = "24")]
    pub token_ttl_hours: u64,

    /// PBKDF2-SHA256 rounds used when hashing new passwords.
    #[arg(long, env = "PASSWORD_ITERATIONS", default_value = "100000")]
    pub password_iterations: u32,

    // --- Triage Args ---
    /// Directory holding the classifier artifacts (columns.json, encoder.json, model.json).
    #[arg(long, env = "MODEL_DIR", default_value = "data/model")]
    pub model_dir: String,

    /// Directory holding the disease lookup tables
    /// (description.json, medications.json, diets.json, precautions.json).
    #[arg(long, env = "KNOWLEDGE_DIR", default_value = "data/knowledge")]
    pub knowledge_dir: String,

    /// Minimum similarity (0.0 to 1.0) for a symptom to match a vocabulary column.
    #[arg(long, env = "MATCH_CUTOFF", default_value = "0.6")]
    pub match_cutoff: f64,
}
