use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "jobfeed-query", about = "Read-only freelance job feed query service")]
pub struct Config {
    /// Legacy bypass credential, checked by literal match before the credential service.
    /// A documented backdoor for local/staging use; disable in production deployments.
    #[arg(long, env = "API_KEY")]
    pub api_key: Option<String>,

    /// Google Cloud project id hosting the origin Firestore database.
    /// If absent, read from the service account credential file.
    #[arg(long, env = "FIREBASE_PROJECT_ID")]
    pub firebase_project_id: Option<String>,

    /// Path to the service account credentials JSON used to authenticate to Firestore.
    #[arg(long, env = "FIREBASE_SERVICE_ACCOUNT_PATH")]
    pub firebase_service_account_path: Option<String>,

    /// Firestore collection holding full job records.
    #[arg(long, env = "FIRESTORE_COLLECTION", default_value = "individual_jobs")]
    pub firestore_collection: String,

    /// Firestore collection holding job summary records.
    #[arg(long, env = "FIRESTORE_JOB_LIST_COLLECTION", default_value = "job_list")]
    pub firestore_job_list_collection: String,

    /// Redis endpoint backing the cache adapter.
    #[arg(long, env = "REDIS_ADDR", default_value = "localhost:6379")]
    pub redis_addr: String,

    /// Redis AUTH password, if the deployment requires one.
    #[arg(long, env = "REDIS_PASSWORD")]
    pub redis_password: Option<String>,

    /// Listen port for the HTTP surface.
    #[arg(long, env = "PORT", default_value = "8080")]
    pub port: u16,
}

impl Config {
    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    pub fn redis_url(&self) -> String {
        match &self.redis_password {
            Some(password) => format!("redis://:{password}@{}", self.redis_addr),
            None => format!("redis://{}", self.redis_addr),
        }
    }
}
