pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_APPLICATION_NAME: &str = "listings";

/// Where and as whom to connect. The port is always the server default.
#[derive(Clone)]
pub struct ConnectOptions {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub application_name: String,
}

impl ConnectOptions {
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        ConnectOptions {
            host: DEFAULT_HOST.to_string(),
            user: user.into(),
            password: password.into(),
            database: database.into(),
            application_name: DEFAULT_APPLICATION_NAME.to_string(),
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn application_name(mut self, application_name: impl Into<String>) -> Self {
        self.application_name = application_name.into();
        self
    }

    #[cfg(feature = "postgres")]
    pub fn to_pg_config(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.host)
            .user(&self.user)
            .password(&self.password)
            .dbname(&self.database)
            .application_name(&self.application_name);
        config
    }
}

// Keeps the password out of logs.
impl std::fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("application_name", &self.application_name)
            .finish()
    }
}
