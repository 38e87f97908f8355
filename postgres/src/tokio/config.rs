use tokio_postgres::Config;
use tokio_postgres::config::SslMode;

/// Connection parameters for a PostgreSQL database reached through `tokio-postgres`.
///
/// Bundles the network location, credentials and security settings a session needs
/// to open its connection.
#[derive(Debug, Clone)]
pub struct PgConnectionConfig {
    /// Host name or IP address of the PostgreSQL server
    pub host: String,
    /// Port number that the PostgreSQL server listens on
    pub port: u16,
    /// Name of the target database
    pub name: String,
    /// Username for authentication
    pub username: String,
    /// Optional password for authentication
    pub password: Option<String>,
    /// SSL mode for the connection
    pub ssl_mode: SslMode,
}

impl PgConnectionConfig {
    /// Returns a [`Config`] carrying every connection parameter of this instance,
    /// ready to connect to the configured database.
    pub fn with_db(&self) -> Config {
        let mut config = Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.name)
            .user(&self.username)
            .ssl_mode(self.ssl_mode);

        if let Some(password) = &self.password {
            config.password(password);
        }

        config
    }
}
