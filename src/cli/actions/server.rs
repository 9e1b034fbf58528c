use crate::accounts::{self, templates::Templates};
use anyhow::Result;
use tracing::{debug, info};
use url::Url;

pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub template_dir: Option<String>,
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("port", &self.port)
            .field("dsn", &redact_dsn(&self.dsn))
            .field("template_dir", &self.template_dir)
            .finish()
    }
}

/// DSN with the password replaced by `***`.
#[must_use]
pub fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("***"));
            }
            url.to_string()
        }
        Err(_) => "***".to_string(),
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if templates cannot be loaded, the database is unreachable, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("Server args: {:?}", args);

    let templates = match &args.template_dir {
        Some(dir) => {
            info!("Loading templates from {}", dir);
            Templates::from_dir(dir)?
        }
        None => {
            debug!("Using embedded templates");
            Templates::embedded()?
        }
    };

    accounts::new(args.port, args.dsn, templates).await
}
