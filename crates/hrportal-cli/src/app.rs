use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use hrportal_core::api::{google_login_url, GoogleFlow, Method};
use hrportal_core::auth::{FileBackend, KeyringBackend, MemoryBackend, SessionBackend};
use hrportal_core::{
    Access, ApiClient, AuthApi, ClientConfig, LogNotifier, Notifier, SessionGuard, SessionStatus,
    SessionStore, Settings, StorageKind,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::terminal::{muted, TerminalNavigator, TerminalNotifier};
use crate::{Args, Command};

pub struct App {
    config: ClientConfig,
    settings: Settings,
    store: SessionStore,
    notifier: Arc<dyn Notifier>,
    api: ApiClient,
}

impl App {
    pub fn new(args: &Args) -> Result<Self> {
        let config = ClientConfig::from_env().context("Invalid client configuration")?;
        let settings = match Settings::load() {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "Failed to load settings, using defaults");
                Settings::default()
            }
        };

        let storage = args.store.map(StorageKind::from).unwrap_or(settings.storage);
        let store = SessionStore::new(Self::backend(storage));
        match store.load() {
            Ok(found) => debug!(found, ?storage, "Session store ready"),
            Err(e) => warn!(error = %e, "Failed to load saved session"),
        }

        let (notifier, api): (Arc<dyn Notifier>, ApiClient) = if args.quiet {
            (
                Arc::new(LogNotifier),
                ApiClient::quiet(&config, store.clone())?,
            )
        } else {
            let notifier: Arc<dyn Notifier> = Arc::new(TerminalNotifier);
            let api = ApiClient::new(&config, store.clone(), notifier.clone())?;
            (notifier, api)
        };

        Ok(Self {
            config,
            settings,
            store,
            notifier,
            api,
        })
    }

    fn backend(kind: StorageKind) -> Arc<dyn SessionBackend> {
        match kind {
            StorageKind::Memory => Arc::new(MemoryBackend::new()),
            StorageKind::File => {
                let dir = Settings::cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
                Arc::new(FileBackend::new(dir))
            }
            StorageKind::Keyring => Arc::new(KeyringBackend::new()),
        }
    }

    pub async fn run(mut self, command: Command) -> Result<()> {
        let auth = AuthApi::new(self.api.clone());
        match command {
            Command::Signin { employee_id } => {
                let employee_id = match employee_id.or_else(|| self.settings.last_employee_id.clone()) {
                    Some(id) => id,
                    None => prompt("Employee ID: ")?,
                };
                let password = rpassword::prompt_password("Password: ")?;
                let session = auth.sign_in(&employee_id, &password).await?;
                println!("Signed in as {} ({})", session.display_name(), session.hr_role);

                self.settings.last_employee_id = Some(employee_id);
                if let Err(e) = self.settings.save() {
                    warn!(error = %e, "Failed to save settings");
                }
            }
            Command::GoogleSignin { email, id_token } => {
                let session = auth.sign_in_with_google(&email, &id_token).await?;
                println!("Signed in as {} ({})", session.display_name(), session.hr_role);
            }
            Command::GoogleUrl { signup } => {
                let flow = if signup { GoogleFlow::SignUp } else { GoogleFlow::SignIn };
                println!("{}", google_login_url(&self.config.api_url, &self.config.app_origin, flow));
            }
            Command::Register { employee_id } => {
                let password = rpassword::prompt_password("Password: ")?;
                print_strength(&password);
                let confirm = rpassword::prompt_password("Confirm password: ")?;
                auth.register(&employee_id, &password, &confirm).await?;
                println!("Registration successful, please sign in.");
            }
            Command::ForgotPassword { email } => {
                auth.forgot_password(&email).await?;
                println!("If the address is registered, a reset link is on its way.");
            }
            Command::ResetPassword { token } => {
                let password = rpassword::prompt_password("New password: ")?;
                print_strength(&password);
                let confirm = rpassword::prompt_password("Confirm password: ")?;
                auth.reset_password(&token, &password, &confirm).await?;
                println!("Password changed, please sign in.");
            }
            Command::Get { path } => self.send(Method::GET, &path, None).await?,
            Command::Post { path, data } => {
                self.send(Method::POST, &path, parse_data(data.as_deref())?).await?
            }
            Command::Put { path, data } => {
                self.send(Method::PUT, &path, parse_data(data.as_deref())?).await?
            }
            Command::Delete { path } => self.send(Method::DELETE, &path, None).await?,
            Command::Status => self.print_status(),
            Command::Watch => self.watch().await?,
            Command::Signout => {
                auth.sign_out()?;
                println!("Signed out.");
            }
        }
        Ok(())
    }

    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<()> {
        let response = self.api.request(method, path, body).await?;
        if !response.body.is_null() {
            println!("{}", serde_json::to_string_pretty(&response.body)?);
        }
        Ok(())
    }

    fn guard(&self) -> (SessionGuard, tokio::sync::mpsc::UnboundedReceiver<String>) {
        let (navigator, redirects) = TerminalNavigator::new();
        let guard = SessionGuard::new(self.store.clone(), self.notifier.clone(), Arc::new(navigator))
            .with_sign_in_path(&self.config.sign_in_path);
        (guard, redirects)
    }

    fn print_status(&self) {
        let Some(session) = self.store.get() else {
            println!("Not signed in.");
            return;
        };
        let (guard, _) = self.guard();
        match guard.status() {
            SessionStatus::Active { expires_in } => println!(
                "Signed in as {} ({}), session expires in {}m {}s",
                session.display_name(),
                session.hr_role,
                expires_in.as_secs() / 60,
                expires_in.as_secs() % 60
            ),
            SessionStatus::Expired => println!("Session for {} has expired.", session.display_name()),
            SessionStatus::Missing => println!("Not signed in."),
        }
    }

    /// Mount the guard and wait for the expiry flow or Ctrl-C.
    async fn watch(&self) -> Result<()> {
        let (guard, mut redirects) = self.guard();
        if guard.mount() == Access::Granted {
            println!("Session active. {}", muted("Press Ctrl-C to stop watching."));
        }

        tokio::select! {
            path = redirects.recv() => {
                if let Some(path) = path {
                    println!("Signed out. Continue at {}{}", self.config.app_origin, path);
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                guard.unmount();
            }
        }
        Ok(())
    }
}

fn prompt(label: &str) -> Result<String> {
    use std::io::Write;

    eprint!("{}", label);
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn parse_data(data: Option<&str>) -> Result<Option<Value>> {
    data.map(|raw| serde_json::from_str(raw).context("--data must be valid JSON"))
        .transpose()
}

fn print_strength(password: &str) {
    let strength = hrportal_core::auth::password_strength(password);
    if !strength.label().is_empty() {
        eprintln!("{}", muted(&format!("{} password", strength.label())));
    }
}
