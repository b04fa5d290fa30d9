use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing::info;

use crew_assistant::api::CrewClient;
use crew_assistant::app::App;
use crew_assistant::auth::{self, OidcClient};
use crew_assistant::config::Config;
use crew_assistant::form::{OutputView, RequestForm};
use crew_assistant::{handler, logging, tui, ui};

#[derive(Parser)]
#[command(name = "crew-assistant")]
#[command(about = "Manage your calendar and contacts in plain language", version)]
struct Cli {
    /// Backend base URL (overrides CREW_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive terminal UI (default)
    Tui,
    /// Sign in through the browser, send one request and print the result
    Ask {
        /// What you would like to do, e.g. "Find contact information for Sarah"
        request: String,
    },
    /// Check that the backend is running
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }

    match cli.command.unwrap_or(Commands::Tui) {
        Commands::Tui => run_tui(&config).await,
        Commands::Ask { request } => {
            logging::init_stderr_logging();
            ask(&config, &request).await
        }
        Commands::Health => {
            logging::init_stderr_logging();
            health(&config).await
        }
    }
}

async fn run_tui(config: &Config) -> Result<()> {
    let _log_guard = logging::init_file_logging()?;
    info!(api_url = %config.api_url, "starting terminal UI");

    let mut app = App::new(config)?;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event).await?,
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    result
}

async fn ask(config: &Config, request: &str) -> Result<()> {
    let mut form = RequestForm::default();
    form.set_draft(request);

    // Validate before sending anyone to the browser
    if request.trim().is_empty() {
        form.begin_submit(None);
        return Err(anyhow!(form.error().unwrap_or_default().to_string()));
    }

    let oidc = OidcClient::new(config.oidc_settings()?);
    println!("{}", "🔐 Signing in with your browser...".bold().blue());
    let user = auth::signin(&oidc, |url| {
        println!("If the browser does not open, visit:\n  {}\n", url.cyan());
    })
    .await
    .context("Sign-in failed")?;

    if let Some(name) = user.display_name() {
        println!("Signed in as {}", name.bold());
    }

    let crew = CrewClient::new(config.api_base()?);
    if let Some(submission) = form.begin_submit(Some(&user.access_token)) {
        println!("🤖 Processing your request...\n");
        let result = crew.submit(&submission.token, &submission.user_request).await;
        form.finish(result);
    }

    match form.output(false) {
        OutputView::Success(text) => {
            println!("{}", "✅ Response".bold().green());
            println!("{}", text);
            Ok(())
        }
        OutputView::Error(message) => {
            println!("{}", "❌ Error".bold().red());
            Err(anyhow!(message.to_string()))
        }
        OutputView::Loading | OutputView::Empty => Ok(()),
    }
}

async fn health(config: &Config) -> Result<()> {
    let crew = CrewClient::new(config.api_base()?);

    match crew.health().await {
        Ok(status) => {
            println!(
                "{} {} {}",
                "●".green(),
                crew.base_url().as_str().bold(),
                status.status.green()
            );
            if let Some(message) = status.message {
                println!("  {}", message.dimmed());
            }
            Ok(())
        }
        Err(err) => {
            println!("{} {}", "●".red(), crew.base_url().as_str().bold());
            Err(anyhow!(err.user_message()))
        }
    }
}
