use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use editor_ai_proxy::ai::{
    AssistantService, ImageGenerationService, OpenAiAssistantClient, StabilityImageClient,
};
use editor_ai_proxy::app::App;
use editor_ai_proxy::auth::{AuthContext, Capability};
use editor_ai_proxy::dialog::{DialogController, DialogKind, DialogRequest, InsertionMode};
use editor_ai_proxy::forwarder::ImageForm;
use editor_ai_proxy::models::{Config, ForwardResponse, ProviderSettings};
use editor_ai_proxy::prompts::compose_text_prompt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// User id recorded for requests made from the command line.
const CLI_USER_ID: u64 = 0;

#[derive(Debug, Parser)]
#[command(name = "editor-ai-proxy")]
#[command(about = "Forward editor prompts to Stability.ai and OpenAI Assistants")]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP proxy.
    Serve,
    /// Generate, watermark and store one image; prints the <img> tag.
    Image {
        prompt: String,
        #[arg(long)]
        model: Option<String>,
        #[arg(long, default_value = "square")]
        aspect_ratio: String,
        #[arg(long)]
        context_id: Option<u64>,
    },
    /// Ask the configured assistant; prints its HTML reply.
    Ask {
        prompt: String,
        /// File whose contents are sent as editor context.
        #[arg(long)]
        context: Option<PathBuf>,
        #[arg(long)]
        assistant_id: Option<String>,
    },
    /// List the Stability.ai engines visible to the configured key.
    TestImage,
    /// Check the configured assistant id.
    TestAssistant {
        #[arg(long)]
        assistant_id: Option<String>,
    },
    /// Submit a prompt to a running proxy and splice the result into a file.
    Compose {
        /// Proxy base URL, e.g. http://127.0.0.1:8080
        #[arg(long)]
        server: String,
        #[arg(long, value_enum, default_value = "text")]
        kind: Kind,
        #[arg(long)]
        document: PathBuf,
        /// Byte range to replace or append after, as START..END.
        #[arg(long, value_parser = parse_range)]
        selection: Option<std::ops::Range<usize>>,
        #[arg(long, default_value = "replace", value_parser = parse_mode)]
        mode: InsertionMode,
        #[arg(long, default_value_t = 1)]
        user_id: u64,
        #[arg(long, default_value = "image:generate,text:generate")]
        capabilities: String,
        /// Extra form fields as NAME=VALUE (aspectratio, model, context, ...).
        #[arg(long = "option", value_parser = parse_option)]
        options: Vec<(String, String)>,
        #[arg(long, default_value_t = 120)]
        timeout: u64,
        prompt: String,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Kind {
    Image,
    Text,
}

fn parse_range(input: &str) -> std::result::Result<std::ops::Range<usize>, String> {
    let (start, end) = input
        .split_once("..")
        .ok_or_else(|| format!("Invalid range '{}'. Expected START..END", input))?;
    let start = start
        .trim()
        .parse()
        .map_err(|_| format!("Invalid range start '{}'", start))?;
    let end = end
        .trim()
        .parse()
        .map_err(|_| format!("Invalid range end '{}'", end))?;
    Ok(start..end)
}

fn parse_mode(input: &str) -> std::result::Result<InsertionMode, String> {
    Ok(InsertionMode::parse(input))
}

fn parse_option(input: &str) -> std::result::Result<(String, String), String> {
    input
        .split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .ok_or_else(|| format!("Invalid option '{}'. Expected NAME=VALUE", input))
}

fn print_envelope(response: &ForwardResponse) -> Result<()> {
    if response.success {
        if !response.content.is_empty() {
            println!("{}", response.content);
        }
        if let Some(details) = &response.details {
            match details {
                serde_json::Value::String(text) => print!("{}", text),
                other => println!("{}", serde_json::to_string_pretty(other)?),
            }
        }
        Ok(())
    } else {
        anyhow::bail!("{}", response.error)
    }
}

fn stability_settings(config: &Config) -> Result<ProviderSettings> {
    Ok(ProviderSettings {
        api_key: config
            .stability
            .api_key
            .clone()
            .context("STABILITY_API_KEY not set")?,
        base_url: config.stability.base_url.clone(),
        timeout: Duration::from_secs(config.stability.timeout_secs),
    })
}

fn openai_client(config: &Config, assistant_id: Option<String>) -> Result<OpenAiAssistantClient> {
    let settings = ProviderSettings {
        api_key: config
            .openai
            .api_key
            .clone()
            .context("OPENAI_API_KEY not set")?,
        base_url: config.openai.base_url.clone(),
        timeout: Duration::from_secs(config.openai.timeout_secs),
    };
    let assistant_id = assistant_id
        .or_else(|| config.openai.assistant_id.clone())
        .context("OPENAI_ASSISTANT_ID not set")?;
    Ok(OpenAiAssistantClient::new(settings, assistant_id))
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Serve => {
            let config = Config::from_env()?;
            editor_ai_proxy::server::run(config).await?;
        }
        Command::Image {
            prompt,
            model,
            aspect_ratio,
            context_id,
        } => {
            let app = App::new(Config::from_env()?).await?;
            let operator = AuthContext::new(CLI_USER_ID, &[Capability::GenerateImage]);
            let form = ImageForm {
                action: "generate".to_string(),
                prompt,
                model,
                aspectratio: Some(aspect_ratio),
                contextid: context_id.map(|id| id.to_string()),
                ..ImageForm::default()
            };
            print_envelope(&app.forward_image(&operator, form).await)?;
        }
        Command::Ask {
            prompt,
            context,
            assistant_id,
        } => {
            let config = Config::from_env()?;
            let context = match context {
                Some(path) => Some(
                    std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?,
                ),
                None => None,
            };
            let client = openai_client(&config, assistant_id)?;
            let reply = client
                .ask(&compose_text_prompt(&prompt, context.as_deref()))
                .await?;
            println!("{}", editor_ai_proxy::ai::strip_code_fence(&reply));
        }
        Command::TestImage => {
            let config = Config::from_env()?;
            let client = StabilityImageClient::new(stability_settings(&config)?);
            for model in client.test_connection().await? {
                println!("{}", model);
            }
        }
        Command::TestAssistant { assistant_id } => {
            let config = Config::from_env()?;
            let report = openai_client(&config, assistant_id)?.test_connection().await?;
            print!("{}", report.describe());
        }
        Command::Compose {
            server,
            kind,
            document,
            selection,
            mode,
            user_id,
            capabilities,
            options,
            timeout,
            prompt,
        } => {
            let original = std::fs::read_to_string(&document)
                .with_context(|| format!("Failed to read {}", document.display()))?;
            let kind = match kind {
                Kind::Image => DialogKind::Image,
                Kind::Text => DialogKind::Text,
            };
            let session_key = std::env::var("SESSION_KEY").ok();
            let request = options.iter().fold(
                DialogRequest::new(kind, &server, &prompt).identity(
                    user_id,
                    &capabilities,
                    session_key.as_deref(),
                ),
                |request, (name, value)| request.option(name, value),
            );

            let selection = selection.unwrap_or(original.len()..original.len());
            let mut controller = DialogController::new(mode);
            let updated = controller
                .submit(
                    &request,
                    &reqwest::Client::new(),
                    Duration::from_secs(timeout),
                    &original,
                    selection,
                )
                .await;

            match updated {
                Some(updated) => {
                    std::fs::write(&document, updated)?;
                    info!("Updated {}", document.display());
                }
                None => {
                    let message = controller
                        .banner()
                        .map(|banner| banner.message().to_string())
                        .unwrap_or_else(|| "Request failed".to_string());
                    anyhow::bail!(message);
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "editor_ai_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    if let Err(e) = run(args.command).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("3..10").unwrap(), 3..10);
        assert!(parse_range("3-10").unwrap_err().contains("START..END"));
        assert!(parse_range("a..1").is_err());
    }

    #[test]
    fn test_parse_option() {
        assert_eq!(
            parse_option("aspectratio=landscape").unwrap(),
            ("aspectratio".to_string(), "landscape".to_string())
        );
        assert!(parse_option("nope").is_err());
    }

    #[test]
    fn test_cli_parses_compose() {
        let args = CliArgs::try_parse_from([
            "editor-ai-proxy",
            "compose",
            "--server",
            "http://localhost:8080",
            "--kind",
            "image",
            "--document",
            "page.html",
            "--selection",
            "0..4",
            "--mode",
            "append",
            "--option",
            "aspectratio=portrait",
            "a lighthouse",
        ])
        .unwrap();

        match args.command {
            Command::Compose {
                selection,
                mode,
                options,
                prompt,
                ..
            } => {
                assert_eq!(selection, Some(0..4));
                assert_eq!(mode, InsertionMode::Append);
                assert_eq!(options.len(), 1);
                assert_eq!(prompt, "a lighthouse");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
