//! Roundtable CLI - AI Group Discussion Practice
//!
//! Practice group discussions against a panel of AI personas, from the
//! terminal or through the HTTP service.

mod console;

use clap::{Parser, Subcommand};
use colored::Colorize;
use console::ConsoleInput;
use roundtable_core::tts::utterance_filename;
use roundtable_core::{
    ApiEndpoint, Config, DiscussionCallback, DiscussionEvent, DiscussionOrchestrator,
    ExclusiveRenderer, KokoroRenderer, LanguageToolChecker, LexiconSentiment, OpenAIResponder,
    PerformanceAnalyzer, PersonaRegistry, PersonaStyle, SeededRandom, SilentRenderer,
    SpeechRenderer, TurnSelector, WhisperTranscriber, config_with_style,
};
use roundtable_server::{AppState, DEFAULT_IDLE_TIMEOUT};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "roundtable",
    version,
    about = "AI Group Discussion - Practice discussions with AI teammates",
    long_about = "Hold a moderated group discussion with a panel of AI personas and get feedback on your participation."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Hold a discussion in the terminal
    Discuss {
        /// Topic to discuss (asked for interactively when omitted)
        #[arg(short, long, value_name = "TOPIC")]
        topic: Option<String>,

        /// Write each spoken line as a WAV file into this directory
        #[arg(long, value_name = "DIR")]
        audio_dir: Option<PathBuf>,

        /// Text only, no speech synthesis
        #[arg(long)]
        mute: bool,

        /// Seed for reproducible speaker selection
        #[arg(long, value_name = "SEED")]
        seed: Option<u64>,

        /// Persona prompt style: concise or natural
        #[arg(long, default_value = "concise", value_parser = parse_style, value_name = "STYLE")]
        style: PersonaStyle,

        /// Path to a TOML configuration file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Serve discussions over HTTP
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8000", value_name = "ADDR")]
        addr: SocketAddr,

        /// Persona prompt style: concise or natural
        #[arg(long, default_value = "natural", value_parser = parse_style, value_name = "STYLE")]
        style: PersonaStyle,

        /// Return text only, no speech synthesis
        #[arg(long)]
        mute: bool,

        /// Path to a TOML configuration file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Speak a greeting in each persona's voice
    Voices {
        /// Directory for the greeting WAV files
        #[arg(long, default_value = "voice-check", value_name = "DIR")]
        audio_dir: PathBuf,

        /// Path to a TOML configuration file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

fn parse_style(name: &str) -> Result<PersonaStyle, String> {
    PersonaStyle::parse(name)
        .ok_or_else(|| format!("Unknown style '{}'. Available styles: concise, natural", name))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();
    init_tracing();

    match Cli::parse().command {
        Command::Discuss {
            topic,
            audio_dir,
            mute,
            seed,
            style,
            config,
        } => {
            let config = load_config(config, style)?;
            discuss(config, topic, audio_dir, mute, seed).await
        }
        Command::Serve {
            addr,
            style,
            mute,
            config,
        } => {
            let config = load_config(config, style)?;
            serve(config, addr, mute).await
        }
        Command::Voices { audio_dir, config } => {
            let config = load_config(config, PersonaStyle::Concise)?;
            voices(config, audio_dir).await
        }
    }
}

/// Logs go to stderr so they never interleave with the transcript.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("roundtable=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<PathBuf>, style: PersonaStyle) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match path {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration");
            Config::load(path)?
        }
        None => config_with_style(style),
    };

    if let Ok(url) = env::var("LANGUAGETOOL_URL") {
        config.grammar.endpoint = url;
    }
    Ok(config)
}

fn api_endpoint() -> ApiEndpoint {
    let api_base = env::var("OPENAI_API_BASE")
        .or_else(|_| env::var("OPENAI_BASE_URL"))
        .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());

    let api_key = env::var("OPENAI_API_KEY").unwrap_or_else(|_| {
        eprintln!(
            "{}",
            "Warning: OPENAI_API_KEY not set. API calls may fail.".yellow()
        );
        String::new()
    });

    ApiEndpoint::new(api_base, api_key)
}

/// Kokoro behind the device lock, or silence when muted.
async fn build_renderer(
    config: &Config,
    mute: bool,
) -> Result<Arc<dyn SpeechRenderer>, Box<dyn std::error::Error>> {
    if mute {
        return Ok(Arc::new(SilentRenderer));
    }

    println!("{}", "Initializing text-to-speech engine...".dimmed());
    let kokoro = KokoroRenderer::new().await?;
    kokoro.validate_personas(PersonaRegistry::from_config(config)?.personas())?;
    Ok(Arc::new(ExclusiveRenderer::new(Arc::new(kokoro))))
}

fn build_analyzer(config: &Config) -> Result<PerformanceAnalyzer, Box<dyn std::error::Error>> {
    let analyzer = PerformanceAnalyzer::new(Arc::new(LexiconSentiment::new()));
    if !config.grammar.enabled {
        return Ok(analyzer);
    }
    Ok(analyzer.with_grammar(Arc::new(LanguageToolChecker::new(&config.grammar)?)))
}

async fn discuss(
    config: Config,
    topic: Option<String>,
    audio_dir: Option<PathBuf>,
    mute: bool,
    seed: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let endpoint = api_endpoint();
    if let Some(dir) = &audio_dir {
        std::fs::create_dir_all(dir)?;
    }

    let responder = Arc::new(OpenAIResponder::new(&endpoint, config.model.clone())?);
    let renderer = build_renderer(&config, mute).await?;
    let mut orchestrator = DiscussionOrchestrator::new(&config, responder, renderer)?
        .with_analyzer(build_analyzer(&config)?)
        .with_callback(create_console_callback(audio_dir));
    if let Some(seed) = seed {
        orchestrator = orchestrator.with_selector(TurnSelector::new(SeededRandom::new(seed)));
    }

    // Print header
    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!(
        "{}",
        format!("  {} - Group Discussion", "Roundtable".bold())
            .bright_blue()
            .bold()
    );
    println!("{}", "═".repeat(70).bright_blue());
    println!();
    println!("{}", "Panel:".bold());
    for (i, p) in orchestrator.registry().personas().iter().enumerate() {
        println!(
            "  {}. {} - voice {}",
            i + 1,
            p.name.bright_cyan(),
            p.voice_id.dimmed()
        );
    }
    println!();
    println!(
        "{}",
        format!(
            "Say {} at any time to end the discussion.",
            orchestrator
                .settings()
                .termination_phrases
                .iter()
                .map(|p| format!("'{}'", p))
                .collect::<Vec<_>>()
                .join(", ")
        )
        .dimmed()
    );
    println!("{}", "─".repeat(70).dimmed());

    let input = ConsoleInput::new();
    let (mut session, _) = match topic {
        Some(topic) => orchestrator.open(Some(topic)).await?,
        None => orchestrator.start(&input).await?,
    };

    let closing = loop {
        match orchestrator.run(&mut session, &input).await {
            Ok(closing) => break closing,
            Err(e) if input.is_closed() => {
                info!("Input closed, concluding: {e}");
                break orchestrator.conclude(&mut session).await?;
            }
            Err(e) if !e.is_fatal() => {
                warn!("Turn failed, listening again: {e}");
            }
            Err(e) => return Err(e.into()),
        }
    };

    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!("{}", "  Discussion concluded.".bright_green().bold());
    println!("{}", "═".repeat(70).bright_blue());
    println!();

    match closing.report {
        Some(report) => println!("{}", report),
        None => println!(
            "{}",
            "You did not speak during the discussion, so there is no report.".yellow()
        ),
    }
    println!();

    Ok(())
}

async fn serve(
    config: Config,
    addr: SocketAddr,
    mute: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let endpoint = api_endpoint();
    let responder = Arc::new(OpenAIResponder::new(&endpoint, config.model.clone())?);
    let renderer = build_renderer(&config, mute).await?;
    let orchestrator = DiscussionOrchestrator::new(&config, responder, renderer)?
        .with_analyzer(build_analyzer(&config)?);
    let transcriber = WhisperTranscriber::new(endpoint, config.transcription.clone());

    let state = Arc::new(AppState::new(Arc::new(orchestrator), Arc::new(transcriber)));
    roundtable_server::serve(addr, state, DEFAULT_IDLE_TIMEOUT).await?;
    Ok(())
}

async fn voices(config: Config, audio_dir: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let registry = PersonaRegistry::from_config(&config)?;
    println!("{}", "Initializing text-to-speech engine...".dimmed());
    let kokoro = KokoroRenderer::new().await?;
    kokoro.validate_personas(registry.personas())?;
    std::fs::create_dir_all(&audio_dir)?;

    for (i, persona) in registry.personas().iter().enumerate() {
        let greeting = format!("Hello, I'm {}. Ready when you are.", persona.name);
        let wav = kokoro.render(&greeting, &persona.voice_id).await?;
        let path = audio_dir.join(utterance_filename(i + 1, &persona.name));
        std::fs::write(&path, wav)?;
        println!(
            "{} {} {}",
            "▶".bright_cyan(),
            persona.name.bright_cyan().bold(),
            path.display().to_string().dimmed()
        );
    }

    Ok(())
}

/// Create a callback that prints discussion events to the console and
/// optionally saves each rendered utterance.
fn create_console_callback(audio_dir: Option<PathBuf>) -> DiscussionCallback {
    let counter = AtomicUsize::new(0);

    Box::new(move |event| match event {
        DiscussionEvent::TopicSet { topic } => {
            println!();
            println!("{} {}", "Topic:".bold(), topic.bright_white());
            println!();
        }
        DiscussionEvent::SpeakerStart { name } => {
            println!(
                "{} {} {}",
                "▶".bright_cyan(),
                name.bright_cyan().bold(),
                "is thinking...".dimmed()
            );
        }
        DiscussionEvent::Utterance {
            name,
            content,
            audio,
            closing,
        } => {
            if closing {
                println!("{}", "  Closing summary:".yellow());
            }
            // Word wrap and indent the content
            let wrapped = textwrap(&content, 66);
            for line in wrapped.lines() {
                println!("  {}", line);
            }
            println!();

            if let (Some(dir), Some(audio)) = (&audio_dir, audio) {
                let index = counter.fetch_add(1, Ordering::Relaxed) + 1;
                let path = dir.join(utterance_filename(index, &name));
                if let Err(e) = std::fs::write(&path, audio) {
                    warn!(path = %path.display(), "Could not save audio: {e}");
                }
            }
        }
        DiscussionEvent::HumanTurn { name, content } => {
            println!("{} {}", format!("{}:", name).bright_green().bold(), content);
            println!();
        }
        DiscussionEvent::NoInput => {
            println!("{}", "  (no input heard, the team continues)".dimmed());
            println!();
        }
        DiscussionEvent::TerminationRequested { phrase } => {
            println!();
            println!(
                "{}",
                format!("  Heard '{}', wrapping up the discussion.", phrase).bright_magenta()
            );
            println!();
        }
        DiscussionEvent::DiscussionEnd { .. } => {
            // Handled in discuss
        }
    })
}

/// Simple text wrapping function.
fn textwrap(text: &str, width: usize) -> String {
    let mut result = String::new();
    let mut current_line_len = 0;

    for word in text.split_whitespace() {
        if current_line_len + word.len() + 1 > width && current_line_len > 0 {
            result.push('\n');
            current_line_len = 0;
        }
        if current_line_len > 0 {
            result.push(' ');
            current_line_len += 1;
        }
        result.push_str(word);
        current_line_len += word.len();
    }

    result
}
