use std::future::Future;
use std::path::PathBuf;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use voicechat::{
    ChatClient, ChatMessage, ClientConfig, PlaybackArbiter, SynthesisClient, SynthesisRequest,
};

/// Output file stem when `--out` is not given; the extension follows the audio format.
const DEFAULT_OUTPUT_STEM: &str = "out";

/// voicechat - speech synthesis and chat from the command line
#[derive(Parser, Debug)]
#[command(name = "voicechat")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synthesize text and write the audio to a file
    Speak {
        /// Text to synthesize
        #[arg(short = 't', long = "text")]
        text: String,

        /// Voice to use instead of the configured default
        #[arg(short = 's', long = "speaker")]
        speaker: Option<String>,

        /// Output file [default: out.<format extension>]
        #[arg(short = 'o', long = "out")]
        out: Option<PathBuf>,
    },

    /// Send one message to the chat endpoint
    Chat {
        /// User message
        #[arg(short = 'm', long = "message")]
        message: String,

        /// System prompt
        #[arg(long = "system", default_value = "")]
        system: String,

        /// Also synthesize the reply
        #[arg(long = "speak")]
        speak: bool,

        /// Output file for the spoken reply [default: out.<format extension>]
        #[arg(short = 'o', long = "out")]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    // Load configuration from file or environment
    let config = if let Some(config_path) = cli.config {
        info!(path = %config_path.display(), "Loading configuration");
        ClientConfig::from_file(&config_path)?
    } else {
        ClientConfig::from_env()?
    };

    let arbiter = PlaybackArbiter::new();
    run_until_interrupted(&arbiter, run(cli.command, &config, &arbiter), ctrl_c()).await
}

async fn run(command: Commands, config: &ClientConfig, arbiter: &PlaybackArbiter) -> anyhow::Result<()> {
    match command {
        Commands::Speak { text, speaker, out } => {
            let tts = SynthesisClient::new(config.synthesis.clone())?;
            let mut request = tts.request(text).audio_params(config.audio.clone());
            if let Some(speaker) = speaker {
                request = request.speaker(speaker);
            }
            speak(&tts, arbiter, request.build(), out).await?;
        }
        Commands::Chat {
            message,
            system,
            speak: should_speak,
            out,
        } => {
            let chat = ChatClient::new(config.chat.clone())?;
            let reply = chat
                .complete(&system, &[ChatMessage::user(message)], None)
                .await?;
            println!("{}", reply.content);

            if should_speak {
                let tts = SynthesisClient::new(config.synthesis.clone())?;
                let request = tts
                    .request(reply.content)
                    .audio_params(config.audio.clone())
                    .build();
                speak(&tts, arbiter, request, out).await?;
            }
        }
    }

    Ok(())
}

/// Resolves on Ctrl+C. Never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

/// Drive `work` to completion unless `interrupt` fires first.
///
/// On interrupt the current playback is stopped while `work` is still alive,
/// then `work` is dropped, which abandons any synthesis or chat request still
/// in flight.
async fn run_until_interrupted<W, I>(
    arbiter: &PlaybackArbiter,
    work: W,
    interrupt: I,
) -> anyhow::Result<()>
where
    W: Future<Output = anyhow::Result<()>>,
    I: Future<Output = ()>,
{
    let interrupted = async {
        interrupt.await;
        arbiter.stop_current()
    };

    tokio::select! {
        result = work => result,
        stopped = interrupted => {
            match stopped {
                Some(identity) => warn!(identity = %identity, "Interrupted, playback stopped"),
                None => warn!("Interrupted"),
            }
            Err(anyhow!("Interrupted"))
        }
    }
}

/// `out.<ext>` for the audio format the request asks for.
fn default_output_path(request: &SynthesisRequest) -> PathBuf {
    PathBuf::from(format!(
        "{DEFAULT_OUTPUT_STEM}.{}",
        request.audio_params().format.extension()
    ))
}

/// Synthesize `request` and hand the audio to the arbiter, whose action writes it to `out`.
async fn speak(
    tts: &SynthesisClient,
    arbiter: &PlaybackArbiter,
    request: SynthesisRequest,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let path = out.unwrap_or_else(|| default_output_path(&request));
    let outcome = tts.synthesize_with_stats(&request).await;
    let attempts = outcome.attempts;
    let audio = outcome
        .result
        .decode_audio()
        .map_err(|e| anyhow!("Synthesis failed after {attempts} attempt(s): {e}"))?;

    let identity = path.display().to_string();
    arbiter
        .request_play(identity, move |ctx| async move {
            if ctx.is_stopped() {
                return Ok(());
            }
            tokio::fs::write(&path, &audio)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), bytes = audio.len(), "Audio written");
            Ok(())
        })
        .await?;

    Ok(())
}
