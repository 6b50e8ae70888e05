use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use wake_assistant::config::TtsProvider;
use wake_assistant::intent::{IntentHandlers, IntentMatcher};
use wake_assistant::narrator::{ConsoleNarrator, Narrator, VoiceNarrator};
use wake_assistant::services::Services;
use wake_assistant::session::{SessionEnd, SessionLoop};
use wake_assistant::transcript::{LineSource, MicrophoneSource, TranscriptSource};
use wake_assistant::voice::{
    AudioCapture, AudioPlayback, Endpointer, PLAYBACK_SAMPLE_RATE, SpeechToText, TextToSpeech,
    rms,
};
use wake_assistant::wake_word::WakeWordGate;
use wake_assistant::{Config, shutdown};

/// Wake-word voice assistant
#[derive(Parser)]
#[command(name = "wake-assistant", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Read commands from stdin and print replies instead of using audio
    #[arg(long)]
    text: bool,

    /// Override the wake word
    #[arg(short, long)]
    wake_word: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// Show microphone levels against the calibrated speech threshold
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Play a cut-off tone and a full tone
    TestSpeaker,
    /// Speak a line with the configured voice
    TestTts {
        /// Text to speak (defaults to the greeting)
        text: Option<String>,
    },
    /// Capture and transcribe a single phrase
    ListenOnce,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,wake_assistant=info",
        1 => "info,wake_assistant=debug",
        2 => "debug",
        _ => "trace",
    };

    // RUST_LOG wins over -v
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(wake_word) = &cli.wake_word {
        config.set_wake_word(wake_word);
    }
    tracing::debug!(?config, "loaded configuration");

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(&config, duration).await,
            Command::TestSpeaker => test_speaker().await,
            Command::TestTts { text } => test_tts(&config, text).await,
            Command::ListenOnce => listen_once(&config).await,
        };
    }

    let (trigger, shutdown) = shutdown::channel();
    trigger.trigger_on_ctrl_c();

    let (source, narrator): (Box<dyn TranscriptSource>, Box<dyn Narrator>) = if cli.text {
        println!("Type commands starting with \"{}\". Ctrl-D to quit.", config.wake_word);
        let stdin = BufReader::new(tokio::io::stdin());
        (
            Box::new(LineSource::new(stdin).shutdown_on_eof(trigger)),
            Box::new(ConsoleNarrator::new(&config.assistant_name)),
        )
    } else {
        let audio = AudioCapture::new()?;
        let stt = SpeechToText::from_config(&config.stt, &config.api_keys)?;
        (
            Box::new(MicrophoneSource::new(audio, stt, config.listen.clone())),
            voice_narrator(&config)?,
        )
    };

    let handlers = IntentHandlers::new(
        Services::from_config(&config),
        config.intents.knowledge_sentences,
    );

    let mut session = SessionLoop::new(
        source,
        narrator,
        WakeWordGate::new(&config.wake_word),
        IntentMatcher::from_config(&config.intents),
        handlers,
        config.session.clone(),
        config.greeting(),
        shutdown,
    );

    tracing::info!(wake_word = %config.wake_word, text_mode = cli.text, "assistant ready");

    match session.run().await? {
        SessionEnd::Shutdown => tracing::info!("stopped on request"),
        SessionEnd::Interrupted => tracing::info!("stopped by interrupt"),
    }

    Ok(())
}

/// Spoken narrator, or console output when no speech backend is configured
fn voice_narrator(config: &Config) -> anyhow::Result<Box<dyn Narrator>> {
    if config.voice.provider == TtsProvider::Console {
        return Ok(Box::new(ConsoleNarrator::new(&config.assistant_name)));
    }

    match TextToSpeech::from_config(&config.voice, &config.api_keys) {
        Ok(tts) => Ok(Box::new(VoiceNarrator::new(
            &config.assistant_name,
            tts,
            AudioPlayback::new()?,
        ))),
        Err(e) => {
            tracing::warn!(error = %e, "speech output unavailable, printing replies instead");
            Ok(Box::new(ConsoleNarrator::new(&config.assistant_name)))
        }
    }
}

/// Calibrate like a real listen, then show each second against the threshold
#[allow(clippy::future_not_send)]
async fn test_mic(config: &Config, duration: u64) -> anyhow::Result<()> {
    let mut capture = AudioCapture::new()?;
    capture.start()?;

    let calibration = config.listen.calibration;
    println!("Microphone at {} Hz", capture.sample_rate());
    println!("Stay quiet for {} ms while the noise floor is measured...", calibration.as_millis());

    capture.clear_buffer();
    tokio::time::sleep(calibration).await;
    let mut endpointer = Endpointer::new(&config.listen, capture.sample_rate());
    endpointer.calibrate(&capture.take_buffer());
    let threshold = endpointer.threshold();

    println!(
        "Speech threshold: {threshold:.4} RMS (configured floor {:.4})",
        config.listen.energy_threshold
    );
    println!("Now say \"{} what time is it\". '|' marks the threshold.\n", config.wake_word);

    let mut heard = 0;
    for second in 1..=duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let energy = rms(&capture.take_buffer());
        let speech = energy > threshold;
        if speech {
            heard += 1;
        }

        println!(
            "[{second:2}s] {energy:.4} [{}] {}",
            level_meter(energy, threshold, METER_WIDTH),
            if speech { "speech" } else { "quiet" }
        );
    }

    capture.stop();

    println!();
    if heard == 0 {
        println!("Nothing crossed the threshold. The assistant would not hear you.");
        println!("Check the default source (pactl info) or lower listen.energy_threshold.");
    } else {
        println!("{heard} of {duration} seconds counted as speech.");
    }

    Ok(())
}

const METER_WIDTH: usize = 40;

/// Bar scaled so the threshold sits a quarter of the way along
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn level_meter(energy: f32, threshold: f32, width: usize) -> String {
    let full_scale = threshold.max(f32::EPSILON) * 4.0;
    let filled = ((energy / full_scale) * width as f32).clamp(0.0, width as f32) as usize;
    let marker = width / 4;

    (0..width)
        .map(|i| match (i == marker, i < filled) {
            (true, _) => '|',
            (false, true) => '#',
            (false, false) => ' ',
        })
        .collect()
}

/// Sine tone at the playback rate
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn tone(frequency: f32, seconds: f32) -> Vec<f32> {
    let rate = PLAYBACK_SAMPLE_RATE as f32;
    (0..(rate * seconds) as usize)
        .map(|i| 0.3 * (std::f32::consts::TAU * frequency * i as f32 / rate).sin())
        .collect()
}

/// Play a tone cut short the way an interrupt cuts a reply, then a full one
async fn test_speaker() -> anyhow::Result<()> {
    let playback = AudioPlayback::new()?;

    println!("A low tone that stops after half a second...");
    let cut = tokio::time::timeout(Duration::from_millis(500), playback.play(tone(440.0, 3.0)));
    if cut.await.is_ok() {
        println!("The tone was not cut short; playback ignores cancellation.");
    }

    println!("...then a higher tone for one second.");
    playback.play(tone(880.0, 1.0)).await?;

    println!("\nYou should have heard two tones with no overlap.");
    println!("If not, check the default sink (pactl info).");

    Ok(())
}

/// Speak a line through the same narrator the assistant uses
#[allow(clippy::future_not_send)]
async fn test_tts(config: &Config, text: Option<String>) -> anyhow::Result<()> {
    let text = text.unwrap_or_else(|| config.greeting());
    let tts = TextToSpeech::from_config(&config.voice, &config.api_keys)?;
    let mut narrator = VoiceNarrator::new(&config.assistant_name, tts, AudioPlayback::new()?);

    println!("{:?} voice \"{}\" says: {text}", config.voice.provider, config.voice.voice);
    let started = std::time::Instant::now();
    narrator.speak(&text).await?;
    println!("Spoken in {:.1}s", started.elapsed().as_secs_f32());

    Ok(())
}

/// Capture one phrase and print what was recognized
#[allow(clippy::future_not_send)]
async fn listen_once(config: &Config) -> anyhow::Result<()> {
    let audio = AudioCapture::new()?;
    let stt = SpeechToText::from_config(&config.stt, &config.api_keys)?;
    let mut source = MicrophoneSource::new(audio, stt, config.listen.clone());

    println!("Say something...");
    match source.capture().await {
        Ok(utterance) => println!("Heard: {}", utterance.raw().trim()),
        Err(failure) => println!("Nothing recognized: {failure}"),
    }

    Ok(())
}
