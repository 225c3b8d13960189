use anki_vocab::{
    anki::AnkiConnect,
    config::{
        self,
        Config,
        ConfigOverrides,
        Policy,
    },
    console::Console,
    llm::OpenAiGenerator,
    persistence,
    session::{
        Services,
        Session,
        SessionOptions,
        UpdateEngine,
        UpdateOutcome,
        UpdateRequest,
    },
    tts::EdgeTts,
    CardError,
};
use clap::{
    Args,
    Parser,
    Subcommand,
};

#[derive(Parser, Debug)]
#[command(name = "anki-vocab", version, about = "Generate and maintain Anki vocabulary cards")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Interactive loop: one `context | word` line per card
    Session {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Regenerate an existing note in place
    Update {
        #[command(flatten)]
        common: CommonArgs,
        /// Word to search for
        #[arg(long, conflicts_with = "note_id")]
        word: Option<String>,
        /// Note id to update
        #[arg(long)]
        note_id: Option<u64>,
        /// Context sentence (defaults to the note's own)
        #[arg(long)]
        sentence: Option<String>,
        /// Extra instruction for the model
        #[arg(long)]
        prompt: Option<String>,
    },

    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write the default config file
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Print the merged configuration
    Show,
    /// Set a dotted config key, e.g. `tts.voice en-GB-SoniaNeural`
    Set { key: String, value: String },
    /// Print the config file location
    Path,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    #[arg(long)]
    deck: Option<String>,
    #[arg(long)]
    note_model: Option<String>,
    #[arg(long)]
    openai_model: Option<String>,
    #[arg(long)]
    voice: Option<String>,
    #[arg(long)]
    rate: Option<String>,
    /// ask, never or always
    #[arg(long)]
    update_policy: Option<Policy>,
    /// ask, never or always
    #[arg(long)]
    overwrite_audio: Option<Policy>,
    /// Accept default actions without prompting
    #[arg(short, long)]
    yes: bool,
    #[arg(long)]
    no_tts: bool,
    /// Preview generated cards without writing anything
    #[arg(long)]
    dry_run: bool,
}

impl CommonArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            deck: self.deck.clone(),
            note_model: self.note_model.clone(),
            openai_model: self.openai_model.clone(),
            voice: self.voice.clone(),
            rate: self.rate.clone(),
            no_tts: self.no_tts,
            update_policy: self.update_policy,
            overwrite_audio: self.overwrite_audio,
        }
    }

    fn options(&self) -> SessionOptions {
        SessionOptions { auto_accept: self.yes, dry_run: self.dry_run }
    }
}

/// Live adapters for one resolved configuration.
struct Backends {
    store: AnkiConnect,
    generator: OpenAiGenerator,
    synthesizer: EdgeTts,
}

impl Backends {
    fn connect(config: &Config) -> Result<Self, CardError> {
        Ok(Self {
            generator: OpenAiGenerator::new(config)?,
            store: AnkiConnect::new(&config.ankiconnect_url)?,
            synthesizer: EdgeTts::new(&config.tts.command),
        })
    }

    fn ping_store(&self) -> Result<(), CardError> {
        let version = self.store.version()?;
        log::info!("AnkiConnect v{} is reachable", version);
        Ok(())
    }

    fn services(&self) -> Services<'_> {
        Services { store: &self.store, generator: &self.generator, synthesizer: &self.synthesizer }
    }
}

pub fn run(command: Option<Command>, console: &mut dyn Console) -> Result<(), CardError> {
    match command {
        None => choose_command(console),
        Some(Command::Session { common }) => run_session(&common, console),
        Some(Command::Update { common, word, note_id, sentence, prompt }) => {
            let request = UpdateRequest { word, note_id, sentence, prompt };
            run_update(&common, &request, console)
        }
        Some(Command::Config(command)) => run_config(command, console),
    }
}

fn run_session(common: &CommonArgs, console: &mut dyn Console) -> Result<(), CardError> {
    let config = config::resolve_config(&common.overrides())?;
    let backends = Backends::connect(&config)?;
    if !common.dry_run {
        backends.ping_store()?;
    }
    let summary = Session::new(&config, backends.services(), common.options()).run(console)?;
    log::debug!("{:?}", summary);
    Ok(())
}

fn run_update(
    common: &CommonArgs,
    request: &UpdateRequest,
    console: &mut dyn Console,
) -> Result<(), CardError> {
    let config = config::resolve_config(&common.overrides())?;
    let backends = Backends::connect(&config)?;
    backends.ping_store()?;
    let engine = UpdateEngine::new(&config, backends.services(), common.options());
    match engine.run(request, console) {
        Ok(UpdateOutcome::Updated(note_id)) => log::debug!("Update finished for {}", note_id),
        Ok(_) => {}
        Err(CardError::SelectionAbort) => console.report("Skipped."),
        Err(e) => return Err(e),
    }
    Ok(())
}

fn run_config(command: ConfigCommand, console: &mut dyn Console) -> Result<(), CardError> {
    let path = persistence::config_file_path();
    match command {
        ConfigCommand::Init { force } => {
            config::init_config(&path, force)?;
            console.report(&format!("Wrote default config to {}", path.display()));
        }
        ConfigCommand::Show => {
            let document = config::display_document()?;
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        ConfigCommand::Set { key, value } => {
            config::set_config_value(&path, &key, &value)?;
            console.report(&format!("Set {} in {}", key, path.display()));
        }
        ConfigCommand::Path => println!("{}", path.display()),
    }
    Ok(())
}

const CHOOSER: [&str; 4] = ["Start session", "Update a note", "Show config", "Quit"];

/// No-subcommand entry point: make sure an API key exists, then offer the commands.
fn choose_command(console: &mut dyn Console) -> Result<(), CardError> {
    let current = config::resolve_config(&ConfigOverrides::default())?;
    if current.openai_api_key.is_none() {
        let Some(key) = console.read_line("OpenAI API key: ")? else {
            return Ok(());
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(CardError::Config("an OpenAI API key is required".into()));
        }
        let path = persistence::config_file_path();
        config::set_config_value(&path, "openai_api_key", key)?;
        console.report(&format!("Saved API key to {}", path.display()));
    }

    let options: Vec<String> = CHOOSER.iter().map(|option| option.to_string()).collect();
    let selected = match console.select("What do you want to do?", &options, 0) {
        Ok(selected) => selected,
        Err(CardError::SelectionAbort) => return Ok(()),
        Err(e) => return Err(e),
    };

    let common = CommonArgs::default();
    match selected {
        0 => run_session(&common, console),
        1 => {
            let Some(target) = console.read_line("Word or note id: ")? else {
                return Ok(());
            };
            let target = target.trim();
            let request = match target.parse::<u64>() {
                Ok(note_id) => UpdateRequest { note_id: Some(note_id), ..UpdateRequest::default() },
                Err(_) => UpdateRequest { word: Some(target.to_string()), ..UpdateRequest::default() },
            };
            run_update(&common, &request, console)
        }
        2 => run_config(ConfigCommand::Show, console),
        _ => Ok(()),
    }
}
