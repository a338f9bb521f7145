use anyhow::{Context, Result, bail};
use std::{env, fs, path::Path, process};
use unimark_config::{Config, HtmlSettings};
use unimark_engine::{Engine, ExtensionRef, HtmlOptions, catalog};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Transformed external tree as JSON.
    Tree,
    /// Editor document as JSON.
    Doc,
    /// Markdown regenerated through both conversions.
    Roundtrip,
    /// Node, mark and key names of the composed grammar.
    Schema,
}

impl Command {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "tree" => Some(Self::Tree),
            "doc" => Some(Self::Doc),
            "roundtrip" => Some(Self::Roundtrip),
            "schema" => Some(Self::Schema),
            _ => None,
        }
    }
}

fn html_options(settings: HtmlSettings) -> HtmlOptions {
    HtmlOptions {
        skip_void_elements: settings.skip_void_elements,
        fix_root_html: settings.fix_root_html,
    }
}

fn build_engine(config: &Config) -> Result<Engine> {
    let options = html_options(config.html);
    let mut requested: Vec<ExtensionRef> = Vec::with_capacity(config.extensions.len());
    for name in &config.extensions {
        match catalog(name, &options) {
            Some(ext) => requested.push(ext),
            None => bail!("Unknown extension '{name}' in config"),
        }
    }
    Ok(Engine::new(&requested)?)
}

fn run(command: Command, engine: &Engine, source: &str) -> Result<String> {
    let output = match command {
        Command::Tree => serde_json::to_string_pretty(&engine.parse_external(source)?)?,
        Command::Doc => serde_json::to_string_pretty(&engine.parse(source)?)?,
        Command::Roundtrip => {
            let doc = engine.parse(source)?;
            engine.serialize(&doc)?
        }
        Command::Schema => describe_schema(engine),
    };
    Ok(output)
}

fn describe_schema(engine: &Engine) -> String {
    let grammar = engine.grammar();
    let mut lines = Vec::new();
    if let Some(top) = grammar.top_node() {
        lines.push(format!("top: {}", top.name()));
    }
    let nodes: Vec<&str> = grammar.node_types().map(|n| n.name()).collect();
    lines.push(format!("nodes: {}", nodes.join(", ")));
    let marks: Vec<&str> = grammar.mark_types().map(|m| m.name()).collect();
    lines.push(format!("marks: {}", marks.join(", ")));
    let keys: Vec<&str> = engine.bindings().keys().collect();
    lines.push(format!("keys: {}", keys.join(", ")));
    let transforms: Vec<&str> = engine.composition().transforms().iter().map(|t| t.name()).collect();
    lines.push(format!("transforms: {}", transforms.join(", ")));
    lines.join("\n")
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <tree|doc|roundtrip|schema> <markdown-file>", args[0]);
        process::exit(1);
    }
    let Some(command) = Command::parse(&args[1]) else {
        eprintln!("Error: Unknown command '{}'", args[1]);
        eprintln!("Usage: {} <tree|doc|roundtrip|schema> <markdown-file>", args[0]);
        process::exit(1);
    };

    let config_path = Config::config_path();
    let config = match Config::load() {
        Ok(Some(config)) => {
            log::info!("Using config from {}", config_path.display());
            config
        }
        Ok(None) => Config::default(),
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };

    let engine = build_engine(&config)?;
    let path = Config::expand_path(Path::new(&args[2]));
    let source =
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;

    let output = run(command, &engine, &source)?;
    println!("{}", output.trim_end());
    Ok(())
}
