use std::path::PathBuf;

use clap::Parser;
use glam::Vec3;

use modforge_client::cli::{CliArgs, Command};
use modforge_client::config::{find_config, load_config, ModforgeConfig};
use modforge_client::instantiate::ObjectsCollection;
use modforge_client::mod_registry::Mod;
use modforge_client::session::GameSession;
use modforge_core::level::{Level, LevelObject};
use modforge_core::math::TransformDef;

const TICK_SECONDS: f32 = 1.0 / 60.0;

fn main() {
    let args = CliArgs::parse();
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let project = match find_config(&cwd) {
        Some(path) => match load_config(&path) {
            Ok(config) => Some((path, config)),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        None => None,
    };

    let default_filter = project
        .as_ref()
        .and_then(|(_, c)| c.log_filter.clone())
        .unwrap_or_else(|| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    tracing::info!("modforge v{}", env!("CARGO_PKG_VERSION"));
    if let Some((path, config)) = &project {
        tracing::info!("Loaded project: {} v{} ({:?})", config.name, config.version, path);
    }

    let mod_root = match (&args.mod_dir, &project) {
        (Some(dir), _) => PathBuf::from(dir),
        (None, Some((path, config))) => config.mod_root(path),
        (None, None) => cwd,
    };

    let registry = match Mod::open(&mod_root) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let config = project.as_ref().map(|(_, c)| c);
    let result = match args.command {
        Command::Objects => {
            list_objects(&registry);
            Ok(())
        }
        Command::Levels => {
            for name in registry.level_names() {
                println!("{}", name);
            }
            Ok(())
        }
        Command::Validate { level } => validate(&registry, &level),
        Command::Load { level, ticks } => match level.or_else(|| default_level(config)) {
            Some(level) => run_level(&registry, &level, ticks),
            None => Err("no level given and no default_level in modforge.yaml".to_string()),
        },
        Command::New { id, object, name } => new_level(&registry, &id, &object, name),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn default_level(config: Option<&ModforgeConfig>) -> Option<String> {
    config.and_then(|c| c.default_level.clone())
}

fn list_objects(registry: &Mod) {
    for definition in registry.definitions() {
        match definition.script() {
            Some(script) => println!("{}\t{}\t{}", definition.id(), definition.type_name(), script),
            None => println!("{}\t{}", definition.id(), definition.type_name()),
        }
    }
}

fn validate(registry: &Mod, name: &str) -> Result<(), String> {
    let level = registry.load_level(name).map_err(|e| e.to_string())?;
    match level.validate() {
        Ok(()) => {
            println!("Level '{}' is valid ({} objects)", name, level.objects().len());
            Ok(())
        }
        Err(errors) => {
            for error in &errors {
                println!("{}", error);
            }
            Err(format!("level '{}' has {} problem(s)", name, errors.len()))
        }
    }
}

fn run_level(registry: &Mod, name: &str, ticks: u32) -> Result<(), String> {
    let level = registry.load_level(name).map_err(|e| e.to_string())?;
    let mut resources = registry.resources();
    let objects = ObjectsCollection::load(registry.definitions(), &mut resources);
    let mut session =
        GameSession::start(registry, &objects, &level).map_err(|e| e.to_string())?;

    let summary = session.level_scene().clone();
    tracing::info!(
        "Level '{}': {} spawned, {} skipped, {} scripted",
        level.id(),
        summary.spawned.len(),
        summary.skipped.len(),
        session.scripted_objects().len()
    );
    if let Some(player) = &summary.player {
        tracing::info!("Player vehicle: {}", player);
    }

    let mut events = session.ready();
    for _ in 0..ticks {
        events.extend(session.update(TICK_SECONDS));
    }
    for event in &events {
        tracing::info!("{:?}", event);
    }

    let state = session.state();
    println!(
        "{}: {} objects after {} ticks ({} skipped at load)",
        level.id(),
        state.scene.len(),
        ticks,
        summary.skipped.len()
    );
    for message in state.services.messages.messages() {
        println!("message: {}", message);
    }
    for effect in state.services.effects.pending() {
        println!("effect: {:?} at {}", effect.kind, effect.position);
    }
    Ok(())
}

fn new_level(registry: &Mod, id: &str, object: &str, name: Option<String>) -> Result<(), String> {
    if registry.definition(object).is_none() {
        return Err(format!("no object definition with id '{}'", object));
    }
    if registry.level_path(id).exists() {
        return Err(format!("level '{}' already exists", id));
    }

    let level = Level {
        id: Some(id.to_string()),
        name: Some(name.unwrap_or_else(|| id.to_string())),
        objects: Some(vec![LevelObject::new(object, TransformDef::at(Vec3::ZERO))]),
    };
    let path = registry.save_level(id, &level).map_err(|e| e.to_string())?;
    println!("Wrote {}", path.display());
    Ok(())
}
