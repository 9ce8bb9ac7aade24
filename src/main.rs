//! Deckstate entry point
//!
//! Native demo: bootstraps a table on the in-memory engine, saves it through
//! a shared save slot, restores it into a fresh session and checks that the
//! second save matches the first.
//!
//! Usage: `deckstate [config.json] [library.json]`

use deckstate::engine::{SimConfig, SimEngine};
use deckstate::{CardLibrary, PersistResult, SaveSlot, Session, SessionConfig};

fn table(config: &SessionConfig, library: &CardLibrary, seed: u64) -> Box<Session<SimEngine>> {
    let engine = SimEngine::new(SimConfig {
        seed,
        acks_per_poll: 2,
    });
    Box::new(Session::new(config.clone(), library.clone(), engine))
}

fn run() -> PersistResult<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    let library = match std::env::args().nth(2) {
        Some(path) => CardLibrary::load(path)?,
        None => CardLibrary::builtin(),
    };

    // First run: nothing saved yet
    let mut first = table(&config, &library, 1);
    let report = first.on_load("")?;
    log::info!("Bootstrapped {} cards into {} zones", report.instances, report.zones);
    first.pump();
    for instance in first.instances().iter() {
        let engine = first.engine();
        let container = instance
            .object_in(engine)
            .and_then(|object| engine.container_of(object));
        match container {
            Some(zone) => log::info!("'{}' rests in zone object {zone}", instance.definition().id),
            None => log::info!("'{}' is loose", instance.definition().id),
        }
    }

    let mut slot = SaveSlot::new();
    slot.register(first)?;
    let saved = slot.save()?;
    println!("{saved}");

    // Next run: restore from the slot
    let mut restored = SaveSlot::new();
    restored.register(table(&config, &library, 2))?;
    restored.load(&saved)?;
    let resaved = restored.save()?;

    if resaved == saved {
        println!("✓ Restored session saves identically");
    } else {
        println!("✗ Restored session differs from the original save");
        std::process::exit(1);
    }
    Ok(())
}

fn main() {
    env_logger::init();
    log::info!("Deckstate (native) starting...");

    if let Err(e) = run() {
        log::error!("{e}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
