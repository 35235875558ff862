use std::fs;

use log::info;
use rs_markov_core::speech;
use rs_markov_core::{
    BulkConfig, BulkTrainer, ChainConfig, ChainRegistry, Environment, Ephemeral, MessageKind, Snapshot, TopicFallback,
};

/// Chain fed with every line of the corpus, whoever said it.
const CHANNEL: &str = "#corpus";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging level is taken from RUST_LOG (ex. RUST_LOG=debug)
    env_logger::init();
    fs::create_dir_all("./data")?;

    // Character chains of order 9, lines of at most 480 characters.
    // Unknown topics are retried once with a capital letter.
    let mut config = ChainConfig::default();
    config.topic_fallback = TopicFallback::Capitalized;

    // All persistent chains live in one database file.
    // Chains trained by a previous run are reopened.
    let environment = Environment::open("./data/chains.redb")?;
    let mut registry = ChainRegistry::new(environment, config.order)?;
    registry.rehydrate()?;

    // Each corpus line is "speaker<TAB>message".
    // Every message trains both the channel chain and the speaker's chain.
    let corpus = fs::read_to_string("./data/corpus.tsv")?;
    let trainer = BulkTrainer::spawn(registry, config.granularity, BulkConfig::default())?;
    for line in corpus.lines() {
        let Some((speaker, message)) = line.split_once('\t') else {
            continue;
        };
        trainer.submit(CHANNEL, message)?;
        // Chains need a name; unattributed lines only feed the channel
        if !speaker.is_empty() {
            trainer.submit(speaker, message)?;
        }
    }
    let (registry, report) = trainer.finish()?;
    info!("{report:?}");
    println!(
        "Trained {} lines ({} too short) into {} chains",
        report.lines_trained, report.lines_skipped, report.chains_touched
    );

    // One line per chain
    let mut rng = rand::rng();
    for name in registry.names() {
        if let Some(chain) = registry.get(&name) {
            println!("{name}: {}", speech::say(chain, &config, &mut rng)?);
        }
    }

    // Topic-seeded line from the channel chain
    if let Some(chain) = registry.get(CHANNEL) {
        match speech::say_about(chain, "hello", &config, &mut rng)? {
            Some(line) => println!("About hello: {line}"),
            None => println!("I don't know anything about that."),
        }
    }

    // The same corpus in memory, saved as a snapshot for a later restart
    let mut memory = ChainRegistry::new(Ephemeral, config.order)?;
    for line in corpus.lines() {
        if let Some((_, message)) = line.split_once('\t') {
            speech::learn(memory.chain(CHANNEL)?, config.granularity, MessageKind::Say, message)?;
        }
    }
    memory.into_snapshot(vec![CHANNEL.to_owned()], config.output_limit)?.save("./data/chains.bin")?;

    let restored = Snapshot::load("./data/chains.bin")?.into_registry()?;
    println!("Snapshot holds {} chains of order {}", restored.len(), restored.order());

    Ok(())
}
