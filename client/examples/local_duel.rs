//! Local Duel Example
//!
//! Two clients share one in-memory store, draft random teams from a generated
//! catalog and play the battle out, each picking a random move on its turn.
//!
//! Run with `RUST_LOG=pokeduel_client=debug` to watch the store traffic.

use std::sync::Arc;

use anyhow::Result;
use pokeduel_client::{
    BattleEvent, BattleHandle, DuelConfig, MemoryConnection, MemoryRecordStore, MemoryStore,
    Session,
};
use pokeduel_protocol::{BaseStats, CombatantData, MoveData, PlayerRole};
use pokeduel_team::{
    Catalog, MAX_SPECIES_ID, StaticCatalog, TeamBuilder, load_candidates, random_candidate_ids,
};
use rand::Rng;
use rand::seq::SliceRandom;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

const TYPES: &[&str] = &[
    "normal", "fire", "water", "grass", "electric", "ice", "fighting", "poison", "ground",
    "flying", "psychic", "bug", "rock", "ghost", "dragon",
];

fn generated_catalog() -> StaticCatalog {
    let mut rng = rand::thread_rng();
    StaticCatalog::new((1..=MAX_SPECIES_ID).map(|id| {
        let own_type = TYPES[rng.gen_range(0..TYPES.len())];
        let hp = rng.gen_range(40..=110);
        CombatantData {
            id,
            name: format!("species-{:03}", id),
            sprite: String::new(),
            types: vec![own_type.to_string()],
            stats: BaseStats {
                hp,
                attack: rng.gen_range(40..=120),
                defense: rng.gen_range(40..=120),
            },
            moves: vec![
                MoveData {
                    name: "Tackle".into(),
                    move_type: "normal".into(),
                    power: 40,
                },
                MoveData {
                    name: format!("{} Blast", own_type),
                    move_type: own_type.to_string(),
                    power: rng.gen_range(50..=90),
                },
            ],
            current_hp: hp,
            max_hp: hp,
        }
    }))
}

async fn draft<C: Catalog>(catalog: &C) -> Result<Vec<CombatantData>> {
    let ids = random_candidate_ids(&mut rand::thread_rng());
    let mut candidates = load_candidates(catalog, &ids).await;
    candidates.shuffle(&mut rand::thread_rng());

    let mut builder = TeamBuilder::default();
    for candidate in candidates {
        if builder.is_full() {
            break;
        }
        builder.select(candidate)?;
    }
    Ok(builder.build()?)
}

async fn narrate(
    who: PlayerRole,
    mut events: mpsc::UnboundedReceiver<BattleEvent>,
    handle: BattleHandle,
) {
    while let Some(event) = events.recv().await {
        match event {
            BattleEvent::TurnStarted { mine: true } => {
                let moves = handle
                    .duel()
                    .and_then(|duel| duel.my_active().map(|active| active.moves.len()))
                    .unwrap_or(1)
                    .max(1);
                let choice = rand::thread_rng().gen_range(0..moves);
                if let Err(e) = handle.choose_move(choice) {
                    println!("[{}] could not choose: {}", who, e);
                }
            }
            BattleEvent::MoveResolved(exchange) if exchange.attacker == who => {
                println!(
                    "[{}] {} used {} on {}: {} damage (x{}), {} HP left",
                    who,
                    exchange.attacker_name,
                    exchange.move_used.name,
                    exchange.defender_name,
                    exchange.resolution.damage,
                    exchange.resolution.effectiveness,
                    exchange.resolution.defender_hp,
                );
            }
            BattleEvent::Substituted { side, index } if side == who => {
                println!("[{}] sends out member #{}", who, index + 1);
            }
            BattleEvent::Diagnostic(message) => println!("[{}] {}", who, message),
            BattleEvent::Ended(outcome) => {
                println!("[{}] battle over: {:?}", who, outcome);
                break;
            }
            _ => {}
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let store = MemoryStore::new();
    let config = DuelConfig::default();
    let catalog = generated_catalog();

    let mut host = Session::<MemoryConnection>::create_room(
        store.connect(),
        Arc::new(MemoryRecordStore::new()),
        config.clone(),
    )
    .await?;
    println!("Room {} created", host.code());

    let mut guest = Session::join_room(
        store.connect(),
        Arc::new(MemoryRecordStore::new()),
        config,
        host.code().as_str(),
    )
    .await?;
    host.wait_for_opponent().await?;

    host.submit_team(draft(&catalog).await?).await?;
    guest.submit_team(draft(&catalog).await?).await?;

    let (host_battle, guest_battle) =
        tokio::join!(host.await_both_ready(), guest.await_both_ready());
    let (mut host_battle, mut guest_battle) = (host_battle?, guest_battle?);

    let mut narrators = Vec::new();
    for battle in [&mut host_battle, &mut guest_battle] {
        if let Some(events) = battle.take_events() {
            narrators.push(tokio::spawn(narrate(battle.role(), events, battle.handle())));
        }
    }

    let (host_outcome, guest_outcome) = tokio::join!(host_battle.run(), guest_battle.run());
    println!("Host: {:?}, guest: {:?}", host_outcome?, guest_outcome?);

    for narrator in narrators {
        narrator.await?;
    }
    Ok(())
}
