//! Basic demonstration of the Emberfield simulation.
//!
//! Run with: cargo run --example arena_demo

use ember_sim::{AiTuning, Alignment, Faction, SimConfig, SimWorld, Stats};

fn main() {
    println!("=== Emberfield - Simulation Demo ===\n");

    let mut sim = SimWorld::with_config(SimConfig {
        tick_interval: 0.3,
        tile_size: 1.0,
        rng_seed: 1,
        ..Default::default()
    });

    // A player in the middle of the arena.
    sim.spawn_player(1, 5, 5, Stats::new(50));

    // A pack of goblins around the edges.
    let mut goblins = Faction::new("goblins", Alignment::Bad);
    goblins.hostile_to_player = true;
    let tuning = AiTuning {
        awareness_range: 8,
        chase_range: 15,
        wander_chance: 0.1,
        wander_radius: 3,
    };
    for (i, (x, y)) in [(0, 0), (10, 0), (0, 10), (10, 10)].iter().enumerate() {
        sim.spawn_npc(10 + i as u32, goblins.clone(), *x, *y, Stats::default(), tuning);
    }

    println!("Initial state:");
    print_units(&mut sim);

    // Walk the player toward a corner while the goblins react.
    sim.command_move(1, 9, 9, false).unwrap();

    println!("\nRunning 60 ticks (18 seconds at 0.3s per tick)...\n");
    for tick in 0..60 {
        sim.step(0.3);

        if (tick + 1) % 15 == 0 {
            println!("--- Tick {} (t={:.1}s) ---", sim.current_tick(), sim.current_time());
            print_units(&mut sim);
        }
    }

    println!("\n=== Final State (JSON) ===\n");
    println!("{}", sim.snapshot().to_json_pretty().unwrap());
}

fn print_units(sim: &mut SimWorld) {
    let snapshot = sim.snapshot();
    for unit in &snapshot.units {
        println!(
            "  {} {}: tile=({}, {}) visual=({:.1}, {:.1}) hp={}/{} [{}]",
            if unit.is_player { "player" } else { "goblin" },
            unit.id,
            unit.tile_x,
            unit.tile_y,
            unit.x,
            unit.y,
            unit.hitpoints,
            unit.max_hitpoints,
            unit.animation,
        );
    }
}
