//! Integration tests for AQUASIM

use aquasim::checkpoint::{Checkpoint, EcosystemSnapshot, PersistenceError};
use aquasim::ecology::{PopulationCounts, TimeClock};
use aquasim::saves::SaveManager;
use aquasim::{AnimalState, Config, Ecosystem, EventKind, Species, TurnDriver, Vec2};
use std::collections::HashMap;

/// Config with no initial population and no spontaneous plants
fn empty_config() -> Config {
    let mut config = Config::default();
    config.population.initial = PopulationCounts::new(0, 0, 0, 0);
    config.plants.spawn_chance = 0.0;
    config
}

/// Turns interleaved with a second of motion frames
fn run_with_motion(eco: &mut Ecosystem, turns: usize, mut check: impl FnMut(&Ecosystem)) {
    for _ in 0..turns {
        eco.simulate_turn();
        check(eco);
        for _ in 0..30 {
            eco.advance_motion(1.0 / 30.0);
        }
    }
}

#[test]
fn test_initialize_reports_exact_counts() {
    let mut eco = Ecosystem::empty(Config::default(), 1);
    eco.initialize(PopulationCounts::new(25, 15, 5, 2));
    let stats = eco.get_statistics();

    assert_eq!(stats.counts, PopulationCounts::new(25, 15, 5, 2));
    assert_eq!(stats.turn, 0);
    assert_eq!(stats.day, 1);
}

#[test]
fn test_hungry_fish_eats_plant() {
    let mut eco = Ecosystem::empty(empty_config(), 2);
    let fish = eco.spawn(Species::Fish, Vec2::new(200.0, 200.0));
    let plant = eco.spawn(Species::Plant, Vec2::new(280.0, 240.0));
    eco.animal_mut(fish).unwrap().set_energy(20.0);

    eco.simulate_turn();
    let f = eco.animal(fish).unwrap();
    assert_eq!(f.target, Vec2::new(280.0, 240.0));
    assert_eq!(f.state, AnimalState::Eating);

    // Swim until the fish reaches the plant, then a turn resolves the meal
    let mut arrived = false;
    for _ in 0..1200 {
        if eco.advance_motion(1.0 / 60.0) > 0 {
            arrived = true;
            break;
        }
    }
    assert!(arrived);
    assert_eq!(eco.animal(fish).unwrap().position, Vec2::new(280.0, 240.0));
    eco.simulate_turn();

    let eats: Vec<_> = eco.events.iter().filter(|e| e.kind == EventKind::Eat).collect();
    assert_eq!(eats.len(), 1);
    assert_eq!(eats[0].species, Some(Species::Fish));
    assert_eq!(eats[0].other, Some(plant));
    assert!(eco.plant(plant).is_none());
}

#[test]
fn test_shark_drops_lock_beyond_persistence() {
    let mut eco = Ecosystem::empty(empty_config(), 3);
    eco.config.shark.patrol_chance = 0.0;
    let shark = eco.spawn(Species::Shark, Vec2::new(100.0, 300.0));
    let trout = eco.spawn(Species::Trout, Vec2::new(200.0, 300.0));

    eco.simulate_turn();
    assert_eq!(eco.animal(shark).unwrap().target_entity, Some(trout));

    // The trout escapes 500 units away, past the 480 persistence distance
    eco.animal_mut(trout).unwrap().position = Vec2::new(600.0, 300.0);
    eco.simulate_turn();

    assert_eq!(eco.animal(shark).unwrap().target_entity, None);
}

/// Eaters recorded while the driver runs turns and frames together
fn meals_under_driver(eco: &mut Ecosystem, turns: u64) -> Vec<Species> {
    let mut driver = TurnDriver::from_config(&eco.config);
    let fps = eco.config.world.fps;
    let mut eaters = Vec::new();
    driver.run_turns(eco, turns, fps, |eco| {
        eaters.extend(
            eco.events
                .iter()
                .filter(|e| e.kind == EventKind::Eat)
                .filter_map(|e| e.species),
        );
    });
    eaters
}

#[test]
fn test_trout_catches_cornered_fish_under_motion() {
    let mut eco = Ecosystem::empty(empty_config(), 21);
    let trout = eco.spawn(Species::Trout, Vec2::new(120.0, 120.0));
    let fish = eco.spawn(Species::Fish, Vec2::new(0.0, 0.0));
    eco.animal_mut(trout).unwrap().set_energy(60.0);

    let eaters = meals_under_driver(&mut eco, 20);

    assert!(eaters.contains(&Species::Trout));
    assert!(eco.animal(fish).is_none());
}

#[test]
fn test_shark_catches_cornered_trout_under_motion() {
    let mut eco = Ecosystem::empty(empty_config(), 22);
    eco.config.shark.patrol_chance = 0.0;
    eco.spawn(Species::Shark, Vec2::new(150.0, 150.0));
    let trout = eco.spawn(Species::Trout, Vec2::new(0.0, 0.0));

    let eaters = meals_under_driver(&mut eco, 20);

    assert!(eaters.contains(&Species::Shark));
    assert!(eco.animal(trout).is_none());
}

#[test]
fn test_trout_pack_shares_prey() {
    let mut eco = Ecosystem::empty(empty_config(), 4);
    eco.config.trout.min_allies_for_pack = 1;
    let a = eco.spawn(Species::Trout, Vec2::new(300.0, 300.0));
    let b = eco.spawn(Species::Trout, Vec2::new(300.0, 400.0));
    let fish = eco.spawn(Species::Fish, Vec2::new(450.0, 350.0));
    for id in [a, b] {
        eco.animal_mut(id).unwrap().set_energy(40.0);
    }

    eco.simulate_turn();

    assert_eq!(eco.animal(a).unwrap().target_entity, Some(fish));
    assert_eq!(eco.animal(b).unwrap().target_entity, Some(fish));
}

#[test]
fn test_clock_full_day_cycle() {
    let config = Config::default();
    let mut clock = TimeClock::new(config.clock.clone());
    clock.advance(5.0);
    let (day, progress) = (clock.day(), clock.day_progress());

    clock.advance(f64::from(config.clock.day_cycle_turns));

    assert_eq!(clock.day(), day + 1);
    assert!((clock.day_progress() - progress).abs() < 1e-9);

    let mut fresh = TimeClock::new(config.clock.clone());
    fresh.advance(f64::from(config.clock.day_cycle_turns));
    assert!(fresh.day_progress().abs() < 1e-9);
    assert_eq!(fresh.day(), 2);
}

#[test]
fn test_balance_tops_up_plants() {
    let mut config = empty_config();
    config.population.limits.plants.min = 20;
    let mut eco = Ecosystem::empty(config, 6);
    assert_eq!(eco.counts().plants, 0);

    eco.balance_populations();
    assert_eq!(eco.counts().plants, 20);
}

#[test]
fn test_energy_bounds_and_death_invariant() {
    let mut eco = Ecosystem::new_with_seed(Config::default(), 12345);

    run_with_motion(&mut eco, 300, |eco| {
        for animal in eco.populations.all_animals() {
            assert!(animal.energy >= 0.0 && animal.energy <= animal.max_energy);
            assert!(animal.energy > 0.0, "starved animal survived the turn");
            assert!(animal.age < animal.lifespan, "old animal survived the turn");
        }
    });
    assert_eq!(eco.turn_count(), 300);
}

#[test]
fn test_no_prey_eaten_twice_per_turn() {
    let mut eco = Ecosystem::new_with_seed(Config::default(), 777);
    eco.config.shark.fallback_to_fish = true;

    run_with_motion(&mut eco, 200, |eco| {
        let mut eaten: HashMap<u64, usize> = HashMap::new();
        for event in eco.events.iter().filter(|e| e.kind == EventKind::Eat) {
            *eaten.entry(event.other.unwrap()).or_default() += 1;
        }
        assert!(eaten.values().all(|&n| n == 1));
    });
}

#[test]
fn test_populations_stay_within_limits() {
    let mut config = Config::default();
    config.population.limits.fish.min = 5;
    config.population.limits.fish.max = 12;
    config.population.limits.trout.min = 2;
    let mut eco = Ecosystem::new_with_seed(config, 99);

    run_with_motion(&mut eco, 150, |eco| {
        let counts = eco.counts();
        for species in Species::ALL {
            let limit = eco.config.population.limits.get(species);
            assert!(limit.contains(counts.get(species)), "{} out of bounds", species);
        }
    });
}

#[test]
fn test_stale_target_is_reacquired() {
    let mut eco = Ecosystem::empty(empty_config(), 8);
    let trout = eco.spawn(Species::Trout, Vec2::new(100.0, 100.0));
    let first = eco.spawn(Species::Fish, Vec2::new(180.0, 100.0));
    let second = eco.spawn(Species::Fish, Vec2::new(100.0, 220.0));
    eco.animal_mut(trout).unwrap().set_energy(40.0);
    eco.animal_mut(trout).unwrap().target_entity = Some(first);

    // The locked fish disappears between turns
    let doomed = [first].into_iter().collect();
    eco.populations.remove(&doomed);

    eco.simulate_turn();
    assert_eq!(eco.animal(trout).unwrap().target_entity, Some(second));
}

#[test]
fn test_positions_stay_in_bounds() {
    let mut eco = Ecosystem::new_with_seed(Config::default(), 31);
    let (w, h) = (eco.config.world.width, eco.config.world.height);

    run_with_motion(&mut eco, 100, |eco| {
        for animal in eco.populations.all_animals() {
            assert!(animal.position.x >= 0.0 && animal.position.x + animal.size.x <= w);
            assert!(animal.position.y >= 0.0 && animal.position.y + animal.size.y <= h);
            assert!(animal.target.x >= 0.0 && animal.target.x + animal.size.x <= w);
            assert!(animal.target.y >= 0.0 && animal.target.y + animal.size.y <= h);
        }
    });
}

#[test]
fn test_checkpoint_persistence() {
    let mut eco = Ecosystem::new_with_seed(Config::default(), 54321);
    let mut driver = TurnDriver::from_config(&eco.config);
    driver.run_turns(&mut eco, 40, 30, |_| {});

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checkpoint.bin");
    eco.create_checkpoint().save(&path).unwrap();

    let loaded = Checkpoint::load(&path).unwrap();
    assert_eq!(loaded.seed, eco.seed());
    assert_eq!(loaded.snapshot, eco.to_snapshot());

    let mut restored = Ecosystem::from_checkpoint(loaded).unwrap();
    assert_eq!(restored.turn_count(), 40);
    assert_eq!(restored.clock(), eco.clock());

    // Both continue down the same random stream
    eco.run(25);
    restored.run(25);
    assert_eq!(restored.to_snapshot(), eco.to_snapshot());
}

#[test]
fn test_save_slot_roundtrip() {
    let mut eco = Ecosystem::new_with_seed(Config::default(), 10);
    eco.run(12);
    eco.set_paused(true);

    let dir = tempfile::tempdir().unwrap();
    let saves = SaveManager::new(dir.path()).unwrap();
    let id = saves.save("Reef at noon", eco.save_meta(), eco.to_snapshot()).unwrap();

    let listed = saves.list().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].cycle, 12);
    assert_eq!(listed[0].counts, eco.counts());

    let file = saves.load(&id).unwrap();
    let restored = Ecosystem::from_snapshot(Config::default(), &file.state, 10).unwrap();
    assert!(restored.is_paused());
    assert_eq!(restored.counts(), eco.counts());
    assert_eq!(restored.clock(), eco.clock());
    assert_eq!(restored.to_snapshot(), eco.to_snapshot());
}

#[test]
fn test_unknown_species_in_save_fails() {
    let json = r#"{"turn": 3.0, "entities": [{"id": 1, "species": "octopus", "x": 1.0, "y": 1.0}]}"#;
    let snapshot: EcosystemSnapshot = serde_json::from_str(json).unwrap();

    let result = Ecosystem::from_snapshot(Config::default(), &snapshot, 0);
    assert!(matches!(result, Err(PersistenceError::UnknownSpecies(_))));
}

#[test]
fn test_config_yaml_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    let mut config = Config::default();
    config.shark.fallback_to_fish = true;
    config.population.initial.fish = 7;
    config.save(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert!(loaded.shark.fallback_to_fish);
    assert_eq!(loaded.population.initial.fish, 7);
    assert_eq!(loaded.clock.day_cycle_turns, 32);
}
