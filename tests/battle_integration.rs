//! Battle system integration tests

use battle_grid::battle::*;
use battle_grid::core::types::{BlockingTier, DamageType, LineOfFire, Side, UnitKey};
use battle_grid::data::{GameData, RankStats, ResistanceTable, UnitDef};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const UNITS: &str = r#"
[[units]]
id = "gunner"
name = "Gunner"
tags = ["soldier"]

[[units.ranks]]
hp = 60
accuracy = 100

[[units.weapons]]
name = "Launcher"
abilities = ["shell", "bite"]

[[units]]
id = "dummy"
name = "Dummy"

[[units.ranks]]
hp = 200

[[units]]
id = "plated_dummy"
name = "Plated Dummy"

[[units.ranks]]
hp = 200

[units.ranks.hp_resistances]
explosive = 50

[[units]]
id = "biter"
name = "Biter"

[[units.ranks]]
hp = 10
accuracy = 100

[[units.weapons]]
name = "Jaws"
abilities = ["bite"]
"#;

const ABILITIES: &str = r#"
[[abilities]]
id = "shell"
damage_type = "explosive"
min_damage = 100
max_damage = 100
max_range = 5
ammo_cost = 0

[abilities.target_area]
type = "area"
tiles = [
    { x = 0, y = 0 },
    { x = -1, y = 0, damage_percent = 50 },
    { x = 1, y = 0, damage_percent = 50 },
    { x = 0, y = 1, damage_percent = 50 },
]

[[abilities]]
id = "bite"
min_damage = 4
max_damage = 4
max_range = 1
line_of_fire = "contact"
ammo_cost = 0
"#;

const EFFECTS: &str = r#"
[[status_effects]]
id = "burning"
family = "fire"
duration = 3

[status_effects.kind]
type = "damage_over_time"
damage_type = "fire"
"#;

fn game_data() -> GameData {
    let mut data = GameData::parse_toml(UNITS, ABILITIES, EFFECTS, "").unwrap();
    data.add_unit(UnitDef {
        id: "statue".into(),
        ranks: vec![RankStats {
            hp: 5,
            ..Default::default()
        }],
        ignorable: true,
        ..Default::default()
    });
    data
}

fn slots(unit_id: &str, ids: &[u8]) -> Vec<FormationSlot> {
    ids.iter().map(|&id| FormationSlot::new(unit_id, id, 1)).collect()
}

#[test]
fn test_dodge_example() {
    // Offense 30 against defense 20
    assert_eq!(dodge_chance(20, 30), 0);
    assert_eq!(dodge_chance(30, 30), 5);
}

#[test]
fn test_piercing_and_armor_example() {
    let mut armor_resistances = ResistanceTable::default();
    armor_resistances.set(DamageType::Piercing, 50);
    let defender = DefenderProfile {
        current_armor: 40,
        hp_resistances: ResistanceTable::default(),
        armor_resistances,
        stunned: false,
        modifiers: Vec::new(),
    };

    let breakdown = DamageBreakdown::compute(100, 0, false, 100, DamageType::Piercing, 25, &defender);
    assert_eq!(breakdown.base_damage, 100);
    assert_eq!(breakdown.mitigation.piercing, 25);
    assert_eq!(breakdown.mitigation.armorable, 75);
    assert_eq!(breakdown.mitigation.armor_resisted, 37);
    assert_eq!(breakdown.mitigation.overflow, 0);
    assert_eq!(breakdown.hp_damage(), 25);
    assert_eq!(breakdown.armor_damage(), 37);
}

#[test]
fn test_stunned_target_takes_everything_to_hp() {
    let defender = DefenderProfile {
        current_armor: 40,
        hp_resistances: ResistanceTable::default(),
        armor_resistances: ResistanceTable::uniform(50),
        stunned: true,
        modifiers: Vec::new(),
    };
    let result = mitigate(100, DamageType::Piercing, 25, &defender);
    assert!(result.armor_bypassed);
    assert_eq!(result.hp_damage, 100);
    assert_eq!(result.armor_damage, 0);
}

#[test]
fn test_splash_through_player_turn() {
    let data = game_data();
    let mut wave = slots("dummy", &[1, 2, 7]);
    wave.push(FormationSlot::new("plated_dummy", 3, 1));
    let state = initialize_battle(
        &data,
        GridLayout::standard(),
        &slots("gunner", &[2]),
        vec![Wave::new(wave)],
        0,
    )
    .unwrap();

    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let transition = resolve_player_turn(
        &data,
        state,
        PlayerCommand::Attack {
            unit: 2,
            ability_id: "shell".into(),
            target: 2,
        },
        &mut rng,
    );
    assert!(transition.accepted);
    let state = transition.state;
    let hp = |id: u8| state.unit(UnitKey::new(Side::Enemy, id)).unwrap().current_hp;

    // Center at full damage, neighbours at half, resisted independently
    assert_eq!(hp(2), 100);
    assert_eq!(hp(1), 150);
    assert_eq!(hp(3), 175);
    assert_eq!(hp(7), 150);
    assert_eq!(state.phase, TurnPhase::EnemyTurn);
    assert_eq!(state.log.len(), 1);
    assert_eq!(state.log[0].summary.hits, 4);
}

#[test]
fn test_rejected_command_leaves_state_unchanged() {
    let data = game_data();
    let state = initialize_battle(
        &data,
        GridLayout::standard(),
        &slots("gunner", &[2]),
        vec![Wave::new(slots("dummy", &[2]))],
        0,
    )
    .unwrap();
    let before = state.clone();
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    let transition = resolve_player_turn(
        &data,
        state,
        PlayerCommand::Attack {
            unit: 2,
            ability_id: "shell".into(),
            target: 12,
        },
        &mut rng,
    );
    assert!(!transition.accepted);
    assert!(transition.actions.is_empty());
    assert_eq!(transition.state, before);
}

#[test]
fn test_dot_clears_last_wave_before_enemy_acts() {
    let data = game_data();
    let state = initialize_battle(
        &data,
        GridLayout::standard(),
        &slots("gunner", &[2]),
        vec![Wave::new(slots("biter", &[2]))],
        0,
    )
    .unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(3);

    let mut state = resolve_player_turn(&data, state, PlayerCommand::Skip, &mut rng).state;
    let burning = data.status_effect("burning").unwrap().clone();
    apply_status(
        &mut state.enemy_units[0],
        &burning,
        50,
        Some(UnitKey::new(Side::Friendly, 2)),
    );

    let transition = resolve_enemy_turn(&data, state, &mut rng);
    assert!(transition.accepted);
    assert!(transition.state.is_player_victory());
    assert!(!transition
        .actions
        .iter()
        .any(|a| matches!(a, BattleAction::Attack { .. } | BattleAction::Skip { .. })));
    assert!(transition.actions.contains(&BattleAction::Death {
        unit: UnitKey::new(Side::Enemy, 2),
        unit_id: "biter".into(),
        killer: Some(UnitKey::new(Side::Friendly, 2)),
    }));
    // The gunner is untouched
    assert_eq!(transition.state.friendly_units[0].current_hp, 60);
}

#[test]
fn test_dot_clear_brings_next_wave_before_ai() {
    let data = game_data();
    let state = initialize_battle(
        &data,
        GridLayout::standard(),
        &slots("gunner", &[2]),
        vec![
            Wave::new(slots("dummy", &[2])),
            Wave::new(slots("biter", &[2])),
        ],
        0,
    )
    .unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(3);

    let mut state = resolve_player_turn(&data, state, PlayerCommand::Skip, &mut rng).state;
    let burning = data.status_effect("burning").unwrap().clone();
    apply_status(&mut state.enemy_units[0], &burning, 500, None);

    let transition = resolve_enemy_turn(&data, state, &mut rng);
    let wave_started = transition
        .actions
        .iter()
        .position(|a| matches!(a, BattleAction::WaveStarted { wave: 1, .. }))
        .unwrap();
    let attack = transition
        .actions
        .iter()
        .position(|a| matches!(a, BattleAction::Attack { .. }))
        .unwrap();
    assert!(wave_started < attack);

    let state = transition.state;
    assert_eq!(state.current_wave, 1);
    assert_eq!(state.enemy_units[0].unit_id, "biter");
    assert_eq!(state.friendly_units[0].current_hp, 56);
    assert_eq!(state.phase, TurnPhase::PlayerTurn);
}

#[test]
fn test_wave_advance_requires_cleared_wave() {
    let data = game_data();
    let mut state = initialize_battle(
        &data,
        GridLayout::standard(),
        &slots("gunner", &[2]),
        vec![
            Wave::new(vec![
                FormationSlot::new("dummy", 2, 1),
                FormationSlot::new("statue", 4, 1),
            ]),
            Wave::new(slots("dummy", &[0])),
        ],
        0,
    )
    .unwrap();

    let rejected = advance_wave(&data, state.clone());
    assert!(!rejected.accepted);
    assert_eq!(rejected.state.current_wave, 0);

    // Ignorable units do not hold a wave open
    state.enemy_units[0].take_damage(200, 0);
    state.enemy_collapsed.insert(0);
    let advanced = advance_wave(&data, state);
    assert!(advanced.accepted);
    assert_eq!(advanced.state.current_wave, 1);
    assert!(advanced.state.enemy_collapsed.is_empty());
    assert_eq!(advanced.state.phase, TurnPhase::EnemyTurn);

    // No wave after the last one
    let mut last = advanced.state;
    last.enemy_units[0].take_damage(200, 0);
    assert!(!advance_wave(&data, last.clone()).accepted);
    assert_eq!(
        check_battle_end(&last),
        BattleEndCheck {
            is_over: true,
            player_won: true,
        }
    );
}

#[test]
fn test_mutual_wipe_is_defeat() {
    let data = game_data();
    let mut state = initialize_battle(
        &data,
        GridLayout::standard(),
        &slots("gunner", &[2]),
        vec![Wave::new(slots("dummy", &[2]))],
        0,
    )
    .unwrap();
    state.friendly_units[0].take_damage(1000, 0);
    state.enemy_units[0].take_damage(1000, 0);
    assert_eq!(
        check_battle_end(&state),
        BattleEndCheck {
            is_over: true,
            player_won: false,
        }
    );
}

#[test]
fn test_line_of_fire_tiers() {
    let mut data = game_data();
    for (id, blocking) in [
        ("open", BlockingTier::None),
        ("wall", BlockingTier::God),
    ] {
        data.add_unit(UnitDef {
            id: id.into(),
            blocking,
            ranks: vec![RankStats {
                hp: 10,
                ..Default::default()
            }],
            ..Default::default()
        });
    }
    let layout = GridLayout::standard();
    let spawn = |unit_id: &str, grid_id: u8| {
        CombatUnit::spawn(
            &data,
            layout,
            Side::Enemy,
            &FormationSlot::new(unit_id, grid_id, 1),
        )
        .unwrap()
    };

    // A None-tier unit in front still stops contact attacks
    let defenders = vec![spawn("open", 0), spawn("dummy", 5)];
    let contact = check_line_of_fire(&data, LineOfFire::Contact, &defenders[1], &defenders);
    assert!(contact.blocked);
    assert_eq!(contact.blocker, Some(UnitKey::new(Side::Enemy, 0)));
    assert!(!check_line_of_fire(&data, LineOfFire::Direct, &defenders[1], &defenders).blocked);

    // Nothing stops indirect fire
    let defenders = vec![spawn("wall", 0), spawn("wall", 5), spawn("dummy", 10)];
    let indirect = check_line_of_fire(&data, LineOfFire::Indirect, &defenders[2], &defenders);
    assert_eq!(
        indirect,
        LineOfFireCheck {
            blocked: false,
            blocker: None,
        }
    );
    assert!(check_line_of_fire(&data, LineOfFire::Precise, &defenders[2], &defenders).blocked);
}

#[test]
fn test_one_row_collapses_per_side_per_turn() {
    let data = game_data();
    let state = initialize_battle(
        &data,
        GridLayout::standard(),
        &slots("dummy", &[0]),
        vec![Wave::new(slots("dummy", &[10]))],
        0,
    )
    .unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    let after_player = resolve_player_turn(&data, state, PlayerCommand::Skip, &mut rng);
    let collapsed: Vec<_> = after_player
        .actions
        .iter()
        .filter(|a| matches!(a, BattleAction::RowCollapsed { .. }))
        .cloned()
        .collect();
    assert_eq!(
        collapsed,
        vec![
            BattleAction::RowCollapsed {
                side: Side::Enemy,
                row: 0,
            },
            BattleAction::RowCollapsed {
                side: Side::Friendly,
                row: 1,
            },
        ]
    );

    let after_enemy = resolve_enemy_turn(&data, after_player.state, &mut rng);
    let state = after_enemy.state;
    assert_eq!(state.enemy_collapsed.iter().copied().collect::<Vec<_>>(), vec![0, 1]);
    assert_eq!(state.friendly_collapsed.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
}

fn shipped_data_dir() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("data")
}

#[test]
fn test_health_and_armor_stay_in_bounds() {
    let data = GameData::load_from_dir(&shipped_data_dir()).unwrap();
    let scenario =
        Scenario::load_from_toml(&shipped_data_dir().join("scenarios/outpost.toml")).unwrap();

    for seed in 0..8 {
        let mut state = scenario.initialize(&data).unwrap();
        let mut policy = RandomPolicy::new(ChaCha8Rng::seed_from_u64(seed));
        let mut rng = ChaCha8Rng::seed_from_u64(seed + 100);
        let mut steps = 0;
        while !state.is_battle_over() && steps < 300 {
            state = match state.phase {
                TurnPhase::PlayerTurn => {
                    let command = policy.choose_command(&data, &state);
                    let transition = resolve_player_turn(&data, state, command, &mut rng);
                    if transition.accepted {
                        transition.state
                    } else {
                        resolve_player_turn(&data, transition.state, PlayerCommand::Skip, &mut rng)
                            .state
                    }
                }
                _ => resolve_enemy_turn(&data, state, &mut rng).state,
            };
            for unit in state.friendly_units.iter().chain(&state.enemy_units) {
                assert!(unit.current_hp <= unit.max_hp);
                assert!(unit.current_armor <= unit.max_armor);
                assert_eq!(unit.is_dead, unit.current_hp == 0);
                if unit.is_dead {
                    assert!(unit.status_effects.is_empty());
                }
            }
            steps += 1;
        }
    }
}
